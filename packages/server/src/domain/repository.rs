//! Durable store interfaces consumed by the hub.
//!
//! The hub never talks to SQL directly. These traits are the boundary;
//! concrete implementations live in the infrastructure layer.

use async_trait::async_trait;

use super::{
    entity::{NewPrivateMessage, PrivateMessage, Session, TypingIndicator, User},
    error::RepositoryError,
    value_object::{MessageId, UserId},
};

/// Forum store operations the hub needs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ForumRepository: Send + Sync {
    /// Set the user's online flag.
    async fn set_online(&self, user_id: UserId, online: bool) -> Result<(), RepositoryError>;

    /// Users currently flagged online, in presence-snapshot order.
    async fn list_online(&self) -> Result<Vec<User>, RepositoryError>;

    /// Persist a private message and return its id.
    async fn create_private_message(
        &self,
        message: NewPrivateMessage,
    ) -> Result<MessageId, RepositoryError>;

    /// Messages exchanged between `a` and `b` in either direction.
    ///
    /// The window is taken newest-first (`limit`/`offset`) and returned
    /// oldest-first.
    async fn fetch_recent_between(
        &self,
        a: UserId,
        b: UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PrivateMessage>, RepositoryError>;

    /// Record that `user_id` is (or stopped) typing to `target_user_id`.
    ///
    /// Updates the existing record for the pair or inserts one, and returns
    /// the full indicator.
    async fn upsert_typing(
        &self,
        user_id: UserId,
        target_user_id: UserId,
        is_typing: bool,
    ) -> Result<TypingIndicator, RepositoryError>;
}

/// Session lookup used to authenticate WebSocket upgrades.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// The live session with this id. Expired sessions are reported as absent.
    async fn find_session(&self, session_id: &str) -> Result<Option<Session>, RepositoryError>;
}

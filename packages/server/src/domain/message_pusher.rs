//! Delivery of hub events to connected users.

use std::sync::Arc;

use async_trait::async_trait;

use super::{
    connection::Connection, error::MessagePushError, event::OutboundEvent, value_object::UserId,
};

/// Outcome of a fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections the frame was enqueued on
    pub delivered: usize,
    /// Connections evicted because their queue was full
    pub evicted: usize,
}

/// Registry of live connections plus non-blocking delivery onto their queues.
///
/// Implementations must never wait for queue space. A connection whose queue
/// is full is unregistered and closed on the spot; its pumps then run the
/// regular teardown.
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// Install `connection` as the user's only connection and return the one
    /// it replaced. The caller tears down the returned connection.
    async fn register(&self, connection: Arc<Connection>) -> Option<Arc<Connection>>;

    /// Remove `connection` only if it is still the registered instance for its user.
    async fn unregister(&self, connection: &Arc<Connection>) -> bool;

    /// The currently registered connection for `user_id`.
    async fn lookup(&self, user_id: UserId) -> Option<Arc<Connection>>;

    /// Deliver an event to one user.
    async fn push_to(&self, user_id: UserId, event: &OutboundEvent)
    -> Result<(), MessagePushError>;

    /// Deliver an event to every registered connection.
    async fn broadcast(&self, event: &OutboundEvent) -> Result<BroadcastReport, MessagePushError>;
}

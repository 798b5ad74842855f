//! Forum records the hub reads from and writes to the durable store.

use super::value_object::{MessageContent, MessageId, Timestamp, UserId};

/// A forum user as published in the presence snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub age: u32,
    pub gender: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub created_at: Timestamp,
    pub last_login: Option<Timestamp>,
    pub online: bool,
}

impl User {
    /// Create an offline user with only the identifying fields set.
    pub fn new(id: UserId, username: impl Into<String>, created_at: Timestamp) -> Self {
        Self {
            id,
            username: username.into(),
            age: 0,
            gender: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            created_at,
            last_login: None,
            online: false,
        }
    }
}

/// A private message before persistence. The sender is always the
/// authenticated owner of the connection it arrived on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPrivateMessage {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: MessageContent,
}

/// A persisted private message carrying canonical id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateMessage {
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    /// Display name of the sender
    pub sender: String,
    /// Display name of the receiver
    pub receiver: String,
    pub content: MessageContent,
    pub read: bool,
    pub created_at: Timestamp,
}

/// Typing status of `user_id` towards `target_user_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingIndicator {
    pub user_id: UserId,
    pub username: String,
    pub target_user_id: UserId,
    pub is_typing: bool,
    pub updated_at: Timestamp,
}

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub user_id: UserId,
    pub expires_at: Timestamp,
}

impl Session {
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now > self.expires_at
    }
}

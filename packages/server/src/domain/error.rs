//! Domain error types.

use thiserror::Error;

use super::value_object::UserId;

/// Value object validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("user id must be positive, got {0}")]
    InvalidUserId(i64),

    #[error("message content must not be empty")]
    EmptyContent,

    #[error("message content is too long ({length} > {max} characters)")]
    ContentTooLong { length: usize, max: usize },
}

/// Errors reported by the durable store collaborators
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("user {0} not found")]
    UserNotFound(UserId),

    #[error("storage failure: {0}")]
    Storage(String),
}

/// Errors raised while pushing an event to connected users
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    /// No connection is registered for the user; the event is undeliverable.
    #[error("user {0} is not connected")]
    NotConnected(UserId),

    /// The connection is already closing and accepts no more frames.
    #[error("connection of user {0} is closed")]
    ConnectionClosed(UserId),

    /// The outbound queue was full; the connection has been evicted.
    #[error("outbound queue of user {0} is full, connection evicted")]
    QueueFull(UserId),

    #[error("failed to encode envelope: {0}")]
    Encode(String),
}

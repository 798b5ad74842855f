//! Hub events: what a client may send and what the hub pushes back.

use super::entity::{PrivateMessage, TypingIndicator, User};
use super::value_object::{MessageContent, UserId};

/// A private message as requested by the client. The sender is not part of
/// the request; it is taken from the connection the frame arrived on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateMessageRequest {
    pub receiver_id: UserId,
    pub content: MessageContent,
}

/// A decoded inbound envelope. One case per known tag plus `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    PrivateMessage(PrivateMessageRequest),
    TypingIndicator {
        target_user_id: UserId,
        is_typing: bool,
    },
    /// Raw frame, fanned out unmodified.
    PostCreated(String),
    /// Raw frame, fanned out unmodified.
    CommentCreated(String),
    /// Unrecognized tag; accepted on the wire, never routed.
    Unknown(String),
}

impl ClientEvent {
    /// Wire tag of the event, for logging.
    pub fn tag(&self) -> &str {
        match self {
            Self::PrivateMessage(_) => "private_message",
            Self::TypingIndicator { .. } => "typing_indicator",
            Self::PostCreated(_) => "post_created",
            Self::CommentCreated(_) => "comment_created",
            Self::Unknown(tag) => tag,
        }
    }
}

/// An event the hub delivers to one or more connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    PrivateMessage(PrivateMessage),
    TypingIndicator(TypingIndicator),
    OnlineUsers(Vec<User>),
    /// An already-encoded frame relayed as received.
    Passthrough(String),
}

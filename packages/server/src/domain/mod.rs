//! Domain layer: identities, forum records, hub events, connections and the
//! interfaces the hub consumes.

pub mod connection;
pub mod entity;
pub mod error;
pub mod event;
pub mod message_pusher;
pub mod repository;
pub mod value_object;

pub use connection::{Connection, ConnectionId, ConnectionState, EnqueueError, OutboundQueue};
pub use entity::{NewPrivateMessage, PrivateMessage, Session, TypingIndicator, User};
pub use error::{MessagePushError, RepositoryError, ValueObjectError};
pub use event::{ClientEvent, OutboundEvent, PrivateMessageRequest};
pub use message_pusher::{BroadcastReport, MessagePusher};
pub use repository::{ForumRepository, SessionRepository};
pub use value_object::{MessageContent, MessageId, Timestamp, UserId};

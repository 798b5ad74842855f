//! Envelope codec for the hub's WebSocket protocol.
//!
//! Every frame is a JSON object `{"type": "<tag>", "payload": <any>}`.
//! Payload keys are camelCase.

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::domain::{ClientEvent, OutboundEvent, PrivateMessageRequest, UserId};

/// Known envelope tags. `as_str` is the only table of wire names; serde and
/// `parse` both go through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    PrivateMessage,
    TypingIndicator,
    PostCreated,
    CommentCreated,
    OnlineUsers,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrivateMessage => "private_message",
            Self::TypingIndicator => "typing_indicator",
            Self::PostCreated => "post_created",
            Self::CommentCreated => "comment_created",
            Self::OnlineUsers => "online_users",
        }
    }

    const ALL: [Self; 5] = [
        Self::PrivateMessage,
        Self::TypingIndicator,
        Self::PostCreated,
        Self::CommentCreated,
        Self::OnlineUsers,
    ];

    pub fn parse(tag: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|message_type| message_type.as_str() == tag)
    }
}

impl Serialize for MessageType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Codec failures. None of them are fatal to the connection.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed envelope: {0}")]
    Malformed(String),

    #[error("invalid {tag} payload: {reason}")]
    InvalidPayload { tag: &'static str, reason: String },

    #[error("failed to encode {tag} envelope: {reason}")]
    Encode { tag: &'static str, reason: String },
}

/// Inbound envelope with its payload left undecoded.
#[derive(Debug, Deserialize)]
pub struct RawEnvelope {
    #[serde(rename = "type")]
    pub r#type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Outbound envelope.
#[derive(Debug, Serialize)]
pub struct Envelope<'a, P: Serialize> {
    #[serde(rename = "type")]
    pub r#type: MessageType,
    pub payload: &'a P,
}

/// `private_message` payload sent by a client. Any sender field is ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateMessagePayload {
    pub receiver_id: UserId,
    pub content: String,
}

/// `typing_indicator` payload sent by a client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingIndicatorPayload {
    pub target_user_id: UserId,
    #[serde(default)]
    pub is_typing: bool,
}

/// Persisted private message as pushed to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateMessageDto {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sender: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub receiver: String,
    pub content: String,
    pub read: bool,
    pub created_at: String,
}

/// Typing indicator as pushed to its target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingIndicatorDto {
    pub user_id: i64,
    pub username: String,
    pub target_user_id: i64,
    pub is_typing: bool,
    pub updated_at: String,
}

/// Entry of the `online_users` presence snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: i64,
    pub username: String,
    pub age: u32,
    pub gender: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<String>,
    pub online: bool,
}

/// Decode one inbound text frame.
///
/// Unknown tags decode successfully to [`ClientEvent::Unknown`]. Passthrough
/// tags keep the frame exactly as received.
pub fn decode_client_event(text: &str) -> Result<ClientEvent, CodecError> {
    let envelope: RawEnvelope =
        serde_json::from_str(text).map_err(|e| CodecError::Malformed(e.to_string()))?;

    let Some(message_type) = MessageType::parse(&envelope.r#type) else {
        return Ok(ClientEvent::Unknown(envelope.r#type));
    };

    match message_type {
        MessageType::PrivateMessage => {
            let payload: PrivateMessagePayload = decode_payload(message_type, envelope.payload)?;
            let request = PrivateMessageRequest::try_from(payload).map_err(|e| {
                CodecError::InvalidPayload {
                    tag: message_type.as_str(),
                    reason: e.to_string(),
                }
            })?;
            Ok(ClientEvent::PrivateMessage(request))
        }
        MessageType::TypingIndicator => {
            let payload: TypingIndicatorPayload = decode_payload(message_type, envelope.payload)?;
            Ok(ClientEvent::TypingIndicator {
                target_user_id: payload.target_user_id,
                is_typing: payload.is_typing,
            })
        }
        MessageType::PostCreated => Ok(ClientEvent::PostCreated(text.to_string())),
        MessageType::CommentCreated => Ok(ClientEvent::CommentCreated(text.to_string())),
        // Server-to-client only; a client echoing it gets no routed action.
        MessageType::OnlineUsers => Ok(ClientEvent::Unknown(envelope.r#type)),
    }
}

fn decode_payload<T: serde::de::DeserializeOwned>(
    message_type: MessageType,
    payload: serde_json::Value,
) -> Result<T, CodecError> {
    serde_json::from_value(payload).map_err(|e| CodecError::InvalidPayload {
        tag: message_type.as_str(),
        reason: e.to_string(),
    })
}

/// Encode an outbound event into a text frame.
pub fn encode_event(event: &OutboundEvent) -> Result<String, CodecError> {
    match event {
        OutboundEvent::PrivateMessage(message) => {
            encode(MessageType::PrivateMessage, &PrivateMessageDto::from(message))
        }
        OutboundEvent::TypingIndicator(indicator) => {
            encode(MessageType::TypingIndicator, &TypingIndicatorDto::from(indicator))
        }
        OutboundEvent::OnlineUsers(users) => {
            let users: Vec<UserDto> = users.iter().map(UserDto::from).collect();
            encode(MessageType::OnlineUsers, &users)
        }
        OutboundEvent::Passthrough(frame) => Ok(frame.clone()),
    }
}

fn encode<P: Serialize>(message_type: MessageType, payload: &P) -> Result<String, CodecError> {
    serde_json::to_string(&Envelope {
        r#type: message_type,
        payload,
    })
    .map_err(|e| CodecError::Encode {
        tag: message_type.as_str(),
        reason: e.to_string(),
    })
}

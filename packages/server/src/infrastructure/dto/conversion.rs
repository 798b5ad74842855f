//! Mapping between wire DTOs and domain types.

use agora_shared::time::timestamp_to_rfc3339;

use crate::domain::{
    MessageContent, PrivateMessage, PrivateMessageRequest, TypingIndicator, User,
    ValueObjectError,
};

use super::websocket::{PrivateMessagePayload, PrivateMessageDto, TypingIndicatorDto, UserDto};

impl TryFrom<PrivateMessagePayload> for PrivateMessageRequest {
    type Error = ValueObjectError;

    fn try_from(payload: PrivateMessagePayload) -> Result<Self, Self::Error> {
        Ok(Self {
            receiver_id: payload.receiver_id,
            content: MessageContent::new(payload.content)?,
        })
    }
}

impl From<&PrivateMessage> for PrivateMessageDto {
    fn from(message: &PrivateMessage) -> Self {
        Self {
            id: message.id.value(),
            sender_id: message.sender_id.value(),
            receiver_id: message.receiver_id.value(),
            sender: message.sender.clone(),
            receiver: message.receiver.clone(),
            content: message.content.as_str().to_string(),
            read: message.read,
            created_at: timestamp_to_rfc3339(message.created_at.value()),
        }
    }
}

impl From<&TypingIndicator> for TypingIndicatorDto {
    fn from(indicator: &TypingIndicator) -> Self {
        Self {
            user_id: indicator.user_id.value(),
            username: indicator.username.clone(),
            target_user_id: indicator.target_user_id.value(),
            is_typing: indicator.is_typing,
            updated_at: timestamp_to_rfc3339(indicator.updated_at.value()),
        }
    }
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.value(),
            username: user.username.clone(),
            age: user.age,
            gender: user.gender.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            created_at: timestamp_to_rfc3339(user.created_at.value()),
            last_login: user
                .last_login
                .map(|timestamp| timestamp_to_rfc3339(timestamp.value())),
            online: user.online,
        }
    }
}

//! Infrastructure layer: wire formats, connection registry and storage.

pub mod dto;
pub mod message_pusher;
pub mod repository;

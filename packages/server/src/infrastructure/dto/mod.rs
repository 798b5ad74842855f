//! Data Transfer Objects (DTOs).
//!
//! - `websocket`: the envelope codec and its payloads
//! - `conversion`: mapping between DTOs and domain types

pub mod conversion;
pub mod websocket;

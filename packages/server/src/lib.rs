//! Real-time connection hub for the Agora forum.
//!
//! Tracks one live WebSocket connection per user, routes private messages and
//! typing indicators through the forum store, relays post/comment
//! notifications and keeps every client's online-user list current.

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

//! InMemory Repository 実装

pub mod demo;
pub mod forum;
pub mod session;

pub use demo::{DemoAccount, seed_demo};
pub use forum::InMemoryForumRepository;
pub use session::{InMemorySessionRepository, SESSION_TTL_MILLIS};

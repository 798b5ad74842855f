//! UI 層（axum サーバー、WebSocket / HTTP ハンドラー）

pub mod handler;
pub mod server;
pub mod signal;
pub mod state;

pub use server::Server;
pub use state::AppState;

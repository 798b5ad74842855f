//! メッセージ送信（通知）の実装
//!
//! - `registry`: ユーザー ID から現在の接続への対応表
//! - `websocket`: レジストリ上の接続キューへ envelope を積む `MessagePusher` 実装

pub mod registry;
pub mod websocket;

pub use registry::ConnectionRegistry;
pub use websocket::WebSocketMessagePusher;

//! UseCase 層
//!
//! - `connect_user`: 接続の登録と再接続時の古い接続の切断
//! - `disconnect_user`: 接続の一度きりの後始末（teardown）
//! - `route_message`: 受信イベントの振り分け
//! - `presence`: オンライン一覧の配信
//! - `authenticate`: 接続要求のユーザー解決

pub mod authenticate;
pub mod connect_user;
pub mod disconnect_user;
pub mod error;
pub mod presence;
pub mod route_message;

pub use authenticate::{AuthenticateUseCase, Credentials};
pub use connect_user::ConnectUserUseCase;
pub use disconnect_user::DisconnectUserUseCase;
pub use error::{PresenceError, RouteError};
pub use presence::{BroadcastOnlineUsersUseCase, PresenceGate};
pub use route_message::{RECENT_LOOKUP_WINDOW, RouteMessageUseCase, RouteOutcome};

//! Shared application state and dependency wiring.

use std::sync::Arc;

use crate::{
    config::HubConfig,
    domain::{ForumRepository, MessagePusher, SessionRepository},
    infrastructure::message_pusher::{ConnectionRegistry, WebSocketMessagePusher},
    usecase::{
        AuthenticateUseCase, BroadcastOnlineUsersUseCase, ConnectUserUseCase,
        DisconnectUserUseCase, PresenceGate, RouteMessageUseCase,
    },
};

/// Shared application state
pub struct AppState {
    /// 接続のユースケース
    pub connect_user_usecase: Arc<ConnectUserUseCase>,
    /// 切断（teardown）のユースケース
    pub disconnect_user_usecase: Arc<DisconnectUserUseCase>,
    /// メッセージ振り分けのユースケース
    pub route_message_usecase: Arc<RouteMessageUseCase>,
    /// オンライン一覧のユースケース
    pub broadcast_online_users_usecase: Arc<BroadcastOnlineUsersUseCase>,
    /// 認証のユースケース
    pub authenticate_usecase: Arc<AuthenticateUseCase>,
    pub config: HubConfig,
}

impl AppState {
    /// Wire the hub on top of the given stores.
    ///
    /// 1. MessagePusher (connection registry)
    /// 2. UseCases
    pub fn new(
        forum: Arc<dyn ForumRepository>,
        sessions: Arc<dyn SessionRepository>,
        config: HubConfig,
    ) -> Self {
        let message_pusher: Arc<dyn MessagePusher> = Arc::new(WebSocketMessagePusher::new(
            Arc::new(ConnectionRegistry::new()),
        ));
        let gate = Arc::new(PresenceGate::new());

        let broadcast_online_users_usecase = Arc::new(BroadcastOnlineUsersUseCase::new(
            forum.clone(),
            message_pusher.clone(),
        ));
        let disconnect_user_usecase = Arc::new(DisconnectUserUseCase::new(
            forum.clone(),
            message_pusher.clone(),
            broadcast_online_users_usecase.clone(),
            gate.clone(),
        ));
        let connect_user_usecase = Arc::new(ConnectUserUseCase::new(
            forum.clone(),
            message_pusher.clone(),
            broadcast_online_users_usecase.clone(),
            disconnect_user_usecase.clone(),
            gate,
        ));
        let route_message_usecase = Arc::new(RouteMessageUseCase::new(forum, message_pusher));
        let authenticate_usecase = Arc::new(AuthenticateUseCase::new(sessions));

        Self {
            connect_user_usecase,
            disconnect_user_usecase,
            route_message_usecase,
            broadcast_online_users_usecase,
            authenticate_usecase,
            config,
        }
    }
}

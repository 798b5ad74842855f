//! UseCase: ユーザー接続処理
//!
//! 1 ユーザーにつき接続は 1 つだけ。同じユーザーの新しい接続は古い接続を
//! 置き換え、古い接続はこのユースケースが返る前に閉じられる。

use std::sync::Arc;

use crate::domain::{Connection, ForumRepository, MessagePusher};

use super::{
    disconnect_user::DisconnectUserUseCase,
    presence::{BroadcastOnlineUsersUseCase, PresenceGate},
};

/// ユーザー接続のユースケース
pub struct ConnectUserUseCase {
    repository: Arc<dyn ForumRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    presence: Arc<BroadcastOnlineUsersUseCase>,
    disconnect: Arc<DisconnectUserUseCase>,
    gate: Arc<PresenceGate>,
}

impl ConnectUserUseCase {
    pub fn new(
        repository: Arc<dyn ForumRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        presence: Arc<BroadcastOnlineUsersUseCase>,
        disconnect: Arc<DisconnectUserUseCase>,
        gate: Arc<PresenceGate>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
            presence,
            disconnect,
            gate,
        }
    }

    /// 接続を登録し、オンラインにして一覧を配信する
    ///
    /// 戻った時点で同じユーザーの古い接続は閉じられている。
    /// ストアへの書き込みや配信の失敗はログに残すだけで、接続自体は有効のまま。
    pub async fn execute(&self, connection: Arc<Connection>) {
        let user_id = connection.user_id();
        let connection_id = connection.id();

        let evicted = {
            let _gate = self.gate.enter().await;
            let evicted = self.message_pusher.register(connection).await;
            if let Err(e) = self.repository.set_online(user_id, true).await {
                tracing::warn!(%user_id, error = %e, "Failed to mark user online");
            }
            evicted
        };

        if let Some(previous) = evicted {
            tracing::info!(
                %user_id,
                previous_connection_id = %previous.id(),
                %connection_id,
                "Replacing existing connection"
            );
            self.disconnect.execute(&previous).await;
        }

        tracing::info!(%user_id, %connection_id, "User connected");
        if let Err(e) = self.presence.execute().await {
            tracing::warn!(%user_id, error = %e, "Failed to broadcast online users");
        }
    }
}

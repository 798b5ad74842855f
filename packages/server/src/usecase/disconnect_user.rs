//! UseCase: 接続の後始末（teardown）
//!
//! 受信ポンプ・送信ポンプ・再接続による置き換えのどこから呼ばれても、
//! 副作用は接続ごとに 1 回だけ実行される。
//!
//! 1. 接続を終了する（送信キューを閉じて受信ポンプを起こし、送信ポンプにソケットの解放を指示する）
//! 2. レジストリからこの接続インスタンスを外す
//! 3. 新しい接続が登録されていなければオフラインにする
//! 4. オンライン一覧を配信する

use std::sync::Arc;

use crate::domain::{Connection, ForumRepository, MessagePusher};

use super::presence::{BroadcastOnlineUsersUseCase, PresenceGate};

/// 接続切断のユースケース
pub struct DisconnectUserUseCase {
    repository: Arc<dyn ForumRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    presence: Arc<BroadcastOnlineUsersUseCase>,
    gate: Arc<PresenceGate>,
}

impl DisconnectUserUseCase {
    pub fn new(
        repository: Arc<dyn ForumRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        presence: Arc<BroadcastOnlineUsersUseCase>,
        gate: Arc<PresenceGate>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
            presence,
            gate,
        }
    }

    /// teardown を実行する
    ///
    /// # Returns
    ///
    /// この呼び出しが teardown を実行した場合は `true`、既に実行済みなら `false`
    pub async fn execute(&self, connection: &Arc<Connection>) -> bool {
        if !connection.begin_teardown() {
            return false;
        }

        let user_id = connection.user_id();
        connection.terminate();

        let went_offline = {
            let _gate = self.gate.enter().await;
            self.message_pusher.unregister(connection).await;

            if self.message_pusher.lookup(user_id).await.is_some() {
                false
            } else {
                if let Err(e) = self.repository.set_online(user_id, false).await {
                    tracing::warn!(%user_id, error = %e, "Failed to mark user offline");
                }
                true
            }
        };
        connection.mark_closed();

        if !went_offline {
            tracing::debug!(
                %user_id,
                connection_id = %connection.id(),
                "Superseded connection torn down"
            );
            return true;
        }

        tracing::info!(%user_id, connection_id = %connection.id(), "User disconnected");
        if let Err(e) = self.presence.execute().await {
            tracing::warn!(%user_id, error = %e, "Failed to broadcast online users");
        }
        true
    }
}

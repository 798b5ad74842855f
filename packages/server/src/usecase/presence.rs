//! UseCase: オンライン一覧の配信
//!
//! 配信する一覧は常にストアから取り直す。レジストリは「誰が接続しているか」、
//! ストアは「誰がオンラインか」を表し、公開するのは後者。

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use crate::domain::{BroadcastReport, ForumRepository, MessagePusher, OutboundEvent, User};

use super::error::PresenceError;

/// 接続・切断に伴うレジストリ操作とオンライン状態の書き込みを直列化するロック
///
/// 古い接続の teardown が、新しい接続によるオンライン化を上書きしないようにする。
#[derive(Debug, Default)]
pub struct PresenceGate {
    lock: Mutex<()>,
}

impl PresenceGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn enter(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }
}

/// オンライン一覧配信のユースケース
pub struct BroadcastOnlineUsersUseCase {
    repository: Arc<dyn ForumRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl BroadcastOnlineUsersUseCase {
    pub fn new(
        repository: Arc<dyn ForumRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// 現在のオンライン一覧（ストアの並び順）
    pub async fn online_users(&self) -> Result<Vec<User>, PresenceError> {
        Ok(self.repository.list_online().await?)
    }

    /// オンライン一覧を `online_users` として全接続に配信する
    pub async fn execute(&self) -> Result<BroadcastReport, PresenceError> {
        let users = self.online_users().await?;
        let count = users.len();
        let report = self
            .message_pusher
            .broadcast(&OutboundEvent::OnlineUsers(users))
            .await?;
        tracing::debug!(
            online = count,
            delivered = report.delivered,
            "Broadcasted online users"
        );
        Ok(report)
    }
}

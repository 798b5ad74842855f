//! UseCase 層のエラー

use thiserror::Error;

use crate::domain::{MessageId, MessagePushError, RepositoryError};

/// メッセージ振り分けのエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// 保存に失敗したため配信は行わない
    #[error("failed to persist: {0}")]
    Persistence(#[from] RepositoryError),

    #[error("persisted message {0} could not be read back")]
    MissingPersisted(MessageId),

    #[error("failed to push: {0}")]
    Push(#[from] MessagePushError),
}

/// オンライン一覧配信のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PresenceError {
    #[error("failed to load online users: {0}")]
    Repository(#[from] RepositoryError),

    #[error("failed to broadcast online users: {0}")]
    Push(#[from] MessagePushError),
}

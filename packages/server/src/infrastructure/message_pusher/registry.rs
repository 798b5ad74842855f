//! 接続レジストリ
//!
//! ユーザーごとに高々 1 つの接続を保持する。古い接続の差し替えと削除は
//! 接続インスタンスの同一性（`Arc::ptr_eq`）で判定するため、遅れて届いた
//! 古い接続の削除要求が新しい接続を消すことはない。

use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;

use crate::domain::{Connection, UserId};

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<UserId, Arc<Connection>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 接続を登録し、同じユーザーの既存接続があればそれを返す
    pub async fn register(&self, connection: Arc<Connection>) -> Option<Arc<Connection>> {
        let mut connections = self.connections.write().await;
        connections.insert(connection.user_id(), connection)
    }

    /// 登録中の接続が `connection` 自身である場合に限り削除する
    pub async fn unregister(&self, connection: &Arc<Connection>) -> bool {
        let mut connections = self.connections.write().await;
        match connections.get(&connection.user_id()) {
            Some(current) if Arc::ptr_eq(current, connection) => {
                connections.remove(&connection.user_id());
                true
            }
            _ => false,
        }
    }

    pub async fn lookup(&self, user_id: UserId) -> Option<Arc<Connection>> {
        self.connections.read().await.get(&user_id).cloned()
    }

    /// 現在の接続一覧のコピー（ユーザー ID 昇順）
    ///
    /// ロックはコピーの間だけ保持するので、呼び出し側は送信中に
    /// レジストリを変更できる。
    pub async fn snapshot(&self) -> Vec<Arc<Connection>> {
        let mut connections: Vec<Arc<Connection>> =
            self.connections.read().await.values().cloned().collect();
        connections.sort_by_key(|connection| connection.user_id());
        connections
    }

    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}

//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - 接続レジストリの管理（登録・削除・検索）
//! - イベントを envelope にエンコードし、接続の送信キューへ積む（push_to, broadcast）
//!
//! ソケットへの書き込みは UI 層の送信ポンプが行う。ここではキューに積むだけで、
//! 待ち合わせは一切しない。キューが満杯の接続は遅いクライアントとして
//! レジストリから外し、接続を閉じる。

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    domain::{
        BroadcastReport, Connection, EnqueueError, MessagePushError, MessagePusher,
        OutboundEvent, UserId,
    },
    infrastructure::dto::websocket::encode_event,
};

use super::registry::ConnectionRegistry;

pub struct WebSocketMessagePusher {
    registry: Arc<ConnectionRegistry>,
}

impl WebSocketMessagePusher {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// 送信キューが溢れた接続をレジストリから外して閉じる
    async fn evict(&self, connection: &Arc<Connection>) {
        self.registry.unregister(connection).await;
        if connection.close() {
            tracing::warn!(
                user_id = %connection.user_id(),
                connection_id = %connection.id(),
                "Outbound queue full, evicting slow connection"
            );
        }
    }
}

fn encode(event: &OutboundEvent) -> Result<String, MessagePushError> {
    encode_event(event).map_err(|e| MessagePushError::Encode(e.to_string()))
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register(&self, connection: Arc<Connection>) -> Option<Arc<Connection>> {
        let user_id = connection.user_id();
        let connection_id = connection.id();
        let previous = self.registry.register(connection).await;
        tracing::debug!(%user_id, %connection_id, "Connection registered");
        previous
    }

    async fn unregister(&self, connection: &Arc<Connection>) -> bool {
        let removed = self.registry.unregister(connection).await;
        if removed {
            tracing::debug!(
                user_id = %connection.user_id(),
                connection_id = %connection.id(),
                "Connection unregistered"
            );
        }
        removed
    }

    async fn lookup(&self, user_id: UserId) -> Option<Arc<Connection>> {
        self.registry.lookup(user_id).await
    }

    async fn push_to(
        &self,
        user_id: UserId,
        event: &OutboundEvent,
    ) -> Result<(), MessagePushError> {
        let Some(connection) = self.registry.lookup(user_id).await else {
            return Err(MessagePushError::NotConnected(user_id));
        };
        let frame = encode(event)?;

        match connection.try_enqueue(frame) {
            Ok(()) => Ok(()),
            Err(EnqueueError::Full) => {
                self.evict(&connection).await;
                Err(MessagePushError::QueueFull(user_id))
            }
            Err(EnqueueError::Closed) => Err(MessagePushError::ConnectionClosed(user_id)),
        }
    }

    async fn broadcast(&self, event: &OutboundEvent) -> Result<BroadcastReport, MessagePushError> {
        let frame = encode(event)?;
        let mut report = BroadcastReport::default();

        for connection in self.registry.snapshot().await {
            match connection.try_enqueue(frame.clone()) {
                Ok(()) => report.delivered += 1,
                Err(EnqueueError::Full) => {
                    self.evict(&connection).await;
                    report.evicted += 1;
                }
                // 閉じかけの接続はスキップ
                Err(EnqueueError::Closed) => {}
            }
        }

        tracing::debug!(
            delivered = report.delivered,
            evicted = report.evicted,
            "Broadcast finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OutboundQueue;

    fn user(id: i64) -> UserId {
        UserId::new(id).unwrap()
    }

    fn passthrough(body: &str) -> OutboundEvent {
        OutboundEvent::Passthrough(body.to_string())
    }

    async fn connect(
        pusher: &WebSocketMessagePusher,
        id: i64,
        capacity: usize,
    ) -> (Arc<Connection>, OutboundQueue) {
        let (connection, queue) = Connection::open(user(id), capacity);
        pusher.register(connection.clone()).await;
        (connection, queue)
    }

    fn create_test_pusher() -> (WebSocketMessagePusher, Arc<ConnectionRegistry>) {
        let registry = Arc::new(ConnectionRegistry::new());
        (WebSocketMessagePusher::new(registry.clone()), registry)
    }

    #[tokio::test]
    async fn test_push_to_success() {
        // テスト項目: 接続中のユーザーにフレームを送信できる
        // given (前提条件):
        let (pusher, _registry) = create_test_pusher();
        let (_connection, mut queue) = connect(&pusher, 1, 4).await;

        // when (操作):
        let result = pusher.push_to(user(1), &passthrough("hello")).await;

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(queue.next().await.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_push_to_not_connected() {
        // テスト項目: 接続していないユーザーへの送信は NotConnected を返す
        // given (前提条件):
        let (pusher, _registry) = create_test_pusher();

        // when (操作):
        let result = pusher.push_to(user(9), &passthrough("hello")).await;

        // then (期待する結果):
        assert_eq!(result, Err(MessagePushError::NotConnected(user(9))));
    }

    #[tokio::test]
    async fn test_push_to_full_queue_evicts_connection() {
        // テスト項目: 送信キューが満杯の接続は削除され、閉じられる
        // given (前提条件):
        let (pusher, registry) = create_test_pusher();
        let (connection, _queue) = connect(&pusher, 1, 1).await;
        pusher.push_to(user(1), &passthrough("first")).await.unwrap();

        // when (操作):
        let result = pusher.push_to(user(1), &passthrough("second")).await;

        // then (期待する結果):
        assert_eq!(result, Err(MessagePushError::QueueFull(user(1))));
        assert!(connection.is_closed());
        assert!(registry.lookup(user(1)).await.is_none());
    }

    #[tokio::test]
    async fn test_push_to_closing_connection() {
        // テスト項目: 閉じられた接続への送信は ConnectionClosed を返す
        // given (前提条件):
        let (pusher, _registry) = create_test_pusher();
        let (connection, _queue) = connect(&pusher, 1, 4).await;
        connection.close();

        // when (操作):
        let result = pusher.push_to(user(1), &passthrough("late")).await;

        // then (期待する結果):
        assert_eq!(result, Err(MessagePushError::ConnectionClosed(user(1))));
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_connection() {
        // テスト項目: ブロードキャストは全接続に同じフレームを届ける
        // given (前提条件):
        let (pusher, _registry) = create_test_pusher();
        let (_c1, mut q1) = connect(&pusher, 1, 4).await;
        let (_c2, mut q2) = connect(&pusher, 2, 4).await;

        // when (操作):
        let report = pusher.broadcast(&passthrough("news")).await.unwrap();

        // then (期待する結果):
        assert_eq!(
            report,
            BroadcastReport {
                delivered: 2,
                evicted: 0
            }
        );
        assert_eq!(q1.next().await.as_deref(), Some("news"));
        assert_eq!(q2.next().await.as_deref(), Some("news"));
    }

    #[tokio::test]
    async fn test_broadcast_continues_past_slow_connection() {
        // テスト項目: 満杯の接続があっても残りの接続には配信される
        // given (前提条件):
        let (pusher, registry) = create_test_pusher();
        let (slow, _slow_queue) = connect(&pusher, 1, 1).await;
        let (_fast, mut fast_queue) = connect(&pusher, 2, 4).await;
        slow.try_enqueue("backlog".to_string()).unwrap();

        // when (操作):
        let report = pusher.broadcast(&passthrough("news")).await.unwrap();

        // then (期待する結果):
        assert_eq!(
            report,
            BroadcastReport {
                delivered: 1,
                evicted: 1
            }
        );
        assert!(slow.is_closed());
        assert!(registry.lookup(user(1)).await.is_none());
        assert_eq!(fast_queue.next().await.as_deref(), Some("news"));
    }

    #[tokio::test]
    async fn test_broadcast_without_connections() {
        // テスト項目: 接続が 1 つもなくてもエラーにならない
        // given (前提条件):
        let (pusher, _registry) = create_test_pusher();

        // when (操作):
        let report = pusher.broadcast(&passthrough("news")).await.unwrap();

        // then (期待する結果):
        assert_eq!(report, BroadcastReport::default());
    }
}

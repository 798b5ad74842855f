//! UseCase: 受信イベントの振り分け
//!
//! - `private_message`: 保存してから、保存済みレコードを受信者と送信者に届ける
//! - `typing_indicator`: 状態を記録し、相手にだけ届ける
//! - `post_created` / `comment_created`: 受信したフレームをそのまま全接続に配る
//! - 未知のタグ: 何もしない

use std::sync::Arc;

use crate::domain::{
    BroadcastReport, ClientEvent, ForumRepository, MessageId, MessagePushError, MessagePusher,
    NewPrivateMessage, OutboundEvent, PrivateMessageRequest, UserId,
};

use super::error::RouteError;

/// 保存直後のレコードを探す際に読む直近メッセージの件数
pub const RECENT_LOOKUP_WINDOW: usize = 20;

/// 振り分けの結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    PrivateMessage { id: MessageId, delivered: usize },
    TypingIndicator { delivered: bool },
    Broadcast(BroadcastReport),
    Ignored,
}

/// メッセージ振り分けのユースケース
pub struct RouteMessageUseCase {
    repository: Arc<dyn ForumRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl RouteMessageUseCase {
    pub fn new(
        repository: Arc<dyn ForumRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// `sender` から届いたイベントを振り分ける
    ///
    /// 送信者はクライアントの申告ではなく、接続の所有者で決まる。
    pub async fn execute(
        &self,
        sender: UserId,
        event: ClientEvent,
    ) -> Result<RouteOutcome, RouteError> {
        match event {
            ClientEvent::PrivateMessage(request) => self.private_message(sender, request).await,
            ClientEvent::TypingIndicator {
                target_user_id,
                is_typing,
            } => self.typing_indicator(sender, target_user_id, is_typing).await,
            ClientEvent::PostCreated(frame) | ClientEvent::CommentCreated(frame) => {
                let report = self
                    .message_pusher
                    .broadcast(&OutboundEvent::Passthrough(frame))
                    .await?;
                Ok(RouteOutcome::Broadcast(report))
            }
            ClientEvent::Unknown(tag) => {
                tracing::warn!(%sender, %tag, "Unknown message type, dropped");
                Ok(RouteOutcome::Ignored)
            }
        }
    }

    async fn private_message(
        &self,
        sender: UserId,
        request: PrivateMessageRequest,
    ) -> Result<RouteOutcome, RouteError> {
        let receiver = request.receiver_id;
        let id = self
            .repository
            .create_private_message(NewPrivateMessage {
                sender_id: sender,
                receiver_id: receiver,
                content: request.content,
            })
            .await?;

        let message = self
            .repository
            .fetch_recent_between(sender, receiver, RECENT_LOOKUP_WINDOW, 0)
            .await?
            .into_iter()
            .find(|message| message.id == id)
            .ok_or(RouteError::MissingPersisted(id))?;

        let event = OutboundEvent::PrivateMessage(message);
        let mut delivered = 0;
        // 自分宛ては 1 回だけ届ける
        let targets = if sender == receiver {
            vec![receiver]
        } else {
            vec![receiver, sender]
        };
        for target in targets {
            if self.deliver(target, &event).await {
                delivered += 1;
            }
        }

        tracing::debug!(%sender, %receiver, message_id = %id, delivered, "Private message routed");
        Ok(RouteOutcome::PrivateMessage { id, delivered })
    }

    async fn typing_indicator(
        &self,
        sender: UserId,
        target: UserId,
        is_typing: bool,
    ) -> Result<RouteOutcome, RouteError> {
        let indicator = self
            .repository
            .upsert_typing(sender, target, is_typing)
            .await?;
        let delivered = self
            .deliver(target, &OutboundEvent::TypingIndicator(indicator))
            .await;
        Ok(RouteOutcome::TypingIndicator { delivered })
    }

    /// 1 ユーザーへの配信。失敗はログに残して `false` を返す
    async fn deliver(&self, user_id: UserId, event: &OutboundEvent) -> bool {
        match self.message_pusher.push_to(user_id, event).await {
            Ok(()) => true,
            Err(MessagePushError::NotConnected(_)) => {
                tracing::debug!(%user_id, "Recipient not connected, dropped");
                false
            }
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "Failed to deliver");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::{
        domain::{
            Connection, MessageContent, OutboundQueue, PrivateMessage, RepositoryError,
            Timestamp, TypingIndicator, repository::MockForumRepository,
        },
        infrastructure::message_pusher::{ConnectionRegistry, WebSocketMessagePusher},
    };

    fn user(id: i64) -> UserId {
        UserId::new(id).unwrap()
    }

    fn content(text: &str) -> MessageContent {
        MessageContent::new(text.to_string()).unwrap()
    }

    fn create_usecase(
        repository: MockForumRepository,
    ) -> (RouteMessageUseCase, Arc<WebSocketMessagePusher>) {
        let pusher = Arc::new(WebSocketMessagePusher::new(Arc::new(ConnectionRegistry::new())));
        (
            RouteMessageUseCase::new(Arc::new(repository), pusher.clone()),
            pusher,
        )
    }

    async fn connect(pusher: &WebSocketMessagePusher, id: i64) -> OutboundQueue {
        let (connection, queue) = Connection::open(user(id), 8);
        pusher.register(connection).await;
        queue
    }

    fn stored_message(id: i64, from: i64, to: i64, text: &str) -> PrivateMessage {
        PrivateMessage {
            id: MessageId::new(id),
            sender_id: user(from),
            receiver_id: user(to),
            sender: format!("user{from}"),
            receiver: format!("user{to}"),
            content: content(text),
            read: false,
            created_at: Timestamp::new(1_672_531_200_000),
        }
    }

    fn queue_is_empty(queue: &mut OutboundQueue) -> bool {
        futures_util::FutureExt::now_or_never(queue.next()).is_none()
    }

    #[tokio::test]
    async fn test_private_message_delivered_to_receiver_and_echoed() {
        // テスト項目: 保存済みの id 42 のメッセージが受信者と送信者の両方に届く
        // given (前提条件):
        let mut repository = MockForumRepository::new();
        repository
            .expect_create_private_message()
            .times(1)
            .returning(|message| {
                assert_eq!(message.sender_id, user(1));
                assert_eq!(message.receiver_id, user(2));
                Ok(MessageId::new(42))
            });
        repository
            .expect_fetch_recent_between()
            .times(1)
            .returning(|_, _, _, _| {
                Ok(vec![
                    stored_message(41, 2, 1, "earlier"),
                    stored_message(42, 1, 2, "hi"),
                ])
            });
        let (usecase, pusher) = create_usecase(repository);
        let mut alice = connect(&pusher, 1).await;
        let mut bob = connect(&pusher, 2).await;
        let request = PrivateMessageRequest {
            receiver_id: user(2),
            content: content("hi"),
        };

        // when (操作):
        let outcome = usecase
            .execute(user(1), ClientEvent::PrivateMessage(request))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(
            outcome,
            RouteOutcome::PrivateMessage {
                id: MessageId::new(42),
                delivered: 2
            }
        );
        let to_bob: Value = serde_json::from_str(&bob.next().await.unwrap()).unwrap();
        let to_alice: Value = serde_json::from_str(&alice.next().await.unwrap()).unwrap();
        assert_eq!(to_bob, to_alice);
        assert_eq!(to_bob["type"], "private_message");
        assert_eq!(to_bob["payload"]["id"], json!(42));
        assert_eq!(to_bob["payload"]["senderId"], json!(1));
        assert_eq!(to_bob["payload"]["receiverId"], json!(2));
        assert_eq!(to_bob["payload"]["content"], json!("hi"));
    }

    #[tokio::test]
    async fn test_private_message_persistence_failure_delivers_nothing() {
        // テスト項目: 保存に失敗したメッセージは誰にも届かない
        // given (前提条件):
        let mut repository = MockForumRepository::new();
        repository
            .expect_create_private_message()
            .returning(|_| Err(RepositoryError::Storage("disk full".to_string())));
        repository.expect_fetch_recent_between().never();
        let (usecase, pusher) = create_usecase(repository);
        let mut alice = connect(&pusher, 1).await;
        let mut bob = connect(&pusher, 2).await;
        let request = PrivateMessageRequest {
            receiver_id: user(2),
            content: content("hi"),
        };

        // when (操作):
        let result = usecase
            .execute(user(1), ClientEvent::PrivateMessage(request))
            .await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(RouteError::Persistence(RepositoryError::Storage(
                "disk full".to_string()
            )))
        );
        assert!(queue_is_empty(&mut alice));
        assert!(queue_is_empty(&mut bob));
    }

    #[tokio::test]
    async fn test_private_message_missing_after_persist_delivers_nothing() {
        // テスト項目: 保存後のレコードが読み戻せない場合は配信しない
        // given (前提条件):
        let mut repository = MockForumRepository::new();
        repository
            .expect_create_private_message()
            .returning(|_| Ok(MessageId::new(42)));
        repository
            .expect_fetch_recent_between()
            .returning(|_, _, _, _| Ok(vec![]));
        let (usecase, pusher) = create_usecase(repository);
        let mut bob = connect(&pusher, 2).await;
        let request = PrivateMessageRequest {
            receiver_id: user(2),
            content: content("hi"),
        };

        // when (操作):
        let result = usecase
            .execute(user(1), ClientEvent::PrivateMessage(request))
            .await;

        // then (期待する結果):
        assert_eq!(result, Err(RouteError::MissingPersisted(MessageId::new(42))));
        assert!(queue_is_empty(&mut bob));
    }

    #[tokio::test]
    async fn test_private_message_to_offline_receiver_is_still_echoed() {
        // テスト項目: 受信者が未接続でも送信者には確認として届く
        // given (前提条件):
        let mut repository = MockForumRepository::new();
        repository
            .expect_create_private_message()
            .returning(|_| Ok(MessageId::new(7)));
        repository
            .expect_fetch_recent_between()
            .returning(|_, _, _, _| Ok(vec![stored_message(7, 1, 2, "later")]));
        let (usecase, pusher) = create_usecase(repository);
        let mut alice = connect(&pusher, 1).await;
        let request = PrivateMessageRequest {
            receiver_id: user(2),
            content: content("later"),
        };

        // when (操作):
        let outcome = usecase
            .execute(user(1), ClientEvent::PrivateMessage(request))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(
            outcome,
            RouteOutcome::PrivateMessage {
                id: MessageId::new(7),
                delivered: 1
            }
        );
        assert!(alice.next().await.unwrap().contains("\"id\":7"));
    }

    #[tokio::test]
    async fn test_private_message_to_self_delivered_once() {
        // テスト項目: 自分宛てのメッセージは 1 回だけ届く
        // given (前提条件):
        let mut repository = MockForumRepository::new();
        repository
            .expect_create_private_message()
            .returning(|_| Ok(MessageId::new(3)));
        repository
            .expect_fetch_recent_between()
            .returning(|_, _, _, _| Ok(vec![stored_message(3, 1, 1, "note")]));
        let (usecase, pusher) = create_usecase(repository);
        let mut alice = connect(&pusher, 1).await;
        let request = PrivateMessageRequest {
            receiver_id: user(1),
            content: content("note"),
        };

        // when (操作):
        let outcome = usecase
            .execute(user(1), ClientEvent::PrivateMessage(request))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(
            outcome,
            RouteOutcome::PrivateMessage {
                id: MessageId::new(3),
                delivered: 1
            }
        );
        assert!(alice.next().await.is_some());
        assert!(queue_is_empty(&mut alice));
    }

    #[tokio::test]
    async fn test_typing_indicator_only_reaches_target() {
        // テスト項目: タイピング状態は相手にだけ届き、送信者には返らない
        // given (前提条件):
        let mut repository = MockForumRepository::new();
        repository
            .expect_upsert_typing()
            .times(1)
            .returning(|user_id, target_user_id, is_typing| {
                Ok(TypingIndicator {
                    user_id,
                    username: "alice".to_string(),
                    target_user_id,
                    is_typing,
                    updated_at: Timestamp::new(0),
                })
            });
        let (usecase, pusher) = create_usecase(repository);
        let mut alice = connect(&pusher, 1).await;
        let mut bob = connect(&pusher, 2).await;
        let mut carol = connect(&pusher, 3).await;

        // when (操作):
        let outcome = usecase
            .execute(
                user(1),
                ClientEvent::TypingIndicator {
                    target_user_id: user(2),
                    is_typing: true,
                },
            )
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(outcome, RouteOutcome::TypingIndicator { delivered: true });
        let frame: Value = serde_json::from_str(&bob.next().await.unwrap()).unwrap();
        assert_eq!(frame["type"], "typing_indicator");
        assert_eq!(frame["payload"]["userId"], json!(1));
        assert_eq!(frame["payload"]["username"], json!("alice"));
        assert_eq!(frame["payload"]["isTyping"], json!(true));
        assert!(queue_is_empty(&mut alice));
        assert!(queue_is_empty(&mut carol));
    }

    #[tokio::test]
    async fn test_post_created_passthrough_reaches_everyone() {
        // テスト項目: post_created は送信者を含む全接続にそのまま届く
        // given (前提条件):
        let mut repository = MockForumRepository::new();
        repository.expect_create_private_message().never();
        let (usecase, pusher) = create_usecase(repository);
        let mut alice = connect(&pusher, 1).await;
        let mut bob = connect(&pusher, 2).await;
        let raw = r#"{"type":"post_created","payload":{"id":9,"title":"Hello"}}"#;

        // when (操作):
        let outcome = usecase
            .execute(user(1), ClientEvent::PostCreated(raw.to_string()))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(
            outcome,
            RouteOutcome::Broadcast(BroadcastReport {
                delivered: 2,
                evicted: 0
            })
        );
        assert_eq!(alice.next().await.as_deref(), Some(raw));
        assert_eq!(bob.next().await.as_deref(), Some(raw));
    }

    #[tokio::test]
    async fn test_unknown_tag_is_ignored() {
        // テスト項目: 未知のタグは何も配信しない
        // given (前提条件):
        let repository = MockForumRepository::new();
        let (usecase, pusher) = create_usecase(repository);
        let mut alice = connect(&pusher, 1).await;

        // when (操作):
        let outcome = usecase
            .execute(user(1), ClientEvent::Unknown("reaction_added".to_string()))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(outcome, RouteOutcome::Ignored);
        assert!(queue_is_empty(&mut alice));
    }
}

//! InMemory Forum Repository 実装
//!
//! ユーザー・プライベートメッセージ・タイピング状態を 1 つの Mutex の下に保持する。
//! 時刻は注入された `Clock` から取るため、テストでは固定できる。

use std::{
    cmp::Reverse,
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use agora_shared::time::Clock;
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    ForumRepository, MessageId, NewPrivateMessage, PrivateMessage, RepositoryError, Timestamp,
    TypingIndicator, User, UserId,
};

#[derive(Debug, Default)]
struct ForumState {
    users: BTreeMap<UserId, User>,
    /// id 昇順
    messages: Vec<PrivateMessage>,
    typing: HashMap<(UserId, UserId), TypingIndicator>,
    last_message_id: i64,
}

impl ForumState {
    fn username(&self, user_id: UserId) -> Result<String, RepositoryError> {
        self.users
            .get(&user_id)
            .map(|user| user.username.clone())
            .ok_or(RepositoryError::UserNotFound(user_id))
    }

    /// ユーザーが最後に送信したメッセージの時刻
    fn last_sent_at(&self, user_id: UserId) -> Option<Timestamp> {
        self.messages
            .iter()
            .filter(|message| message.sender_id == user_id)
            .map(|message| message.created_at)
            .max()
    }
}

/// インメモリ Forum Repository 実装
pub struct InMemoryForumRepository {
    state: Mutex<ForumState>,
    clock: Arc<dyn Clock>,
}

impl InMemoryForumRepository {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(ForumState::default()),
            clock,
        }
    }

    /// ユーザーを追加する（同じ ID があれば上書き）
    pub async fn insert_user(&self, user: User) {
        let mut state = self.state.lock().await;
        state.users.insert(user.id, user);
    }

    pub async fn get_user(&self, user_id: UserId) -> Option<User> {
        self.state.lock().await.users.get(&user_id).cloned()
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }
}

#[async_trait]
impl ForumRepository for InMemoryForumRepository {
    async fn set_online(&self, user_id: UserId, online: bool) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        let user = state
            .users
            .get_mut(&user_id)
            .ok_or(RepositoryError::UserNotFound(user_id))?;
        user.online = online;
        Ok(())
    }

    async fn list_online(&self) -> Result<Vec<User>, RepositoryError> {
        let state = self.state.lock().await;
        let mut online: Vec<(Option<Timestamp>, User)> = state
            .users
            .values()
            .filter(|user| user.online)
            .map(|user| (state.last_sent_at(user.id), user.clone()))
            .collect();

        // 最新の送信が新しい順、送信のないユーザーは末尾、同順位はユーザー名順
        online.sort_by(|(a_sent, a), (b_sent, b)| {
            let a_key = (a_sent.is_none(), Reverse(*a_sent));
            let b_key = (b_sent.is_none(), Reverse(*b_sent));
            a_key
                .cmp(&b_key)
                .then_with(|| a.username.cmp(&b.username))
        });

        Ok(online.into_iter().map(|(_, user)| user).collect())
    }

    async fn create_private_message(
        &self,
        message: NewPrivateMessage,
    ) -> Result<MessageId, RepositoryError> {
        let created_at = self.now();
        let mut state = self.state.lock().await;
        let sender = state.username(message.sender_id)?;
        let receiver = state.username(message.receiver_id)?;

        state.last_message_id += 1;
        let id = MessageId::new(state.last_message_id);
        state.messages.push(PrivateMessage {
            id,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            sender,
            receiver,
            content: message.content,
            read: false,
            created_at,
        });
        Ok(id)
    }

    async fn fetch_recent_between(
        &self,
        a: UserId,
        b: UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PrivateMessage>, RepositoryError> {
        let state = self.state.lock().await;
        let mut window: Vec<PrivateMessage> = state
            .messages
            .iter()
            .rev()
            .filter(|message| {
                (message.sender_id == a && message.receiver_id == b)
                    || (message.sender_id == b && message.receiver_id == a)
            })
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        window.reverse();
        Ok(window)
    }

    async fn upsert_typing(
        &self,
        user_id: UserId,
        target_user_id: UserId,
        is_typing: bool,
    ) -> Result<TypingIndicator, RepositoryError> {
        let updated_at = self.now();
        let mut state = self.state.lock().await;
        let username = state.username(user_id)?;

        let indicator = state
            .typing
            .entry((user_id, target_user_id))
            .and_modify(|existing| {
                existing.is_typing = is_typing;
                existing.updated_at = updated_at;
                existing.username = username.clone();
            })
            .or_insert_with(|| TypingIndicator {
                user_id,
                username: username.clone(),
                target_user_id,
                is_typing,
                updated_at,
            });
        Ok(indicator.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI64, Ordering};

    use agora_shared::time::FixedClock;

    use super::*;
    use crate::domain::MessageContent;

    /// 呼ばれるたびに 1ms 進む時計
    struct TickingClock(AtomicI64);

    impl Clock for TickingClock {
        fn now_millis(&self) -> i64 {
            self.0.fetch_add(1, Ordering::SeqCst)
        }
    }

    fn user(id: i64) -> UserId {
        UserId::new(id).unwrap()
    }

    async fn create_repository(clock: Arc<dyn Clock>, names: &[(i64, &str)]) -> InMemoryForumRepository {
        let repository = InMemoryForumRepository::new(clock);
        for (id, name) in names {
            repository
                .insert_user(User::new(user(*id), *name, Timestamp::new(0)))
                .await;
        }
        repository
    }

    fn new_message(from: i64, to: i64, content: &str) -> NewPrivateMessage {
        NewPrivateMessage {
            sender_id: user(from),
            receiver_id: user(to),
            content: MessageContent::new(content.to_string()).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_set_online_unknown_user() {
        // テスト項目: 存在しないユーザーのオンライン状態は変更できない
        // given (前提条件):
        let repository = create_repository(Arc::new(FixedClock::new(0)), &[]).await;

        // when (操作):
        let result = repository.set_online(user(1), true).await;

        // then (期待する結果):
        assert_eq!(result, Err(RepositoryError::UserNotFound(user(1))));
    }

    #[tokio::test]
    async fn test_list_online_orders_by_latest_sent_message_then_username() {
        // テスト項目: オンライン一覧は最新送信の新しい順、送信なしは末尾でユーザー名順
        // given (前提条件):
        let clock = Arc::new(TickingClock(AtomicI64::new(1_000)));
        let repository = create_repository(
            clock,
            &[(1, "alice"), (2, "bob"), (3, "carol"), (4, "dave"), (5, "erin")],
        )
        .await;
        for id in [1, 2, 3, 4] {
            repository.set_online(user(id), true).await.unwrap();
        }
        repository.create_private_message(new_message(2, 1, "old")).await.unwrap();
        repository.create_private_message(new_message(3, 1, "new")).await.unwrap();
        repository.create_private_message(new_message(5, 1, "offline")).await.unwrap();

        // when (操作):
        let online = repository.list_online().await.unwrap();

        // then (期待する結果):
        let names: Vec<&str> = online.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["carol", "bob", "alice", "dave"]);
    }

    #[tokio::test]
    async fn test_create_private_message_assigns_ids_and_names() {
        // テスト項目: 作成したメッセージに連番 ID と送受信者名が付与される
        // given (前提条件):
        let repository =
            create_repository(Arc::new(FixedClock::new(500)), &[(1, "alice"), (2, "bob")]).await;

        // when (操作):
        let first = repository.create_private_message(new_message(1, 2, "hi")).await.unwrap();
        let second = repository.create_private_message(new_message(2, 1, "yo")).await.unwrap();

        // then (期待する結果):
        assert_eq!(first, MessageId::new(1));
        assert_eq!(second, MessageId::new(2));
        let messages = repository.fetch_recent_between(user(1), user(2), 10, 0).await.unwrap();
        assert_eq!(messages[0].sender, "alice");
        assert_eq!(messages[0].receiver, "bob");
        assert_eq!(messages[0].created_at, Timestamp::new(500));
        assert!(!messages[0].read);
    }

    #[tokio::test]
    async fn test_create_private_message_to_unknown_receiver() {
        // テスト項目: 存在しない受信者宛てのメッセージは保存されない
        // given (前提条件):
        let repository = create_repository(Arc::new(FixedClock::new(0)), &[(1, "alice")]).await;

        // when (操作):
        let result = repository.create_private_message(new_message(1, 9, "hi")).await;

        // then (期待する結果):
        assert_eq!(result, Err(RepositoryError::UserNotFound(user(9))));
        assert!(
            repository
                .fetch_recent_between(user(1), user(9), 10, 0)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_fetch_recent_between_window() {
        // テスト項目: 新しい順に limit/offset で切り出し、古い順で返す
        // given (前提条件):
        let repository = create_repository(
            Arc::new(FixedClock::new(0)),
            &[(1, "alice"), (2, "bob"), (3, "carol")],
        )
        .await;
        for content in ["m1", "m2", "m3", "m4"] {
            repository.create_private_message(new_message(1, 2, content)).await.unwrap();
        }
        repository.create_private_message(new_message(3, 1, "other")).await.unwrap();

        // when (操作):
        let latest = repository.fetch_recent_between(user(2), user(1), 2, 0).await.unwrap();
        let older = repository.fetch_recent_between(user(1), user(2), 2, 2).await.unwrap();

        // then (期待する結果):
        let contents = |messages: &[PrivateMessage]| -> Vec<String> {
            messages.iter().map(|m| m.content.as_str().to_string()).collect()
        };
        assert_eq!(contents(&latest), vec!["m3", "m4"]);
        assert_eq!(contents(&older), vec!["m1", "m2"]);
    }

    #[tokio::test]
    async fn test_upsert_typing_updates_existing_pair() {
        // テスト項目: 同じ (ユーザー, 相手) の組は更新され、表示名と時刻を含んで返る
        // given (前提条件):
        let clock = Arc::new(TickingClock(AtomicI64::new(10)));
        let repository = create_repository(clock, &[(1, "alice"), (2, "bob")]).await;
        let first = repository.upsert_typing(user(1), user(2), true).await.unwrap();

        // when (操作):
        let second = repository.upsert_typing(user(1), user(2), false).await.unwrap();

        // then (期待する結果):
        assert!(first.is_typing);
        assert_eq!(first.updated_at, Timestamp::new(10));
        assert_eq!(second.username, "alice");
        assert_eq!(second.target_user_id, user(2));
        assert!(!second.is_typing);
        assert_eq!(second.updated_at, Timestamp::new(11));
    }

    #[tokio::test]
    async fn test_upsert_typing_unknown_user() {
        // テスト項目: 存在しないユーザーのタイピング状態は記録されない
        // given (前提条件):
        let repository = create_repository(Arc::new(FixedClock::new(0)), &[(2, "bob")]).await;

        // when (操作):
        let result = repository.upsert_typing(user(1), user(2), true).await;

        // then (期待する結果):
        assert_eq!(result, Err(RepositoryError::UserNotFound(user(1))));
    }
}

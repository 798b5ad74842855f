//! 手動テスト用のデモデータ

use crate::domain::{Session, Timestamp, User, UserId, ValueObjectError};

use super::{InMemoryForumRepository, InMemorySessionRepository};

/// デモユーザーとそのセッション
#[derive(Debug, Clone)]
pub struct DemoAccount {
    pub user: User,
    pub session: Session,
}

const DEMO_USERS: [(i64, &str, &str, &str, u32); 3] = [
    (1, "alice", "Alice", "Martin", 28),
    (2, "bob", "Bob", "Bernard", 34),
    (3, "carol", "Carol", "Dubois", 25),
];

/// デモユーザーを登録し、それぞれにセッションを発行する
pub async fn seed_demo(
    forum: &InMemoryForumRepository,
    sessions: &InMemorySessionRepository,
    now: Timestamp,
) -> Result<Vec<DemoAccount>, ValueObjectError> {
    let mut accounts = Vec::with_capacity(DEMO_USERS.len());

    for (id, username, first_name, last_name, age) in DEMO_USERS {
        let mut user = User::new(UserId::new(id)?, username, now);
        user.first_name = first_name.to_string();
        user.last_name = last_name.to_string();
        user.age = age;
        user.email = format!("{username}@example.com");

        forum.insert_user(user.clone()).await;
        let session = sessions.issue(user.id).await;
        accounts.push(DemoAccount { user, session });
    }

    Ok(accounts)
}

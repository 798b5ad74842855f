//! InMemory Session Repository 実装

use std::{collections::HashMap, sync::Arc};

use agora_shared::time::Clock;
use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{RepositoryError, Session, SessionRepository, Timestamp, UserId};

/// セッションの有効期間（24 時間）
pub const SESSION_TTL_MILLIS: i64 = 24 * 60 * 60 * 1000;

pub struct InMemorySessionRepository {
    sessions: Mutex<HashMap<String, Session>>,
    clock: Arc<dyn Clock>,
}

impl InMemorySessionRepository {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// 新しいセッションを発行する
    pub async fn issue(&self, user_id: UserId) -> Session {
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id,
            expires_at: Timestamp::new(self.clock.now_millis() + SESSION_TTL_MILLIS),
        };
        self.insert(session.clone()).await;
        session
    }

    pub async fn insert(&self, session: Session) {
        let mut sessions = self.sessions.lock().await;
        sessions.insert(session.id.clone(), session);
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn find_session(&self, session_id: &str) -> Result<Option<Session>, RepositoryError> {
        let now = Timestamp::new(self.clock.now_millis());
        let mut sessions = self.sessions.lock().await;

        match sessions.get(session_id) {
            Some(session) if session.is_expired(now) => {
                sessions.remove(session_id);
                Ok(None)
            }
            Some(session) => Ok(Some(session.clone())),
            None => Ok(None),
        }
    }
}

//! UseCase: 接続要求のユーザー解決

use std::sync::Arc;

use crate::domain::{SessionRepository, UserId};

/// 接続要求から取り出した認証情報
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// クエリ文字列の `token`
    pub query_token: Option<String>,
    /// Cookie の `session_id`
    pub cookie_session: Option<String>,
    /// `Authorization: Bearer <token>`
    pub bearer: Option<String>,
}

impl Credentials {
    /// 試す順（クエリ、Cookie、Bearer）に並べた空でないトークン
    fn candidates(&self) -> impl Iterator<Item = &str> {
        [&self.query_token, &self.cookie_session, &self.bearer]
            .into_iter()
            .filter_map(|token| token.as_deref())
            .filter(|token| !token.is_empty())
    }
}

pub struct AuthenticateUseCase {
    sessions: Arc<dyn SessionRepository>,
}

impl AuthenticateUseCase {
    pub fn new(sessions: Arc<dyn SessionRepository>) -> Self {
        Self { sessions }
    }

    /// 最初に有効だったトークンのユーザーを返す
    pub async fn execute(&self, credentials: &Credentials) -> Option<UserId> {
        for token in credentials.candidates() {
            match self.sessions.find_session(token).await {
                Ok(Some(session)) => return Some(session.user_id),
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(error = %e, "Session lookup failed");
                }
            }
        }
        None
    }
}

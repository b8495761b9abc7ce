use sqlx::FromRow;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// ストアフロントのユーザーアカウント
///
/// リセットトークンは平文ではなくSHA256ハッシュとして保持する。
/// `reset_token_hash` が None の場合はリセット待ちなし。
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub reset_token_hash: Option<String>,
    pub reset_token_issued_at: Option<OffsetDateTime>,
    pub reset_token_consumed: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// 発行済みリセットトークンの状態
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetToken {
    pub token_hash: String,
    pub issued_at: OffsetDateTime,
    pub consumed: bool,
}

impl Account {
    /// 保留中のリセットトークン（未発行なら None）
    pub fn reset_token(&self) -> Option<ResetToken> {
        match (&self.reset_token_hash, self.reset_token_issued_at) {
            (Some(token_hash), Some(issued_at)) => Some(ResetToken {
                token_hash: token_hash.clone(),
                issued_at,
                consumed: self.reset_token_consumed,
            }),
            _ => None,
        }
    }
}

impl ResetToken {
    /// 発行から `ttl` を超えて経過しているか
    pub fn is_expired(&self, now: OffsetDateTime, ttl: Duration) -> bool {
        now - self.issued_at > ttl
    }
}

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{RngCore, rngs::OsRng};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::Account;
use crate::repositories::AccountRepository;

/// トークンのランダムバイト長（256bit）
const TOKEN_BYTES: usize = 32;

/// 発行されたリセットトークン
///
/// 平文トークンはリセットURLにのみ埋め込み、DBやログには残さない。
#[derive(Debug)]
pub struct IssuedToken {
    pub account_id: Uuid,
    pub email: String,
    pub value: SecretString,
}

/// 32バイトのランダムトークンを生成
pub fn generate_token() -> SecretString {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    SecretString::from(URL_SAFE_NO_PAD.encode(bytes))
}

/// トークンをSHA256でハッシュ化
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// リセットトークン発行
#[derive(Clone)]
pub struct TokenIssuer<R> {
    repo: R,
}

impl<R: AccountRepository> TokenIssuer<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// トークンを発行してアカウントに保存
    ///
    /// 既存トークンは上書きされ、以後は最新のトークンのみ有効。
    pub async fn issue(&self, email: &str) -> Result<IssuedToken, AppError> {
        let account = self
            .repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::AccountNotFound)?;

        let value = generate_token();
        let token_hash = hash_token(value.expose_secret());

        self.repo
            .store_reset_token(account.id, &token_hash, OffsetDateTime::now_utc())
            .await?;

        tracing::debug!(account_id = %account.id, "リセットトークン発行");

        Ok(IssuedToken {
            account_id: account.id,
            email: account.email,
            value,
        })
    }
}

/// リセットトークン検証
///
/// 副作用なし。トークンの消費は呼び出し側で行う。
#[derive(Clone)]
pub struct TokenValidator<R> {
    repo: R,
    ttl: Duration,
}

impl<R: AccountRepository> TokenValidator<R> {
    pub fn new(repo: R, ttl: Duration) -> Self {
        Self { repo, ttl }
    }

    pub async fn validate(&self, token: &str) -> Result<Account, AppError> {
        let account = self
            .repo
            .find_by_reset_token(&hash_token(token))
            .await?
            .ok_or(AppError::TokenNotFound)?;

        let reset_token = account.reset_token().ok_or(AppError::TokenNotFound)?;

        if reset_token.consumed {
            tracing::warn!(account_id = %account.id, "使用済みトークン");
            return Err(AppError::TokenAlreadyConsumed);
        }

        if reset_token.is_expired(OffsetDateTime::now_utc(), self.ttl) {
            tracing::warn!(account_id = %account.id, "期限切れトークン");
            return Err(AppError::TokenExpired);
        }

        Ok(account)
    }
}

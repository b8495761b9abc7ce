use std::time::Duration as StdDuration;

use secrecy::ExposeSecret;
use time::{Duration, OffsetDateTime};

use crate::config::Config;
use crate::error::AppError;
use crate::repositories::AccountRepository;
use crate::services::notifier::{Notifier, NotifierError};
use crate::services::password::PasswordHasher;
use crate::services::token::{TokenIssuer, TokenValidator};

/// パスワードリセットの動作設定
#[derive(Debug, Clone)]
pub struct ResetSettings {
    /// リセットページのURL
    pub url_base: String,
    /// トークン有効期間
    pub token_ttl: Duration,
    /// メール送信のタイムアウト
    pub notifier_timeout: StdDuration,
}

impl ResetSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            url_base: config.password_reset_url_base.clone(),
            token_ttl: Duration::seconds(config.password_reset_token_ttl_secs),
            notifier_timeout: StdDuration::from_secs(config.notifier_timeout_secs),
        }
    }
}

/// パスワードリセットサービス
///
/// リクエスト（トークン発行 → メール送信）と確定（トークン検証 → パスワード更新）を扱う。
#[derive(Clone)]
pub struct PasswordResetService<R, N, H> {
    account_repo: R,
    issuer: TokenIssuer<R>,
    validator: TokenValidator<R>,
    notifier: N,
    hasher: H,
    settings: ResetSettings,
}

impl<R, N, H> PasswordResetService<R, N, H>
where
    R: AccountRepository + Clone,
    N: Notifier,
    H: PasswordHasher,
{
    /// 新しい PasswordResetService を作成
    pub fn new(account_repo: R, notifier: N, hasher: H, settings: ResetSettings) -> Self {
        Self {
            issuer: TokenIssuer::new(account_repo.clone()),
            validator: TokenValidator::new(account_repo.clone(), settings.token_ttl),
            account_repo,
            notifier,
            hasher,
            settings,
        }
    }

    /// パスワードリセットをリクエスト
    ///
    /// # Security
    /// - トークン（平文）はログに出力しない
    /// - メール送信に失敗してもトークンは保存済みのまま残る
    pub async fn request_reset(&self, email: &str) -> Result<(), AppError> {
        tracing::info!(email = %email, "パスワードリセットリクエスト");

        let issued = self.issuer.issue(email).await.inspect_err(|e| {
            if matches!(e, AppError::AccountNotFound) {
                tracing::info!(email = %email, "パスワードリセット: ユーザー不在");
            }
        })?;

        let reset_url = build_reset_url(&self.settings.url_base, issued.value.expose_secret());

        let sent = tokio::time::timeout(
            self.settings.notifier_timeout,
            self.notifier.send(&reset_url, &issued.email),
        )
        .await
        .unwrap_or(Err(NotifierError::Timeout));

        if let Err(e) = sent {
            tracing::error!(
                error = %e,
                account_id = %issued.account_id,
                "パスワードリセットメール送信失敗（トークンは有効なまま）"
            );
            return Err(AppError::NotificationFailed);
        }

        tracing::info!(account_id = %issued.account_id, "パスワードリセットメール送信完了");

        Ok(())
    }

    /// パスワードリセットを確定
    ///
    /// # Security
    /// - トークン・新パスワードはログに出力しない
    pub async fn confirm_reset(&self, token: &str, new_password: &str) -> Result<(), AppError> {
        let account = self.validator.validate(token).await?;

        let Some(reset_token) = account.reset_token() else {
            return Err(AppError::TokenNotFound);
        };

        let password_hash = self.hasher.hash(new_password)?;

        // パスワード更新とトークン消費は単一の条件付き更新で行う。
        // 有効期限もここで再確認する（ハッシュ計算中の失効を拒否）
        let not_issued_before = OffsetDateTime::now_utc() - self.settings.token_ttl;
        let applied = self
            .account_repo
            .complete_reset(
                account.id,
                &reset_token.token_hash,
                &password_hash,
                not_issued_before,
            )
            .await?;

        if !applied {
            tracing::warn!(account_id = %account.id, "検証後にトークンが消費・置換・失効");
            // 現在の状態から失敗理由を判定（判定できなければ消費済み扱い）
            return Err(self
                .validator
                .validate(token)
                .await
                .err()
                .unwrap_or(AppError::TokenAlreadyConsumed));
        }

        tracing::info!(account_id = %account.id, "パスワードリセット完了");

        Ok(())
    }
}

/// リセットURLを構築
fn build_reset_url(base: &str, token: &str) -> String {
    format!("{}?token={}", base, token)
}

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::error::AppError;
use crate::repositories::PgAccountRepository;
use crate::services::{Argon2Hasher, EmailNotifier, PasswordResetService, ResetSettings};

/// 本番構成のパスワードリセットサービス
pub type StorefrontResetService =
    PasswordResetService<PgAccountRepository, EmailNotifier, Argon2Hasher>;

/// アプリケーション共有状態
///
/// axum の State として全ハンドラーで共有される。
/// Clone は必須（axum が内部で clone するため）。
#[derive(Clone)]
pub struct AppState {
    /// アプリケーション設定（Arc で共有）
    pub config: Arc<Config>,
    /// パスワードリセットサービス
    pub password_reset: StorefrontResetService,
}

impl AppState {
    /// 新しい AppState を作成
    pub fn new(db_pool: PgPool, config: Config) -> Result<Self, AppError> {
        let config = Arc::new(config);
        let account_repo = PgAccountRepository::new(db_pool);
        let notifier = EmailNotifier::from_config(&config)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("notifier setup failed: {e}")))?;

        let password_reset = PasswordResetService::new(
            account_repo,
            notifier,
            Argon2Hasher::new(),
            ResetSettings::from_config(&config),
        );

        Ok(Self {
            config,
            password_reset,
        })
    }
}

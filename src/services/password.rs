use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher as _, PasswordVerifier};

use crate::error::AppError;

/// パスワードの一方向ハッシュ化
pub trait PasswordHasher: Send + Sync {
    /// ソルト付きでハッシュ化
    fn hash(&self, plaintext: &str) -> Result<String, AppError>;

    /// 平文がハッシュと一致するか検証
    fn verify(&self, plaintext: &str, hash: &str) -> Result<bool, AppError>;
}

/// argon2id によるパスワードハッシュ
#[derive(Clone, Default)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, plaintext: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| {
                tracing::error!(error = ?e, "パスワードハッシュ生成エラー");
                AppError::Internal(anyhow::anyhow!("password hash error"))
            })?;
        Ok(hash.to_string())
    }

    fn verify(&self, plaintext: &str, hash: &str) -> Result<bool, AppError> {
        let parsed_hash = PasswordHash::new(hash).map_err(|e| {
            tracing::error!(error = ?e, "パスワードハッシュのパースエラー");
            AppError::Internal(anyhow::anyhow!("password hash parse error"))
        })?;

        Ok(self
            .argon2
            .verify_password(plaintext.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

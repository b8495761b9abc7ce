use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::Account;

/// アカウント永続化の抽象
///
/// パスワードリセットフローはこのトレイト越しにストアへアクセスする。
#[trait_variant::make(AccountRepository: Send)]
pub trait LocalAccountRepository {
    /// メールアドレスでアカウントを検索（大文字小文字を区別しない）
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, sqlx::Error>;

    /// リセットトークンのハッシュでアカウントを検索（完全一致）
    ///
    /// # Note
    /// 有効期限や使用済みフラグの検証は呼び出し側で行う
    async fn find_by_reset_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<Account>, sqlx::Error>;

    /// リセットトークンを保存（既存トークンは上書き）
    async fn store_reset_token(
        &self,
        account_id: Uuid,
        token_hash: &str,
        issued_at: OffsetDateTime,
    ) -> Result<(), sqlx::Error>;

    /// パスワード更新とトークン消費を1つの更新で行う
    ///
    /// `not_issued_before` より前に発行されたトークン（期限切れ）は更新しない。
    ///
    /// # Returns
    /// トークンが未使用・有効期限内のまま残っていて更新できた場合 true。
    /// 並行リクエストで先に消費・置換されていた場合や期限切れの場合は false。
    async fn complete_reset(
        &self,
        account_id: Uuid,
        token_hash: &str,
        new_password_hash: &str,
        not_issued_before: OffsetDateTime,
    ) -> Result<bool, sqlx::Error>;
}

#[derive(Clone)]
pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl AccountRepository for PgAccountRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, sqlx::Error> {
        sqlx::query_as::<_, Account>(
            r#"
            SELECT id, email, password_hash, reset_token_hash, reset_token_issued_at,
                   reset_token_consumed, created_at, updated_at
            FROM users
            WHERE lower(email) = lower($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_by_reset_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<Account>, sqlx::Error> {
        sqlx::query_as::<_, Account>(
            r#"
            SELECT id, email, password_hash, reset_token_hash, reset_token_issued_at,
                   reset_token_consumed, created_at, updated_at
            FROM users
            WHERE reset_token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
    }

    async fn store_reset_token(
        &self,
        account_id: Uuid,
        token_hash: &str,
        issued_at: OffsetDateTime,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET reset_token_hash = $2,
                reset_token_issued_at = $3,
                reset_token_consumed = FALSE,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(account_id)
        .bind(token_hash)
        .bind(issued_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn complete_reset(
        &self,
        account_id: Uuid,
        token_hash: &str,
        new_password_hash: &str,
        not_issued_before: OffsetDateTime,
    ) -> Result<bool, sqlx::Error> {
        // 条件付きUPDATE: 同一トークンでの並行リクエストは1件のみ成功する
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $3,
                reset_token_consumed = TRUE,
                updated_at = NOW()
            WHERE id = $1
              AND reset_token_hash = $2
              AND NOT reset_token_consumed
              AND reset_token_issued_at >= $4
            "#,
        )
        .bind(account_id)
        .bind(token_hash)
        .bind(new_password_hash)
        .bind(not_issued_before)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

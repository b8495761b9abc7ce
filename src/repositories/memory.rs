//! テスト用のインメモリ AccountRepository
//!
//! PgAccountRepository と同じ上書き・条件付き更新の意味論を持つ。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use super::AccountRepository;
use crate::models::Account;

#[derive(Clone, Default)]
pub struct InMemoryAccountRepository {
    accounts: Arc<Mutex<HashMap<Uuid, Account>>>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// アカウントを登録
    pub fn insert(&self, email: &str, password_hash: &str) -> Account {
        let now = OffsetDateTime::now_utc();
        let account = Account {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            reset_token_hash: None,
            reset_token_issued_at: None,
            reset_token_consumed: false,
            created_at: now,
            updated_at: now,
        };
        self.accounts
            .lock()
            .unwrap()
            .insert(account.id, account.clone());
        account
    }

    pub fn get(&self, account_id: Uuid) -> Option<Account> {
        self.accounts.lock().unwrap().get(&account_id).cloned()
    }

    /// 発行時刻を過去にずらす（有効期限切れの再現用）
    pub fn backdate_reset_token(&self, account_id: Uuid, by: Duration) {
        let mut accounts = self.accounts.lock().unwrap();
        if let Some(account) = accounts.get_mut(&account_id) {
            account.reset_token_issued_at = account.reset_token_issued_at.map(|at| at - by);
        }
    }
}

impl AccountRepository for InMemoryAccountRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, sqlx::Error> {
        let accounts = self.accounts.lock().unwrap();
        Ok(accounts
            .values()
            .find(|a| a.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_reset_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<Account>, sqlx::Error> {
        let accounts = self.accounts.lock().unwrap();
        Ok(accounts
            .values()
            .find(|a| a.reset_token_hash.as_deref() == Some(token_hash))
            .cloned())
    }

    async fn store_reset_token(
        &self,
        account_id: Uuid,
        token_hash: &str,
        issued_at: OffsetDateTime,
    ) -> Result<(), sqlx::Error> {
        let mut accounts = self.accounts.lock().unwrap();
        if let Some(account) = accounts.get_mut(&account_id) {
            account.reset_token_hash = Some(token_hash.to_string());
            account.reset_token_issued_at = Some(issued_at);
            account.reset_token_consumed = false;
            account.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }

    async fn complete_reset(
        &self,
        account_id: Uuid,
        token_hash: &str,
        new_password_hash: &str,
        not_issued_before: OffsetDateTime,
    ) -> Result<bool, sqlx::Error> {
        let mut accounts = self.accounts.lock().unwrap();
        match accounts.get_mut(&account_id) {
            Some(account)
                if account.reset_token_hash.as_deref() == Some(token_hash)
                    && !account.reset_token_consumed
                    && account
                        .reset_token_issued_at
                        .is_some_and(|at| at >= not_issued_before) =>
            {
                account.password_hash = new_password_hash.to_string();
                account.reset_token_consumed = true;
                account.updated_at = OffsetDateTime::now_utc();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_find_by_email_ignores_case() {
        let repo = InMemoryAccountRepository::new();
        let account = repo.insert("User@Example.com", "hash");

        let found = repo.find_by_email("user@example.COM").await.unwrap();
        assert_eq!(found.map(|a| a.id), Some(account.id));
    }

    #[tokio::test]
    async fn test_store_reset_token_overwrites() {
        let repo = InMemoryAccountRepository::new();
        let account = repo.insert("user@example.com", "hash");
        let now = OffsetDateTime::now_utc();

        repo.store_reset_token(account.id, "first", now).await.unwrap();
        repo.store_reset_token(account.id, "second", now).await.unwrap();

        assert!(repo.find_by_reset_token("first").await.unwrap().is_none());
        assert!(repo.find_by_reset_token("second").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_complete_reset_applies_once() {
        let repo = InMemoryAccountRepository::new();
        let account = repo.insert("user@example.com", "old");
        let now = OffsetDateTime::now_utc();
        let cutoff = now - Duration::minutes(30);
        repo.store_reset_token(account.id, "token", now).await.unwrap();

        assert!(
            repo.complete_reset(account.id, "token", "new", cutoff)
                .await
                .unwrap()
        );
        assert!(
            !repo
                .complete_reset(account.id, "token", "newer", cutoff)
                .await
                .unwrap()
        );

        let stored = repo.get(account.id).unwrap();
        assert_eq!(stored.password_hash, "new");
        assert!(stored.reset_token_consumed);
    }

    #[tokio::test]
    async fn test_complete_reset_rejects_token_issued_before_cutoff() {
        let repo = InMemoryAccountRepository::new();
        let account = repo.insert("user@example.com", "old");
        let now = OffsetDateTime::now_utc();
        repo.store_reset_token(account.id, "token", now - Duration::minutes(31))
            .await
            .unwrap();

        let applied = repo
            .complete_reset(account.id, "token", "new", now - Duration::minutes(30))
            .await
            .unwrap();

        assert!(!applied);
        let stored = repo.get(account.id).unwrap();
        assert_eq!(stored.password_hash, "old");
        assert!(!stored.reset_token_consumed);
    }
}

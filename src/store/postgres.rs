use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{AccountStore, StoreError};
use crate::models::{Account, Message};

const ACCOUNT_COLUMNS: &str = "username, email, password_hash, verified, \
     verify_code, verify_code_expires_at, accepting_messages, created_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1 \
             ORDER BY verified DESC, created_at DESC LIMIT 1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn upsert(&self, account: &Account) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO accounts (username, email, password_hash, verified,
                verify_code, verify_code_expires_at, accepting_messages, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (username) DO UPDATE SET
                email = EXCLUDED.email,
                password_hash = EXCLUDED.password_hash,
                verified = EXCLUDED.verified,
                verify_code = EXCLUDED.verify_code,
                verify_code_expires_at = EXCLUDED.verify_code_expires_at,
                accepting_messages = EXCLUDED.accepting_messages
            "#,
        )
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.verified)
        .bind(&account.verify_code)
        .bind(account.verify_code_expires_at)
        .bind(account.accepting_messages)
        .bind(account.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_by_email(&self, email: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM accounts WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn mark_verified(&self, username: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE accounts SET verified = TRUE WHERE username = $1")
            .bind(username)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn set_verify_code(
        &self,
        username: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE accounts SET verify_code = $1, verify_code_expires_at = $2 \
             WHERE username = $3",
        )
        .bind(code)
        .bind(expires_at)
        .bind(username)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_accepting(&self, username: &str, accepting: bool) -> Result<(), StoreError> {
        sqlx::query("UPDATE accounts SET accepting_messages = $1 WHERE username = $2")
            .bind(accepting)
            .bind(username)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn append_message(&self, username: &str, message: &Message) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO messages (message_id, username, content, created_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(message.message_id)
        .bind(username)
        .bind(&message.content)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove_message(&self, username: &str, message_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM messages WHERE username = $1 AND message_id = $2")
            .bind(username)
            .bind(message_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_messages(&self, username: &str) -> Result<Vec<Message>, StoreError> {
        let messages = sqlx::query_as::<_, Message>(
            "SELECT message_id, content, created_at FROM messages \
             WHERE username = $1 ORDER BY created_at DESC",
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }
}

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{AccountStore, StoreError};
use crate::models::{Account, Message};

/// 内存存储后端，测试和本地开发用
#[derive(Default)]
pub struct MemoryStore {
    // 用户名 -> (账户, 收件箱)
    inner: Mutex<HashMap<String, (Account, Vec<Message>)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.get(username).map(|(account, _)| account.clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut candidates: Vec<&Account> = inner
            .values()
            .map(|(account, _)| account)
            .filter(|account| account.email == email)
            .collect();
        candidates.sort_by_key(|account| (account.verified, account.created_at));
        Ok(candidates.last().cloned().cloned())
    }

    async fn upsert(&self, account: &Account) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let entry = inner
            .entry(account.username.clone())
            .or_insert_with(|| (account.clone(), Vec::new()));
        entry.0 = account.clone();
        Ok(())
    }

    async fn delete_by_email(&self, email: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.retain(|_, (account, _)| account.email != email);
        Ok(())
    }

    async fn mark_verified(&self, username: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some((account, _)) = inner.get_mut(username) {
            account.verified = true;
        }
        Ok(())
    }

    async fn set_verify_code(
        &self,
        username: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some((account, _)) = inner.get_mut(username) {
            account.verify_code = Some(code.to_string());
            account.verify_code_expires_at = Some(expires_at);
        }
        Ok(())
    }

    async fn set_accepting(&self, username: &str, accepting: bool) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some((account, _)) = inner.get_mut(username) {
            account.accepting_messages = accepting;
        }
        Ok(())
    }

    async fn append_message(&self, username: &str, message: &Message) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.get_mut(username) {
            Some((_, messages)) => {
                messages.push(message.clone());
                Ok(())
            }
            None => Err(StoreError("no such account".into())),
        }
    }

    async fn remove_message(&self, username: &str, message_id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some((_, messages)) = inner.get_mut(username) {
            let before = messages.len();
            messages.retain(|m| m.message_id != message_id);
            return Ok(messages.len() < before);
        }
        Ok(false)
    }

    async fn list_messages(&self, username: &str) -> Result<Vec<Message>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut messages = inner
            .get(username)
            .map(|(_, messages)| messages.clone())
            .unwrap_or_default();
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(messages)
    }
}

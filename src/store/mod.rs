use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Account, Message};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// 存储层错误。上层不关心驱动细节，统一按"存储不可用"处理
#[derive(Debug, thiserror::Error)]
#[error("storage unavailable: {0}")]
pub struct StoreError(pub String);

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError(e.to_string())
    }
}

/// 账户存储的端口。消息挂在账户下，所有消息操作都必须带上属主用户名
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError>;

    /// 同一邮箱可能同时存在多条未验证记录，优先返回已验证的那条
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    /// 按用户名插入或整体覆盖一条账户记录
    async fn upsert(&self, account: &Account) -> Result<(), StoreError>;

    /// 注册回滚用：按邮箱删除账户
    async fn delete_by_email(&self, email: &str) -> Result<(), StoreError>;

    async fn mark_verified(&self, username: &str) -> Result<(), StoreError>;

    async fn set_verify_code(
        &self,
        username: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn set_accepting(&self, username: &str, accepting: bool) -> Result<(), StoreError>;

    async fn append_message(&self, username: &str, message: &Message) -> Result<(), StoreError>;

    /// 返回是否真的删掉了一条消息
    async fn remove_message(&self, username: &str, message_id: Uuid) -> Result<bool, StoreError>;

    /// 按创建时间倒序返回收件箱
    async fn list_messages(&self, username: &str) -> Result<Vec<Message>, StoreError>;
}

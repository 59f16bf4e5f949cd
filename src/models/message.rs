use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// 匿名消息。结构上就没有发送者字段，匿名性由此保证
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub message_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(content: String, now: DateTime<Utc>) -> Self {
        Message {
            message_id: Uuid::new_v4(),
            content,
            created_at: now,
        }
    }
}

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{Account, Message};
use crate::store::AccountStore;

// 提交表单的长度约束，服务端同样执行
const CONTENT_MIN_CHARS: usize = 3;
const CONTENT_MAX_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    // 接收者用户名
    pub username: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct AcceptMessagesRequest {
    pub accept_messages: bool,
}

#[derive(Debug, Serialize)]
pub struct AcceptMessagesResponse {
    pub accepting_messages: bool,
}

impl Account {
    /// 收件箱闸门：接收者存在且开启接收才允许写入。
    /// 消息本身没有发送者字段，调用方是谁在这里不可见
    pub async fn submit_message(
        store: &dyn AccountStore,
        req: SendMessageRequest,
    ) -> Result<(), ApiError> {
        let account = store
            .find_by_username(&req.username)
            .await?
            .ok_or(ApiError::NotFound("用户不存在"))?;

        if !account.accepting_messages {
            return Err(ApiError::NotAccepting);
        }

        let chars = req.content.chars().count();
        if !(CONTENT_MIN_CHARS..=CONTENT_MAX_CHARS).contains(&chars) {
            return Err(ApiError::Validation(
                "消息长度必须在3到200个字符之间".to_string(),
            ));
        }

        let message = Message::new(req.content, Utc::now());
        store.append_message(&account.username, &message).await?;
        Ok(())
    }

    /// 本人收件箱，按创建时间倒序
    pub async fn inbox(
        store: &dyn AccountStore,
        username: &str,
    ) -> Result<Vec<Message>, ApiError> {
        store
            .find_by_username(username)
            .await?
            .ok_or(ApiError::NotFound("用户不存在"))?;

        Ok(store.list_messages(username).await?)
    }

    /// 删除本人收件箱里的一条消息。"不存在"和"已删除"对外是同一种错误
    pub async fn delete_message(
        store: &dyn AccountStore,
        username: &str,
        message_id: Uuid,
    ) -> Result<(), ApiError> {
        if !store.remove_message(username, message_id).await? {
            return Err(ApiError::NotFound("消息不存在或已删除"));
        }
        Ok(())
    }

    /// 设置接收开关，设置成当前值也算成功
    pub async fn set_accepting_flag(
        store: &dyn AccountStore,
        username: &str,
        accepting: bool,
    ) -> Result<bool, ApiError> {
        store
            .find_by_username(username)
            .await?
            .ok_or(ApiError::NotFound("用户不存在"))?;

        store.set_accepting(username, accepting).await?;
        Ok(accepting)
    }

    pub async fn accepting_flag(
        store: &dyn AccountStore,
        username: &str,
    ) -> Result<bool, ApiError> {
        let account = store
            .find_by_username(username)
            .await?
            .ok_or(ApiError::NotFound("用户不存在"))?;

        Ok(account.accepting_messages)
    }
}

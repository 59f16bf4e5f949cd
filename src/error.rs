use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::store::StoreError;
use crate::utils::{ApiResponse, error_codes};

/// 业务错误，所有下层失败在返回前都先转换成这里的某一种
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(&'static str),
    #[error("验证码错误")]
    CodeMismatch,
    #[error("验证码已过期")]
    CodeExpired,
    #[error("对方未开启消息接收")]
    NotAccepting,
    #[error("{0}")]
    AlreadyTaken(&'static str),
    #[error("{0}")]
    Validation(String),
    #[error("未授权访问")]
    Unauthorized,
    #[error("用户名或密码错误")]
    AuthFailed,
    #[error("请先完成邮箱验证")]
    NotVerified,
    #[error("存储服务不可用")]
    Storage(#[from] StoreError),
    #[error("发送验证邮件失败")]
    EmailDelivery,
    #[error("生成消息建议失败")]
    Suggestion,
    #[error("内部服务器错误")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::CodeMismatch
            | ApiError::CodeExpired
            | ApiError::AlreadyTaken(_)
            | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotAccepting | ApiError::NotVerified => StatusCode::FORBIDDEN,
            ApiError::Unauthorized | ApiError::AuthFailed => StatusCode::UNAUTHORIZED,
            ApiError::Storage(_)
            | ApiError::EmailDelivery
            | ApiError::Suggestion
            | ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            ApiError::NotFound(_) => error_codes::NOT_FOUND,
            ApiError::CodeMismatch => error_codes::CODE_MISMATCH,
            ApiError::CodeExpired => error_codes::CODE_EXPIRED,
            ApiError::NotAccepting => error_codes::PERMISSION_DENIED,
            ApiError::AlreadyTaken(_) => error_codes::ALREADY_TAKEN,
            ApiError::Validation(_) => error_codes::VALIDATION_ERROR,
            ApiError::Unauthorized | ApiError::AuthFailed | ApiError::NotVerified => {
                error_codes::AUTH_FAILED
            }
            ApiError::EmailDelivery => error_codes::EMAIL_SEND_FAILED,
            ApiError::Storage(_) | ApiError::Suggestion | ApiError::Internal => {
                error_codes::INTERNAL_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Storage(e) = &self {
            tracing::error!("Storage error: {}", e);
        }

        let body = Json(ApiResponse::<()> {
            code: self.code(),
            msg: self.to_string(),
            resp_data: None,
        });

        (self.status(), body).into_response()
    }
}

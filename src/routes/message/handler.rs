use axum::{
    extract::{Extension, Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use super::model::{AcceptMessagesRequest, AcceptMessagesResponse, SendMessageRequest};
use crate::models::Account;
use crate::utils::{Claims, success_to_api_response, success_with_message};
use crate::{AppState, error::ApiError};

/// 公开接口，任何人都可以匿名投递
#[axum::debug_handler]
pub async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Account::submit_message(state.store.as_ref(), req).await?;
    Ok((StatusCode::OK, success_with_message("消息发送成功", ())))
}

#[axum::debug_handler]
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = Account::inbox(state.store.as_ref(), &claims.sub).await?;
    Ok((StatusCode::OK, success_to_api_response(messages)))
}

#[axum::debug_handler]
pub async fn delete_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(message_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Account::delete_message(state.store.as_ref(), &claims.sub, message_id).await?;
    Ok((StatusCode::OK, success_with_message("消息已删除", ())))
}

#[axum::debug_handler]
pub async fn set_accepting(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AcceptMessagesRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let accepting =
        Account::set_accepting_flag(state.store.as_ref(), &claims.sub, req.accept_messages)
            .await?;
    Ok((
        StatusCode::OK,
        success_to_api_response(AcceptMessagesResponse {
            accepting_messages: accepting,
        }),
    ))
}

#[axum::debug_handler]
pub async fn get_accepting(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let accepting = Account::accepting_flag(state.store.as_ref(), &claims.sub).await?;
    Ok((
        StatusCode::OK,
        success_to_api_response(AcceptMessagesResponse {
            accepting_messages: accepting,
        }),
    ))
}

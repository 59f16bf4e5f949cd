use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use super::model::{CheckUsernameQuery, LoginRequest, RegisterRequest, VerifyCodeRequest};
use crate::models::Account;
use crate::utils::success_with_message;
use crate::{AppState, error::ApiError};

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Account::register(state.store.as_ref(), state.mailer.as_ref(), req).await?;
    Ok((
        StatusCode::CREATED,
        success_with_message("注册成功，验证码已发送至邮箱", ()),
    ))
}

#[axum::debug_handler]
pub async fn verify_code(
    State(state): State<AppState>,
    Json(req): Json<VerifyCodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Account::verify(state.store.as_ref(), &req.username, &req.code).await?;
    Ok((StatusCode::OK, success_with_message("账户验证成功", ())))
}

#[axum::debug_handler]
pub async fn resend_code(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Account::reissue_code(state.store.as_ref(), state.mailer.as_ref(), &username).await?;
    Ok((StatusCode::OK, success_with_message("验证码已重新发送", ())))
}

#[axum::debug_handler]
pub async fn check_username(
    State(state): State<AppState>,
    Query(query): Query<CheckUsernameQuery>,
) -> Result<impl IntoResponse, ApiError> {
    Account::check_username(state.store.as_ref(), &query.username).await?;
    Ok((StatusCode::OK, success_with_message("用户名可用", ())))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let resp = Account::login(state.store.as_ref(), &state.config, req).await?;
    Ok((StatusCode::OK, success_with_message("登录成功", resp)))
}

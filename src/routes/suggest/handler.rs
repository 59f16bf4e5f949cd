use axum::{extract::State, http::StatusCode, response::IntoResponse};

use super::model::{SuggestResponse, generate_suggestions};
use crate::utils::success_to_api_response;
use crate::{AppState, error::ApiError};

#[axum::debug_handler]
pub async fn suggest_messages(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let suggestions = generate_suggestions(&state.http, &state.config).await?;
    Ok((
        StatusCode::OK,
        success_to_api_response(SuggestResponse { suggestions }),
    ))
}

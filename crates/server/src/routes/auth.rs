use axum::{Router, extract::State, response::Json as ResponseJson, routing::post};
use db::models::user::{Credentials, UserWithRoles};
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

/// POST /api/auth/login
/// Returns the user and their roles; any mismatch is a plain 401
pub async fn login(
    State(state): State<AppState>,
    axum::Json(credentials): axum::Json<Credentials>,
) -> Result<ResponseJson<ApiResponse<UserWithRoles>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(
        state.users.authenticate(credentials).await?,
    )))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/auth/login", post(login))
}

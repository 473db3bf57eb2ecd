use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{delete, get},
};
use db::models::role::{CreateRole, Role};
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

pub async fn list_roles(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Role>>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(state.roles.list().await?)))
}

pub async fn create_role(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<CreateRole>,
) -> Result<ResponseJson<ApiResponse<Role>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(
        state.roles.create(payload).await?,
    )))
}

/// DELETE /api/roles/{id}
/// Grants of the role go with it
pub async fn delete_role(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    state.roles.delete(id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/roles", get(list_roles).post(create_role))
        .route("/roles/{id}", delete(delete_role))
}

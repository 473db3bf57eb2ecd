use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::user::{CreateUser, UserWithRoles};
use serde_json::{Map, Value};
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

pub async fn list_users(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<UserWithRoles>>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(state.users.list().await?)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<UserWithRoles>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(state.users.get(id).await?)))
}

/// POST /api/users
/// Optional `role_ids` are granted in the same transaction
pub async fn create_user(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<CreateUser>,
) -> Result<ResponseJson<ApiResponse<UserWithRoles>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(
        state.users.create(payload).await?,
    )))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    axum::Json(fields): axum::Json<Map<String, Value>>,
) -> Result<ResponseJson<ApiResponse<UserWithRoles>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(
        state.users.update(id, &fields).await?,
    )))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    state.users.delete(id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn grant_user_role(
    State(state): State<AppState>,
    Path((id, role_id)): Path<(i64, i64)>,
) -> Result<ResponseJson<ApiResponse<UserWithRoles>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(
        state.users.grant_role(id, role_id).await?,
    )))
}

pub async fn revoke_user_role(
    State(state): State<AppState>,
    Path((id, role_id)): Path<(i64, i64)>,
) -> Result<ResponseJson<ApiResponse<UserWithRoles>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(
        state.users.revoke_role(id, role_id).await?,
    )))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route(
            "/users/{id}/roles/{role_id}",
            post(grant_user_role).delete(revoke_user_role),
        )
}

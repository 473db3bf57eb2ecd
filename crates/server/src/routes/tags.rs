use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{delete, get},
};
use db::models::tag::{CreateTag, Tag};
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

pub async fn list_tags(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Tag>>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(state.tags.list().await?)))
}

pub async fn create_tag(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<CreateTag>,
) -> Result<ResponseJson<ApiResponse<Tag>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(
        state.tags.create(payload).await?,
    )))
}

pub async fn delete_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    state.tags.delete(id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tags", get(list_tags).post(create_tag))
        .route("/tags/{id}", delete(delete_tag))
}

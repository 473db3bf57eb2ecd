use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::task::{CreateTask, Task, TaskWithTags};
use serde_json::{Map, Value};
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

/// GET /api/tasks
pub async fn list_tasks(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<TaskWithTags>>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(state.tasks.list().await?)))
}

/// GET /api/tasks/owner/{owner_id}
/// Incomplete tasks first
pub async fn list_owner_tasks(
    State(state): State<AppState>,
    Path(owner_id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<Vec<TaskWithTags>>>, ApiError> {
    let tasks = state.tasks.list_by_owner(owner_id).await?;
    Ok(ResponseJson(ApiResponse::success(tasks)))
}

pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<TaskWithTags>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(state.tasks.get(id).await?)))
}

pub async fn create_task(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<CreateTask>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(
        state.tasks.create(payload).await?,
    )))
}

/// PATCH /api/tasks/{id}
/// Body is a map of the fields to change
pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    axum::Json(fields): axum::Json<Map<String, Value>>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(
        state.tasks.update(id, &fields).await?,
    )))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    state.tasks.delete(id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn add_task_tag(
    State(state): State<AppState>,
    Path((id, tag_id)): Path<(i64, i64)>,
) -> Result<ResponseJson<ApiResponse<TaskWithTags>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(
        state.tasks.add_tag(id, tag_id).await?,
    )))
}

pub async fn remove_task_tag(
    State(state): State<AppState>,
    Path((id, tag_id)): Path<(i64, i64)>,
) -> Result<ResponseJson<ApiResponse<TaskWithTags>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(
        state.tasks.remove_tag(id, tag_id).await?,
    )))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/owner/{owner_id}", get(list_owner_tasks))
        .route(
            "/tasks/{id}",
            get(get_task).patch(update_task).delete(delete_task),
        )
        .route(
            "/tasks/{id}/tags/{tag_id}",
            post(add_task_tag).delete(remove_task_tag),
        )
}

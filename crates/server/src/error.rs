use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::entity_error::EntityError;
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Entity(#[from] EntityError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Entity(EntityError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Entity(EntityError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Entity(EntityError::Authentication) => StatusCode::UNAUTHORIZED,
            ApiError::Entity(EntityError::Storage(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            ApiError::Entity(EntityError::Storage(e)) => {
                tracing::error!(error = %e, "Storage failure");
                "internal storage error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ApiResponse::<()>::error(&message))).into_response()
    }
}

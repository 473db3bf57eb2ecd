//! Error taxonomy shared by the entity services.

use db::partial_update::UpdateError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EntityError {
    /// Caller input was missing or malformed; nothing was executed.
    #[error("validation error: {0}")]
    Validation(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    /// Document/secret pair matched no user. Deliberately says nothing about which half was wrong.
    #[error("invalid credentials")]
    Authentication,
    #[error("database error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl EntityError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }
}

impl From<UpdateError> for EntityError {
    fn from(err: UpdateError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Trimmed value of a required text field, or a validation error naming it.
pub(crate) fn required_text(value: Option<String>, field: &str) -> Result<String, EntityError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| EntityError::validation(format!("{field} is required")))
}

/// Trimmed value of a text field an update may leave out but must not blank.
pub(crate) fn supplied_text(
    value: Option<String>,
    field: &str,
) -> Result<Option<String>, EntityError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if v.is_empty() => Err(EntityError::validation(format!(
            "{field} must not be blank"
        ))),
        other => Ok(other),
    }
}

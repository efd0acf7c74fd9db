//! Structured error types for the store and the HTTP API.

use crate::types::Id;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

/// Kind of record named in a not-found error.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum EntityKind {
    Project,
    Villa,
    Category,
    Team,
    Task,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Project => "Project",
            EntityKind::Villa => "Villa",
            EntityKind::Category => "Category",
            EntityKind::Team => "Team",
            EntityKind::Task => "Task",
        };
        f.write_str(name)
    }
}

/// Typed failures raised by the store inside `anyhow::Error`.
///
/// Callers downcast to tell a missing record apart from a database fault.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} not found with id: {id}")]
    NotFound { entity: EntityKind, id: Id },

    #[error("{0} is required")]
    MissingReference(&'static str),
}

impl StoreError {
    pub fn not_found(entity: EntityKind, id: Id) -> Self {
        StoreError::NotFound { entity, id }
    }
}

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    MissingRequiredField,
    InvalidFieldValue,
    InvalidReference,

    // Not found errors
    ProjectNotFound,
    VillaNotFound,
    CategoryNotFound,
    TeamNotFound,
    TaskNotFound,

    // Internal errors
    DatabaseError,
    InternalError,
}

impl ErrorCode {
    /// HTTP status the code is reported with.
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::MissingRequiredField
            | ErrorCode::InvalidFieldValue
            | ErrorCode::InvalidReference => StatusCode::BAD_REQUEST,
            ErrorCode::ProjectNotFound
            | ErrorCode::VillaNotFound
            | ErrorCode::CategoryNotFound
            | ErrorCode::TeamNotFound
            | ErrorCode::TaskNotFound => StatusCode::NOT_FOUND,
            ErrorCode::DatabaseError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn is_not_found(self) -> bool {
        self.status() == StatusCode::NOT_FOUND
    }

    /// The not-found code for one kind of record.
    pub fn not_found_for(entity: EntityKind) -> Self {
        match entity {
            EntityKind::Project => ErrorCode::ProjectNotFound,
            EntityKind::Villa => ErrorCode::VillaNotFound,
            EntityKind::Category => ErrorCode::CategoryNotFound,
            EntityKind::Team => ErrorCode::TeamNotFound,
            EntityKind::Task => ErrorCode::TaskNotFound,
        }
    }
}

/// Structured error returned by API handlers.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    // Convenience constructors

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("{} is required", field),
        )
        .with_field(field)
    }

    pub fn invalid_value(field: &str, reason: &str) -> Self {
        Self::new(ErrorCode::InvalidFieldValue, reason).with_field(field)
    }

    pub fn not_found(entity: EntityKind, id: Id) -> Self {
        Self::new(
            ErrorCode::not_found_for(entity),
            format!("{} not found with id: {}", entity, id),
        )
    }

    pub fn database(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::DatabaseError, err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }

    /// Report a not-found as a bad request.
    ///
    /// Used by create handlers: a payload that references a missing record
    /// is malformed, the target of the request itself does not exist yet.
    pub fn into_bad_request(self) -> Self {
        if self.code.is_not_found() {
            Self {
                code: ErrorCode::InvalidReference,
                ..self
            }
        } else {
            self
        }
    }
}

impl ApiError {
    /// Like [`Self::into_bad_request`], but a missing `target` stays a 404.
    ///
    /// Used by update handlers: the record being updated may be absent, any
    /// other missing record was referenced by the payload.
    pub fn into_bad_request_unless(self, target: EntityKind) -> Self {
        if self.code == ErrorCode::not_found_for(target) {
            self
        } else {
            self.into_bad_request()
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => ApiError::not_found(entity, id),
            StoreError::MissingReference(field) => ApiError::missing_field(field),
        }
    }
}

// Allow using ? with anyhow errors from the store
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        let err = match err.downcast::<StoreError>() {
            Ok(store_err) => return store_err.into(),
            Err(err) => err,
        };
        let err = match err.downcast::<ApiError>() {
            Ok(api_err) => return api_err,
            Err(err) => err,
        };
        if err.downcast_ref::<rusqlite::Error>().is_some() {
            ApiError::database(err)
        } else {
            ApiError::internal(err)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status();
        if status.is_server_error() {
            tracing::error!(code = ?self.code, "{}", self.message);
        } else {
            tracing::warn!(code = ?self.code, "{}", self.message);
        }
        (status, Json(self)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_not_found_maps_to_404() {
        let err: ApiError =
            anyhow::Error::new(StoreError::not_found(EntityKind::Task, 7)).into();
        assert_eq!(err.code, ErrorCode::TaskNotFound);
        assert_eq!(err.code.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.message, "Task not found with id: 7");
    }

    #[test]
    fn not_found_becomes_bad_request_on_create() {
        let err = ApiError::not_found(EntityKind::Category, 3).into_bad_request();
        assert_eq!(err.code, ErrorCode::InvalidReference);
        assert_eq!(err.code.status(), StatusCode::BAD_REQUEST);
        assert!(err.message.contains("Category"));
    }

    #[test]
    fn update_keeps_404_for_its_own_target() {
        let missing_task = ApiError::not_found(EntityKind::Task, 4);
        assert_eq!(
            missing_task.into_bad_request_unless(EntityKind::Task).code,
            ErrorCode::TaskNotFound
        );

        let missing_team = ApiError::not_found(EntityKind::Team, 9);
        assert_eq!(
            missing_team.into_bad_request_unless(EntityKind::Task).code,
            ErrorCode::InvalidReference
        );
    }

    #[test]
    fn bad_request_leaves_other_codes_alone() {
        let err = ApiError::internal("boom").into_bad_request();
        assert_eq!(err.code, ErrorCode::InternalError);
    }

    #[test]
    fn missing_reference_maps_to_missing_field() {
        let err: ApiError = anyhow::Error::new(StoreError::MissingReference("villa.id")).into();
        assert_eq!(err.code, ErrorCode::MissingRequiredField);
        assert_eq!(err.field.as_deref(), Some("villa.id"));
    }

    #[test]
    fn sqlite_errors_map_to_database_error() {
        let err: ApiError = anyhow::Error::new(rusqlite::Error::InvalidQuery).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[test]
    fn error_serializes_without_empty_field() {
        let json = serde_json::to_value(ApiError::not_found(EntityKind::Team, 1)).unwrap();
        assert_eq!(json["code"], "TEAM_NOT_FOUND");
        assert!(json.get("field").is_none());
    }
}

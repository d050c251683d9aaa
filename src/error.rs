// HTTP API Error Types
use axum::{extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::access::AccessError;
use crate::database::{DatabaseError, StoreError, StoreErrorKind};
use crate::filter::FilterError;

/// HTTP API error: status, stable machine-readable code and a client-safe message
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest { code: &'static str, message: String },

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden { code: &'static str, message: String },

    // 404 Not Found
    NotFound { code: &'static str, message: String },

    // 409 Conflict
    Conflict { code: &'static str, message: String },

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable { code: &'static str, message: String },
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest { message, .. }
            | ApiError::Forbidden { message, .. }
            | ApiError::NotFound { message, .. }
            | ApiError::Conflict { message, .. }
            | ApiError::ServiceUnavailable { message, .. } => message,
            ApiError::Unauthorized(message) | ApiError::InternalServerError(message) => message,
        }
    }

    /// Stable code for client branching
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest { code, .. }
            | ApiError::Forbidden { code, .. }
            | ApiError::NotFound { code, .. }
            | ApiError::Conflict { code, .. }
            | ApiError::ServiceUnavailable { code, .. } => code,
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::InternalServerError(_) => "DATABASE_ERROR",
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "success": false,
            "error": {
                "code": self.error_code(),
                "message": self.message(),
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }
        })
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest { code: "BAD_REQUEST", message: message.into() }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn access_denied(message: impl Into<String>) -> Self {
        ApiError::Forbidden { code: "ACCESS_DENIED", message: message.into() }
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }
}

impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        let message = err.to_string();
        match err {
            FilterError::UnknownTable(_) => ApiError::NotFound { code: "TABLE_NOT_FOUND", message },
            FilterError::UnknownColumn { .. } => ApiError::BadRequest { code: "COLUMN_NOT_FOUND", message },
            FilterError::MissingPredicate { .. } => ApiError::BadRequest { code: "MISSING_PREDICATE", message },
            FilterError::HeterogeneousBatch { .. } => ApiError::BadRequest { code: "HETEROGENEOUS_BATCH", message },
            FilterError::InvalidFilter(_) | FilterError::EmptyPatch(_) => {
                ApiError::BadRequest { code: "INVALID_FILTER", message }
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let code = err.kind.code();
        match err.kind {
            StoreErrorKind::DuplicateEntry | StoreErrorKind::ForeignKeyViolation => {
                ApiError::Conflict { code, message: err.message }
            }
            StoreErrorKind::NotNullViolation | StoreErrorKind::ColumnNotFound | StoreErrorKind::InvalidInput => {
                ApiError::BadRequest { code, message: err.message }
            }
            StoreErrorKind::TableNotFound => ApiError::NotFound { code, message: err.message },
            StoreErrorKind::PermissionDenied => ApiError::Forbidden { code, message: err.message },
            StoreErrorKind::SerializationConflict | StoreErrorKind::Timeout | StoreErrorKind::ConnectionLost => {
                ApiError::ServiceUnavailable { code, message: "Database temporarily unavailable".to_string() }
            }
            StoreErrorKind::SyntaxError | StoreErrorKind::Database => {
                // Don't expose internal SQL errors to clients
                tracing::error!("Database error ({:?}): {}", err.sqlstate, err.message);
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Store(store) => store.into(),
            DatabaseError::PoolExhausted { waited } => ApiError::ServiceUnavailable {
                code: "POOL_EXHAUSTED",
                message: format!("No database connection available after {}ms", waited.as_millis()),
            },
            DatabaseError::RetriesExhausted { attempts, last } => ApiError::ServiceUnavailable {
                code: "RETRIES_EXHAUSTED",
                message: format!("Gave up after {} attempts ({})", attempts, last.kind.code()),
            },
            DatabaseError::PoolClosed => ApiError::ServiceUnavailable {
                code: "DATABASE_ERROR",
                message: "Service is shutting down".to_string(),
            },
            DatabaseError::ConfigMissing(_) | DatabaseError::InvalidDatabaseUrl => {
                tracing::error!("Database misconfigured: {}", err);
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::AccessDenied { .. } => ApiError::access_denied(err.to_string()),
            AccessError::Filter(e) => e.into(),
            AccessError::Database(e) => e.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn validation_errors_are_bad_requests() {
        let err: ApiError = FilterError::MissingPredicate { table: "profiles".into(), operation: "delete" }.into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "MISSING_PREDICATE");

        let err: ApiError = FilterError::HeterogeneousBatch { row: 1 }.into();
        assert_eq!(err.error_code(), "HETEROGENEOUS_BATCH");
    }

    #[test]
    fn access_denied_is_forbidden() {
        let err: ApiError = AccessError::AccessDenied { table: "audit_events".into(), operation: "select" }.into();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.error_code(), "ACCESS_DENIED");
    }

    #[test]
    fn store_errors_keep_their_codes() {
        let err: ApiError = DatabaseError::Store(StoreError::from_sqlstate("23505", "duplicate key")).into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.error_code(), "DUPLICATE_ENTRY");

        let err: ApiError = DatabaseError::Store(StoreError::from_sqlstate("42P01", "relation missing")).into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.error_code(), "TABLE_NOT_FOUND");
    }

    #[test]
    fn rejected_values_are_bad_requests() {
        let err: ApiError = DatabaseError::Store(StoreError::from_sqlstate("22P02", "invalid input syntax for type uuid")).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }

    #[test]
    fn pool_pressure_is_service_unavailable() {
        let err: ApiError = DatabaseError::PoolExhausted { waited: Duration::from_millis(250) }.into();
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.error_code(), "POOL_EXHAUSTED");

        let last = StoreError::from_sqlstate("40001", "could not serialize");
        let err: ApiError = DatabaseError::RetriesExhausted { attempts: 3, last }.into();
        assert_eq!(err.error_code(), "RETRIES_EXHAUSTED");
    }

    #[test]
    fn envelope_shape() {
        let body = ApiError::unauthorized("bad token").to_json();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
        assert_eq!(body["error"]["message"], "bad token");
        assert!(body["error"]["timestamp"].is_string());
    }
}

//! # Query Errors
//!
//! Error types for parameter decoding, plan construction and plan execution.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Message returned to clients for any execution failure
pub const GENERIC_FAILURE_MESSAGE: &str = "An unexpected error occurred";

/// Query translation and execution errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    // ==================
    // Client Errors (4xx)
    // ==================
    /// Malformed parameter value
    #[error("Invalid parameter '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    /// Column referenced but absent from the entity schema
    #[error("Unknown column '{column}' on '{entity}'")]
    UnknownColumn { entity: String, column: String },

    /// Relation requested for eager loading but not defined
    #[error("Unknown relation '{relation}' on '{entity}'")]
    UnknownRelation { entity: String, relation: String },

    /// Entity not present in the schema catalog
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    // ==================
    // Server Errors (5xx)
    // ==================
    /// Storage failure while running a finished plan. The detail is for logs only.
    #[error("An unexpected error occurred")]
    ExecutionFailure(String),
}

impl QueryError {
    /// Shorthand for an invalid parameter error
    pub fn invalid(param: impl Into<String>, message: impl Into<String>) -> Self {
        QueryError::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }

    pub fn unknown_column(entity: impl Into<String>, column: impl Into<String>) -> Self {
        QueryError::UnknownColumn {
            entity: entity.into(),
            column: column.into(),
        }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            QueryError::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
            QueryError::UnknownColumn { .. } => StatusCode::BAD_REQUEST,
            QueryError::UnknownRelation { .. } => StatusCode::BAD_REQUEST,

            // 404 Not Found
            QueryError::UnknownEntity(_) => StatusCode::NOT_FOUND,

            // 500 Internal Server Error
            QueryError::ExecutionFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The offending query parameter, when one is known
    pub fn parameter(&self) -> Option<&str> {
        match self {
            QueryError::InvalidParameter { param, .. } => Some(param),
            _ => None,
        }
    }

    /// Stable machine-readable kind, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::InvalidParameter { .. } => "invalid_parameter",
            QueryError::UnknownColumn { .. } => "unknown_column",
            QueryError::UnknownRelation { .. } => "unknown_relation",
            QueryError::UnknownEntity(_) => "unknown_entity",
            QueryError::ExecutionFailure(_) => "execution_failure",
        }
    }
}

/// Error payload
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
}

/// Error response envelope
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

impl From<QueryError> for ErrorResponse {
    fn from(err: QueryError) -> Self {
        Self {
            error: ErrorBody {
                status_code: err.status_code().as_u16(),
                parameter: err.parameter().map(str::to_string),
                message: err.to_string(),
            },
        }
    }
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse::from(self));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            QueryError::invalid("sort", "bad").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            QueryError::unknown_column("products", "nope").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            QueryError::UnknownEntity("ghosts".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            QueryError::ExecutionFailure("disk on fire".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_execution_failure_hides_detail() {
        let err = QueryError::ExecutionFailure("connection refused at 10.0.0.3".to_string());
        let body = ErrorResponse::from(err);
        assert_eq!(body.error.message, GENERIC_FAILURE_MESSAGE);
        assert!(body.error.parameter.is_none());
    }

    #[test]
    fn test_invalid_parameter_names_param() {
        let body = ErrorResponse::from(QueryError::invalid("per_page", "must be an integer"));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"]["parameter"], "per_page");
        assert_eq!(json["error"]["status_code"], 400);
        assert!(json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("must be an integer"));
    }
}

//! Executor error types
//!
//! Error codes:
//! - APIQUERY_UNKNOWN_ENTITY
//! - APIQUERY_UNKNOWN_RELATION
//! - APIQUERY_DATA_LOAD_FAILED
//! - APIQUERY_EXECUTION_FAILED

use thiserror::Error;

use crate::query::QueryError;

/// Result type for executor operations
pub type ExecutorResult<T> = Result<T, ExecutorError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutorError {
    #[error("Entity '{0}' not found")]
    UnknownEntity(String),

    #[error("Relation '{relation}' is not defined on '{entity}'")]
    UnknownRelation { entity: String, relation: String },

    /// Seed data could not be read or did not match the schema
    #[error("Failed to load data from {path}: {message}")]
    DataLoad { path: String, message: String },

    /// Anything else. The message is for logs, never for clients.
    #[error("Execution failed: {0}")]
    Internal(String),
}

impl ExecutorError {
    pub fn internal(message: impl Into<String>) -> Self {
        ExecutorError::Internal(message.into())
    }

    pub fn data_load(path: impl Into<String>, message: impl Into<String>) -> Self {
        ExecutorError::DataLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ExecutorError::UnknownEntity(_) => "APIQUERY_UNKNOWN_ENTITY",
            ExecutorError::UnknownRelation { .. } => "APIQUERY_UNKNOWN_RELATION",
            ExecutorError::DataLoad { .. } => "APIQUERY_DATA_LOAD_FAILED",
            ExecutorError::Internal(_) => "APIQUERY_EXECUTION_FAILED",
        }
    }
}

impl From<ExecutorError> for QueryError {
    fn from(err: ExecutorError) -> Self {
        match err {
            ExecutorError::UnknownEntity(entity) => QueryError::UnknownEntity(entity),
            ExecutorError::UnknownRelation { entity, relation } => {
                QueryError::UnknownRelation { entity, relation }
            }
            other => QueryError::ExecutionFailure(other.to_string()),
        }
    }
}

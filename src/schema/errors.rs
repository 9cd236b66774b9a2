//! Schema catalog errors
//!
//! All schema errors surface at startup: a malformed catalog stops boot.

use thiserror::Error;

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Schema catalog errors
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Catalog file could not be read
    #[error("Failed to read schema catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Catalog file is not valid JSON or has the wrong shape
    #[error("Malformed schema catalog {path}: {message}")]
    Malformed { path: String, message: String },

    /// Same entity declared twice
    #[error("Entity '{0}' is declared more than once")]
    DuplicateEntity(String),

    /// Relation points at an entity the catalog does not declare
    #[error("Relation '{relation}' on '{entity}' targets unknown entity '{target}'")]
    DanglingRelation {
        entity: String,
        relation: String,
        target: String,
    },
}

impl SchemaError {
    pub fn malformed(path: impl Into<String>, message: impl Into<String>) -> Self {
        SchemaError::Malformed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Error code used in structured logs
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::Io { .. } => "APIQUERY_SCHEMA_IO",
            SchemaError::Malformed { .. } => "APIQUERY_SCHEMA_MALFORMED",
            SchemaError::DuplicateEntity(_) => "APIQUERY_SCHEMA_DUPLICATE_ENTITY",
            SchemaError::DanglingRelation { .. } => "APIQUERY_SCHEMA_DANGLING_RELATION",
        }
    }
}

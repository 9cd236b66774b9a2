//! CLI-specific error types
//!
//! Every CLI error ends the process with a non-zero status.

use std::fmt;
use std::io;

use crate::executor::ExecutorError;
use crate::query::QueryError;
use crate::schema::SchemaError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file missing, malformed or invalid
    ConfigError,
    /// stdin/stdout failure or malformed request
    IoError,
    /// Schema catalog could not be loaded
    SchemaError,
    /// Seed data could not be loaded
    DataError,
    /// The request was rejected by the translator
    QueryRejected,
    /// Server could not start
    BootFailed,
}

impl CliErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "APIQUERY_CLI_CONFIG_ERROR",
            Self::IoError => "APIQUERY_CLI_IO_ERROR",
            Self::SchemaError => "APIQUERY_CLI_SCHEMA_ERROR",
            Self::DataError => "APIQUERY_CLI_DATA_ERROR",
            Self::QueryRejected => "APIQUERY_CLI_QUERY_REJECTED",
            Self::BootFailed => "APIQUERY_CLI_BOOT_FAILED",
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn boot_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::BootFailed, msg)
    }

    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<SchemaError> for CliError {
    fn from(e: SchemaError) -> Self {
        Self::new(CliErrorCode::SchemaError, format!("[{}] {}", e.code(), e))
    }
}

impl From<ExecutorError> for CliError {
    fn from(e: ExecutorError) -> Self {
        Self::new(CliErrorCode::DataError, format!("[{}] {}", e.code(), e))
    }
}

impl From<QueryError> for CliError {
    fn from(e: QueryError) -> Self {
        Self::new(CliErrorCode::QueryRejected, e.to_string())
    }
}

pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_code() {
        let err = CliError::config_error("schema_path is required");
        assert_eq!(
            err.to_string(),
            "APIQUERY_CLI_CONFIG_ERROR: schema_path is required"
        );
    }

    #[test]
    fn test_query_error_conversion() {
        let err: CliError = QueryError::invalid("page", "must be an integer").into();
        assert_eq!(err.code(), &CliErrorCode::QueryRejected);
        assert!(err.message().contains("page"));
    }
}

//! Configuration file
//!
//! ```json
//! {
//!   "server": { "port": 8080 },
//!   "schema_path": "schema.json",
//!   "data_path": "seed.json",
//!   "translator": { "max_per_page": 100 },
//!   "log_level": "info"
//! }
//! ```
//!
//! Relative paths are resolved against the directory holding the file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::http_server::HttpServerConfig;
use crate::observability::Severity;
use crate::query::TranslatorConfig;

use super::errors::{CliError, CliResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: HttpServerConfig,

    /// Schema catalog file (required)
    pub schema_path: PathBuf,

    /// Seed rows for the in-memory store. Absent means empty tables.
    #[serde(default)]
    pub data_path: Option<PathBuf>,

    #[serde(default)]
    pub translator: TranslatorConfig,

    /// Lowest severity written by the logger (default: "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let mut config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        config.validate()?;

        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        if self.schema_path.is_relative() {
            self.schema_path = base.join(&self.schema_path);
        }
        if let Some(data_path) = &self.data_path {
            if data_path.is_relative() {
                self.data_path = Some(base.join(data_path));
            }
        }
    }

    pub fn validate(&self) -> CliResult<()> {
        if self.schema_path.as_os_str().is_empty() {
            return Err(CliError::config_error("schema_path must not be empty"));
        }
        self.server.validate().map_err(CliError::config_error)?;
        self.translator
            .validate()
            .map_err(|e| CliError::config_error(format!("translator: {}", e)))?;
        self.severity()?;
        Ok(())
    }

    pub fn severity(&self) -> CliResult<Severity> {
        Severity::parse(&self.log_level).ok_or_else(|| {
            CliError::config_error(format!(
                "Invalid log_level: '{}'. Expected trace, info, warn, error or fatal.",
                self.log_level
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("apiquery.json");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_defaults_and_relative_paths() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, r#"{"schema_path": "schema.json"}"#);

        let config = Config::load(&path).unwrap();
        assert_eq!(config.schema_path, dir.path().join("schema.json"));
        assert_eq!(config.data_path, None);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.translator.default_per_page, 15);
        assert_eq!(config.severity().unwrap(), Severity::Info);
    }

    #[test]
    fn test_missing_schema_path() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, r#"{"server": {"port": 9000}}"#);
        let err = Config::load(&path).unwrap_err();
        assert_eq!(err.code_str(), "APIQUERY_CLI_CONFIG_ERROR");
    }

    #[test]
    fn test_invalid_translator_section() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"{"schema_path": "s.json", "translator": {"max_per_page": 0}}"#,
        );
        let err = Config::load(&path).unwrap_err();
        assert!(err.message().contains("translator"));
    }

    #[test]
    fn test_invalid_log_level() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, r#"{"schema_path": "s.json", "log_level": "loud"}"#);
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load(Path::new("/nonexistent/apiquery.json")).unwrap_err();
        assert!(err.message().contains("Failed to read config"));
    }
}

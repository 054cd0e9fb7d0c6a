//! Engine configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::{Database, DbResult};

/// Default gather timeout for one fetch cycle.
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 10_000;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for the store and the fetch coordinator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// SQLite file; in-memory when absent
    pub database_path: Option<PathBuf>,
    /// Upper bound on one gather of the four reads
    pub fetch_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
        }
    }
}

impl EngineConfig {
    /// Parse a JSON config; missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON config file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch_timeout_ms == 0 {
            return Err(ConfigError::Invalid("fetch_timeout_ms must be positive".into()));
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Open the configured database.
    pub fn open_database(&self) -> DbResult<Database> {
        match &self.database_path {
            Some(path) => Database::open(path),
            None => Database::open_in_memory(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_empty_object() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.fetch_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_partial_override() {
        let config = EngineConfig::from_json_str(r#"{"fetch_timeout_ms": 250}"#).unwrap();
        assert_eq!(config.fetch_timeout_ms, 250);
        assert!(config.database_path.is_none());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = EngineConfig::from_json_str(r#"{"fetch_timeout_ms": 0}"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_from_file_opens_database() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("pills.db");
        let config_path = dir.path().join("engine.json");
        std::fs::write(
            &config_path,
            serde_json::json!({ "database_path": db_path }).to_string(),
        )
        .unwrap();

        let config = EngineConfig::from_file(&config_path).unwrap();
        assert_eq!(config.database_path.as_deref(), Some(db_path.as_path()));
        config.open_database().unwrap();
        assert!(db_path.exists());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = EngineConfig::from_file("/nonexistent/engine.json");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}

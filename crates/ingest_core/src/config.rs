//! Pipeline configuration.
//!
//! # Responsibility
//! - Declare tunables for one pipeline instance with safe defaults.
//! - Parse JSON configuration and validate it before use.
//!
//! # Invariants
//! - A config returned by `from_json_str` has passed `validate()`.
//! - Unknown keys are rejected instead of ignored.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Default software agent recorded on provenance events.
pub const DEFAULT_AGENT_NAME: &str = "ingest_core";
const DEFAULT_MAX_RENAME_ATTEMPTS: u32 = 10_000;
const MAX_SCAN_WORKERS: usize = 64;

/// How path conflicts are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictMode {
    /// Reject the submission on any conflict.
    Strict,
    /// Rename conflicting top-level slugs.
    Lenient,
}

/// Configuration for one pipeline instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub conflict_mode: ConflictMode,
    /// Virus scan worker threads; `1` scans sequentially.
    pub scan_workers: usize,
    /// Upper bound on slug increments per top-level object.
    pub max_rename_attempts: u32,
    /// Software agent recorded on every event.
    pub agent_name: String,
    /// Whether the fixity filter runs.
    pub verify_fixity: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            conflict_mode: ConflictMode::Lenient,
            scan_workers: 1,
            max_rename_attempts: DEFAULT_MAX_RENAME_ATTEMPTS,
            agent_name: DEFAULT_AGENT_NAME.to_string(),
            verify_fixity: true,
        }
    }
}

impl PipelineConfig {
    /// Parses and validates a JSON document. Missing keys take defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan_workers == 0 || self.scan_workers > MAX_SCAN_WORKERS {
            return Err(ConfigError::InvalidScanWorkers(self.scan_workers));
        }
        if self.max_rename_attempts == 0 {
            return Err(ConfigError::InvalidRenameAttempts);
        }
        if self.agent_name.trim().is_empty() {
            return Err(ConfigError::EmptyAgentName);
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Parse(String),
    InvalidScanWorkers(usize),
    InvalidRenameAttempts,
    EmptyAgentName,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(message) => write!(f, "invalid pipeline config: {message}"),
            Self::InvalidScanWorkers(value) => write!(
                f,
                "scan_workers must be between 1 and {MAX_SCAN_WORKERS}, got {value}"
            ),
            Self::InvalidRenameAttempts => write!(f, "max_rename_attempts must be at least 1"),
            Self::EmptyAgentName => write!(f, "agent_name must not be blank"),
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::{ConfigError, ConflictMode, PipelineConfig};

    #[test]
    fn empty_document_yields_defaults() {
        let config = PipelineConfig::from_json_str("{}").expect("defaults should validate");
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.conflict_mode, ConflictMode::Lenient);
    }

    #[test]
    fn parses_strict_mode_and_workers() {
        let config =
            PipelineConfig::from_json_str(r#"{"conflict_mode":"strict","scan_workers":4}"#)
                .expect("valid config");
        assert_eq!(config.conflict_mode, ConflictMode::Strict);
        assert_eq!(config.scan_workers, 4);
        assert!(config.verify_fixity);
    }

    #[test]
    fn rejects_zero_workers() {
        let err = PipelineConfig::from_json_str(r#"{"scan_workers":0}"#).unwrap_err();
        assert_eq!(err, ConfigError::InvalidScanWorkers(0));
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = PipelineConfig::from_json_str(r#"{"scan_threads":2}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_blank_agent_name() {
        let config = PipelineConfig {
            agent_name: "  ".to_string(),
            ..PipelineConfig::default()
        };
        assert_eq!(config.validate().unwrap_err(), ConfigError::EmptyAgentName);
    }
}

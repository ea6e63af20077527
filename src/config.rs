//! Server configuration
//!
//! Loaded from an optional TOML file. Every field has a default, so a missing
//! file or a partial file is fine.
//!
//! ```toml
//! retry_count = 2
//! retry_backoff_ms = 250
//! time_zone = "America/Chicago"
//! log_level = "info"
//! default_person_id = "household"
//!
//! [diagnostics]
//! max_entries_per_session = 64
//! max_sessions = 256
//!
//! [model]
//! command = "/opt/llm/bin/extract"
//! args = ["--json"]
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::capture::{
    CommandModel, InMemoryDiagnosticsStore, ModelCollaborator, PipelineSettings, UnavailableModel,
};

/// Upper bound for `retry_count`
pub const MAX_RETRY_COUNT: i32 = 10;
/// Lower bound for `diagnostics.max_entries_per_session`
pub const MIN_ENTRIES_PER_SESSION: usize = 8;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Extra model attempts after the first one
    pub retry_count: i32,
    /// Pause between model attempts
    pub retry_backoff_ms: u64,
    /// IANA time zone of the household
    pub time_zone: String,
    /// Default tracing filter when `CAPTURE_MCP_LOG` is not set
    pub log_level: String,
    /// Person captures are attributed to when the caller does not say
    pub default_person_id: String,
    pub diagnostics: DiagnosticsConfig,
    pub model: ModelConfig,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            retry_count: 2,
            retry_backoff_ms: 0,
            time_zone: "UTC".to_string(),
            log_level: "info".to_string(),
            default_person_id: "household".to_string(),
            diagnostics: DiagnosticsConfig::default(),
            model: ModelConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub max_entries_per_session: usize,
    pub max_sessions: usize,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            max_entries_per_session: InMemoryDiagnosticsStore::DEFAULT_MAX_ENTRIES_PER_SESSION,
            max_sessions: InMemoryDiagnosticsStore::DEFAULT_MAX_SESSIONS,
        }
    }
}

/// Local model runtime; leave `command` unset when no model is installed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub command: Option<String>,
    pub args: Vec<String>,
}

impl CaptureConfig {
    /// Load from `path`, or return defaults when no path is given or the
    /// file does not exist
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: CaptureConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry_count > MAX_RETRY_COUNT {
            return Err(ConfigError::Invalid {
                message: format!(
                    "retry_count is {} but may be at most {}",
                    self.retry_count, MAX_RETRY_COUNT
                ),
            });
        }
        if self.diagnostics.max_entries_per_session < MIN_ENTRIES_PER_SESSION {
            return Err(ConfigError::Invalid {
                message: format!(
                    "diagnostics.max_entries_per_session is {} but must be at least {}",
                    self.diagnostics.max_entries_per_session, MIN_ENTRIES_PER_SESSION
                ),
            });
        }
        if self.diagnostics.max_sessions == 0 {
            return Err(ConfigError::Invalid {
                message: "diagnostics.max_sessions must be at least 1".to_string(),
            });
        }
        if self.time_zone.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "time_zone must not be empty".to_string(),
            });
        }
        if matches!(&self.model.command, Some(command) if command.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                message: "model.command must not be empty when set".to_string(),
            });
        }
        Ok(())
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            retry_count: self.retry_count,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    pub fn diagnostics_store(&self) -> InMemoryDiagnosticsStore {
        InMemoryDiagnosticsStore::new(
            self.diagnostics.max_entries_per_session,
            self.diagnostics.max_sessions,
        )
    }

    /// The model collaborator this configuration describes
    pub fn model_collaborator(&self) -> Arc<dyn ModelCollaborator> {
        match &self.model.command {
            Some(command) => Arc::new(CommandModel::new(command, self.model.args.clone())),
            None => Arc::new(UnavailableModel),
        }
    }
}

//! Server configuration.
//!
//! A config file (YAML or JSON) supplies defaults; command-line flags override
//! them field by field in `main`.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// API description document (JSON or YAML)
    pub definition: Option<PathBuf>,
    pub host: String,
    pub port: u16,
    /// Status allowlist replacing every route's declared status keys
    pub statuses: Option<Vec<String>>,
    /// Serve literal examples unless a request says otherwise
    #[serde(alias = "forceExample")]
    pub force_example: bool,
    /// File mapping custom string formats to sample values
    pub formats: Option<PathBuf>,
    /// Base directory for file `$ref`s; defaults to the description's directory
    pub directory: Option<PathBuf>,
    /// Suppress the activity log
    pub silent: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            definition: None,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            statuses: None,
            force_example: false,
            formats: None,
            directory: None,
            silent: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("No API description given; pass a definition file")]
    MissingDefinition,
    #[error("Host must not be empty")]
    EmptyHost,
    #[error("Status allowlist must not contain empty entries")]
    EmptyStatus,
}

impl ServerConfig {
    /// Load configuration from a YAML (or JSON) file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: ServerConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.definition.is_none() {
            return Err(ConfigError::MissingDefinition);
        }
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if let Some(ref statuses) = self.statuses {
            if statuses.iter().any(|s| s.trim().is_empty()) {
                return Err(ConfigError::EmptyStatus);
            }
        }
        Ok(())
    }

    /// Directory used to resolve file references.
    pub fn reference_directory(&self) -> Option<PathBuf> {
        self.directory.clone().or_else(|| {
            self.definition
                .as_deref()
                .and_then(Path::parent)
                .map(Path::to_path_buf)
        })
    }
}

/// Split a comma separated allowlist, dropping blanks.
pub fn parse_statuses(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

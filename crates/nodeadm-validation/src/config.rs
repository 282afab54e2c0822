//! Runner settings loaded from JSON.

use std::path::Path;

use nodeadm_core::{ConfigError, ConfigResult, RetryConfig};
use serde::{Deserialize, Serialize};

/// Which validations to skip and how network checks retry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Validation names dropped at registration.
    pub skip_validations: Vec<String>,
    pub retry: RetryConfig,
}

impl RunnerConfig {
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &Path) -> ConfigResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }
}

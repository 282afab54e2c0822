//! Serde-backed retry settings.
//!
//! Durations are expressed in milliseconds so documents stay plain JSON.
//! A zero timeout disables that bound; zero steps means unlimited attempts.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::retry::network::{
    NETWORK_REQUEST_BACKOFF, NETWORK_REQUEST_FACTOR, NETWORK_REQUEST_JITTER,
    NETWORK_REQUEST_TIMEOUT,
};
use crate::retry::Backoff;

/// Backoff section of a [`RetryConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub duration_ms: u64,
    pub factor: f64,
    pub jitter: f64,
    pub steps: usize,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            duration_ms: NETWORK_REQUEST_BACKOFF.as_millis() as u64,
            factor: NETWORK_REQUEST_FACTOR,
            jitter: NETWORK_REQUEST_JITTER,
            steps: 0,
        }
    }
}

impl BackoffConfig {
    pub fn to_backoff(&self) -> Backoff {
        Backoff {
            duration: Duration::from_millis(self.duration_ms),
            factor: self.factor,
            jitter: self.jitter,
            steps: self.steps,
        }
    }
}

/// Retry policy as read from configuration. Defaults match the network preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub timeout_ms: u64,
    pub operation_timeout_ms: u64,
    pub backoff: BackoffConfig,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            timeout_ms: NETWORK_REQUEST_TIMEOUT.as_millis() as u64,
            operation_timeout_ms: 0,
            backoff: BackoffConfig::default(),
        }
    }
}

impl RetryConfig {
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

//! Runner configuration, read from a TOML file.
//!
//! ```toml
//! test_timeout = 5000
//! hook_timeout = 10000
//!
//! [sequence]
//! shuffle = true
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_TEST_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_HOOK_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Default bound for a test body, in milliseconds. `0` disables the bound.
    pub test_timeout: u64,
    /// Default bound for hooks, in milliseconds.
    pub hook_timeout: u64,
    pub sequence: SequenceConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    /// Shuffle the file-level suite (and everything that inherits from it).
    pub shuffle: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            test_timeout: DEFAULT_TEST_TIMEOUT_MS,
            hook_timeout: DEFAULT_HOOK_TIMEOUT_MS,
            sequence: SequenceConfig::default(),
        }
    }
}

impl RunnerConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded runner config from {}", path.display());
        Self::from_toml_str(&source)
    }

    pub fn test_timeout(&self) -> Duration {
        Duration::from_millis(self.test_timeout)
    }

    pub fn hook_timeout(&self) -> Duration {
        Duration::from_millis(self.hook_timeout)
    }
}

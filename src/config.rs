use crate::compiler::{DEFAULT_DATA_API_VERSION, DEFAULT_FLOW_VERSION};
use crate::error::ConfigError;
use crate::normalizer::FALLBACK_FLOW_NAME;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Settings for the editor and compiler, usually read from a TOML file.
///
/// ```toml
/// autosave_debounce_ms = 1200
/// flow_version = "7.2"
/// retry_failed_saves = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Quiet period after the last edit before an autosave starts.
    pub autosave_debounce_ms: u64,
    /// Vendor Flow JSON `version` field.
    pub flow_version: String,
    /// Emitted as `data_api_version` when a screen uses data exchange.
    pub data_api_version: String,
    /// Flow name used when a session does not provide one.
    pub default_flow_name: String,
    /// Reschedule a failed save on its own instead of waiting for the next edit.
    pub retry_failed_saves: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            autosave_debounce_ms: 800,
            flow_version: DEFAULT_FLOW_VERSION.to_string(),
            data_api_version: DEFAULT_DATA_API_VERSION.to_string(),
            default_flow_name: FALLBACK_FLOW_NAME.to_string(),
            retry_failed_saves: false,
        }
    }
}

impl EditorConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }
}

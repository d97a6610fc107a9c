//! Coordinator configuration.
//!
//! Loaded from TOML. Every field has a default, so a partial or missing
//! file still yields a usable configuration.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ScanResult;

/// What the coordinator does to the scanner after a code is recognized.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanReaction {
    /// Pause and wait for an explicit resume.
    #[default]
    Pause,
    /// Stop scanning altogether.
    Stop,
    /// Keep scanning.
    Continue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    #[serde(default = "default_start_recheck_ms")]
    pub start_recheck_ms: u64,
    #[serde(default = "default_stop_recheck_ms")]
    pub stop_recheck_ms: u64,
    #[serde(default = "default_max_reissues")]
    pub max_reissues: u32,
    #[serde(default)]
    pub scan_reaction: ScanReaction,
    #[serde(default = "default_continuous_mode")]
    pub continuous_mode: bool,
    #[serde(default = "default_search_bar_placeholder")]
    pub search_bar_placeholder: String,
    #[serde(default = "default_feedback_button_size")]
    pub feedback_button_size: f64,
}

fn default_start_recheck_ms() -> u64 {
    1000
}

fn default_stop_recheck_ms() -> u64 {
    500
}

fn default_max_reissues() -> u32 {
    5
}

fn default_continuous_mode() -> bool {
    true
}

fn default_search_bar_placeholder() -> String {
    "Manual barcode entry".to_string()
}

fn default_feedback_button_size() -> f64 {
    40.0
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        CoordinatorConfig {
            start_recheck_ms: default_start_recheck_ms(),
            stop_recheck_ms: default_stop_recheck_ms(),
            max_reissues: default_max_reissues(),
            scan_reaction: ScanReaction::default(),
            continuous_mode: default_continuous_mode(),
            search_bar_placeholder: default_search_bar_placeholder(),
            feedback_button_size: default_feedback_button_size(),
        }
    }
}

impl CoordinatorConfig {
    pub fn from_toml_str(contents: &str) -> ScanResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn to_toml_string(&self) -> ScanResult<String> {
        Ok(toml::to_string(self)?)
    }

    /// Delay before checking that a start request took effect.
    pub fn start_recheck(&self) -> Duration {
        Duration::from_millis(self.start_recheck_ms)
    }

    /// Delay before checking that a stop request took effect.
    pub fn stop_recheck(&self) -> Duration {
        Duration::from_millis(self.stop_recheck_ms)
    }
}

/// Read a config file, failing on IO or parse errors.
pub fn read_config(path: &Path) -> ScanResult<CoordinatorConfig> {
    let data = fs::read_to_string(path)?;
    CoordinatorConfig::from_toml_str(&data)
}

/// Load a config file, falling back to defaults when it is missing or invalid.
pub fn load_config(path: &Path) -> CoordinatorConfig {
    match read_config(path) {
        Ok(config) => {
            info!(path = %path.display(), "Loaded coordinator config");
            config
        }
        Err(err) => {
            warn!(path = %path.display(), "Falling back to default coordinator config: {err}");
            CoordinatorConfig::default()
        }
    }
}

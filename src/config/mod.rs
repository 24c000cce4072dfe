//! Typed configuration, loaded from a JSON file with defaults for any
//! missing key and silent ignoring of unrecognized ones.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::protocol::serial::SerialConfig;

pub const DEFAULT_CONFIG_PATH: &str = "modbus_server_config.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub max_slaves: usize,
    pub log_level: String,
    pub log_file: String,
    pub stats_interval: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            max_slaves: 10,
            log_level: "INFO".to_string(),
            log_file: "modbus_server.log".to_string(),
            stats_interval: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceSection {
    pub memory_check_interval: u64,
    pub cpu_check_interval: u64,
}

impl Default for PerformanceSection {
    fn default() -> Self {
        Self {
            memory_check_interval: 30,
            cpu_check_interval: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub serial: SerialConfig,
    pub server: ServerSection,
    pub performance: PerformanceSection,
}

impl Config {
    /// Load configuration from `path`, creating it with defaults if it
    /// doesn't exist yet. Missing keys in an existing file fall back to
    /// their defaults; unrecognized keys are ignored.
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            let config = Config::default();
            config.save(path)?;
            log::info!("wrote default configuration to {}", path.display());
            return Ok(config);
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration at {}", path.display()))?;
        let config = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse configuration at {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write configuration to {}", path.display()))
    }
}

//! TOML file configuration.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Optional TOML configuration file. Every field is optional; values present
/// here override CLI arguments during resolution.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub catalog: Option<String>,
    pub database: Option<String>,
    pub workgroup: Option<String>,
    pub output_location: Option<String>,
    pub auth_header: Option<String>,
    pub max_results: Option<usize>,
    pub max_wait_seconds: Option<u64>,
    pub request_timeout_sec: Option<u64>,
    pub polling: Option<PollingConfig>,
}

/// `[polling]` section: status-poll backoff and transient-retry tuning.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollingConfig {
    pub initial_interval_ms: Option<u64>,
    pub max_interval_ms: Option<u64>,
    pub multiplier: Option<f64>,
    pub jitter_fraction: Option<f64>,
    pub transient_retries: Option<u32>,
    pub transient_backoff_ms: Option<u64>,
}

impl FileConfig {
    /// Load and parse a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

//! TOML configuration for the worker binary.

use std::path::PathBuf;

use outreach_delivery::WorkerConfig;
use outreach_queue::{JobStoreConfig, QueueConfig};
use serde::Deserialize;

/// Full binary configuration. Every section is optional; an absent
/// section takes its defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub queue: QueueConfig,
    pub store: JobStoreConfig,
    pub worker: WorkerConfig,
}

impl Config {
    /// Load configuration using the following precedence:
    /// 1. `OUTREACH_CONFIG` environment variable
    /// 2. ./outreach.toml (current working directory)
    /// 3. /etc/outreach/outreach.toml (system-wide config)
    ///
    /// With no file present the defaults apply.
    ///
    /// # Errors
    /// If `OUTREACH_CONFIG` points at a missing file, or a found file
    /// cannot be read or parsed.
    pub fn load() -> anyhow::Result<Self> {
        let Some(path) = find_config_file()? else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Failed to read config from {}: {e}", path.display()))?;

        toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config {}: {e}", path.display()))
    }
}

fn find_config_file() -> anyhow::Result<Option<PathBuf>> {
    if let Ok(env_path) = std::env::var("OUTREACH_CONFIG") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(Some(path));
        }
        anyhow::bail!(
            "OUTREACH_CONFIG points to non-existent file: {}",
            path.display()
        );
    }

    Ok([
        PathBuf::from("./outreach.toml"),
        PathBuf::from("/etc/outreach/outreach.toml"),
    ]
    .into_iter()
    .find(|path| path.exists()))
}

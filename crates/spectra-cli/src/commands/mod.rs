pub mod calibrate;
pub mod config;
pub mod extract;
pub mod info;
pub mod peak;
pub mod session;

use std::path::Path;

use anyhow::{Context, Result};
use spectra_core::config::SessionConfig;

/// Read a TOML session config, or fall back to defaults.
pub fn load_config(path: Option<&Path>) -> Result<SessionConfig> {
    let Some(path) = path else {
        return Ok(SessionConfig::default());
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: SessionConfig = toml::from_str(&contents).context("Invalid session config")?;
    config
        .validate()
        .with_context(|| format!("Invalid session config {}", path.display()))?;
    Ok(config)
}

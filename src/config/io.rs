//! Configuration I/O - Loading and saving configuration
//!
//! Handles reading configuration from files and environment variables.

use std::path::Path;
use std::time::Duration;

use super::types::Config;
use crate::error::{Error, Result};

/// Load configuration with layered precedence:
/// 1. Config file if it exists, otherwise defaults
/// 2. Environment variable overrides (includes .env)
pub fn load_config() -> Result<Config> {
    load_config_with(&super::paths::config_path())
}

/// Load configuration from an explicit file path, then apply env overrides.
/// A missing file falls back to defaults.
pub fn load_config_with(config_path: &Path) -> Result<Config> {
    let mut config = if config_path.exists() {
        load_config_from_path(config_path)?
    } else {
        Config::default()
    };

    apply_env_overrides(&mut config);

    Ok(config)
}

/// Load configuration from a specific path
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    let extension = path.extension().and_then(|ext| ext.to_str());
    let config: Config = match extension {
        Some("json") | Some("json5") => json5::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid JSON config: {}", e)))?,
        Some("toml") => toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid TOML config: {}", e)))?,
        _ => json5::from_str(&content)
            .or_else(|_| toml::from_str(&content).map_err(|e| Error::Config(e.to_string())))
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?,
    };

    Ok(config)
}

/// Apply environment variable overrides to an existing config.
///
/// Loads `.env` first, then overlays any set variables. Env vars have the
/// highest precedence: defaults < file < env.
pub fn apply_env_overrides(config: &mut Config) {
    dotenvy::dotenv().ok();
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

/// Overlay values produced by `lookup` onto `config`. Unparseable values are
/// ignored so a typo never prevents startup.
pub fn apply_overrides_from<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(bind) = lookup("RELAY_BIND") {
        config.server.bind = bind;
    }
    if let Some(port) = lookup("RELAY_PORT").and_then(|v| v.parse().ok()) {
        config.server.port = port;
    }
    if let Some(origins) = lookup("RELAY_ALLOWED_ORIGINS") {
        config.server.allowed_origins = origins
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
    }

    if let Some(quota) = lookup("RELAY_RATE_QUOTA").and_then(|v| v.parse().ok()) {
        config.relay.rate_quota = quota;
    }
    if let Some(window) = lookup("RELAY_RATE_WINDOW").and_then(|v| parse_duration(&v)) {
        config.relay.rate_window = window;
    }
    if let Some(grace) = lookup("RELAY_SHUTDOWN_GRACE").and_then(|v| parse_duration(&v)) {
        config.relay.shutdown_grace = grace;
    }

    if let Some(customer_id) = lookup("RELAY_CUSTOMER_ID") {
        config.guard.default_customer_id = customer_id;
    }

    if let Some(level) = lookup("RUST_LOG") {
        config.log.level = level;
    }
    if let Some(format) = lookup("LOG_FORMAT").and_then(|v| v.parse().ok()) {
        config.log.format = format;
    }
}

fn parse_duration(value: &str) -> Option<Duration> {
    humantime::parse_duration(value).ok()
}

/// Save configuration to a file
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    let content = if path.extension().map_or(false, |ext| ext == "toml") {
        toml::to_string_pretty(config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?
    } else {
        serde_json::to_string_pretty(config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(path, content)?;
    Ok(())
}

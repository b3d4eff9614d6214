// Configuration module for mqtt-db-bridge
//
// Provides:
// - YAML configuration file loading
// - Environment variable substitution and overrides
// - Configuration validation
// - Default values

pub mod types;
mod loader;

pub use types::*;
pub use loader::ConfigLoader;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<BridgeConfig> {
    let config = ConfigLoader::load(path).context("Failed to load configuration")?;
    ConfigLoader::validate(&config)?;
    Ok(config)
}

/// Load configuration with environment variable overrides
pub fn load_config_with_env<P: AsRef<Path>>(path: P) -> Result<BridgeConfig> {
    let mut config = ConfigLoader::load(path).context("Failed to load configuration")?;
    apply_env_overrides(&mut config)?;
    ConfigLoader::validate(&config)?;
    Ok(config)
}

/// Allow environment variables to override config values
pub fn apply_env_overrides(config: &mut BridgeConfig) -> Result<()> {
    if let Ok(host) = std::env::var("MQTT_HOST") {
        config.mqtt.host = host;
    }

    if let Ok(port) = std::env::var("MQTT_PORT") {
        config.mqtt.port = port
            .parse()
            .with_context(|| format!("Invalid MQTT_PORT '{}'", port))?;
    }

    if let Ok(host) = std::env::var("MARIADB_HOST") {
        config.storage.mariadb.host = Some(host);
    }

    if let Ok(password) = std::env::var("MARIADB_PASSWORD") {
        config.storage.mariadb.password = Some(password);
    }

    if let Ok(host) = std::env::var("MONGODB_HOST") {
        config.storage.mongodb.host = Some(host);
    }

    if let Ok(password) = std::env::var("MONGODB_PASSWORD") {
        config.storage.mongodb.password = password;
    }

    Ok(())
}

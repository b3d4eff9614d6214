// Configuration loader with environment variable substitution

use super::types::*;
use anyhow::{bail, Context, Result};
use regex::Regex;
use std::path::Path;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["text", "json"];

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file with environment variable substitution.
    ///
    /// The result is not validated yet: CLI and environment overrides are
    /// applied on top before [`ConfigLoader::validate`] runs.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<BridgeConfig> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file {}", path.as_ref().display()))?;

        let content = Self::substitute_env_vars(&content);

        let config: BridgeConfig = serde_yaml::from_str(&content)
            .context("Failed to parse YAML configuration")?;

        Ok(config)
    }

    /// Substitute ${VAR} and ${VAR:-default} patterns with environment variables
    ///
    /// Examples:
    /// - ${MQTT_HOST} -> broker.local
    /// - ${MQTT_HOST:-localhost} -> localhost (if MQTT_HOST not set)
    pub(crate) fn substitute_env_vars(content: &str) -> String {
        let re = match Regex::new(r"\$\{([^}:]+)(?::-([^}]+))?\}") {
            Ok(re) => re,
            Err(_) => return content.to_string(),
        };

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default_value = caps.get(2).map(|m| m.as_str());

            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => match default_value {
                    Some(default) => default.to_string(),
                    // Keep original if no default and var not found
                    None => format!("${{{}}}", var_name),
                },
            }
        })
        .to_string()
    }

    /// Validate configuration
    pub fn validate(config: &BridgeConfig) -> Result<()> {
        let mqtt = &config.mqtt;

        if mqtt.host.trim().is_empty() {
            bail!("mqtt.host cannot be empty");
        }
        if mqtt.port == 0 {
            bail!("mqtt.port must be > 0");
        }
        if mqtt.topics.is_empty() {
            bail!("At least one mqtt topic is required (use '-t' or mqtt.topics)");
        }
        if mqtt.topics.iter().any(|t| t.is_empty()) {
            bail!("mqtt.topics cannot contain an empty topic filter");
        }
        if mqtt.channel_capacity == 0 {
            bail!("mqtt.channel_capacity must be > 0");
        }
        if mqtt.max_packet_size == 0 || mqtt.max_packet_size > MQTT_MAX_PACKET_SIZE {
            bail!(
                "mqtt.max_packet_size must be between 1 and {}",
                MQTT_MAX_PACKET_SIZE
            );
        }
        if mqtt.reconnect.min_delay_ms == 0 {
            bail!("mqtt.reconnect.min_delay_ms must be > 0");
        }
        if mqtt.reconnect.min_delay() > mqtt.reconnect.max_delay() {
            bail!("mqtt.reconnect.min_delay_ms must not exceed max_delay_seconds");
        }

        for backend in config.storage.enabled_backends() {
            match backend {
                BackendConfig::MariaDb(mariadb) => {
                    if mariadb.port == 0 {
                        bail!("storage.mariadb.port must be > 0");
                    }
                    if !Self::is_sql_identifier(&mariadb.table) {
                        bail!(
                            "storage.mariadb.table '{}' is not a valid table name",
                            mariadb.table
                        );
                    }
                }
                BackendConfig::MongoDb(mongodb) => {
                    if mongodb.port == 0 {
                        bail!("storage.mongodb.port must be > 0");
                    }
                    if mongodb.database.is_empty() {
                        bail!("storage.mongodb.database cannot be empty");
                    }
                    if mongodb.collection.is_empty() {
                        bail!("storage.mongodb.collection cannot be empty");
                    }
                }
            }
        }

        let level = config.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            bail!(
                "Unknown log level: '{}'. Supported: {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            );
        }
        if !LOG_FORMATS.contains(&config.logging.format.as_str()) {
            bail!(
                "Unknown log format: '{}'. Supported: {}",
                config.logging.format,
                LOG_FORMATS.join(", ")
            );
        }

        Ok(())
    }

    /// The table name is the only text placed into the insert statement
    fn is_sql_identifier(name: &str) -> bool {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")
            .map(|re| re.is_match(name))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> BridgeConfig {
        let mut config = BridgeConfig::default();
        config.mqtt.topics.push("sensors/#".to_string());
        config
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("MQTT_DB_BRIDGE_TEST_VAR", "broker.local");

        let input = "host: ${MQTT_DB_BRIDGE_TEST_VAR}";
        let output = ConfigLoader::substitute_env_vars(input);
        assert_eq!(output, "host: broker.local");

        std::env::remove_var("MQTT_DB_BRIDGE_TEST_VAR");
    }

    #[test]
    fn test_env_var_with_default() {
        std::env::remove_var("MQTT_DB_BRIDGE_TEST_VAR2");

        let input = "database: ${MQTT_DB_BRIDGE_TEST_VAR2:-archive}";
        let output = ConfigLoader::substitute_env_vars(input);
        assert_eq!(output, "database: archive");
    }

    #[test]
    fn test_unknown_var_kept_verbatim() {
        std::env::remove_var("MQTT_DB_BRIDGE_TEST_VAR3");

        let input = "password: ${MQTT_DB_BRIDGE_TEST_VAR3}";
        let output = ConfigLoader::substitute_env_vars(input);
        assert_eq!(output, input);
    }

    #[test]
    fn test_validation_default_with_topic() {
        assert!(ConfigLoader::validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_validation_requires_topic() {
        let config = BridgeConfig::default();

        let result = ConfigLoader::validate(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("topic"));
    }

    #[test]
    fn test_validation_rejects_table_injection() {
        let mut config = valid_config();
        config.storage.mariadb.host = Some("localhost".to_string());
        config.storage.mariadb.table = "messages; DROP TABLE messages".to_string();

        let result = ConfigLoader::validate(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("table"));
    }

    #[test]
    fn test_validation_ignores_disabled_backend() {
        let mut config = valid_config();
        config.storage.mongodb.collection = String::new();
        assert!(ConfigLoader::validate(&config).is_ok());

        config.storage.mongodb.host = Some("localhost".to_string());
        assert!(ConfigLoader::validate(&config).is_err());
    }

    #[test]
    fn test_validation_reconnect_bounds() {
        let mut config = valid_config();
        config.mqtt.reconnect.min_delay_ms = 60_000;
        config.mqtt.reconnect.max_delay_seconds = 30;

        let result = ConfigLoader::validate(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("reconnect"));
    }

    #[test]
    fn test_validation_packet_size_bounds() {
        let mut config = valid_config();
        config.mqtt.max_packet_size = MQTT_MAX_PACKET_SIZE + 1;
        let result = ConfigLoader::validate(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("max_packet_size"));

        config.mqtt.max_packet_size = MQTT_MAX_PACKET_SIZE;
        assert!(ConfigLoader::validate(&config).is_ok());
    }

    #[test]
    fn test_validation_invalid_log_level() {
        let mut config = valid_config();
        config.logging.level = "verbose".to_string();

        let result = ConfigLoader::validate(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("log level"));
    }
}

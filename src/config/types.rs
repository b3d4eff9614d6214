// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Configuration types for mqtt-db-bridge

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest packet the MQTT protocol can encode (remaining length of 256 MB - 1)
pub const MQTT_MAX_PACKET_SIZE: usize = 268_435_455;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// MQTT broker connection and subscription settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MqttConfig {
    #[serde(default = "default_mqtt_host")]
    pub host: String,

    #[serde(default = "default_mqtt_port")]
    pub port: u16,

    /// Keepalive interval in seconds (0 disables keepalive)
    #[serde(default = "default_keepalive")]
    pub keepalive_seconds: u64,

    /// Topic filters to subscribe to, passed to the broker verbatim ('#' for all)
    #[serde(default)]
    pub topics: Vec<String>,

    /// Client identifier; a random one is generated when unset
    #[serde(default)]
    pub client_id: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Largest packet accepted from or sent to the broker, in bytes.
    /// A delivered message above this limit drops the connection and is lost.
    #[serde(default = "default_max_packet_size")]
    pub max_packet_size: usize,

    /// Capacity of the client request queue (subscribe/disconnect)
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: default_mqtt_host(),
            port: default_mqtt_port(),
            keepalive_seconds: default_keepalive(),
            topics: Vec::new(),
            client_id: None,
            username: None,
            password: None,
            max_packet_size: default_max_packet_size(),
            channel_capacity: default_channel_capacity(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl MqttConfig {
    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_seconds)
    }
}

/// Pacing of connection attempts after a failed connect or a dropped connection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,

    #[serde(default = "default_max_delay_seconds")]
    pub max_delay_seconds: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: default_min_delay_ms(),
            max_delay_seconds: default_max_delay_seconds(),
        }
    }
}

impl ReconnectConfig {
    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_secs(self.max_delay_seconds)
    }
}

/// Storage backends; each one is enabled by setting its host
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub mariadb: MariaDbConfig,

    #[serde(default)]
    pub mongodb: MongoDbConfig,
}

/// A single enabled backend, tagged by kind
#[derive(Debug, Clone)]
pub enum BackendConfig {
    MariaDb(MariaDbConfig),
    MongoDb(MongoDbConfig),
}

impl BackendConfig {
    pub fn backend_type(&self) -> &'static str {
        match self {
            BackendConfig::MariaDb(_) => "mariadb",
            BackendConfig::MongoDb(_) => "mongodb",
        }
    }
}

impl StorageConfig {
    /// Backends whose host is configured, in write order (MariaDB, then MongoDB)
    pub fn enabled_backends(&self) -> Vec<BackendConfig> {
        let mut backends = Vec::new();
        if host_is_set(&self.mariadb.host) {
            backends.push(BackendConfig::MariaDb(self.mariadb.clone()));
        }
        if host_is_set(&self.mongodb.host) {
            backends.push(BackendConfig::MongoDb(self.mongodb.clone()));
        }
        backends
    }
}

fn host_is_set(host: &Option<String>) -> bool {
    host.as_deref().is_some_and(|h| !h.trim().is_empty())
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MariaDbConfig {
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default = "default_mariadb_port")]
    pub port: u16,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default = "default_database")]
    pub database: String,

    /// Target table; must be a plain SQL identifier
    #[serde(default = "default_table")]
    pub table: String,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,

    #[serde(default)]
    pub max_retries: u32,
}

impl Default for MariaDbConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: default_mariadb_port(),
            user: None,
            password: None,
            database: default_database(),
            table: default_table(),
            connect_timeout_seconds: default_connect_timeout(),
            max_retries: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MongoDbConfig {
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default = "default_mongodb_port")]
    pub port: u16,

    #[serde(default = "default_mongodb_user")]
    pub user: Option<String>,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default = "default_collection")]
    pub collection: String,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,

    #[serde(default)]
    pub max_retries: u32,
}

impl Default for MongoDbConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: default_mongodb_port(),
            user: default_mongodb_user(),
            password: String::new(),
            database: default_database(),
            collection: default_collection(),
            connect_timeout_seconds: default_connect_timeout(),
            max_retries: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"

    #[serde(default = "default_log_format")]
    pub format: String, // "text", "json"
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_mqtt_host() -> String { "localhost".to_string() }
fn default_mqtt_port() -> u16 { 1883 }
fn default_keepalive() -> u64 { 30 }
fn default_max_packet_size() -> usize { MQTT_MAX_PACKET_SIZE }
fn default_channel_capacity() -> usize { 64 }
fn default_min_delay_ms() -> u64 { 100 }
fn default_max_delay_seconds() -> u64 { 30 }
fn default_mariadb_port() -> u16 { 3306 }
fn default_mongodb_port() -> u16 { 27017 }
fn default_mongodb_user() -> Option<String> { Some("root".to_string()) }
fn default_database() -> String { "mqtt".to_string() }
fn default_table() -> String { "messages".to_string() }
fn default_collection() -> String { "messages".to_string() }
fn default_connect_timeout() -> u64 { 10 }
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "text".to_string() }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_packet_limit_is_protocol_maximum() {
        let config = MqttConfig::default();
        assert_eq!(config.max_packet_size, MQTT_MAX_PACKET_SIZE);
        assert!(config.max_packet_size > 256 * 1024);
    }

    #[test]
    fn test_no_backends_by_default() {
        let config = StorageConfig::default();
        assert!(config.enabled_backends().is_empty());
    }

    #[test]
    fn test_enabled_backends_order() {
        let mut config = StorageConfig::default();
        config.mongodb.host = Some("mongo".to_string());
        config.mariadb.host = Some("maria".to_string());

        let kinds: Vec<_> = config
            .enabled_backends()
            .iter()
            .map(|b| b.backend_type())
            .collect();
        assert_eq!(kinds, vec!["mariadb", "mongodb"]);
    }

    #[test]
    fn test_blank_host_is_disabled() {
        let mut config = StorageConfig::default();
        config.mariadb.host = Some("   ".to_string());
        config.mongodb.host = Some(String::new());
        assert!(config.enabled_backends().is_empty());
    }
}

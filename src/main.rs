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

use anyhow::Result;
use clap::Parser;
use mqtt_db_bridge::config::{apply_env_overrides, BridgeConfig, ConfigLoader};
use mqtt_db_bridge::{BackendSet, Bridge, ConnectionSupervisor};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// MQTT database writer - archive MQTT messages in MariaDB and/or MongoDB
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose mode (debug logging)
    #[arg(short, long)]
    verbose: bool,

    /// The MQTT broker address
    #[arg(long)]
    mqtt_host: Option<String>,

    /// The MQTT broker port
    #[arg(long)]
    mqtt_port: Option<u16>,

    /// The MQTT keepalive interval (in seconds)
    #[arg(long)]
    mqtt_keepalive: Option<u64>,

    /// The topic(s) to subscribe to ('#' for all topics). Can be specified multiple times
    #[arg(short = 't', long = "mqtt-topic", value_name = "TOPIC")]
    mqtt_topics: Vec<String>,

    /// The address to the MariaDB server
    #[arg(long)]
    mariadb_host: Option<String>,

    /// The port of the MariaDB server
    #[arg(long)]
    mariadb_port: Option<u16>,

    /// The database user
    #[arg(long)]
    mariadb_user: Option<String>,

    /// The database password
    #[arg(long)]
    mariadb_password: Option<String>,

    /// The name of the database
    #[arg(long)]
    mariadb_name: Option<String>,

    /// MongoDB server address
    #[arg(long)]
    mongodb_host: Option<String>,

    /// MongoDB server port
    #[arg(long)]
    mongodb_port: Option<u16>,

    /// MongoDB database name
    #[arg(long)]
    mongodb_db: Option<String>,

    /// MongoDB collection
    #[arg(long)]
    mongodb_collection: Option<String>,

    /// MongoDB user
    #[arg(long)]
    mongodb_user: Option<String>,

    /// MongoDB password
    #[arg(long)]
    mongodb_password: Option<String>,
}

impl Args {
    /// Apply CLI overrides on top of file and environment values
    fn apply(self, config: &mut BridgeConfig) {
        if self.verbose {
            config.logging.level = "debug".to_string();
        }

        let mqtt = &mut config.mqtt;
        if let Some(host) = self.mqtt_host {
            mqtt.host = host;
        }
        if let Some(port) = self.mqtt_port {
            mqtt.port = port;
        }
        if let Some(keepalive) = self.mqtt_keepalive {
            mqtt.keepalive_seconds = keepalive;
        }
        mqtt.topics.extend(self.mqtt_topics);

        let mariadb = &mut config.storage.mariadb;
        if self.mariadb_host.is_some() {
            mariadb.host = self.mariadb_host;
        }
        if let Some(port) = self.mariadb_port {
            mariadb.port = port;
        }
        if self.mariadb_user.is_some() {
            mariadb.user = self.mariadb_user;
        }
        if self.mariadb_password.is_some() {
            mariadb.password = self.mariadb_password;
        }
        if let Some(name) = self.mariadb_name {
            mariadb.database = name;
        }

        let mongodb = &mut config.storage.mongodb;
        if self.mongodb_host.is_some() {
            mongodb.host = self.mongodb_host;
        }
        if let Some(port) = self.mongodb_port {
            mongodb.port = port;
        }
        if let Some(db) = self.mongodb_db {
            mongodb.database = db;
        }
        if let Some(collection) = self.mongodb_collection {
            mongodb.collection = collection;
        }
        if self.mongodb_user.is_some() {
            mongodb.user = self.mongodb_user;
        }
        if let Some(password) = self.mongodb_password {
            mongodb.password = password;
        }
    }
}

fn init_tracing(config: &BridgeConfig) -> Result<()> {
    let log_level = match config.logging.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true);

    if config.logging.format == "json" {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Precedence: CLI > environment > file > defaults
    let mut config = match &args.config {
        Some(path) => ConfigLoader::load(path)?,
        None => BridgeConfig::default(),
    };
    apply_env_overrides(&mut config)?;
    let config_path = args.config.clone();
    args.apply(&mut config);
    ConfigLoader::validate(&config)?;

    init_tracing(&config)?;

    info!("Starting MQTT database bridge");
    if let Some(path) = config_path {
        info!("Loaded configuration from: {:?}", path);
    }

    // A backend that cannot connect aborts startup here
    let backends = BackendSet::from_config(&config.storage).await?;
    info!("Active storage backends: {:?}", backends.backend_types());

    let bridge = Bridge::new(backends, config.mqtt.topics.clone());
    let supervisor = ConnectionSupervisor::new(&config.mqtt);

    info!("Running until stopped with ctrl+c...");
    let exit_code = supervisor.run(bridge).await;

    info!("MQTT database bridge shut down with exit code {}", exit_code);
    std::process::exit(exit_code);
}

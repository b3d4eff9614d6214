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

// MariaDB (relational) backend implementation

use super::backend::{StorageBackend, WriteOutcome};
use super::error::StorageError;
use crate::config::MariaDbConfig;
use crate::message::Message;
use async_trait::async_trait;
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Opts, OptsBuilder};
use std::time::Duration;
use tracing::{error, info};

/// Session setup run on every (re)connect; each insert commits on its own
/// whatever the server's global default is.
const SESSION_INIT: &str = "SET autocommit=1";

/// Appends one `(time, topic, payload)` row per message, committed individually
pub struct MariaDbBackend {
    opts: Opts,
    conn: Option<Conn>,
    insert_sql: String,
    connect_timeout: Duration,
    max_retries: u32,
}

impl MariaDbBackend {
    /// Connect to the server; failure here aborts startup
    pub async fn connect(config: MariaDbConfig) -> Result<Self, StorageError> {
        let host = config.host.clone().unwrap_or_default();

        let mut backend = Self {
            opts: connection_opts(&config),
            conn: None,
            insert_sql: insert_statement(&config.table),
            connect_timeout: Duration::from_secs(config.connect_timeout_seconds),
            max_retries: config.max_retries,
        };

        match backend.ensure_connected().await {
            Ok(()) => {
                info!(
                    "Connected to MariaDB server '{}' as '{}'",
                    host,
                    config.user.as_deref().unwrap_or("")
                );
                Ok(backend)
            }
            Err(e) => {
                error!("Failed to connect MariaDB server '{}': {}", host, e);
                Err(e)
            }
        }
    }

    /// Open the connection if there is none (first use, or after a failed write)
    async fn ensure_connected(&mut self) -> Result<(), StorageError> {
        if self.conn.is_some() {
            return Ok(());
        }

        let conn = tokio::time::timeout(self.connect_timeout, Conn::new(self.opts.clone()))
            .await
            .map_err(|_| StorageError::Timeout(self.connect_timeout))??;
        self.conn = Some(conn);
        Ok(())
    }
}

/// Connection options for the configured server, with autocommit forced on
pub fn connection_opts(config: &MariaDbConfig) -> Opts {
    OptsBuilder::default()
        .ip_or_hostname(config.host.clone().unwrap_or_default())
        .tcp_port(config.port)
        .user(config.user.clone())
        .pass(config.password.clone())
        .db_name(Some(config.database.clone()))
        .init(vec![SESSION_INIT])
        .into()
}

/// Parameterised insert; topic and payload are bound, never spliced into the text
pub(crate) fn insert_statement(table: &str) -> String {
    format!(
        "INSERT INTO {} (time, topic, payload) VALUES (NOW(), ?, ?)",
        table
    )
}

#[async_trait]
impl StorageBackend for MariaDbBackend {
    async fn write_record(&mut self, message: &Message) -> Result<WriteOutcome, StorageError> {
        self.ensure_connected().await?;
        let Some(conn) = self.conn.as_mut() else {
            return Err(StorageError::Unavailable("no MariaDB connection".to_string()));
        };

        let params = (message.topic.clone(), message.payload.to_vec());
        match conn.exec_drop(self.insert_sql.as_str(), params).await {
            Ok(()) => Ok(WriteOutcome::Stored {
                id: conn.last_insert_id().map(|id| id.to_string()),
            }),
            Err(e) => {
                // The connection may be broken; reopen it on the next attempt
                self.conn = None;
                Err(e.into())
            }
        }
    }

    fn backend_type(&self) -> &str {
        "MariaDB"
    }

    fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

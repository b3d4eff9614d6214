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

// MongoDB (document) backend implementation

use super::backend::{StorageBackend, WriteOutcome};
use super::error::StorageError;
use crate::config::MongoDbConfig;
use crate::message::Message;
use async_trait::async_trait;
use bson::{doc, Bson};
use chrono::{DateTime, Utc};
use mongodb::options::{ClientOptions, Credential, ServerAddress};
use mongodb::{Client, Collection};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

/// Document layout in the target collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub time: bson::DateTime,
    pub topic: String,
    pub message: Bson,
}

impl StoredDocument {
    /// Decode the payload as JSON and wrap it with topic and write time.
    ///
    /// `Err` carries the reason the payload cannot be stored as a document.
    pub fn from_message(message: &Message, time: DateTime<Utc>) -> Result<Self, String> {
        let value: serde_json::Value = serde_json::from_slice(&message.payload).map_err(|e| {
            format!(
                "failed to parse '{}' as json: {}",
                String::from_utf8_lossy(&message.payload),
                e
            )
        })?;

        let message_bson = bson::to_bson(&value)
            .map_err(|e| format!("json value has no BSON representation: {}", e))?;

        Ok(Self {
            time: bson::DateTime::from_chrono(time),
            topic: message.topic.clone(),
            message: message_bson,
        })
    }
}

/// Inserts one `{time, topic, message}` document per JSON message
pub struct MongoDbBackend {
    collection: Collection<StoredDocument>,
    max_retries: u32,
}

impl MongoDbBackend {
    /// Build the client and ping the server; failure here aborts startup
    pub async fn connect(config: MongoDbConfig) -> Result<Self, StorageError> {
        let host = config.host.clone().unwrap_or_default();
        let timeout = Duration::from_secs(config.connect_timeout_seconds);

        let address = ServerAddress::parse(format!("{}:{}", host, config.port))?;
        let mut options = ClientOptions::builder().hosts(vec![address]).build();
        options.connect_timeout = Some(timeout);
        options.server_selection_timeout = Some(timeout);
        options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
        if let Some(user) = config.user.as_ref().filter(|u| !u.is_empty()) {
            let mut credential = Credential::default();
            credential.username = Some(user.clone());
            credential.password = Some(config.password.clone());
            options.credential = Some(credential);
        }

        let client = Client::with_options(options)?;
        let database = client.database(&config.database);

        if let Err(e) = database.run_command(doc! { "ping": 1 }).await {
            error!("Failed to connect MongoDB server '{}': {}", host, e);
            return Err(e.into());
        }

        info!(
            "Connected to '{}' using database '{}' collection '{}'",
            host, config.database, config.collection
        );

        Ok(Self {
            collection: database.collection(&config.collection),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl StorageBackend for MongoDbBackend {
    async fn write_record(&mut self, message: &Message) -> Result<WriteOutcome, StorageError> {
        let document = match StoredDocument::from_message(message, Utc::now()) {
            Ok(document) => document,
            Err(reason) => return Ok(WriteOutcome::Skipped { reason }),
        };

        let result = self.collection.insert_one(&document).await?;
        Ok(WriteOutcome::Stored {
            id: Some(match result.inserted_id {
                Bson::ObjectId(oid) => oid.to_hex(),
                other => other.to_string(),
            }),
        })
    }

    fn backend_type(&self) -> &str {
        "MongoDB"
    }

    fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

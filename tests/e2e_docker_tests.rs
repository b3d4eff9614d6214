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

// End-to-end tests with Docker MariaDB + MongoDB
// Each test returns early when its service is not reachable.
//
//   docker run -d -p 23306:3306 -e MARIADB_ROOT_PASSWORD=test -e MARIADB_DATABASE=mqtt mariadb
//   docker run -d -p 27018:27017 -e MONGO_INITDB_ROOT_USERNAME=root -e MONGO_INITDB_ROOT_PASSWORD=test mongo

use bson::doc;
use chrono::Utc;
use mqtt_db_bridge::config::{MariaDbConfig, MongoDbConfig};
use mqtt_db_bridge::storage::mariadb::connection_opts;
use mqtt_db_bridge::storage::{
    BackendSet, MariaDbBackend, MongoDbBackend, StorageBackend, StoredDocument,
};
use mqtt_db_bridge::{Bridge, BrokerHandle, Message, FATAL_EXIT_CODE};
use mysql_async::prelude::Queryable;
use serde_json::json;
use std::env;
use std::sync::Mutex;
use uuid::Uuid;

fn mariadb_config(table: &str) -> MariaDbConfig {
    MariaDbConfig {
        host: Some(env::var("MARIADB_TEST_HOST").unwrap_or_else(|_| "127.0.0.1".to_string())),
        port: env::var("MARIADB_TEST_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(23306),
        user: Some("root".to_string()),
        password: Some(env::var("MARIADB_TEST_PASSWORD").unwrap_or_else(|_| "test".to_string())),
        database: "mqtt".to_string(),
        table: table.to_string(),
        connect_timeout_seconds: 3,
        max_retries: 0,
    }
}

fn mongodb_config(collection: &str) -> MongoDbConfig {
    MongoDbConfig {
        host: Some(env::var("MONGODB_TEST_HOST").unwrap_or_else(|_| "127.0.0.1".to_string())),
        port: env::var("MONGODB_TEST_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(27018),
        user: Some("root".to_string()),
        password: env::var("MONGODB_TEST_PASSWORD").unwrap_or_else(|_| "test".to_string()),
        database: "mqtt_e2e".to_string(),
        collection: collection.to_string(),
        connect_timeout_seconds: 3,
        max_retries: 0,
    }
}

#[derive(Default)]
struct CountingBroker {
    disconnects: Mutex<u32>,
}

impl BrokerHandle for CountingBroker {
    fn subscribe(&self, _topic: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn disconnect(&self) -> anyhow::Result<()> {
        *self.disconnects.lock().unwrap() += 1;
        Ok(())
    }
}

#[tokio::test]
async fn test_e2e_mariadb_inserts_row() {
    let config = mariadb_config("messages");
    let mut conn = match mysql_async::Conn::new(connection_opts(&config)).await {
        Ok(conn) => conn,
        Err(e) => {
            println!("⚠️  MariaDB not available, skipping: {}", e);
            return;
        }
    };
    conn.query_drop(
        "CREATE TABLE IF NOT EXISTS messages (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            time DATETIME NOT NULL,
            topic VARCHAR(255) NOT NULL,
            payload BLOB)",
    )
    .await
    .unwrap();

    // Sessions opened with the backend's options commit every insert
    let autocommit: Option<i64> = conn.query_first("SELECT @@autocommit").await.unwrap();
    assert_eq!(autocommit, Some(1));

    let mut backend = MariaDbBackend::connect(config).await.unwrap();
    let topic = format!("sensors/temp/{}", Uuid::new_v4().simple());
    let message = Message::new(topic.clone(), &b"{\"v\":21.5}"[..]);

    assert!(backend.write(&message).await);

    let rows: Vec<(String, Vec<u8>, i64)> = conn
        .exec(
            "SELECT topic, payload, TIMESTAMPDIFF(SECOND, time, NOW()) FROM messages WHERE topic = ?",
            (topic.clone(),),
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0, topic);
    assert_eq!(rows[0].1, b"{\"v\":21.5}".to_vec());
    assert!(rows[0].2.abs() <= 5);

    // Quotes and binary data are bound, not spliced into SQL
    let tricky = Message::new(topic.clone(), vec![b'\'', 0, 0xff, b';']);
    assert!(backend.write(&tricky).await);
}

#[tokio::test]
async fn test_e2e_mariadb_failure_shuts_bridge_down() {
    let config = mariadb_config("table_that_does_not_exist");
    let backend = match MariaDbBackend::connect(config).await {
        Ok(backend) => backend,
        Err(e) => {
            println!("⚠️  MariaDB not available, skipping: {}", e);
            return;
        }
    };

    let broker = CountingBroker::default();
    let mut bridge = Bridge::new(
        BackendSet::new(vec![Box::new(backend) as Box<dyn StorageBackend>]),
        vec!["#".to_string()],
    );
    bridge.on_connect(&broker, "localhost", 1883);
    bridge
        .on_message(&broker, Message::new("sensors/temp", &b"1"[..]))
        .await;

    assert_eq!(bridge.exit_code(), FATAL_EXIT_CODE);
    assert_eq!(*broker.disconnects.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_e2e_mongodb_document_round_trip() {
    let config = mongodb_config("messages");
    let mut backend = match MongoDbBackend::connect(config.clone()).await {
        Ok(backend) => backend,
        Err(e) => {
            println!("⚠️  MongoDB not available, skipping: {}", e);
            return;
        }
    };

    let mut options = mongodb::options::ClientOptions::parse(format!(
        "mongodb://root:{}@{}:{}/",
        config.password,
        config.host.clone().unwrap_or_default(),
        config.port
    ))
    .await
    .unwrap();
    options.app_name = Some("e2e-reader".to_string());
    let collection = mongodb::Client::with_options(options)
        .unwrap()
        .database(&config.database)
        .collection::<StoredDocument>(&config.collection);

    let topic = format!("sensors/temp/{}", Uuid::new_v4().simple());
    let payload = json!({"v": 21.5, "unit": "C", "tags": ["a", "b"]});
    let before = Utc::now().timestamp_millis();

    let message = Message::new(topic.clone(), serde_json::to_vec(&payload).unwrap());
    assert!(backend.write(&message).await);

    let stored = collection
        .find_one(doc! { "topic": &topic })
        .await
        .unwrap()
        .expect("document written");
    assert_eq!(stored.topic, topic);
    assert_eq!(stored.message.into_relaxed_extjson(), payload);
    assert!(stored.time.timestamp_millis() >= before - 1000);

    // Non-JSON: success, nothing written
    let raw = Message::new(topic.clone(), &b"not-json"[..]);
    assert!(backend.write(&raw).await);
    let count = collection
        .count_documents(doc! { "topic": &topic })
        .await
        .unwrap();
    assert_eq!(count, 1);
}

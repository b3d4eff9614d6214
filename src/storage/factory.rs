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

// Backend factory for creating storage backends from configuration

use super::backend::StorageBackend;
use super::mariadb::MariaDbBackend;
use super::mongo::MongoDbBackend;
use crate::config::BackendConfig;
use anyhow::{Context, Result};

pub struct BackendFactory;

impl BackendFactory {
    /// Create and connect a storage backend from configuration
    pub async fn create(config: &BackendConfig) -> Result<Box<dyn StorageBackend>> {
        match config {
            BackendConfig::MariaDb(mariadb) => {
                let backend = MariaDbBackend::connect(mariadb.clone())
                    .await
                    .context("Failed to initialize MariaDB backend")?;
                Ok(Box::new(backend))
            }

            BackendConfig::MongoDb(mongodb) => {
                let backend = MongoDbBackend::connect(mongodb.clone())
                    .await
                    .context("Failed to initialize MongoDB backend")?;
                Ok(Box::new(backend))
            }
        }
    }
}

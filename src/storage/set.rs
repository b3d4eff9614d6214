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

use super::backend::StorageBackend;
use super::factory::BackendFactory;
use crate::config::StorageConfig;
use crate::message::Message;
use anyhow::Result;
use tracing::{info, warn};

/// The backend that reported a fatal write failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanOutFailure {
    pub index: usize,
    pub backend: String,
}

/// Ordered, fixed set of active backends
#[derive(Default)]
pub struct BackendSet {
    backends: Vec<Box<dyn StorageBackend>>,
}

impl BackendSet {
    pub fn new(backends: Vec<Box<dyn StorageBackend>>) -> Self {
        Self { backends }
    }

    /// Connect every backend that has a host configured.
    ///
    /// Any connection failure aborts; there is no degraded mode.
    pub async fn from_config(config: &StorageConfig) -> Result<Self> {
        let mut backends = Vec::new();
        for backend_config in config.enabled_backends() {
            let backend = BackendFactory::create(&backend_config).await?;
            info!("Storage backend initialized: {}", backend.backend_type());
            backends.push(backend);
        }

        if backends.is_empty() {
            warn!(
                "No backend specified. Hint: use '--mariadb-host' and/or \
                 '--mongodb-host' to specify"
            );
        }

        Ok(Self::new(backends))
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn backend_types(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.backend_type()).collect()
    }

    /// Write `message` to each backend in order, stopping at the first failure
    pub async fn fan_out(&mut self, message: &Message) -> Result<(), FanOutFailure> {
        for (index, backend) in self.backends.iter_mut().enumerate() {
            if !backend.write(message).await {
                return Err(FanOutFailure {
                    index,
                    backend: backend.backend_type().to_string(),
                });
            }
        }
        Ok(())
    }
}

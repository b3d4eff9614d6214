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

// Storage backend trait for write-only archiving

use super::error::StorageError;
use crate::message::Message;
use async_trait::async_trait;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, warn};

/// Outcome of a single successful write attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The message was persisted; `id` is the backend-assigned record id, if any
    Stored { id: Option<String> },

    /// The payload could not be decoded for this backend and was dropped on purpose
    Skipped { reason: String },
}

/// Generic storage backend trait for write-only archiving
///
/// Each backend owns its connection exclusively and is only ever driven from
/// the single dispatch path, hence `&mut self`.
///
/// Query operations are NOT part of this trait - users should query
/// the databases directly.
#[async_trait]
pub trait StorageBackend: Send {
    /// Perform one write attempt and report what happened.
    ///
    /// Return `Err` only when the store itself rejected the write.
    async fn write_record(&mut self, message: &Message) -> Result<WriteOutcome, StorageError>;

    /// Get backend type identifier
    fn backend_type(&self) -> &str;

    /// How many times a failed write is retried before it is reported as fatal
    fn max_retries(&self) -> u32 {
        0
    }

    /// Persist `message`, returning `false` only on a failure the caller must
    /// treat as fatal. Skipped payloads count as success.
    ///
    /// Errors are logged here and never propagated.
    async fn write(&mut self, message: &Message) -> bool {
        let max_retries = self.max_retries();
        let mut attempt = 0;
        let mut delay = Duration::from_millis(100);

        loop {
            match self.write_record(message).await {
                Ok(WriteOutcome::Stored { id }) => {
                    debug!(
                        "{}: Message with topic '{}' of size {} B written with id {}",
                        self.backend_type(),
                        message.topic,
                        message.len(),
                        id.as_deref().unwrap_or("<none>")
                    );
                    return true;
                }
                Ok(WriteOutcome::Skipped { reason }) => {
                    warn!(
                        "{}: Skipping message with topic '{}': {}",
                        self.backend_type(),
                        message.topic,
                        reason
                    );
                    return true;
                }
                Err(e) if attempt < max_retries => {
                    warn!(
                        "{}: Write for topic '{}' failed (attempt {}/{}): {}. Retrying in {:?}",
                        self.backend_type(),
                        message.topic,
                        attempt + 1,
                        max_retries,
                        e,
                        delay
                    );
                    sleep(delay).await;
                    delay *= 2; // Exponential backoff
                    delay = delay.min(Duration::from_secs(30)); // Cap at 30 seconds
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        "{}: Failed to write message with topic '{}' to database: {}",
                        self.backend_type(),
                        message.topic,
                        e
                    );
                    return false;
                }
            }
        }
    }
}

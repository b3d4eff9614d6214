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

// MQTT to database bridge
//
// A long-running subscriber that archives MQTT messages:
// - Subscribes to one or more topic filters and reconnects forever
// - Writes every message to MariaDB (raw row) and/or MongoDB (JSON document)
// - Stops with a distinct exit code on the first failed write

pub mod bridge;
pub mod config;
pub mod message;
pub mod storage;
pub mod supervisor;

// Re-export main types
pub use bridge::{Bridge, BridgeState, BrokerHandle, ConnectionState, FATAL_EXIT_CODE};
pub use config::{load_config, load_config_with_env, BridgeConfig};
pub use message::Message;
pub use storage::{BackendSet, StorageBackend, WriteOutcome};
pub use supervisor::ConnectionSupervisor;

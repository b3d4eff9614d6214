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

// Storage backend module
//
// Provides a trait-based abstraction for storage backends,
// allowing the bridge to write every message to a relational
// table (MariaDB), a document collection (MongoDB), or both.
//
// This module focuses on WRITE-ONLY operations.
// Users should query backends directly using their own tools.

pub mod backend;
pub mod error;
pub mod factory;
pub mod mariadb;
pub mod mongo;
pub mod set;

pub use backend::{StorageBackend, WriteOutcome};
pub use error::StorageError;
pub use factory::BackendFactory;
pub use mariadb::MariaDbBackend;
pub use mongo::{MongoDbBackend, StoredDocument};
pub use set::{BackendSet, FanOutFailure};

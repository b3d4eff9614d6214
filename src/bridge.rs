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

// Connection lifecycle and message dispatch
//
// The bridge reacts to broker events (connect, subscribe ack, message,
// disconnect, failed connect) and fans every message out to the backends.
// The first fatal write sets the exit code and disconnects from the broker.

use crate::message::Message;
use crate::storage::BackendSet;
use anyhow::Result;
use rumqttc::{AsyncClient, QoS};
use std::fmt::Display;
use tracing::{debug, error, info, warn};

/// Exit code used when a backend write failure shuts the bridge down
pub const FATAL_EXIT_CODE: i32 = -2;

/// Requests the bridge sends back to the broker client.
///
/// Implementations must not block: they are called from the task that
/// drives the connection.
pub trait BrokerHandle {
    fn subscribe(&self, topic: &str) -> Result<()>;
    fn disconnect(&self) -> Result<()>;
}

impl BrokerHandle for AsyncClient {
    fn subscribe(&self, topic: &str) -> Result<()> {
        self.try_subscribe(topic, QoS::AtMostOnce)?;
        Ok(())
    }

    fn disconnect(&self) -> Result<()> {
        self.try_disconnect()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Subscribing,
    Active,
    Reconnecting,
    ShuttingDown,
}

/// Mutable state owned by the bridge
pub struct BridgeState {
    pub exit_code: i32,
    pub backends: BackendSet,
}

pub struct Bridge {
    state: BridgeState,
    topics: Vec<String>,
    connection: ConnectionState,
}

impl Bridge {
    pub fn new(backends: BackendSet, topics: Vec<String>) -> Self {
        Self {
            state: BridgeState {
                exit_code: 0,
                backends,
            },
            topics,
            connection: ConnectionState::Disconnected,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.state.exit_code
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    /// Whether the transport is up (subscribing or receiving)
    pub fn is_connected(&self) -> bool {
        matches!(
            self.connection,
            ConnectionState::Subscribing | ConnectionState::Active
        )
    }

    pub fn is_shutting_down(&self) -> bool {
        self.connection == ConnectionState::ShuttingDown
    }

    /// Transport handshake succeeded: subscribe to every configured topic
    pub fn on_connect(&mut self, broker: &impl BrokerHandle, host: &str, port: u16) {
        if self.is_shutting_down() {
            return;
        }

        info!("Connected to MQTT server {} port {}", host, port);
        self.connection = ConnectionState::Subscribing;

        for topic in &self.topics {
            info!("Subscribing to topic '{}'", topic);
            if let Err(e) = broker.subscribe(topic) {
                error!("Failed to subscribe to topic '{}': {}", topic, e);
            }
        }
    }

    /// The broker acknowledged a subscription
    pub fn on_subscribed(&mut self) {
        if self.connection == ConnectionState::Subscribing {
            debug!("Subscription acknowledged, receiving messages");
            self.connection = ConnectionState::Active;
        }
    }

    /// Dispatch one message to every backend, in order
    pub async fn on_message(&mut self, broker: &impl BrokerHandle, message: Message) {
        match self.connection {
            ConnectionState::ShuttingDown => return,
            ConnectionState::Subscribing => self.connection = ConnectionState::Active,
            _ => {}
        }

        if let Err(failure) = self.state.backends.fan_out(&message).await {
            error!(
                "Backend '{}' failed to store message with topic '{}', shutting down",
                failure.backend, message.topic
            );
            self.state.exit_code = FATAL_EXIT_CODE;
            self.shut_down(broker);
        }
    }

    /// The connection dropped without the bridge asking for it
    pub fn on_disconnect(&mut self, cause: &impl Display) {
        if self.state.exit_code != 0 || self.is_shutting_down() {
            // Already tearing down; nothing to report
            return;
        }

        self.connection = ConnectionState::Reconnecting;
        warn!(
            "Disconnected from MQTT server ({}). Will try to reconnect soon.",
            cause
        );
    }

    /// A connection attempt failed before the handshake completed
    pub fn on_connect_fail(&mut self, cause: &impl Display) {
        debug!(
            "Failed to connect to MQTT server ({}). Will retry soon again.",
            cause
        );
    }

    /// Termination was requested from outside (Ctrl+C); the exit code is kept
    pub fn on_interrupt(&mut self, broker: &impl BrokerHandle) {
        if !self.is_shutting_down() {
            self.shut_down(broker);
        }
    }

    fn shut_down(&mut self, broker: &impl BrokerHandle) {
        let was_connected = self.is_connected();
        self.connection = ConnectionState::ShuttingDown;
        if was_connected {
            if let Err(e) = broker.disconnect() {
                error!("Failed to request disconnect from MQTT server: {}", e);
            }
        }
    }
}

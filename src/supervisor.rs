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

// Drives the MQTT event loop and feeds its events to the bridge

use crate::bridge::Bridge;
use crate::config::{MqttConfig, ReconnectConfig};
use crate::message::Message;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};
use uuid::Uuid;

/// Exponential delay between connection attempts
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    min: Duration,
    max: Duration,
    current: Duration,
}

impl ReconnectBackoff {
    pub fn new(config: &ReconnectConfig) -> Self {
        let min = config.min_delay();
        Self {
            min,
            max: config.max_delay().max(min),
            current: min,
        }
    }

    /// Delay before the next attempt; doubles on every call up to the cap
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.min;
    }
}

/// Owns the broker client and retries the connection forever
pub struct ConnectionSupervisor {
    client: AsyncClient,
    eventloop: EventLoop,
    host: String,
    port: u16,
    backoff: ReconnectBackoff,
}

impl ConnectionSupervisor {
    pub fn new(config: &MqttConfig) -> Self {
        let client_id = config
            .client_id
            .clone()
            .unwrap_or_else(|| format!("mqtt-db-bridge-{}", Uuid::new_v4().simple()));

        let mut options = MqttOptions::new(client_id, config.host.clone(), config.port);
        options.set_keep_alive(config.keepalive());
        options.set_clean_session(true);
        options.set_max_packet_size(config.max_packet_size, config.max_packet_size);
        if let Some(username) = &config.username {
            options.set_credentials(username.clone(), config.password.clone().unwrap_or_default());
        }

        // Room for every subscribe issued on connect plus a disconnect
        let capacity = config.channel_capacity.max(config.topics.len() + 1);
        let (client, eventloop) = AsyncClient::new(options, capacity);

        Self {
            client,
            eventloop,
            host: config.host.clone(),
            port: config.port,
            backoff: ReconnectBackoff::new(&config.reconnect),
        }
    }

    /// Run until the bridge shuts down or Ctrl+C is received; returns the exit code
    pub async fn run(mut self, mut bridge: Bridge) -> i32 {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        let mut interrupted = false;

        loop {
            let event = tokio::select! {
                event = self.eventloop.poll() => event,
                _ = &mut ctrl_c, if !interrupted => {
                    info!("Received Ctrl+C, shutting down");
                    interrupted = true;
                    let connected = bridge.is_connected();
                    bridge.on_interrupt(&self.client);
                    if !connected {
                        break;
                    }
                    continue;
                }
            };

            match event {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    self.backoff.reset();
                    bridge.on_connect(&self.client, &self.host, self.port);
                }
                Ok(Event::Incoming(Packet::SubAck(_))) => bridge.on_subscribed(),
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    bridge.on_message(&self.client, Message::from(publish)).await;
                }
                Ok(Event::Outgoing(Outgoing::Disconnect)) if bridge.is_shutting_down() => {
                    info!("Disconnected from MQTT server");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    if bridge.is_shutting_down() {
                        debug!("Connection closed during shutdown: {}", e);
                        break;
                    }

                    if bridge.is_connected() {
                        bridge.on_disconnect(&e);
                    } else {
                        bridge.on_connect_fail(&e);
                    }

                    let delay = self.backoff.next_delay();
                    tokio::select! {
                        _ = sleep(delay) => {}
                        _ = &mut ctrl_c, if !interrupted => {
                            info!("Received Ctrl+C, shutting down");
                            bridge.on_interrupt(&self.client);
                            break;
                        }
                    }
                }
            }
        }

        bridge.exit_code()
    }
}

//! MQTT client wrapper.

use crate::config::MqttConfig;
use log::{debug, error, info, warn};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Message received from MQTT broker.
#[derive(Debug, Clone)]
pub struct MqttMessage {
    pub topic: String,
    pub payload: String,
}

/// MQTT client for hand signals and servo commands.
pub struct MqttClient {
    client: AsyncClient,
    event_loop: EventLoop,
}

impl MqttClient {
    /// Create a new MQTT client from configuration.
    pub fn new(config: &MqttConfig) -> Self {
        let mut options =
            MqttOptions::new(&config.client_id, &config.broker_host, config.broker_port);
        options.set_keep_alive(Duration::from_secs(30));

        // Set credentials if provided
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username, password);
        }

        let (client, event_loop) = AsyncClient::new(options, 100);

        Self { client, event_loop }
    }

    /// Run the MQTT event loop until the client disconnects.
    ///
    /// Incoming publishes are forwarded to `tx` when given, and dropped
    /// otherwise. `connected` fires on the first ConnAck.
    pub async fn run(
        mut self,
        tx: Option<mpsc::Sender<MqttMessage>>,
        mut connected: Option<oneshot::Sender<()>>,
    ) {
        info!("Starting MQTT event loop");

        loop {
            match self.event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("[MQTT] Connected to broker");
                    if let Some(connected) = connected.take() {
                        let _ = connected.send(());
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let Some(tx) = &tx else {
                        continue;
                    };
                    let topic = publish.topic.clone();
                    let payload = match String::from_utf8(publish.payload.to_vec()) {
                        Ok(s) => s,
                        Err(e) => {
                            warn!("Invalid UTF-8 in MQTT payload: {}", e);
                            continue;
                        }
                    };

                    debug!("Received MQTT message on {}: {}", topic, payload);

                    let msg = MqttMessage { topic, payload };
                    if tx.send(msg).await.is_err() {
                        error!("MQTT message channel closed");
                        break;
                    }
                }
                Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                    info!("[MQTT] Disconnected from broker");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    error!("MQTT connection error: {:?}", e);
                    // Wait before reconnecting
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    }

    /// Get a clone of the async client for publishing from other tasks.
    pub fn client(&self) -> AsyncClient {
        self.client.clone()
    }
}

//! Hand signals published over MQTT.
//!
//! Each message on the hand-count topic is parsed as a
//! [`HandSignal`](crate::input::HandSignal). Whatever publishes there (a
//! meeting watcher, a button, a web hook) only needs to send `raise`,
//! `lower`, a count, or `{"count": n}`.

use super::client::MqttMessage;
use crate::coordinator::HandCoordinator;
use crate::error::Result;
use crate::input::HandSignal;
use log::{debug, info, warn};
use rumqttc::{AsyncClient, QoS};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct MqttHandSource {
    topic: String,
}

impl MqttHandSource {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
        }
    }

    /// Start consuming hand signals.
    ///
    /// Waits for `connected`, subscribes through `client`, then applies each
    /// message from `messages` to the coordinator. The task ends when the
    /// message channel closes or the connection never comes up.
    pub fn start(
        self,
        client: AsyncClient,
        messages: mpsc::Receiver<MqttMessage>,
        connected: oneshot::Receiver<()>,
        coordinator: Arc<HandCoordinator>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run(client, messages, connected, coordinator).await;
        })
    }

    async fn run(
        self,
        client: AsyncClient,
        mut messages: mpsc::Receiver<MqttMessage>,
        connected: oneshot::Receiver<()>,
        coordinator: Arc<HandCoordinator>,
    ) {
        match tokio::time::timeout(CONNECT_TIMEOUT, connected).await {
            Ok(Ok(())) => {
                info!("[MQTT] Connection established, subscribing to {}", self.topic);
            }
            Ok(Err(_)) => {
                warn!("[MQTT] Connection signal channel dropped");
                return;
            }
            Err(_) => {
                warn!("[MQTT] Connection timeout after {:?}", CONNECT_TIMEOUT);
                return;
            }
        }

        if let Err(e) = client.subscribe(&self.topic, QoS::AtLeastOnce).await {
            warn!("[MQTT] Failed to subscribe to {}: {:?}", self.topic, e);
            return;
        }

        while let Some(msg) = messages.recv().await {
            if msg.topic != self.topic {
                debug!("[MQTT] Ignoring message on {}", msg.topic);
                continue;
            }
            match self.handle_payload(&msg.payload, &coordinator).await {
                Ok(count) => info!("[MQTT] {} hand(s) raised", count),
                Err(e) => warn!("[MQTT] Hand signal {:?} failed: {}", msg.payload, e),
            }
        }

        info!("[MQTT] Hand signal stream ended");
    }

    async fn handle_payload(&self, payload: &str, coordinator: &HandCoordinator) -> Result<u32> {
        let signal: HandSignal = payload.parse()?;
        debug!("[MQTT] Received {:?}", signal);
        signal.apply(coordinator).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::testing::RecordingServo;
    use crate::config::{Config, MqttConfig};
    use crate::error::HandError;
    use crate::input::mqtt::MqttClient;

    fn coordinator(servo: &RecordingServo) -> Arc<HandCoordinator> {
        Arc::new(HandCoordinator::new(
            Box::new(servo.clone()),
            Config::default().hand,
        ))
    }

    #[tokio::test]
    async fn test_handle_payload_applies_signal() {
        let servo = RecordingServo::new();
        let hand = coordinator(&servo);
        let source = MqttHandSource::new("hand-raiser/count");

        assert_eq!(source.handle_payload("2", &hand).await.unwrap(), 2);
        assert_eq!(source.handle_payload("lower", &hand).await.unwrap(), 1);
        assert_eq!(
            source.handle_payload(r#"{"count":0}"#, &hand).await.unwrap(),
            0
        );
        assert!(matches!(
            source.handle_payload("wave", &hand).await,
            Err(HandError::InvalidSignal(_))
        ));

        assert_eq!(servo.moves(), vec![30, 0]);
    }

    // The event loop is never polled, so nothing reaches a broker. Requests
    // queue up in the client as long as it is alive.
    fn offline_client() -> MqttClient {
        MqttClient::new(&MqttConfig {
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            client_id: "hand-raiser-test".to_string(),
            username: None,
            password: None,
            hand_count_topic: "hand-raiser/count".to_string(),
        })
    }

    fn message(topic: &str, payload: &str) -> MqttMessage {
        MqttMessage {
            topic: topic.to_string(),
            payload: payload.to_string(),
        }
    }

    #[tokio::test]
    async fn test_source_applies_messages_on_topic() {
        let servo = RecordingServo::new();
        let hand = coordinator(&servo);
        let client = offline_client();
        let (tx, rx) = mpsc::channel(8);
        let (connected_tx, connected_rx) = oneshot::channel();

        let task = MqttHandSource::new("hand-raiser/count").start(
            client.client(),
            rx,
            connected_rx,
            hand.clone(),
        );
        connected_tx.send(()).unwrap();

        tx.send(message("hand-raiser/count", "raise")).await.unwrap();
        tx.send(message("other/topic", "5")).await.unwrap();
        tx.send(message("hand-raiser/count", "raise")).await.unwrap();
        tx.send(message("hand-raiser/count", "garbage")).await.unwrap();
        drop(tx);
        task.await.unwrap();

        assert_eq!(hand.count().await, 2);
        assert_eq!(servo.moves(), vec![30]);
    }

    #[tokio::test]
    async fn test_source_stops_without_connection() {
        let servo = RecordingServo::new();
        let hand = coordinator(&servo);
        let client = offline_client();
        let (_tx, rx) = mpsc::channel(4);
        let (connected_tx, connected_rx) = oneshot::channel();
        drop(connected_tx);

        let task = MqttHandSource::new("hand-raiser/count").start(
            client.client(),
            rx,
            connected_rx,
            hand.clone(),
        );
        task.await.unwrap();

        assert_eq!(hand.count().await, 0);
        assert!(servo.moves().is_empty());
    }
}

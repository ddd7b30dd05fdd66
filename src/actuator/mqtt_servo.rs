//! Servo driven over MQTT.
//!
//! Publishes `{"position": n}` to the configured servo topic. A move counts
//! as acknowledged once the broker has accepted the publish and the servo
//! has had its settle time to get there.

use super::Servo;
use crate::config::ServoConfig;
use crate::error::{HandError, Result};
use async_trait::async_trait;
use log::{debug, info};
use rumqttc::{AsyncClient, QoS};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct ServoCommand {
    position: u32,
}

pub struct MqttServo {
    client: AsyncClient,
    topic: String,
    move_timeout: Duration,
    settle: Duration,
}

impl MqttServo {
    /// Create a servo that publishes through `client`.
    ///
    /// The client's event loop must be driven elsewhere (see
    /// [`MqttClient::run`](crate::input::mqtt::MqttClient::run)).
    pub fn new(client: AsyncClient, config: &ServoConfig) -> Self {
        Self {
            client,
            topic: config.topic.clone(),
            move_timeout: config.move_timeout(),
            settle: config.settle(),
        }
    }

    fn payload(position: u32) -> Result<String> {
        Ok(serde_json::to_string(&ServoCommand { position })?)
    }
}

#[async_trait]
impl Servo for MqttServo {
    async fn move_to(&mut self, position: u32) -> Result<()> {
        let payload = Self::payload(position)?;
        debug!("[Servo] Publishing to {}: {}", self.topic, payload);

        let publish = self
            .client
            .publish(&self.topic, QoS::AtLeastOnce, false, payload);
        match tokio::time::timeout(self.move_timeout, publish).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(HandError::DeviceFault(e.to_string())),
            Err(_) => {
                return Err(HandError::DeviceFault(format!(
                    "move to {} not accepted within {:?}",
                    position, self.move_timeout
                )));
            }
        }

        tokio::time::sleep(self.settle).await;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        info!("[Servo] Disconnecting from MQTT broker");
        self.client.disconnect().await?;
        Ok(())
    }
}

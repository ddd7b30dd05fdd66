//! MQTT input source for hand signals.
//!
//! This module provides the MQTT client shared by the hand-count source and
//! the MQTT servo, and the source that turns published messages into
//! coordinator calls.

mod client;
mod hand_source;

pub use client::{MqttClient, MqttMessage};
pub use hand_source::MqttHandSource;

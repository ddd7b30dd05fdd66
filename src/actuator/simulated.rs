//! Servo stand-in for running without hardware.

use super::Servo;
use crate::error::Result;
use async_trait::async_trait;
use log::info;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Logs each move and waits for a simulated travel time.
///
/// The last commanded position is shared through an atomic so it can be
/// observed from other tasks.
pub struct SimulatedServo {
    position: Arc<AtomicU32>,
    travel: Duration,
}

impl SimulatedServo {
    pub fn new(travel: Duration) -> Self {
        Self {
            position: Arc::new(AtomicU32::new(0)),
            travel,
        }
    }

    /// Shared view of the last commanded position.
    #[cfg(test)]
    fn position_handle(&self) -> Arc<AtomicU32> {
        self.position.clone()
    }
}

#[async_trait]
impl Servo for SimulatedServo {
    async fn move_to(&mut self, position: u32) -> Result<()> {
        let from = self.position.load(Ordering::SeqCst);
        info!("[Sim] Servo moving {} -> {}", from, position);
        tokio::time::sleep(self.travel).await;
        self.position.store(position, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        info!("[Sim] Servo released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_simulated_servo_tracks_position() {
        let mut servo = SimulatedServo::new(Duration::from_millis(100));
        let position = servo.position_handle();

        servo.move_to(30).await.unwrap();
        assert_eq!(position.load(Ordering::SeqCst), 30);

        servo.move_to(0).await.unwrap();
        assert_eq!(position.load(Ordering::SeqCst), 0);
    }
}

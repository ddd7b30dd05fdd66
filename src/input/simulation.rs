//! Hand-count simulation for testing.
//!
//! Provides simulated meeting activity for development without a meeting or
//! broker.

use crate::coordinator::HandCoordinator;
use log::{info, warn};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, interval};

/// Counts cycled through by the simulation. Includes a repeated value and a
/// repeated zero so the idempotent paths get exercised too.
pub const SIMULATED_COUNTS: [u32; 7] = [1, 2, 2, 3, 1, 0, 0];

/// Spawn a task that sets the hand count from [`SIMULATED_COUNTS`] every `step`.
///
/// # Returns
///
/// A `JoinHandle` that can be used to abort the simulation task.
pub fn run_hand_simulation(coordinator: Arc<HandCoordinator>, step: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = interval(step);
        for count in SIMULATED_COUNTS.iter().cycle() {
            interval.tick().await;
            info!("[Sim] {} hand(s) raised", count);
            if let Err(e) = coordinator.set_count(*count).await {
                warn!("[Sim] Failed to set count to {}: {}", count, e);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::testing::RecordingServo;
    use crate::config::Config;

    #[tokio::test(start_paused = true)]
    async fn test_simulation_cycles_hand() {
        let servo = RecordingServo::new();
        let hand = Arc::new(HandCoordinator::new(
            Box::new(servo.clone()),
            Config::default().hand,
        ));

        // Ticks every 500ms: one full pass by 3s, before any wiggle is due
        let sim = run_hand_simulation(hand.clone(), Duration::from_millis(500));
        tokio::time::sleep(Duration::from_millis(3250)).await;
        sim.abort();

        assert_eq!(hand.count().await, 0);
        assert_eq!(servo.moves(), vec![30, 0]);
    }
}

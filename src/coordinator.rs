//! Hand-count coordination.
//!
//! [`HandCoordinator`] keeps track of how many people have their hands up
//! and raises or lowers the robot hand to match. The count, the idle wiggle
//! and the actuator share one lock, and a state change holds it for its whole
//! duration, including servo moves, so two moves are never interleaved on the
//! device.
//!
//! The hand is either idle (count is zero, no wiggle) or active (count is
//! positive, wiggle running). Crossing between the two issues exactly one
//! servo command; changing the count while active only updates the count.

use crate::actuator::{ActuatorController, ActuatorPosition, Servo, WiggleTask};
use crate::config::HandConfig;
use crate::error::{HandError, Result};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// State guarded by the coordinator's lock.
struct HandState {
    count: u32,
    actuator: ActuatorController,
    /// Present exactly while `count > 0`
    wiggler: Option<WiggleTask>,
}

impl AsMut<ActuatorController> for HandState {
    fn as_mut(&mut self) -> &mut ActuatorController {
        &mut self.actuator
    }
}

/// Authoritative count of raised hands. Safe to share between tasks.
pub struct HandCoordinator {
    state: Arc<Mutex<HandState>>,
    inactivity_period: Duration,
}

impl HandCoordinator {
    pub fn new(servo: Box<dyn Servo>, config: HandConfig) -> Self {
        let inactivity_period = config.inactivity_period();
        Self {
            state: Arc::new(Mutex::new(HandState {
                count: 0,
                actuator: ActuatorController::new(servo, config),
                wiggler: None,
            })),
            inactivity_period,
        }
    }

    /// Bring the hand to the lowered position.
    ///
    /// Call once after connecting, before any signals arrive.
    pub async fn start(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        info!("[Hand] Homing hand to lowered position");
        state.actuator.move_to(ActuatorPosition::Lowered).await
    }

    /// Consider one more person to have raised their hand.
    ///
    /// Raises the robot hand if this is the first one. Returns the new count,
    /// or [`HandError::CountOverflow`] if the count cannot grow any further.
    pub async fn increment(&self) -> Result<u32> {
        let mut state = self.state.lock().await;

        let Some(count) = state.count.checked_add(1) else {
            warn!("[Hand] Ignoring raised hand: count is already {}", state.count);
            return Err(HandError::CountOverflow);
        };
        if state.count == 0 {
            self.activate(&mut state).await?;
        }
        state.count = count;

        info!("[Hand] Hand raised, {} raised in total", state.count);
        Ok(state.count)
    }

    /// Consider one person to have lowered their hand.
    ///
    /// Lowers the robot hand if this was the last one. Returns the new count,
    /// or [`HandError::NoRaisedHands`] if nobody had a hand raised.
    pub async fn decrement(&self) -> Result<u32> {
        let mut state = self.state.lock().await;

        match state.count {
            0 => {
                warn!("[Hand] Ignoring lowered hand: no hands are raised");
                return Err(HandError::NoRaisedHands);
            }
            1 => {
                self.deactivate(&mut state).await?;
                state.count = 0;
            }
            _ => state.count -= 1,
        }

        info!("[Hand] Hand lowered, {} raised in total", state.count);
        Ok(state.count)
    }

    /// Set the number of raised hands outright.
    ///
    /// Used by sources that observe the total rather than individual changes,
    /// and to reset the count if someone forgets to lower their hand. Only a
    /// change between zero and non-zero moves the hand.
    pub async fn set_count(&self, count: u32) -> Result<()> {
        let mut state = self.state.lock().await;
        let previous = state.count;

        match (previous, count) {
            (0, 0) => {}
            (0, _) => self.activate(&mut state).await?,
            (_, 0) => self.deactivate(&mut state).await?,
            _ => {}
        }
        state.count = count;

        if previous != count {
            info!("[Hand] Raised hands: {} -> {}", previous, count);
        }
        Ok(())
    }

    /// Current number of raised hands.
    pub async fn count(&self) -> u32 {
        self.state.lock().await.count
    }

    /// Whether the idle wiggle is running. A wiggle that stopped after a
    /// servo fault no longer counts.
    pub async fn is_wiggling(&self) -> bool {
        self.state
            .lock()
            .await
            .wiggler
            .as_ref()
            .is_some_and(|wiggler| !wiggler.is_finished())
    }

    /// Lower the hand, stop the wiggle and release the servo.
    ///
    /// The hand is commanded down even if the count says it already is. If
    /// lowering fails the servo connection is still released and the
    /// lowering error is returned.
    pub async fn shutdown(&self) -> Result<()> {
        info!("[Hand] Shutting down");
        let mut state = self.state.lock().await;

        if let Some(wiggler) = state.wiggler.take() {
            wiggler.stop().await;
        }
        state.count = 0;

        let lowered = state.actuator.move_to(ActuatorPosition::Lowered).await;
        if let Err(e) = &lowered {
            error!("[Hand] Failed to lower hand during shutdown: {}", e);
        }

        state.actuator.close().await?;
        info!("[Hand] Shutdown complete");
        lowered
    }

    /// Idle -> active: raise the hand, then start wiggling.
    ///
    /// Nothing changes if the raise fails.
    async fn activate(&self, state: &mut HandState) -> Result<()> {
        state.actuator.raise().await?;
        debug!("[Hand] Starting idle wiggle");
        state.wiggler = Some(WiggleTask::spawn(
            self.state.clone(),
            self.inactivity_period,
        ));
        Ok(())
    }

    /// Active -> idle: stop the wiggle, then lower the hand.
    ///
    /// The wiggle has fully exited before the lower command goes out. If the
    /// lower fails the hand is still up, so the wiggle is restarted.
    async fn deactivate(&self, state: &mut HandState) -> Result<()> {
        if let Some(wiggler) = state.wiggler.take() {
            debug!("[Hand] Stopping idle wiggle");
            wiggler.stop().await;
        }

        if let Err(e) = state.actuator.lower().await {
            warn!("[Hand] Failed to lower hand, keeping it active: {}", e);
            state.wiggler = Some(WiggleTask::spawn(
                self.state.clone(),
                self.inactivity_period,
            ));
            return Err(e);
        }
        Ok(())
    }
}

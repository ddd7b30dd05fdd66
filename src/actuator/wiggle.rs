//! Idle wiggle for a hand that has been raised for a while.
//!
//! The wiggle runs as a background task that shares the hand's lock with
//! whoever owns the [`WiggleTask`]. It never holds the lock while idle: the
//! lock is taken once per servo move and released during the holds between
//! moves. Every lock acquisition races against the cancellation token, so an
//! owner that holds the lock while stopping the task cannot deadlock.

use super::ActuatorController;
use crate::error::Result;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Handle to a running idle wiggle.
///
/// Dropping the handle cancels the task without waiting for it; use
/// [`WiggleTask::stop`] to wait until it has exited.
pub struct WiggleTask {
    cancel: CancellationToken,
    handle: JoinHandle<Result<()>>,
}

impl WiggleTask {
    /// Spawn the idle wiggle over the actuator behind `shared`.
    pub fn spawn<T>(shared: Arc<Mutex<T>>, inactivity_period: Duration) -> Self
    where
        T: AsMut<ActuatorController> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_idle_wiggle(shared, inactivity_period, cancel.clone()));
        Self { cancel, handle }
    }

    /// Whether the task has exited on its own (only happens after a servo fault).
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel the task and wait for it to exit.
    ///
    /// Once this returns the task will not move the servo again.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        match (&mut self.handle).await {
            Ok(Ok(())) => debug!("[Wiggle] Idle wiggle joined"),
            Ok(Err(e)) => warn!("[Wiggle] Idle wiggle had already stopped: {}", e),
            Err(e) => error!("[Wiggle] Idle wiggle task panicked: {}", e),
        }
    }
}

impl Drop for WiggleTask {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Wiggle the hand every time `inactivity_period` passes without cancellation.
///
/// Returns `Ok(())` once `cancel` fires. A servo fault ends the loop and is
/// returned.
pub async fn run_idle_wiggle<T>(
    shared: Arc<Mutex<T>>,
    inactivity_period: Duration,
    cancel: CancellationToken,
) -> Result<()>
where
    T: AsMut<ActuatorController>,
{
    debug!(
        "[Wiggle] Idle wiggle armed ({:?} inactivity period)",
        inactivity_period
    );

    loop {
        if tokio::time::timeout(inactivity_period, cancel.cancelled())
            .await
            .is_ok()
        {
            break;
        }

        info!(
            "[Wiggle] Hand raised for {:?} without change, wiggling",
            inactivity_period
        );
        if let Err(e) = wiggle_once(&shared, &cancel).await {
            error!("[Wiggle] Servo fault during wiggle, stopping: {}", e);
            return Err(e);
        }
    }

    debug!("[Wiggle] Idle wiggle cancelled");
    Ok(())
}

/// Perform one wiggle sequence.
///
/// Returns `Ok(false)` if cancelled before the sequence completed. The servo
/// is not moved once cancellation has been observed.
pub async fn wiggle_once<T>(shared: &Mutex<T>, cancel: &CancellationToken) -> Result<bool>
where
    T: AsMut<ActuatorController>,
{
    let (steps, hold) = {
        let mut guard = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(false),
            guard = shared.lock() => guard,
        };
        let actuator = guard.as_mut();
        (actuator.wiggle_steps(), actuator.config().wiggle_hold())
    };

    for step in steps {
        {
            let mut guard = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(false),
                guard = shared.lock() => guard,
            };
            guard.as_mut().move_to(step).await?;
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(false),
            _ = tokio::time::sleep(hold) => {}
        }
    }

    Ok(true)
}

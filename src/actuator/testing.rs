//! Servo double that records every acknowledged move.

use super::Servo;
use crate::error::{HandError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Cloneable handle; all clones share the same move log.
#[derive(Clone, Default)]
pub(crate) struct RecordingServo {
    moves: Arc<Mutex<Vec<u32>>>,
    fail: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
    travel: Duration,
}

impl RecordingServo {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every move takes `travel` before it is acknowledged.
    pub(crate) fn with_travel(travel: Duration) -> Self {
        Self {
            travel,
            ..Self::default()
        }
    }

    pub(crate) fn moves(&self) -> Vec<u32> {
        self.moves.lock().clone()
    }

    pub(crate) fn fail_moves(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Servo for RecordingServo {
    async fn move_to(&mut self, position: u32) -> Result<()> {
        if !self.travel.is_zero() {
            tokio::time::sleep(self.travel).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(HandError::DeviceFault(format!(
                "servo did not acknowledge move to {}",
                position
            )));
        }
        self.moves.lock().push(position);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

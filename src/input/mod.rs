//! Sources of hand signals.
//!
//! Every source reduces what it observes to a [`HandSignal`] and applies it
//! to the shared [`HandCoordinator`].

pub mod console;
pub mod mqtt;
pub mod simulation;

use crate::coordinator::HandCoordinator;
use crate::error::{HandError, Result};
use serde::Deserialize;
use std::str::FromStr;

/// A single change reported by a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandSignal {
    /// One more hand went up
    Raise,
    /// One hand went down
    Lower,
    /// The total number of raised hands
    Set(u32),
}

#[derive(Deserialize)]
struct CountPayload {
    count: u32,
}

impl FromStr for HandSignal {
    type Err = HandError;

    /// Accepts `raise`/`up`/`+`, `lower`/`down`/`-`, a bare count, or
    /// `{"count": n}`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "raise" | "up" | "+" => return Ok(HandSignal::Raise),
            "lower" | "down" | "-" => return Ok(HandSignal::Lower),
            _ => {}
        }

        if let Ok(count) = s.parse::<u32>() {
            return Ok(HandSignal::Set(count));
        }

        if s.starts_with('{') {
            let payload: CountPayload = serde_json::from_str(s)?;
            return Ok(HandSignal::Set(payload.count));
        }

        Err(HandError::InvalidSignal(s.to_string()))
    }
}

impl HandSignal {
    /// Apply the signal and return the resulting count.
    pub async fn apply(self, coordinator: &HandCoordinator) -> Result<u32> {
        match self {
            HandSignal::Raise => coordinator.increment().await,
            HandSignal::Lower => coordinator.decrement().await,
            HandSignal::Set(count) => {
                coordinator.set_count(count).await?;
                Ok(count)
            }
        }
    }
}

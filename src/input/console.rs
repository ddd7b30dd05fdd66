//! Hand signals typed on stdin.
//!
//! Stands in for a physical button: each line is parsed as a
//! [`HandSignal`](super::HandSignal).

use super::HandSignal;
use crate::coordinator::HandCoordinator;
use log::{info, warn};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

/// Spawn a task that reads signals from stdin until EOF.
pub fn run_console_source(coordinator: Arc<HandCoordinator>) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("[Console] Type raise, lower, or a count (Ctrl+D to stop)");
        read_signals(BufReader::new(tokio::io::stdin()), &coordinator).await;
        info!("[Console] Input closed");
    })
}

/// Apply every line of `reader` to the coordinator. Returns the number of
/// signals applied successfully.
async fn read_signals<R>(reader: R, coordinator: &HandCoordinator) -> usize
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut applied = 0;

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("[Console] Failed to read input: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let signal = match line.parse::<HandSignal>() {
            Ok(signal) => signal,
            Err(e) => {
                warn!("[Console] {}", e);
                continue;
            }
        };

        match signal.apply(coordinator).await {
            Ok(count) => {
                info!("[Console] {:?} -> {} raised", signal, count);
                applied += 1;
            }
            Err(e) => warn!("[Console] {:?} failed: {}", signal, e),
        }
    }

    applied
}

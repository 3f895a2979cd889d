//! Background operational sweep.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::relay::Relay;

/// Spawns the periodic sweep task. Stopping the task is the caller's
/// cancellation signal; the relay itself has no internal shutdown state.
pub fn spawn_sweeper(relay: Arc<Relay>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            relay.sweep().await;
        }
    })
}

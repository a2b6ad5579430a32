//! Periodic liveness polling.

use super::television::WiiUTelevision;
use log::info;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior, interval};

/// Spawn a task that polls the console every `period` for the life of the process.
///
/// Each tick runs to completion before the next one starts, so a slow device
/// never has two polls in flight. Abort the handle to stop polling.
pub fn spawn_liveness_poll(tv: Arc<WiiUTelevision>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "[Poll] {}: polling every {}s",
            tv.name(),
            period.as_secs_f32()
        );
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            tv.poll().await;
        }
    })
}

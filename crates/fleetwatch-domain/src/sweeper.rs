use crate::state_store::DeviceStateStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Evicts stale device records on a fixed interval, never inline with
/// sample processing.
pub struct StateSweeper {
    store: Arc<DeviceStateStore>,
    interval: Duration,
}

impl StateSweeper {
    pub fn new(store: Arc<DeviceStateStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    pub async fn run(self, ctx: CancellationToken) -> anyhow::Result<()> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ctx.cancelled() => break,
                _ = ticker.tick() => {
                    let evicted = self.store.sweep(Utc::now());
                    debug!(evicted, tracked = self.store.len(), "state sweep finished");
                }
            }
        }
        info!("state sweeper stopped");
        Ok(())
    }
}

//! CleanupLoop - periodic staging sweep
//!
//! The core never schedules anything itself; `serve` owns this loop.

use std::sync::Arc;
use std::time::Duration;

use imgstage_core::{ImageStore, StoreError};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// CleanupLoop calls `ImageStore::cleanup` every `interval`.
///
/// # Flow
/// 1. wait one interval (no sweep at startup)
/// 2. sweep staged images older than `ttl`
/// 3. repeat until `shutdown` fires; a sweep in progress is canceled
pub struct CleanupLoop {
    store: Arc<dyn ImageStore>,
    interval: Duration,
    ttl: Duration,
}

impl CleanupLoop {
    pub fn new(store: Arc<dyn ImageStore>, interval: Duration, ttl: Duration) -> Self {
        Self {
            store,
            interval,
            ttl,
        }
    }

    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            ttl_secs = self.ttl.as_secs(),
            "cleanup scheduler started"
        );
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            match self.store.cleanup(&shutdown, self.ttl).await {
                Ok(()) => {}
                Err(StoreError::Canceled) => break,
                // next tick retries
                Err(e) => tracing::warn!(error = %e, "staging cleanup failed"),
            }
        }
        tracing::info!("cleanup scheduler stopped");
    }
}

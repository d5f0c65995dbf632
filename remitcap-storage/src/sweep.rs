//! Background sweep of expired cache entries.
//!
//! Lazy expiry only reclaims keys that are read again. The sweeper bounds the
//! growth of stale entries that nobody reads.
//!
//! The task is tied to the store's lifecycle: it holds only a weak reference
//! and exits once the store is dropped, the handle is dropped, or
//! [`SweepHandle::shutdown`] is called.

use crate::store::CacheStore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Shortest accepted sweep period.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Default)]
struct SweepMetrics {
    cycles: AtomicU64,
    purged: AtomicU64,
}

impl SweepMetrics {
    fn snapshot(&self) -> SweepSnapshot {
        SweepSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            purged: self.purged.load(Ordering::Relaxed),
        }
    }
}

/// Sweeper activity at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSnapshot {
    /// Completed sweep cycles.
    pub cycles: u64,
    /// Entries purged across all cycles.
    pub purged: u64,
}

/// Handle to a running sweeper.
///
/// Dropping the handle also stops the task.
#[derive(Debug)]
pub struct SweepHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
    metrics: Arc<SweepMetrics>,
}

impl SweepHandle {
    pub fn snapshot(&self) -> SweepSnapshot {
        self.metrics.snapshot()
    }

    /// Whether the task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signal the task to stop and wait for it.
    pub async fn shutdown(self) -> SweepSnapshot {
        // A send error only means the task already exited.
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "cache sweeper task failed");
        }
        self.metrics.snapshot()
    }
}

impl CacheStore {
    /// Start a periodic sweep on the current tokio runtime.
    ///
    /// The period is [`crate::CacheStoreConfig::sweep_interval`]. Missed
    /// ticks are skipped rather than replayed.
    pub fn spawn_sweeper(self: &Arc<Self>) -> SweepHandle {
        let period = self.config().sweep_interval.max(MIN_SWEEP_INTERVAL);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let metrics = Arc::new(SweepMetrics::default());
        let task = tokio::spawn(sweep_task(
            Arc::downgrade(self),
            period,
            shutdown_rx,
            metrics.clone(),
        ));
        SweepHandle {
            shutdown_tx,
            task,
            metrics,
        }
    }
}

async fn sweep_task(
    store: Weak<CacheStore>,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
    metrics: Arc<SweepMetrics>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately.
    ticker.tick().await;

    info!(interval_ms = period.as_millis() as u64, "cache sweeper started");

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }

            _ = ticker.tick() => {
                let Some(store) = store.upgrade() else {
                    debug!("cache dropped, sweeper exiting");
                    break;
                };
                let purged = store.purge_expired();
                metrics.cycles.fetch_add(1, Ordering::Relaxed);
                metrics.purged.fetch_add(purged as u64, Ordering::Relaxed);
                if purged > 0 {
                    debug!(purged, "cache sweep cycle completed");
                } else {
                    tracing::trace!("cache sweep cycle completed with nothing to purge");
                }
            }
        }
    }

    let snapshot = metrics.snapshot();
    info!(
        cycles = snapshot.cycles,
        purged = snapshot.purged,
        "cache sweeper stopped"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::CacheStoreConfig;

    fn store(clock: Arc<ManualClock>) -> Arc<CacheStore> {
        Arc::new(CacheStore::with_clock(
            CacheStoreConfig::new()
                .with_max_entries(10)
                .with_sweep_interval(Duration::from_secs(1)),
            clock,
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_purges_expired_entries() {
        let clock = Arc::new(ManualClock::new());
        let store = store(clock.clone());
        store.set_with_ttl("short", 1u8, Duration::from_millis(100));
        store.set_with_ttl("long", 2u8, Duration::from_secs(3600));

        let handle = store.spawn_sweeper();
        clock.advance(Duration::from_millis(200));
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(store.len(), 1);
        assert_eq!(store.stats().keys, vec!["long"]);

        let snapshot = handle.shutdown().await;
        assert!(snapshot.cycles >= 1);
        assert_eq!(snapshot.purged, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_stops_when_store_dropped() {
        let clock = Arc::new(ManualClock::new());
        let store = store(clock);
        let handle = store.spawn_sweeper();

        drop(store);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(handle.is_finished());
        assert_eq!(handle.shutdown().await.purged, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_task() {
        let clock = Arc::new(ManualClock::new());
        let store = store(clock);
        let handle = store.spawn_sweeper();

        tokio::time::sleep(Duration::from_millis(2500)).await;
        let snapshot = handle.shutdown().await;
        assert!(snapshot.cycles >= 2);
    }
}

//! Background eviction of expired address records.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, warn};

use crate::metrics::PeerStoreMetrics;
use crate::store::PeerStore;

/// Periodically evicts expired addresses from a [`PeerStore`].
///
/// Reads already hide expired records, so the sweep only reclaims memory and never
/// needs to coordinate with readers beyond the address book's entry guards.
#[derive(Debug)]
pub struct AddrSweeper {
    store: Arc<PeerStore>,
    interval: Duration,
    metrics: PeerStoreMetrics,
}

impl AddrSweeper {
    pub fn new(store: Arc<PeerStore>, interval: Duration) -> Self {
        Self {
            store,
            // tokio intervals must be non-zero
            interval: interval.max(Duration::from_millis(1)),
            metrics: PeerStoreMetrics::default(),
        }
    }

    /// Run a single sweep cycle.
    ///
    /// Returns the number of evicted records, or `None` if the cycle panicked. A
    /// failed cycle is logged and leaves the store usable; the next cycle retries.
    pub fn run_once(&self) -> Option<usize> {
        match catch_unwind(AssertUnwindSafe(|| self.store.addr_book().evict_expired())) {
            Ok(evicted) => {
                self.metrics.inc_sweep_cycles();
                if evicted > 0 {
                    debug!(evicted, "swept expired peer addresses");
                }
                Some(evicted)
            }
            Err(_) => {
                self.metrics.inc_sweep_failures();
                error!("address sweep cycle panicked, retrying next interval");
                None
            }
        }
    }

    /// Spawn the sweep loop on the current tokio runtime.
    ///
    /// The loop runs until [`SweepHandle::shutdown`] is called or the handle is dropped.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn(self) -> SweepHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let interval = self.interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        debug!("address sweep shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        self.run_once();
                    }
                }
            }
        });

        debug!(?interval, "address sweep started");
        SweepHandle {
            shutdown_tx,
            task: Some(task),
        }
    }
}

/// Handle to a running sweep task. Dropping it signals the task to stop.
#[derive(Debug)]
pub struct SweepHandle {
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SweepHandle {
    /// Stop the sweep and wait for the task to exit.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "address sweep task failed");
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

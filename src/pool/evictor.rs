//! Background eviction scheduler.
//!
//! One task per registry, ticking at the configured eviction interval and
//! sweeping every keyed pool. The task has an explicit lifecycle: started
//! with the registry, stopped by a shutdown signal. It does not care whether
//! the registry currently holds pools, so an empty-then-repopulated registry
//! keeps sweeping without a restart.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Weak;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::debug;

use crate::pool::registry::RegistryInner;

// ============================================================================
// EvictionScheduler
// ============================================================================

/// Periodic sweep task over a registry's pools.
pub(crate) struct EvictionScheduler {
    shutdown_tx: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl EvictionScheduler {
    /// Spawns the sweep task.
    ///
    /// The task holds only a weak reference to the registry: if every
    /// registry handle is dropped without an explicit shutdown, the task
    /// notices on its next tick and exits on its own.
    pub(crate) fn start(registry: Weak<RegistryInner>, period: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            debug!(period_ms = period.as_millis() as u64, "eviction scheduler started");

            loop {
                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        let Some(inner) = registry.upgrade() else {
                            debug!("registry dropped, eviction scheduler exiting");
                            break;
                        };
                        let pools = inner.pools_snapshot();
                        drop(inner);

                        for pool in pools {
                            pool.sweep().await;
                        }
                    }
                }
            }

            debug!("eviction scheduler stopped");
        });

        Self {
            shutdown_tx,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Signals the task to stop and waits for it to finish. Idempotent.
    pub(crate) async fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
        let handle = { self.handle.lock().take() };
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

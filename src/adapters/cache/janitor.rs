//! Background expiry sweeper for the user cache.
//!
//! The janitor wakes every `cleanup_interval` and evicts entries idle for
//! longer than `ttl`. It is stopped through a watch channel; stopping is
//! idempotent, and `stop` waits for the task to exit so no sweep runs after
//! it returns.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};

use super::store::CacheStore;

/// Status of the cache janitor.
#[derive(Debug, Clone, Default)]
pub struct JanitorStatus {
    /// Whether the sweep loop is running.
    pub running: bool,
    /// Completed sweeps.
    pub total_sweeps: u64,
    /// Entries evicted across all sweeps.
    pub total_evicted: u64,
    /// When the last sweep finished.
    pub last_sweep: Option<Instant>,
}

/// Handle to the background sweep task.
pub struct Janitor {
    stop_tx: watch::Sender<bool>,
    handle: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    status: Arc<Mutex<JanitorStatus>>,
}

impl Janitor {
    /// Spawn the sweep loop on the current tokio runtime.
    ///
    /// `cleanup_interval` must be non-zero; `tokio::time::interval` panics
    /// otherwise. Callers validate configuration before spawning.
    pub fn spawn(store: Arc<CacheStore>, ttl: Duration, cleanup_interval: Duration) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let status = Arc::new(Mutex::new(JanitorStatus {
            running: true,
            ..JanitorStatus::default()
        }));

        let handle = tokio::spawn(run_loop(store, ttl, cleanup_interval, stop_rx, Arc::clone(&status)));

        Self {
            stop_tx,
            handle: tokio::sync::Mutex::new(Some(handle)),
            status,
        }
    }

    /// Signal the loop to exit without waiting for it.
    pub fn request_stop(&self) {
        self.stop_tx.send_replace(true);
    }

    /// Check if stop was requested.
    pub fn is_stop_requested(&self) -> bool {
        *self.stop_tx.borrow()
    }

    /// Signal the loop and wait until it has exited.
    ///
    /// Safe to call any number of times. Concurrent callers all return only
    /// after the task is gone.
    pub async fn stop(&self) {
        self.request_stop();

        let mut handle = self.handle.lock().await;
        if let Some(task) = handle.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "cache janitor task ended abnormally");
            }
        }
    }

    /// Get current janitor status.
    pub fn status(&self) -> JanitorStatus {
        self.status.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Drop for Janitor {
    fn drop(&mut self) {
        self.stop_tx.send_replace(true);
    }
}

async fn run_loop(
    store: Arc<CacheStore>,
    ttl: Duration,
    cleanup_interval: Duration,
    mut stop_rx: watch::Receiver<bool>,
    status: Arc<Mutex<JanitorStatus>>,
) {
    tracing::debug!(
        ttl_ms = ttl.as_millis(),
        interval_ms = cleanup_interval.as_millis(),
        "cache janitor started"
    );

    let mut ticker = interval(cleanup_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        if *stop_rx.borrow_and_update() {
            break;
        }

        tokio::select! {
            biased;
            // Err means the sender is gone, which is also a stop.
            _ = stop_rx.changed() => break,
            _ = ticker.tick() => {
                let evicted = store.sweep_expired(ttl, Instant::now());

                let mut current = status.lock().unwrap_or_else(PoisonError::into_inner);
                current.total_sweeps += 1;
                current.total_evicted += evicted as u64;
                current.last_sweep = Some(Instant::now());
                drop(current);

                if evicted > 0 {
                    tracing::debug!(evicted, remaining = store.len(), "evicted expired cache entries");
                }
            }
        }
    }

    status.lock().unwrap_or_else(PoisonError::into_inner).running = false;
    tracing::debug!("cache janitor stopped");
}

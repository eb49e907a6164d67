//! Background Expiry Sweeper
//!
//! Periodically scans the store and removes keys whose deadline has passed.
//! This is "active expiry", as opposed to the "lazy expiry" `Store::get` does
//! on access.
//!
//! ## Why Do We Need This?
//!
//! Lazy expiry only fires for keys somebody reads. A key that expires and is
//! never read again would otherwise stay in memory forever.
//!
//! ## Design
//!
//! The sweeper runs as a Tokio task and:
//! 1. Sleeps for a fixed interval (default: 1s)
//! 2. Wakes up and sweeps the whole store once
//! 3. Stops as soon as its handle is stopped or dropped

use crate::storage::Store;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Configuration for the expiry sweeper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiryConfig {
    /// Time between two sweeps (default: 1s)
    pub interval: Duration,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
        }
    }
}

/// A handle to the running expiry sweeper.
///
/// When this handle is dropped, the sweeper task will be stopped.
#[derive(Debug)]
pub struct ExpirySweeper {
    /// Sender to signal shutdown
    shutdown_tx: watch::Sender<bool>,
}

impl ExpirySweeper {
    /// Starts the expiry sweeper as a background task.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use sparkkv::storage::{Store, ExpirySweeper, ExpiryConfig};
    /// use std::sync::Arc;
    ///
    /// let store = Arc::new(Store::new());
    /// let sweeper = ExpirySweeper::start(store, ExpiryConfig::default());
    ///
    /// // Sweeper runs in the background...
    ///
    /// sweeper.stop();
    /// ```
    pub fn start(store: Arc<Store>, config: ExpiryConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!(
            interval_ms = config.interval.as_millis() as u64,
            "Background expiry sweeper started"
        );
        tokio::spawn(sweeper_loop(store, config, shutdown_rx));

        Self { shutdown_tx }
    }

    /// Stops the expiry sweeper.
    ///
    /// This is called automatically when the handle is dropped.
    pub fn stop(&self) {
        if !self.shutdown_tx.send_replace(true) {
            info!("Background expiry sweeper stopped");
        }
    }

    pub fn is_stopped(&self) -> bool {
        *self.shutdown_tx.borrow()
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The main sweeper loop.
async fn sweeper_loop(
    store: Arc<Store>,
    config: ExpiryConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    // A zero period would make tokio's interval panic
    let period = config.interval.max(Duration::from_millis(1));
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Expiry sweeper received shutdown signal");
                    return;
                }
            }
        }

        let removed = store.sweep_expired();
        if removed > 0 {
            debug!(
                removed = removed,
                keys_remaining = store.len(),
                "Sweep finished"
            );
        }
    }
}

/// Starts the expiry sweeper with default configuration.
///
/// Call once at process start and keep the handle alive for as long as
/// keys should be reclaimed.
pub fn start_expiry_sweeper(store: Arc<Store>) -> ExpirySweeper {
    ExpirySweeper::start(store, ExpiryConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoredObject;

    fn fast_config() -> ExpiryConfig {
        ExpiryConfig {
            interval: Duration::from_millis(20),
        }
    }

    #[tokio::test]
    async fn test_sweeper_removes_key_within_one_interval() {
        let store = Arc::new(Store::new());
        store.put("short".to_string(), StoredObject::new("value", 10));
        store.put("persistent".to_string(), StoredObject::new("value", 0));

        let _sweeper = ExpirySweeper::start(Arc::clone(&store), fast_config());

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(store.list_keys(), vec!["persistent".to_string()]);
        assert_eq!(store.len(), 1);
        // Removed by the sweep, never read
        assert_eq!(store.stats().expired_keys, 1);
        assert_eq!(store.stats().get_ops, 0);
    }

    #[tokio::test]
    async fn test_sweeper_cleans_many_keys() {
        let store = Arc::new(Store::new());

        for i in 0..100 {
            store.put(
                format!("key{}", i),
                StoredObject::with_ttl("value", Duration::from_millis(10)),
            );
        }
        store.put("persistent".to_string(), StoredObject::persistent("value"));
        assert_eq!(store.len(), 101);

        let _sweeper = ExpirySweeper::start(Arc::clone(&store), fast_config());
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(store.len(), 1);
        assert!(store.get("persistent").is_some());
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_drop() {
        let store = Arc::new(Store::new());

        {
            let sweeper = ExpirySweeper::start(Arc::clone(&store), fast_config());
            tokio::time::sleep(Duration::from_millis(50)).await;
            assert!(!sweeper.is_stopped());
            // Sweeper is dropped here
        }

        store.put(
            "key".to_string(),
            StoredObject::with_ttl("value", Duration::from_millis(10)),
        );

        tokio::time::sleep(Duration::from_millis(100)).await;

        // Nobody swept it: still held until a read evicts it lazily
        assert_eq!(store.len(), 1);
        assert!(store.get("key").is_none());
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_explicit_stop_is_idempotent() {
        let store = Arc::new(Store::new());
        let sweeper = start_expiry_sweeper(store);

        sweeper.stop();
        sweeper.stop();
        assert!(sweeper.is_stopped());
    }
}

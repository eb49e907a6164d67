//! Thread-Safe Key Space with Expiry Support
//!
//! This module implements the store that every connection reads and writes.
//!
//! ## Design Decisions
//!
//! 1. **One RwLock**: The whole mapping sits behind a single `parking_lot::RwLock`.
//!    Lookups and key listing share the lock; upserts, deletes and the sweep take it
//!    exclusively.
//! 2. **Fixed Deadlines**: An object's `expires_at` is computed once when it is built
//!    and never slides on access.
//! 3. **Lazy + Active Expiry**: `get` evicts an expired entry it runs into, and the
//!    background sweeper reclaims the ones nobody reads again.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                    Store                      │
//! │   RwLock<HashMap<String, StoredObject>>       │
//! └───────────────────────────────────────────────┘
//!      ▲ get / list_keys        ▲ put / del / sweep_expired
//!      │ (shared)               │ (exclusive)
//! ```

use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::info;

/// A stored value with its absolute expiry deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// The actual value stored
    pub value: Bytes,
    /// When this object expires (None = never expires)
    pub expires_at: Option<Instant>,
}

impl StoredObject {
    /// Creates an object that expires `duration_ms` milliseconds from now.
    ///
    /// A duration of zero or less means the object never expires.
    pub fn new(value: impl Into<Bytes>, duration_ms: i64) -> Self {
        match u64::try_from(duration_ms) {
            Ok(ms) if ms > 0 => Self::with_ttl(value, Duration::from_millis(ms)),
            _ => Self::persistent(value),
        }
    }

    /// Creates an object without expiry.
    pub fn persistent(value: impl Into<Bytes>) -> Self {
        Self {
            value: value.into(),
            expires_at: None,
        }
    }

    /// Creates an object that expires after `ttl`.
    ///
    /// A deadline too far out for `Instant` to represent never expires.
    pub fn with_ttl(value: impl Into<Bytes>, ttl: Duration) -> Self {
        Self {
            value: value.into(),
            expires_at: Instant::now().checked_add(ttl),
        }
    }

    /// Checks whether the deadline is at or before `now`.
    #[inline]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }

    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Returns the remaining time to live, or None if the object never expires.
    pub fn ttl(&self) -> Option<Duration> {
        self.expires_at
            .map(|exp| exp.saturating_duration_since(Instant::now()))
    }
}

/// Point-in-time counters for the store.
#[derive(Debug, Clone, Default)]
pub struct StorageStats {
    pub keys: u64,
    pub get_ops: u64,
    pub put_ops: u64,
    pub del_ops: u64,
    /// Keys removed because their deadline passed (lazily or by the sweeper)
    pub expired_keys: u64,
}

/// The process-wide key space.
///
/// Wrap it in an `Arc` and share it with every connection and the sweeper.
/// None of the operations can fail: missing keys simply make them no-ops.
///
/// # Example
///
/// ```
/// use sparkkv::storage::{Store, StoredObject};
/// use bytes::Bytes;
///
/// let store = Store::new();
/// store.put("name".to_string(), StoredObject::new("Ariz", 0));
///
/// let object = store.get("name").unwrap();
/// assert_eq!(object.value, Bytes::from("Ariz"));
/// assert!(store.del("name"));
/// assert!(store.get("name").is_none());
/// ```
#[derive(Default)]
pub struct Store {
    entries: RwLock<HashMap<String, StoredObject>>,

    get_count: AtomicU64,
    put_count: AtomicU64,
    del_count: AtomicU64,
    expired_count: AtomicU64,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("keys", &self.len())
            .field("get_count", &self.get_count.load(Ordering::Relaxed))
            .field("put_count", &self.put_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or wholesale replaces the object at `key`.
    pub fn put(&self, key: String, object: StoredObject) {
        self.put_count.fetch_add(1, Ordering::Relaxed);
        self.entries.write().insert(key, object);
    }

    /// Looks up `key`.
    ///
    /// An entry whose deadline has passed is evicted here and reported absent,
    /// even if the sweeper has not reached it yet.
    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.get_count.fetch_add(1, Ordering::Relaxed);

        // Fast path under the shared lock
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => return None,
                Some(object) if !object.is_expired() => return Some(object.clone()),
                Some(_) => {}
            }
        }

        // Expired: re-check under the write lock, a writer may have replaced it since
        let mut entries = self.entries.write();
        match entries.get(key).map(StoredObject::is_expired) {
            Some(true) => {
                entries.remove(key);
                self.expired_count.fetch_add(1, Ordering::Relaxed);
                None
            }
            Some(false) => entries.get(key).cloned(),
            None => None,
        }
    }

    /// Removes `key`, reporting whether it was present.
    pub fn del(&self, key: &str) -> bool {
        self.del_count.fetch_add(1, Ordering::Relaxed);
        self.entries.write().remove(key).is_some()
    }

    /// Snapshot of every key that has not expired.
    pub fn list_keys(&self) -> Vec<String> {
        let now = Instant::now();
        self.entries
            .read()
            .iter()
            .filter(|(_, object)| !object.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Removes every entry whose deadline is at or before now.
    ///
    /// Returns the number of keys removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();

        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, object)| object.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            entries.remove(key);
        }
        drop(entries);

        let removed = expired.len();
        if removed > 0 {
            self.expired_count
                .fetch_add(removed as u64, Ordering::Relaxed);
            info!(removed, "Cleaned up expired keys");
        }
        removed
    }

    /// Number of entries currently held, expired-but-unswept ones included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> StorageStats {
        StorageStats {
            keys: self.len() as u64,
            get_ops: self.get_count.load(Ordering::Relaxed),
            put_ops: self.put_count.load(Ordering::Relaxed),
            del_ops: self.del_count.load(Ordering::Relaxed),
            expired_keys: self.expired_count.load(Ordering::Relaxed),
        }
    }
}

//! Storage Module
//!
//! The in-memory key space plus the background task that reclaims expired keys.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                   Store                     │
//! │     RwLock<HashMap<String, StoredObject>>   │
//! └─────────────────────────────────────────────┘
//!                        ▲
//!                        │ sweep_expired() every interval
//!          ┌─────────────┴─────────────┐
//!          │       ExpirySweeper       │
//!          │  (Background Tokio Task)  │
//!          └───────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use sparkkv::storage::{Store, StoredObject};
//! use bytes::Bytes;
//!
//! let store = Store::new();
//!
//! // No expiry
//! store.put("name".to_string(), StoredObject::new("Ariz", 0));
//! assert_eq!(store.get("name").map(|o| o.value), Some(Bytes::from("Ariz")));
//!
//! // Expires an hour from now
//! store.put("session".to_string(), StoredObject::new("token123", 3_600_000));
//! assert_eq!(store.list_keys().len(), 2);
//! ```

pub mod engine;
pub mod expiry;

// Re-export commonly used types
pub use engine::{StorageStats, Store, StoredObject};
pub use expiry::{start_expiry_sweeper, ExpiryConfig, ExpirySweeper};

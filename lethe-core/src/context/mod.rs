//! Context entries and the store that owns them
//!
//! A [`ContextEntry`] is an opaque, sized, importance-scored unit of context.
//! The [`ContextStore`] maps ids to entries and keeps access bookkeeping
//! (`last_accessed`, `access_count`) current on every read.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use lethe_core::clock::SystemClock;
//! use lethe_core::context::{ContextEntry, ContextStore};
//!
//! let mut store = ContextStore::new(Arc::new(SystemClock::new()));
//! store.add(ContextEntry::new("turn-1", "user asked about eviction", 26).with_importance(0.8));
//!
//! let entry = store.get("turn-1").unwrap();
//! assert_eq!(entry.access_count, 1);
//! ```

mod entry;
mod store;

pub use entry::{clamp_importance, CompressedPayload, ContextEntry, ContextPayload, PayloadKind};
pub use store::ContextStore;

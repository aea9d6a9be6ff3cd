//! # Lethe - Context Eviction for Long-Running Agents
//!
//! Lethe (Λήθη) keeps a bounded, in-memory pool of context entries and decides
//! what to forget when the pool grows too large:
//! - Context store with access bookkeeping and clamped importance scores
//! - Threshold-gated eviction policies (LRU, importance, size, hybrid)
//! - Whitespace-collapsing compression of oversized survivors
//! - Recovery points for on-demand and automatic checkpoint/restore
//! - A pressure monitor that samples usage, predicts trends and triggers eviction
//!
//! ## Quick Start
//!
//! ```rust
//! use lethe_core::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<()> {
//! let config = LetheConfig::builder()
//!     .policies(vec![
//!         EvictionPolicy::new(EvictionStrategy::Lru, 0.75).with_min_keep_count(1),
//!     ])
//!     .enable_compression(false)
//!     .build();
//!
//! let engine = ContextEvictionEngine::builder(config)
//!     .capacity(FixedCapacity(1_000))
//!     .build()?;
//!
//! engine.add_context(ContextEntry::new("a", "first", 500)).await;
//! engine.add_context(ContextEntry::new("b", "second", 500)).await;
//!
//! let event = MemoryPressureEvent::new(3, engine.current_usage().await, 0.0);
//! let result = engine.handle_memory_pressure(&event).await;
//! assert_eq!(result.evicted, vec!["a"]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **Store**: owns entries; every read updates `last_accessed`/`access_count`
//! - **Strategies**: pure victim ranking over a store snapshot
//! - **Coordinator**: picks a policy per pressure event, evicts, compresses
//! - **Recovery**: deep-copy snapshots restorable by id
//! - **Monitor**: periodic, non-overlapping ticks driven by tokio

pub mod clock;
pub mod compression;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod events;
pub mod eviction;
pub mod pressure;
pub mod recovery;

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::compression::{CompressionResult, Compressor};
    pub use crate::config::{ConfigBuilder, LetheConfig};
    pub use crate::context::{ContextEntry, ContextPayload, ContextStore, PayloadKind};
    pub use crate::engine::{ContextEvictionEngine, EngineBuilder, EngineStats, TickOutcome};
    pub use crate::error::{LetheError, Result};
    pub use crate::events::{EvictionHook, HookRegistry, LoggingHook};
    pub use crate::eviction::{
        EvictionCoordinator, EvictionPolicy, EvictionResult, EvictionStrategy, VictimSelector,
    };
    pub use crate::pressure::{
        CapacityProvider, FixedCapacity, MemoryPressureEvent, PressureLevel, PressureMonitor,
    };
    pub use crate::recovery::{RecoveryPoint, RecoveryPointManager, RecoveryReason};
}

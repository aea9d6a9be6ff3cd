//! Eviction policies, victim selection and cycle coordination
//!
//! A cycle is driven by a [`MemoryPressureEvent`](crate::pressure::MemoryPressureEvent):
//!
//! 1. the applicable [`EvictionPolicy`] is the one with the highest threshold
//!    not above the current usage
//! 2. its strategy ranks a store snapshot and picks victims, always leaving
//!    `min_keep_count` entries
//! 3. victims are removed; surviving entries above the compression threshold
//!    are compressed when compression is enabled
//! 4. the [`EvictionResult`] is appended to bounded history

mod coordinator;
mod policy;
mod strategies;

pub use coordinator::{EvictionCoordinator, EvictionResult};
pub use policy::{select_policy, EvictionPolicy, EvictionStrategy, DEFAULT_COMPRESSION_THRESHOLD};
pub use strategies::{
    select_victims, surplus, HybridSelector, ImportanceSelector, LruSelector, SizeSelector,
    VictimSelector,
};

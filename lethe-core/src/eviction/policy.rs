//! Eviction policies

use serde::{Deserialize, Serialize};

use super::strategies::{
    HybridSelector, ImportanceSelector, LruSelector, SizeSelector, VictimSelector,
};

/// Compression threshold used when a policy does not set one
pub const DEFAULT_COMPRESSION_THRESHOLD: u64 = 10_000;

/// Victim ranking strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionStrategy {
    /// Least recently accessed first
    Lru,
    /// Lowest importance first
    Importance,
    /// Smallest entries first
    Size,
    /// Weighted recency, importance and size
    Hybrid,
}

impl EvictionStrategy {
    /// Selector implementing this strategy
    pub fn selector(&self) -> &'static dyn VictimSelector {
        match self {
            EvictionStrategy::Lru => &LruSelector,
            EvictionStrategy::Importance => &ImportanceSelector,
            EvictionStrategy::Size => &SizeSelector,
            EvictionStrategy::Hybrid => &HybridSelector,
        }
    }
}

/// Threshold-gated eviction rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvictionPolicy {
    /// Ranking strategy
    pub strategy: EvictionStrategy,

    /// Minimum usage fraction at which the policy applies (0.0-1.0)
    pub threshold: f64,

    /// Entries that must survive a single cycle
    #[serde(default)]
    pub min_keep_count: usize,

    /// Surviving entries larger than this (bytes) are compressed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression_threshold: Option<u64>,
}

impl EvictionPolicy {
    /// Create a policy with no floor and the default compression threshold
    pub fn new(strategy: EvictionStrategy, threshold: f64) -> Self {
        Self {
            strategy,
            threshold,
            min_keep_count: 0,
            compression_threshold: None,
        }
    }

    /// Set the minimum number of entries to keep
    pub fn with_min_keep_count(mut self, count: usize) -> Self {
        self.min_keep_count = count;
        self
    }

    /// Set the compression threshold in bytes
    pub fn with_compression_threshold(mut self, bytes: u64) -> Self {
        self.compression_threshold = Some(bytes);
        self
    }

    /// Size above which surviving entries are compressed
    pub fn effective_compression_threshold(&self) -> u64 {
        self.compression_threshold
            .unwrap_or(DEFAULT_COMPRESSION_THRESHOLD)
    }

    /// Whether the policy applies at the given usage
    pub fn applies_at(&self, usage: f64) -> bool {
        self.threshold <= usage
    }
}

/// Pick the applicable policy with the highest threshold
///
/// On equal thresholds the earlier policy in `policies` wins.
pub fn select_policy(policies: &[EvictionPolicy], usage: f64) -> Option<&EvictionPolicy> {
    policies
        .iter()
        .filter(|p| p.applies_at(usage))
        .fold(None, |best: Option<&EvictionPolicy>, p| match best {
            Some(b) if b.threshold >= p.threshold => Some(b),
            _ => Some(p),
        })
}

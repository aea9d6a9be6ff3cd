//! Eviction cycle coordination

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::policy::{select_policy, EvictionPolicy, EvictionStrategy};
use super::strategies::select_victims;
use crate::compression::{signed_bytes, CompressionResult, Compressor};
use crate::context::ContextStore;
use crate::pressure::MemoryPressureEvent;

/// Outcome of one eviction cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvictionResult {
    /// Ids removed from the store
    pub evicted: Vec<String>,

    /// Ids compressed in place
    pub compressed: Vec<String>,

    /// Ids restored during the cycle; currently never populated
    pub recovered: Vec<String>,

    /// Bytes released; compression that grows an entry counts negative
    pub memory_freed: i64,

    /// Cycle time (ms since epoch)
    pub timestamp: u64,

    /// Strategy of the policy that ran, if any applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<EvictionStrategy>,
}

impl EvictionResult {
    /// Result for a cycle where nothing happened
    pub fn empty(timestamp: u64) -> Self {
        Self {
            evicted: Vec::new(),
            compressed: Vec::new(),
            recovered: Vec::new(),
            memory_freed: 0,
            timestamp,
            strategy: None,
        }
    }

    /// Whether the cycle changed nothing
    pub fn is_empty(&self) -> bool {
        self.evicted.is_empty() && self.compressed.is_empty() && self.recovered.is_empty()
    }
}

/// Runs eviction cycles against a store and keeps bounded history
pub struct EvictionCoordinator {
    policies: Vec<EvictionPolicy>,
    enable_compression: bool,
    compressor: Compressor,
    history: VecDeque<EvictionResult>,
    history_limit: usize,
    evicted_total: u64,
    compressed_total: u64,
}

impl EvictionCoordinator {
    /// Create a coordinator over the configured policies
    pub fn new(
        policies: Vec<EvictionPolicy>,
        enable_compression: bool,
        history_limit: usize,
    ) -> Self {
        Self {
            policies,
            enable_compression,
            compressor: Compressor::new(),
            history: VecDeque::with_capacity(history_limit),
            history_limit: history_limit.max(1),
            evicted_total: 0,
            compressed_total: 0,
        }
    }

    /// Configured policies
    pub fn policies(&self) -> &[EvictionPolicy] {
        &self.policies
    }

    /// Policy that would run at `usage`
    pub fn policy_for(&self, usage: f64) -> Option<&EvictionPolicy> {
        select_policy(&self.policies, usage)
    }

    /// Run one cycle for a pressure event
    ///
    /// Picks the policy with the highest threshold not above the event's
    /// usage, evicts its victims, then compresses oversized survivors.
    /// Returns an empty result, unrecorded, when no policy applies.
    pub fn handle(
        &mut self,
        event: &MemoryPressureEvent,
        store: &mut ContextStore,
        now: u64,
    ) -> EvictionResult {
        let Some(policy) = select_policy(&self.policies, event.current_usage).cloned() else {
            debug!(usage = event.current_usage, "No eviction policy applies");
            return EvictionResult::empty(now);
        };

        let mut result = EvictionResult::empty(now);
        result.strategy = Some(policy.strategy);

        let snapshot = store.snapshot();
        let victims = select_victims(&snapshot, &policy);
        let victim_ids: HashSet<&str> = victims.iter().map(|v| v.id.as_str()).collect();

        for victim in &victims {
            match store.remove(&victim.id) {
                Some(removed) => {
                    result.memory_freed =
                        result.memory_freed.saturating_add(signed_bytes(removed.size));
                    result.evicted.push(removed.id);
                }
                None => debug!(context_id = %victim.id, "Victim already gone"),
            }
        }

        if self.enable_compression {
            let threshold = policy.effective_compression_threshold();
            for survivor in snapshot
                .iter()
                .filter(|e| !victim_ids.contains(e.id.as_str()))
            {
                let compressed = self.compress_if_oversized(store, &survivor.id, threshold);
                if let Some(compression) = compressed {
                    result.memory_freed =
                        result.memory_freed.saturating_add(compression.bytes_saved());
                    result.compressed.push(compression.id);
                }
            }
        }

        self.evicted_total += result.evicted.len() as u64;
        self.compressed_total += result.compressed.len() as u64;

        info!(
            strategy = ?policy.strategy,
            level = ?event.pressure_level,
            evicted = result.evicted.len(),
            compressed = result.compressed.len(),
            memory_freed = result.memory_freed,
            "Eviction cycle complete"
        );

        self.record(result.clone());
        result
    }

    /// Compress a single entry regardless of policy thresholds
    pub fn compress_entry(
        &mut self,
        store: &mut ContextStore,
        id: &str,
    ) -> Option<CompressionResult> {
        let entry = store.get_mut(id)?;
        let result = self.compressor.compress(entry);
        if !result.is_no_op() {
            self.compressed_total += 1;
        }
        Some(result)
    }

    /// The compressor used by this coordinator
    pub fn compressor(&self) -> &Compressor {
        &self.compressor
    }

    fn compress_if_oversized(
        &self,
        store: &mut ContextStore,
        id: &str,
        threshold: u64,
    ) -> Option<CompressionResult> {
        let entry = store.get_mut(id)?;
        if entry.size <= threshold || entry.is_compressed() {
            return None;
        }

        let result = self.compressor.compress(entry);
        (!result.is_no_op()).then_some(result)
    }

    fn record(&mut self, result: EvictionResult) {
        while self.history.len() >= self.history_limit {
            self.history.pop_front();
        }
        self.history.push_back(result);
    }

    /// Recorded cycles, oldest first
    pub fn history(&self) -> Vec<EvictionResult> {
        self.history.iter().cloned().collect()
    }

    /// Number of recorded cycles
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Lifetime count of evicted entries
    pub fn evicted_total(&self) -> u64 {
        self.evicted_total
    }

    /// Lifetime count of compressed entries
    pub fn compressed_total(&self) -> u64 {
        self.compressed_total
    }
}

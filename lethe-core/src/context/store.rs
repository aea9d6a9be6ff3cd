//! In-memory context store with access bookkeeping

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::entry::{clamp_importance, ContextEntry};
use crate::clock::Clock;

#[derive(Debug, Clone)]
struct StoredEntry {
    /// Insertion sequence, fixes snapshot order
    seq: u64,
    entry: ContextEntry,
}

/// Owns every live [`ContextEntry`], keyed by id
///
/// The store is not synchronized on its own; the engine guards it with a
/// single lock so mutations and eviction cycles never interleave.
pub struct ContextStore {
    entries: HashMap<String, StoredEntry>,
    next_seq: u64,
    clock: Arc<dyn Clock>,
}

impl ContextStore {
    /// Create an empty store reading time from `clock`
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            next_seq: 0,
            clock,
        }
    }

    /// Insert or overwrite an entry; importance is clamped
    ///
    /// Entries built without a pinned timestamp are stamped from the store's
    /// clock. Overwriting keeps the original insertion position.
    pub fn add(&mut self, mut entry: ContextEntry) {
        entry.importance = clamp_importance(entry.importance);
        if entry.stamp_on_insert {
            let now = self.clock.now_millis();
            entry.created_at = now;
            entry.last_accessed = now;
            entry.stamp_on_insert = false;
        }

        if let Some(stored) = self.entries.get_mut(&entry.id) {
            debug!(context_id = %entry.id, "Overwriting context entry");
            stored.entry = entry;
            return;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries
            .insert(entry.id.clone(), StoredEntry { seq, entry });
    }

    /// Read an entry, updating its access time and count
    pub fn get(&mut self, id: &str) -> Option<ContextEntry> {
        let now = self.clock.now_millis();
        let stored = self.entries.get_mut(id)?;
        stored.entry.last_accessed = now;
        stored.entry.access_count += 1;
        Some(stored.entry.clone())
    }

    /// Read an entry without touching access bookkeeping
    pub fn peek(&self, id: &str) -> Option<&ContextEntry> {
        self.entries.get(id).map(|s| &s.entry)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut ContextEntry> {
        self.entries.get_mut(id).map(|s| &mut s.entry)
    }

    /// Remove an entry, returning it if it existed
    pub fn remove(&mut self, id: &str) -> Option<ContextEntry> {
        self.entries.remove(id).map(|s| s.entry)
    }

    /// Set importance (clamped); returns false for unknown ids
    pub fn update_importance(&mut self, id: &str, value: f64) -> bool {
        match self.entries.get_mut(id) {
            Some(stored) => {
                stored.entry.importance = clamp_importance(value);
                true
            }
            None => false,
        }
    }

    /// Point-in-time copy of all entries in insertion order
    pub fn snapshot(&self) -> Vec<ContextEntry> {
        let mut stored: Vec<&StoredEntry> = self.entries.values().collect();
        stored.sort_by_key(|s| s.seq);
        stored.into_iter().map(|s| s.entry.clone()).collect()
    }

    /// Whether an entry exists
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of entry sizes in bytes
    pub fn total_size(&self) -> u64 {
        self.entries.values().map(|s| s.entry.size).sum()
    }
}

//! Recovery points: independent snapshots of single entries
//!
//! A [`RecoveryPoint`] holds a deep copy of one [`ContextEntry`]. Restoring
//! replaces the live entry wholesale. Snapshots are taken on demand or
//! automatically for important entries on monitor ticks.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::{ContextEntry, ContextStore};

/// Why a recovery point was taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryReason {
    /// Requested by a caller
    ManualCheckpoint,
    /// Taken by the monitor for an important entry
    AutomaticCheckpoint,
}

/// Metadata attached to a recovery point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryMetadata {
    /// Why the point was taken
    pub reason: RecoveryReason,

    /// Id of the entry the snapshot belongs to
    pub context_id: String,
}

/// Snapshot of one entry at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryPoint {
    /// `"{context_id}-{timestamp}"`, suffixed if that id is taken
    pub id: String,

    /// Capture time (ms since epoch)
    pub timestamp: u64,

    /// Entry as it was at capture time
    pub context_snapshot: ContextEntry,

    /// Capture metadata
    pub metadata: RecoveryMetadata,
}

/// Settings for [`RecoveryPointManager`]
#[derive(Debug, Clone)]
pub struct RecoverySettings {
    /// Whether checkpoints and restores are allowed at all
    pub enabled: bool,

    /// Minimum time between automatic passes (ms)
    pub interval_ms: u64,

    /// Entries above this importance are captured automatically
    pub auto_importance: f64,

    /// Oldest points are dropped beyond this count
    pub max_points: usize,
}

impl Default for RecoverySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 300_000,
            auto_importance: 0.7,
            max_points: 1_000,
        }
    }
}

/// Owns recovery points independently of the store
pub struct RecoveryPointManager {
    settings: RecoverySettings,
    points: HashMap<String, RecoveryPoint>,
    /// Point ids in creation order
    order: VecDeque<String>,
    last_automatic: Option<u64>,
}

impl RecoveryPointManager {
    /// Create a manager with the given settings
    pub fn new(settings: RecoverySettings) -> Self {
        Self {
            settings,
            points: HashMap::new(),
            order: VecDeque::new(),
            last_automatic: None,
        }
    }

    /// Whether recovery is enabled
    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    /// Snapshot the entry `context_id`, returning the new point id
    ///
    /// Returns `None` when recovery is disabled or the entry is unknown.
    pub fn create(
        &mut self,
        store: &ContextStore,
        context_id: &str,
        reason: RecoveryReason,
        now: u64,
    ) -> Option<String> {
        if !self.settings.enabled {
            return None;
        }
        let snapshot = store.peek(context_id)?.clone();

        let id = self.unique_id(context_id, now);
        let point = RecoveryPoint {
            id: id.clone(),
            timestamp: now,
            context_snapshot: snapshot,
            metadata: RecoveryMetadata {
                reason,
                context_id: context_id.to_string(),
            },
        };

        debug!(recovery_point = %id, context_id, ?reason, "Created recovery point");

        self.points.insert(id.clone(), point);
        self.order.push_back(id.clone());
        self.enforce_limit();

        Some(id)
    }

    /// Overwrite the live entry with the point's snapshot
    ///
    /// Returns the restored context id, or `None` when recovery is disabled
    /// or the point is unknown.
    pub fn restore(&self, point_id: &str, store: &mut ContextStore) -> Option<String> {
        if !self.settings.enabled {
            return None;
        }
        let point = self.points.get(point_id)?;

        store.add(point.context_snapshot.clone());
        debug!(
            recovery_point = point_id,
            context_id = %point.metadata.context_id,
            "Restored context from recovery point"
        );

        Some(point.metadata.context_id.clone())
    }

    /// Capture every important entry if the checkpoint interval has elapsed
    ///
    /// The first call always runs. A pass captures at most `max_points`
    /// entries, most important first, so none of its own points are dropped
    /// by the cap. Returns the ids of points created.
    pub fn auto_checkpoint(&mut self, store: &ContextStore, now: u64) -> Vec<String> {
        if !self.settings.enabled {
            return Vec::new();
        }
        if let Some(last) = self.last_automatic {
            if now.saturating_sub(last) < self.settings.interval_ms {
                return Vec::new();
            }
        }
        self.last_automatic = Some(now);

        let mut important: Vec<ContextEntry> = store
            .snapshot()
            .into_iter()
            .filter(|e| e.importance > self.settings.auto_importance)
            .collect();
        important.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        important.truncate(self.settings.max_points.max(1));

        important
            .iter()
            .map(|e| e.id.as_str())
            .filter_map(|id| self.create(store, id, RecoveryReason::AutomaticCheckpoint, now))
            .collect()
    }

    /// Look up a point
    pub fn get(&self, point_id: &str) -> Option<&RecoveryPoint> {
        self.points.get(point_id)
    }

    /// Points for one entry, oldest first
    pub fn list(&self, context_id: &str) -> Vec<RecoveryPoint> {
        self.order
            .iter()
            .filter_map(|id| self.points.get(id))
            .filter(|p| p.metadata.context_id == context_id)
            .cloned()
            .collect()
    }

    /// Delete a point; returns false if it did not exist
    pub fn delete(&mut self, point_id: &str) -> bool {
        if self.points.remove(point_id).is_none() {
            return false;
        }
        self.order.retain(|id| id != point_id);
        true
    }

    /// Number of stored points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether no points are stored
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn unique_id(&self, context_id: &str, now: u64) -> String {
        let base = format!("{}-{}", context_id, now);
        if !self.points.contains_key(&base) {
            return base;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{}-{}", base, n);
            if !self.points.contains_key(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    fn enforce_limit(&mut self) {
        while self.points.len() > self.settings.max_points.max(1) {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.points.remove(&oldest);
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::Arc;

    fn setup() -> (RecoveryPointManager, ContextStore) {
        let store = ContextStore::new(Arc::new(ManualClock::new(0)));
        (RecoveryPointManager::new(RecoverySettings::default()), store)
    }

    #[test]
    fn test_create_and_restore() {
        let (mut manager, mut store) = setup();
        store.add(ContextEntry::new("a", "x", 1).with_importance(0.6));

        let point_id = manager
            .create(&store, "a", RecoveryReason::ManualCheckpoint, 42)
            .expect("point created");
        assert_eq!(point_id, "a-42");

        store.update_importance("a", 0.0);
        assert_eq!(manager.restore(&point_id, &mut store), Some("a".to_string()));
        assert_eq!(store.peek("a").map(|e| e.importance), Some(0.6));
    }

    #[test]
    fn test_snapshot_is_independent_of_live_entry() {
        let (mut manager, mut store) = setup();
        store.add(ContextEntry::new("a", "x", 1).with_importance(0.6));
        let point_id = manager
            .create(&store, "a", RecoveryReason::ManualCheckpoint, 1)
            .expect("point created");

        store.update_importance("a", 0.1);
        let point = manager.get(&point_id).expect("point");
        assert_eq!(point.context_snapshot.importance, 0.6);

        manager.restore(&point_id, &mut store);
        store.update_importance("a", 0.2);
        let point = manager.get(&point_id).expect("point");
        assert_eq!(point.context_snapshot.importance, 0.6);
    }

    #[test]
    fn test_restore_recreates_removed_entry() {
        let (mut manager, mut store) = setup();
        store.add(ContextEntry::new("a", "x", 1));
        let point_id = manager
            .create(&store, "a", RecoveryReason::ManualCheckpoint, 1)
            .expect("point created");

        store.remove("a");
        assert!(manager.restore(&point_id, &mut store).is_some());
        assert!(store.contains("a"));
    }

    #[test]
    fn test_unknown_ids_are_silent() {
        let (mut manager, mut store) = setup();
        assert!(manager
            .create(&store, "missing", RecoveryReason::ManualCheckpoint, 1)
            .is_none());
        assert!(manager.restore("missing-1", &mut store).is_none());
        assert!(!manager.delete("missing-1"));
    }

    #[test]
    fn test_disabled_recovery_is_no_op() {
        let mut manager = RecoveryPointManager::new(RecoverySettings {
            enabled: false,
            ..Default::default()
        });
        let mut store = ContextStore::new(Arc::new(ManualClock::new(0)));
        store.add(ContextEntry::new("a", "x", 1).with_importance(0.9));

        assert!(manager
            .create(&store, "a", RecoveryReason::ManualCheckpoint, 1)
            .is_none());
        assert!(manager.auto_checkpoint(&store, 1).is_empty());
        assert!(manager.is_empty());
    }

    #[test]
    fn test_ids_are_unique_within_same_millisecond() {
        let (mut manager, mut store) = setup();
        store.add(ContextEntry::new("a", "x", 1));

        let first = manager.create(&store, "a", RecoveryReason::ManualCheckpoint, 5);
        let second = manager.create(&store, "a", RecoveryReason::ManualCheckpoint, 5);

        assert_eq!(first.as_deref(), Some("a-5"));
        assert_eq!(second.as_deref(), Some("a-5-1"));
        assert_eq!(manager.list("a").len(), 2);
    }

    #[test]
    fn test_auto_checkpoint_captures_important_entries() {
        let (mut manager, mut store) = setup();
        store.add(ContextEntry::new("hot", "x", 1).with_importance(0.8));
        store.add(ContextEntry::new("edge", "x", 1).with_importance(0.7));
        store.add(ContextEntry::new("cold", "x", 1).with_importance(0.2));

        let created = manager.auto_checkpoint(&store, 1_000);
        assert_eq!(created, vec!["hot-1000"]);

        let point = manager.get("hot-1000").expect("point");
        assert_eq!(point.metadata.reason, RecoveryReason::AutomaticCheckpoint);
    }

    #[test]
    fn test_auto_checkpoint_respects_interval() {
        let (mut manager, mut store) = setup();
        store.add(ContextEntry::new("hot", "x", 1).with_importance(0.9));

        assert_eq!(manager.auto_checkpoint(&store, 0).len(), 1);
        assert!(manager.auto_checkpoint(&store, 299_999).is_empty());
        assert_eq!(manager.auto_checkpoint(&store, 300_000).len(), 1);
    }

    #[test]
    fn test_oldest_points_dropped_beyond_limit() {
        let mut manager = RecoveryPointManager::new(RecoverySettings {
            max_points: 2,
            ..Default::default()
        });
        let mut store = ContextStore::new(Arc::new(ManualClock::new(0)));
        store.add(ContextEntry::new("a", "x", 1));

        for t in 1..=3 {
            manager.create(&store, "a", RecoveryReason::ManualCheckpoint, t);
        }

        assert_eq!(manager.len(), 2);
        assert!(manager.get("a-1").is_none());
        let ids: Vec<String> = manager.list("a").into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["a-2", "a-3"]);
    }

    #[test]
    fn test_delete() {
        let (mut manager, mut store) = setup();
        store.add(ContextEntry::new("a", "x", 1));
        let id = manager
            .create(&store, "a", RecoveryReason::ManualCheckpoint, 1)
            .expect("point created");

        assert!(manager.delete(&id));
        assert!(manager.list("a").is_empty());
    }

    #[test]
    fn test_auto_pass_never_exceeds_cap() {
        let settings = RecoverySettings {
            max_points: 2,
            ..RecoverySettings::default()
        };
        let mut manager = RecoveryPointManager::new(settings);
        let mut store = ContextStore::new(Arc::new(ManualClock::new(0)));
        store.add(ContextEntry::new("a", "x", 1).with_importance(0.8));
        store.add(ContextEntry::new("b", "x", 1).with_importance(0.95));
        store.add(ContextEntry::new("c", "x", 1).with_importance(0.9));

        let created = manager.auto_checkpoint(&store, 10);
        assert_eq!(created, vec!["b-10", "c-10"]);
        assert!(created.iter().all(|id| manager.get(id).is_some()));
        assert_eq!(manager.len(), 2);
    }
}

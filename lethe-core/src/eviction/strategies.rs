//! Victim selection strategies
//!
//! Every selector ranks a snapshot and returns the lowest-ranked entries,
//! leaving at least `min_keep_count` entries behind. Sorting is stable, so
//! ties keep snapshot order.

use std::cmp::Ordering;

use super::policy::EvictionPolicy;
use crate::context::ContextEntry;

/// Trait for victim selection strategies
pub trait VictimSelector: Send + Sync {
    /// Choose victims from `entries`, most evictable first
    fn select<'a>(
        &self,
        entries: &'a [ContextEntry],
        policy: &EvictionPolicy,
    ) -> Vec<&'a ContextEntry>;

    /// Get the strategy name
    fn name(&self) -> &'static str;
}

/// Number of entries a cycle may remove
pub fn surplus(entry_count: usize, min_keep_count: usize) -> usize {
    entry_count.saturating_sub(min_keep_count)
}

fn rank_and_take<'a, F>(
    entries: &'a [ContextEntry],
    policy: &EvictionPolicy,
    mut compare: F,
) -> Vec<&'a ContextEntry>
where
    F: FnMut(&ContextEntry, &ContextEntry) -> Ordering,
{
    let mut ranked: Vec<&ContextEntry> = entries.iter().collect();
    ranked.sort_by(|a, b| compare(a, b));
    ranked.truncate(surplus(entries.len(), policy.min_keep_count));
    ranked
}

/// Least recently accessed first
#[derive(Debug, Clone, Copy, Default)]
pub struct LruSelector;

impl VictimSelector for LruSelector {
    fn select<'a>(
        &self,
        entries: &'a [ContextEntry],
        policy: &EvictionPolicy,
    ) -> Vec<&'a ContextEntry> {
        rank_and_take(entries, policy, |a, b| a.last_accessed.cmp(&b.last_accessed))
    }

    fn name(&self) -> &'static str {
        "lru"
    }
}

/// Lowest importance first
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportanceSelector;

impl VictimSelector for ImportanceSelector {
    fn select<'a>(
        &self,
        entries: &'a [ContextEntry],
        policy: &EvictionPolicy,
    ) -> Vec<&'a ContextEntry> {
        rank_and_take(entries, policy, |a, b| a.importance.total_cmp(&b.importance))
    }

    fn name(&self) -> &'static str {
        "importance"
    }
}

/// Smallest entries first
///
/// This relieves entry-count pressure rather than byte pressure: many small
/// entries go before one large one.
#[derive(Debug, Clone, Copy, Default)]
pub struct SizeSelector;

impl VictimSelector for SizeSelector {
    fn select<'a>(
        &self,
        entries: &'a [ContextEntry],
        policy: &EvictionPolicy,
    ) -> Vec<&'a ContextEntry> {
        rank_and_take(entries, policy, |a, b| a.size.cmp(&b.size))
    }

    fn name(&self) -> &'static str {
        "size"
    }
}

/// Lowest hybrid score first
#[derive(Debug, Clone, Copy, Default)]
pub struct HybridSelector;

impl HybridSelector {
    /// `last_accessed + importance * 1e9 + size / 1000`
    pub fn score(entry: &ContextEntry) -> f64 {
        entry.last_accessed as f64 + entry.importance * 1e9 + entry.size as f64 / 1000.0
    }
}

impl VictimSelector for HybridSelector {
    fn select<'a>(
        &self,
        entries: &'a [ContextEntry],
        policy: &EvictionPolicy,
    ) -> Vec<&'a ContextEntry> {
        rank_and_take(entries, policy, |a, b| {
            Self::score(a).total_cmp(&Self::score(b))
        })
    }

    fn name(&self) -> &'static str {
        "hybrid"
    }
}

/// Run the policy's strategy over `entries`
pub fn select_victims<'a>(
    entries: &'a [ContextEntry],
    policy: &EvictionPolicy,
) -> Vec<&'a ContextEntry> {
    policy.strategy.selector().select(entries, policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eviction::EvictionStrategy;

    fn entry(id: &str, last_accessed: u64, importance: f64, size: u64) -> ContextEntry {
        ContextEntry::new(id, "x", size)
            .with_timestamp(last_accessed)
            .with_importance(importance)
    }

    fn ids(victims: &[&ContextEntry]) -> Vec<String> {
        victims.iter().map(|e| e.id.clone()).collect()
    }

    fn pool() -> Vec<ContextEntry> {
        vec![
            entry("a", 300, 0.9, 50),
            entry("b", 100, 0.5, 500),
            entry("c", 200, 0.1, 5),
            entry("d", 400, 0.3, 5_000),
        ]
    }

    #[test]
    fn test_lru_evicts_oldest_accessed() {
        let pool = pool();
        let policy = EvictionPolicy::new(EvictionStrategy::Lru, 0.5).with_min_keep_count(2);
        assert_eq!(ids(&select_victims(&pool, &policy)), vec!["b", "c"]);
    }

    #[test]
    fn test_importance_evicts_least_important() {
        let pool = pool();
        let policy =
            EvictionPolicy::new(EvictionStrategy::Importance, 0.5).with_min_keep_count(1);
        assert_eq!(ids(&select_victims(&pool, &policy)), vec!["c", "d", "b"]);
    }

    #[test]
    fn test_size_evicts_smallest() {
        let pool = pool();
        let policy = EvictionPolicy::new(EvictionStrategy::Size, 0.5).with_min_keep_count(2);
        assert_eq!(ids(&select_victims(&pool, &policy)), vec!["c", "a"]);
    }

    #[test]
    fn test_hybrid_importance_dominates() {
        let pool = vec![
            entry("recent-unimportant", 2_000, 0.0, 10),
            entry("old-important", 1_000, 1.0, 10),
            entry("old-unimportant", 1_000, 0.0, 10),
        ];
        let policy = EvictionPolicy::new(EvictionStrategy::Hybrid, 0.5).with_min_keep_count(1);

        assert_eq!(
            ids(&select_victims(&pool, &policy)),
            vec!["old-unimportant", "recent-unimportant"]
        );
    }

    #[test]
    fn test_hybrid_score() {
        let e = entry("a", 1_000, 0.5, 2_000);
        assert_eq!(HybridSelector::score(&e), 1_000.0 + 0.5e9 + 2.0);
    }

    #[test]
    fn test_ties_keep_snapshot_order() {
        let pool = vec![entry("x", 10, 0.5, 1), entry("y", 10, 0.5, 1), entry("z", 10, 0.5, 1)];
        for strategy in [
            EvictionStrategy::Lru,
            EvictionStrategy::Importance,
            EvictionStrategy::Size,
            EvictionStrategy::Hybrid,
        ] {
            let policy = EvictionPolicy::new(strategy, 0.0).with_min_keep_count(1);
            assert_eq!(ids(&select_victims(&pool, &policy)), vec!["x", "y"]);
        }
    }

    #[test]
    fn test_floor_is_respected() {
        let pool = pool();
        for keep in 0..=6 {
            let policy =
                EvictionPolicy::new(EvictionStrategy::Hybrid, 0.0).with_min_keep_count(keep);
            let victims = select_victims(&pool, &policy);
            assert_eq!(victims.len(), surplus(pool.len(), keep));
            if pool.len() >= keep {
                assert!(pool.len() - victims.len() >= keep);
            }
        }
    }

    #[test]
    fn test_empty_pool() {
        let policy = EvictionPolicy::new(EvictionStrategy::Lru, 0.0);
        assert!(select_victims(&[], &policy).is_empty());
    }

    #[test]
    fn test_selector_names() {
        assert_eq!(EvictionStrategy::Lru.selector().name(), "lru");
        assert_eq!(EvictionStrategy::Hybrid.selector().name(), "hybrid");
    }
}

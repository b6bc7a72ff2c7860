//! Memoization of combinator results.
//!
//! Each entry maps a canonical [`OperationKey`] to the storage key that holds
//! its result. The mapping is a pure function of the key, so concurrent
//! writers racing on the same entry can only cause a redundant combine,
//! never a wrong answer.
//!
//! Entries never expire and are never evicted individually; [`OperationsCache::clear`]
//! drops them all at once.

use std::collections::HashMap;

use parking_lot::{Mutex, RwLock};
use timebits::OperationKey;

/// Thread-safe map from canonical operations to derived storage keys.
///
/// # Example
///
/// ```rust
/// use timebits::{OperationKey, Operator};
/// use timebits_engine::OperationsCache;
///
/// let cache = OperationsCache::new();
/// let op = OperationKey::new(Operator::And, vec!["b".into(), "a".into()]).unwrap();
///
/// assert!(cache.resolve(&op).is_none());
/// cache.record(op.clone(), "derived".to_string());
///
/// // Operand order does not matter for AND
/// let swapped = OperationKey::new(Operator::And, vec!["a".into(), "b".into()]).unwrap();
/// assert_eq!(cache.resolve(&swapped).as_deref(), Some("derived"));
/// ```
#[derive(Default)]
pub struct OperationsCache {
    entries: RwLock<HashMap<OperationKey, String>>,
    stats: Mutex<CacheStats>,
}

impl OperationsCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the derived key recorded for `op`, counting a hit or a miss.
    pub fn resolve(&self, op: &OperationKey) -> Option<String> {
        let found = self.entries.read().get(op).cloned();
        let mut stats = self.stats.lock();
        if found.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        found
    }

    /// Records the derived key for `op`, replacing any previous mapping.
    pub fn record(&self, op: OperationKey, derived_key: String) {
        self.entries.write().insert(op, derived_key);
    }

    /// Checks whether `op` has a mapping, without touching statistics.
    pub fn contains(&self, op: &OperationKey) -> bool {
        self.entries.read().contains_key(op)
    }

    /// Drops every mapping and returns the derived keys that were recorded.
    ///
    /// Store-side keys are left untouched.
    pub fn clear(&self) -> Vec<String> {
        let mut dropped: Vec<String> = self.entries.write().drain().map(|(_, key)| key).collect();
        dropped.sort_unstable();
        dropped.dedup();
        dropped
    }

    /// Returns the derived keys currently recorded, sorted.
    pub fn operations(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().values().cloned().collect();
        keys.sort_unstable();
        keys.dedup();
        keys
    }

    /// Returns the number of recorded operations.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns lookup statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.lock().clone();
        stats.entries = self.len();
        stats
    }

    /// Resets hit and miss counters.
    pub fn reset_stats(&self) {
        *self.stats.lock() = CacheStats::default();
    }
}

impl std::fmt::Debug for OperationsCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("OperationsCache")
            .field("entries", &stats.entries)
            .field("hits", &stats.hits)
            .field("misses", &stats.misses)
            .finish()
    }
}

/// Statistics about operations cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of recorded operations.
    pub entries: usize,
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that required a store combine.
    pub misses: u64,
}

impl CacheStats {
    /// Returns the cache hit rate as a percentage.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use timebits::Operator;

    fn op(operator: Operator, operands: &[&str]) -> OperationKey {
        OperationKey::new(operator, operands.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    #[test]
    fn test_cache_new() {
        let cache = OperationsCache::new();
        assert!(cache.is_empty());
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn test_record_resolve() {
        let cache = OperationsCache::new();
        cache.record(op(Operator::Or, &["a", "b"]), "or-ab".to_string());

        assert_eq!(cache.resolve(&op(Operator::Or, &["b", "a"])).as_deref(), Some("or-ab"));
        assert!(cache.resolve(&op(Operator::And, &["a", "b"])).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_subtract_is_order_sensitive() {
        let cache = OperationsCache::new();
        cache.record(op(Operator::Subtract, &["a", "b"]), "a-b".to_string());

        assert!(cache.contains(&op(Operator::Subtract, &["a", "b"])));
        assert!(!cache.contains(&op(Operator::Subtract, &["b", "a"])));
    }

    #[test]
    fn test_stats_count_hits_and_misses() {
        let cache = OperationsCache::new();
        let key = op(Operator::And, &["a", "b"]);

        assert!(cache.resolve(&key).is_none());
        cache.record(key.clone(), "and-ab".to_string());
        assert!(cache.resolve(&key).is_some());
        assert!(cache.resolve(&key).is_some());

        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 66.666).abs() < 0.01);

        cache.reset_stats();
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn test_clear_returns_derived_keys() {
        let cache = OperationsCache::new();
        cache.record(op(Operator::And, &["a", "b"]), "k2".to_string());
        cache.record(op(Operator::Not, &["a"]), "k1".to_string());

        assert_eq!(cache.operations(), vec!["k1", "k2"]);
        assert_eq!(cache.clear(), vec!["k1", "k2"]);
        assert!(cache.is_empty());
        assert!(cache.operations().is_empty());
    }

    #[test]
    fn test_concurrent_record() {
        let cache = Arc::new(OperationsCache::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    let key = op(Operator::Or, &["shared", "other"]);
                    cache.record(key.clone(), "same".to_string());
                    cache.record(op(Operator::Not, &[&format!("k{i}")]), format!("not-{i}"));
                    cache.resolve(&key)
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap().as_deref(), Some("same"));
        }
        assert_eq!(cache.len(), 9);
    }
}

//! Event tracker implementation.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use timebits::{Granularity, Identifier, KeyCodec};
use tracing::{debug, info, warn};

use crate::bitset::{BitSet, QueryContext};
use crate::cache::OperationsCache;
use crate::config::{FailurePolicy, TrackerConfig};
use crate::error::{TrackerError, TrackerResult};
use crate::traits::BitStore;

/// Records event occurrences and answers time-bucketed queries.
///
/// The tracker writes one bit per configured granularity on every
/// [`track`](Self::track) call and hands out [`BitSet`] handles for each
/// bucket. It owns the key codec and the operations cache; every set it hands
/// out borrows them, so derived sets live no longer than the tracker.
///
/// # Example
///
/// ```ignore
/// use timebits_engine::EventTracker;
/// use timebits_store::MemoryBitStore;
///
/// let store = MemoryBitStore::new();
/// let tracker = EventTracker::new(&store);
///
/// tracker.track("login", 12)?;
/// tracker.track_many("login", &[2, 42])?;
///
/// let today = tracker.day("login", chrono::Utc::now())?;
/// assert_eq!(today.len()?, 3);
/// assert!(today.contains(42)?);
/// ```
pub struct EventTracker<'a> {
    /// Reference to the bit store.
    store: &'a dyn BitStore,
    /// Tracker configuration.
    config: TrackerConfig,
    /// Key derivation, namespaced by `config.key_prefix`.
    codec: KeyCodec,
    /// Memoized combinator results.
    cache: OperationsCache,
}

impl<'a> EventTracker<'a> {
    /// Creates a tracker with default configuration.
    pub fn new(store: &'a dyn BitStore) -> Self {
        Self::with_config(store, TrackerConfig::default())
    }

    /// Creates a tracker with custom configuration.
    pub fn with_config(store: &'a dyn BitStore, config: TrackerConfig) -> Self {
        let config = config.normalized();
        Self {
            store,
            codec: KeyCodec::new(config.key_prefix.clone()),
            config,
            cache: OperationsCache::new(),
        }
    }

    /// Returns a reference to the tracker configuration.
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Returns the key codec.
    pub fn codec(&self) -> &KeyCodec {
        &self.codec
    }

    /// Returns the operations cache.
    pub fn cache(&self) -> &OperationsCache {
        &self.cache
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &'a dyn BitStore {
        self.store
    }

    /// Returns the granularities written on every track call.
    pub fn granularities(&self) -> &[Granularity] {
        &self.config.granularities
    }

    /// Returns true if `granularity` is tracked and queryable.
    pub fn supports(&self, granularity: Granularity) -> bool {
        self.config.granularities.contains(&granularity)
    }

    /// Maps an identifier to its bit position, checking the store's bound.
    pub fn position(&self, id: Identifier) -> TrackerResult<u64> {
        self.context().position(id)
    }

    // =========================================================================
    // Tracking
    // =========================================================================

    /// Records that `id` triggered `event` now.
    pub fn track(&self, event: &str, id: Identifier) -> TrackerResult<()> {
        self.track_at(event, id, Utc::now())
    }

    /// Records that `id` triggered `event` at `time`.
    ///
    /// Tracking the same identifier twice in one bucket is a no-op.
    pub fn track_at(&self, event: &str, id: Identifier, time: DateTime<Utc>) -> TrackerResult<()> {
        self.track_many_at(event, &[id], time)
    }

    /// Records that every identifier in `ids` triggered `event` now.
    pub fn track_many(&self, event: &str, ids: &[Identifier]) -> TrackerResult<()> {
        self.track_many_at(event, ids, Utc::now())
    }

    /// Records that every identifier in `ids` triggered `event` at `time`.
    ///
    /// Identifiers are validated before anything is written. Under
    /// [`FailurePolicy::Silent`] a [`TrackerError::StoreUnavailable`] is
    /// logged and swallowed; every other error propagates.
    pub fn track_many_at(
        &self,
        event: &str,
        ids: &[Identifier],
        time: DateTime<Utc>,
    ) -> TrackerResult<()> {
        let positions = ids
            .iter()
            .map(|&id| self.position(id))
            .collect::<TrackerResult<Vec<u64>>>()?;

        match self.write_bits(event, &positions, time) {
            Err(err) if err.is_unavailable() && self.config.failure_policy == FailurePolicy::Silent => {
                warn!(event, error = %err, "Dropping tracked event, store unavailable");
                Ok(())
            }
            result => result,
        }
    }

    fn write_bits(&self, event: &str, positions: &[u64], time: DateTime<Utc>) -> TrackerResult<()> {
        for &granularity in &self.config.granularities {
            let key = self.codec.base_key(event, granularity, time);
            for &position in positions {
                self.store.set_bit(&key, position, true)?;
            }
        }
        debug!(event, count = positions.len(), "Tracked event");
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Returns the set of identifiers that triggered `event` in the bucket of
    /// `granularity` containing `time`.
    ///
    /// Fails with [`TrackerError::InvalidGranularity`] when `granularity` is
    /// not configured.
    pub fn bucket(
        &self,
        granularity: Granularity,
        event: &str,
        time: DateTime<Utc>,
    ) -> TrackerResult<BitSet<'_>> {
        if !self.supports(granularity) {
            return Err(TrackerError::InvalidGranularity(granularity));
        }
        let key = self.codec.base_key(event, granularity, time);
        Ok(BitSet::new(key, self.context()))
    }

    /// Identifiers that triggered `event` during the year containing `time`.
    pub fn year(&self, event: &str, time: DateTime<Utc>) -> TrackerResult<BitSet<'_>> {
        self.bucket(Granularity::Year, event, time)
    }

    /// Identifiers that triggered `event` during the month containing `time`.
    pub fn month(&self, event: &str, time: DateTime<Utc>) -> TrackerResult<BitSet<'_>> {
        self.bucket(Granularity::Month, event, time)
    }

    /// Identifiers that triggered `event` during the week containing `time`.
    pub fn week(&self, event: &str, time: DateTime<Utc>) -> TrackerResult<BitSet<'_>> {
        self.bucket(Granularity::Week, event, time)
    }

    /// Identifiers that triggered `event` during the day containing `time`.
    pub fn day(&self, event: &str, time: DateTime<Utc>) -> TrackerResult<BitSet<'_>> {
        self.bucket(Granularity::Day, event, time)
    }

    /// Identifiers that triggered `event` during the hour containing `time`.
    pub fn hour(&self, event: &str, time: DateTime<Utc>) -> TrackerResult<BitSet<'_>> {
        self.bucket(Granularity::Hour, event, time)
    }

    /// Identifiers that triggered `event` during the minute containing `time`.
    pub fn minute(&self, event: &str, time: DateTime<Utc>) -> TrackerResult<BitSet<'_>> {
        self.bucket(Granularity::Minute, event, time)
    }

    fn context(&self) -> QueryContext<'_> {
        QueryContext {
            store: self.store,
            codec: &self.codec,
            cache: self.config.operations_cache.then_some(&self.cache),
        }
    }

    // =========================================================================
    // Inspection and reset
    // =========================================================================

    /// Returns the distinct names of tracked events, sorted.
    pub fn events(&self) -> TrackerResult<Vec<String>> {
        let keys = self.store.list_keys(&self.codec.events_pattern())?;
        let events: BTreeSet<String> = keys
            .iter()
            .filter_map(|key| self.codec.parse_base_key(key))
            .map(|base| base.event)
            .collect();
        Ok(events.into_iter().collect())
    }

    /// Returns every key in the tracker's namespace, sorted.
    pub fn keys(&self) -> TrackerResult<Vec<String>> {
        self.store.list_keys(&self.codec.all_pattern())
    }

    /// Returns the derived keys currently held by the operations cache.
    pub fn operations(&self) -> Vec<String> {
        self.cache.operations()
    }

    /// Deletes the derived keys recorded by the operations cache, then clears it.
    ///
    /// Base keys are untouched. If the delete fails the cache is left as it
    /// was, so `operations()` still lists every derived key.
    pub fn reset_operations_cache(&self) -> TrackerResult<()> {
        let recorded = self.cache.operations();
        if !recorded.is_empty() {
            self.store.delete_keys(&recorded)?;
        }
        self.cache.clear();
        info!(count = recorded.len(), "Reset operations cache");
        Ok(())
    }

    /// Deletes every key in the tracker's namespace and clears the cache.
    pub fn reset_all(&self) -> TrackerResult<()> {
        let keys = self.keys()?;
        if !keys.is_empty() {
            self.store.delete_keys(&keys)?;
        }
        self.cache.clear();
        info!(count = keys.len(), "Reset all tracked keys");
        Ok(())
    }
}

impl std::fmt::Debug for EventTracker<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventTracker")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish()
    }
}

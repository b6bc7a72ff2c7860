//! Configuration types for the event tracker.

use timebits::{Granularity, DEFAULT_PREFIX};

/// What `track` does when the store cannot be reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FailurePolicy {
    /// Return the connectivity error to the caller.
    #[default]
    Propagate,
    /// Log the failure and return normally. The occurrence is lost.
    Silent,
}

/// Configuration for the event tracker.
///
/// # Example
///
/// ```rust
/// use timebits::Granularity;
/// use timebits_engine::{FailurePolicy, TrackerConfig};
///
/// let config = TrackerConfig::builder()
///     .with_granularities([Granularity::Day, Granularity::Year, Granularity::Hour])
///     .with_failure_policy(FailurePolicy::Silent)
///     .with_key_prefix("analytics")
///     .build();
///
/// assert_eq!(
///     config.granularities,
///     vec![Granularity::Year, Granularity::Day, Granularity::Hour]
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TrackerConfig {
    /// Granularities written on every track call, coarsest first.
    pub granularities: Vec<Granularity>,
    /// Behaviour of `track` on connectivity failures.
    pub failure_policy: FailurePolicy,
    /// Whether combinator results are memoized.
    pub operations_cache: bool,
    /// Namespace prefix for every storage key.
    pub key_prefix: String,
}

impl TrackerConfig {
    /// Creates a new builder for TrackerConfig.
    pub fn builder() -> TrackerConfigBuilder {
        TrackerConfigBuilder::default()
    }

    /// Returns a copy with granularities sorted and deduplicated.
    pub(crate) fn normalized(mut self) -> Self {
        self.granularities.sort_unstable();
        self.granularities.dedup();
        self
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            granularities: Granularity::ALL.to_vec(),
            failure_policy: FailurePolicy::Propagate,
            operations_cache: true,
            key_prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

/// Builder for TrackerConfig.
#[derive(Debug, Clone, Default)]
pub struct TrackerConfigBuilder {
    granularities: Option<Vec<Granularity>>,
    failure_policy: FailurePolicy,
    operations_cache: Option<bool>,
    key_prefix: Option<String>,
}

impl TrackerConfigBuilder {
    /// Restricts tracking and queries to the given granularities.
    pub fn with_granularities<I: IntoIterator<Item = Granularity>>(mut self, granularities: I) -> Self {
        self.granularities = Some(granularities.into_iter().collect());
        self
    }

    /// Sets the failure policy for `track`.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Shorthand for `with_failure_policy(FailurePolicy::Silent)`.
    pub fn silent(self) -> Self {
        self.with_failure_policy(FailurePolicy::Silent)
    }

    /// Enables or disables the operations cache.
    pub fn with_operations_cache(mut self, enabled: bool) -> Self {
        self.operations_cache = Some(enabled);
        self
    }

    /// Sets the key namespace prefix.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Builds the TrackerConfig.
    pub fn build(self) -> TrackerConfig {
        let defaults = TrackerConfig::default();
        TrackerConfig {
            granularities: self.granularities.unwrap_or(defaults.granularities),
            failure_policy: self.failure_policy,
            operations_cache: self.operations_cache.unwrap_or(defaults.operations_cache),
            key_prefix: self.key_prefix.unwrap_or(defaults.key_prefix),
        }
        .normalized()
    }
}

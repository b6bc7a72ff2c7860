//! # timebits-engine
//!
//! Exact unique-event tracking over time-bucketed bitmaps.
//!
//! Callers record that an identifier performed a named event at a given
//! time, then ask which identifiers did so in any year, month, week, day,
//! hour or minute. Results combine with set algebra and are evaluated inside
//! the bit store; only the final membership checks come back over the wire.
//!
//! ## Key Features
//!
//! - **Store agnostic** - anything implementing [`BitStore`] (see `timebits-store`)
//! - **Lazy set algebra** - `&`, `|`, `+`, `^`, `-`, `!` build derived store keys
//! - **Memoized combinators** - identical operator chains reuse one store key
//! - **Typed results** - set operands give a [`BitSet`], literal operands an [`IdentifierList`]
//!
//! ## Quick Start
//!
//! ```ignore
//! use chrono::{Duration, Utc};
//! use timebits_engine::EventTracker;
//! use timebits_store::MemoryBitStore;
//!
//! let store = MemoryBitStore::new();
//! let tracker = EventTracker::new(&store);
//!
//! tracker.track("login", 12)?;
//! tracker.track_many("login", &[2, 42])?;
//! tracker.track_at("login", 2, Utc::now() - Duration::weeks(1))?;
//!
//! let this_week = tracker.week("login", Utc::now())?;
//! let last_week = tracker.week("login", Utc::now() - Duration::weeks(1))?;
//!
//! let returning = (&this_week & &last_week)?;
//! assert_eq!(returning.len()?, 1);
//!
//! let known = (&this_week & &[2, 12, 43])?;
//! assert_eq!(known, [2, 12]);
//! ```
//!
//! ## With Configuration
//!
//! ```ignore
//! use timebits::Granularity;
//! use timebits_engine::{EventTracker, TrackerConfig};
//!
//! let config = TrackerConfig::builder()
//!     .with_granularities([Granularity::Year, Granularity::Month, Granularity::Day])
//!     .silent()
//!     .build();
//!
//! let tracker = EventTracker::with_config(&store, config);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      timebits-engine                         │
//! │                                                              │
//! │  EventTracker                                                │
//! │  ├── track → SETBIT per configured granularity              │
//! │  ├── year/month/week/day/hour/minute → BitSet               │
//! │  └── events / reset_all / reset_operations_cache            │
//! │                                                              │
//! │  BitSet ── & | + ^ - ! ──> OperationsCache ──> BitStore     │
//! │         └─ & - [ids] ───> IdentifierList (GETBIT only)      │
//! │                                                              │
//! │  Dependencies:                                               │
//! │  └── timebits - KeyCodec, Granularity, Operator             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod bitset;
mod cache;
mod config;
mod error;
mod result;
mod traits;
mod tracker;

// Public re-exports
pub use bitset::{BitSet, Operand};
pub use cache::{CacheStats, OperationsCache};
pub use config::{FailurePolicy, TrackerConfig, TrackerConfigBuilder};
pub use error::{TrackerError, TrackerResult};
pub use result::{Combination, IdentifierList};
pub use traits::BitStore;
pub use tracker::EventTracker;

// Re-export commonly used types from dependencies for convenience
pub use timebits::{Granularity, Identifier, KeyCodec, OperationKey, Operator, StoreOp};

//! # timebits-store
//!
//! [`BitStore`](timebits_engine::BitStore) adapters for the timebits engine.
//!
//! ## Features
//!
//! - `memory` (default) - [`MemoryBitStore`], roaring bitmaps in process memory
//! - `redis` - [`RedisBitStore`], a synchronous Redis client using
//!   SETBIT/GETBIT/BITOP/BITCOUNT
//!
//! Both adapters follow Redis string-bitmap semantics, so a tracker behaves
//! the same against either one.
//!
//! ## Quick Start
//!
//! ```ignore
//! use timebits_engine::EventTracker;
//! use timebits_store::MemoryBitStore;
//!
//! let store = MemoryBitStore::new();
//! let tracker = EventTracker::new(&store);
//! tracker.track("login", 12)?;
//! ```

#![warn(missing_docs)]

mod pattern;

#[cfg(feature = "memory")]
mod memory;

#[cfg(feature = "redis")]
mod redis;

#[cfg(feature = "memory")]
pub use memory::MemoryBitStore;

#[cfg(feature = "redis")]
pub use self::redis::{RedisBitStore, RedisStoreConfig};

pub use pattern::glob_match;

//! The bit store contract.
//!
//! The engine never talks to a database directly. Everything it needs from
//! storage is expressed by [`BitStore`], whose operations mirror the Redis
//! `SETBIT`, `GETBIT`, `BITOP`, `BITCOUNT`, `KEYS` and `DEL` commands.
//!
//! Adapters live in the `timebits-store` crate; tests and applications can
//! supply their own.
//!
//! # Example: a store that wraps another and counts combines
//!
//! ```ignore
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use timebits_engine::{BitStore, StoreOp, TrackerResult};
//!
//! struct Counting<S> {
//!     inner: S,
//!     combines: AtomicUsize,
//! }
//!
//! impl<S: BitStore> BitStore for Counting<S> {
//!     fn combine(&self, op: StoreOp, result_key: &str, keys: &[String]) -> TrackerResult<String> {
//!         self.combines.fetch_add(1, Ordering::SeqCst);
//!         self.inner.combine(op, result_key, keys)
//!     }
//!     // ... delegate the remaining methods ...
//! }
//! ```

use std::sync::Arc;

use timebits::StoreOp;

use crate::error::TrackerResult;

/// A bit-addressable key-value store.
///
/// Implementations must be safe to share between threads; the engine adds no
/// locking of its own, so atomicity of single-bit writes and of `combine` is
/// whatever the store provides.
///
/// # Combine semantics
///
/// `combine` follows Redis `BITOP`: the result is as long as the longest
/// operand, missing keys read as empty, and `NOT` inverts every bit up to the
/// operand's byte length. A combine whose result would be empty may leave
/// `result_key` absent.
pub trait BitStore: Send + Sync {
    /// Sets or clears the bit at `position` of `key`, creating the key if needed.
    fn set_bit(&self, key: &str, position: u64, value: bool) -> TrackerResult<()>;

    /// Reads the bit at `position` of `key`. Missing keys read as `false`.
    fn get_bit(&self, key: &str, position: u64) -> TrackerResult<bool>;

    /// Reads several bits of one key, preserving order.
    ///
    /// The default implementation issues one `get_bit` per position;
    /// adapters with pipelining should override it.
    fn get_bits(&self, key: &str, positions: &[u64]) -> TrackerResult<Vec<bool>> {
        positions
            .iter()
            .map(|&position| self.get_bit(key, position))
            .collect()
    }

    /// Combines `operand_keys` with `op` into `result_key` and returns the key
    /// holding the result. [`StoreOp::Not`] takes exactly one operand.
    fn combine(&self, op: StoreOp, result_key: &str, operand_keys: &[String])
        -> TrackerResult<String>;

    /// Counts the set bits of `key`. Missing keys count as zero.
    fn bit_count(&self, key: &str) -> TrackerResult<u64>;

    /// Lists keys matching a glob `pattern` (`*` and `?`), sorted.
    fn list_keys(&self, pattern: &str) -> TrackerResult<Vec<String>>;

    /// Deletes `keys`. Missing keys are ignored.
    fn delete_keys(&self, keys: &[String]) -> TrackerResult<()>;

    /// Largest bit position the store accepts, if it enforces one.
    fn max_position(&self) -> Option<u64> {
        None
    }
}

impl<T: BitStore + ?Sized> BitStore for Arc<T> {
    fn set_bit(&self, key: &str, position: u64, value: bool) -> TrackerResult<()> {
        (**self).set_bit(key, position, value)
    }

    fn get_bit(&self, key: &str, position: u64) -> TrackerResult<bool> {
        (**self).get_bit(key, position)
    }

    fn get_bits(&self, key: &str, positions: &[u64]) -> TrackerResult<Vec<bool>> {
        (**self).get_bits(key, positions)
    }

    fn combine(
        &self,
        op: StoreOp,
        result_key: &str,
        operand_keys: &[String],
    ) -> TrackerResult<String> {
        (**self).combine(op, result_key, operand_keys)
    }

    fn bit_count(&self, key: &str) -> TrackerResult<u64> {
        (**self).bit_count(key)
    }

    fn list_keys(&self, pattern: &str) -> TrackerResult<Vec<String>> {
        (**self).list_keys(pattern)
    }

    fn delete_keys(&self, keys: &[String]) -> TrackerResult<()> {
        (**self).delete_keys(keys)
    }

    fn max_position(&self) -> Option<u64> {
        (**self).max_position()
    }
}

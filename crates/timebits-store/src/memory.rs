//! In-process bit store backed by roaring bitmaps.

use std::collections::HashMap;

use parking_lot::RwLock;
use roaring::RoaringBitmap;
use timebits_engine::{BitStore, StoreOp, TrackerError, TrackerResult};
use tracing::trace;

use crate::pattern::glob_match;

/// A stored bitmap with the byte length Redis would report for it.
#[derive(Debug, Clone, Default)]
struct Bitmap {
    bits: RoaringBitmap,
    /// Bytes spanned by the value, including trailing zero bits.
    len_bytes: u64,
}

impl Bitmap {
    fn span(&self) -> u64 {
        self.len_bytes * 8
    }
}

/// Thread-safe in-memory [`BitStore`].
///
/// Values mirror Redis string bitmaps: every key has a byte length that grows
/// with the highest bit ever written, `NOT` inverts within that length, and a
/// combine whose operands are all missing deletes the result key.
///
/// # Example
///
/// ```rust
/// use timebits_engine::{BitStore, StoreOp};
/// use timebits_store::MemoryBitStore;
///
/// let store = MemoryBitStore::new();
/// store.set_bit("a", 3, true).unwrap();
/// store.set_bit("b", 3, true).unwrap();
/// store.set_bit("b", 9, true).unwrap();
///
/// store.combine(StoreOp::And, "both", &["a".into(), "b".into()]).unwrap();
/// assert_eq!(store.bit_count("both").unwrap(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryBitStore {
    keys: RwLock<HashMap<String, Bitmap>>,
}

impl MemoryBitStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of keys held.
    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    /// Returns true if no keys are held.
    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }

    /// Returns true if `key` exists.
    pub fn contains_key(&self, key: &str) -> bool {
        self.keys.read().contains_key(key)
    }

    /// Returns the byte length of the value at `key` (0 when missing).
    pub fn byte_len(&self, key: &str) -> u64 {
        self.keys.read().get(key).map_or(0, |b| b.len_bytes)
    }

    /// Drops every key.
    pub fn clear(&self) {
        self.keys.write().clear();
    }

    fn offset(position: u64) -> TrackerResult<u32> {
        u32::try_from(position).map_err(|_| {
            TrackerError::Store(format!("bit offset {position} is out of range"))
        })
    }
}

impl BitStore for MemoryBitStore {
    fn set_bit(&self, key: &str, position: u64, value: bool) -> TrackerResult<()> {
        let offset = Self::offset(position)?;
        let mut keys = self.keys.write();
        let bitmap = keys.entry(key.to_string()).or_default();
        bitmap.len_bytes = bitmap.len_bytes.max(position / 8 + 1);
        if value {
            bitmap.bits.insert(offset);
        } else {
            bitmap.bits.remove(offset);
        }
        Ok(())
    }

    fn get_bit(&self, key: &str, position: u64) -> TrackerResult<bool> {
        let Ok(offset) = u32::try_from(position) else {
            return Ok(false);
        };
        Ok(self
            .keys
            .read()
            .get(key)
            .is_some_and(|b| b.bits.contains(offset)))
    }

    fn get_bits(&self, key: &str, positions: &[u64]) -> TrackerResult<Vec<bool>> {
        let keys = self.keys.read();
        let bitmap = keys.get(key);
        Ok(positions
            .iter()
            .map(|&p| {
                u32::try_from(p)
                    .ok()
                    .zip(bitmap)
                    .is_some_and(|(offset, b)| b.bits.contains(offset))
            })
            .collect())
    }

    fn combine(&self, op: StoreOp, result_key: &str, operand_keys: &[String]) -> TrackerResult<String> {
        if operand_keys.is_empty() || (op == StoreOp::Not && operand_keys.len() != 1) {
            return Err(TrackerError::Store(format!(
                "wrong number of operands for BITOP {op}: {}",
                operand_keys.len()
            )));
        }

        let mut keys = self.keys.write();
        let empty = Bitmap::default();
        let operands: Vec<&Bitmap> = operand_keys
            .iter()
            .map(|k| keys.get(k).unwrap_or(&empty))
            .collect();
        let len_bytes = operands.iter().map(|b| b.len_bytes).max().unwrap_or(0);

        let bits = match op {
            StoreOp::And => {
                // A shorter operand is zero-padded, so any missing key empties the result.
                let mut acc = operands[0].bits.clone();
                for b in &operands[1..] {
                    acc &= &b.bits;
                }
                acc
            }
            StoreOp::Or => operands.iter().fold(RoaringBitmap::new(), |acc, b| acc | &b.bits),
            StoreOp::Xor => operands.iter().fold(RoaringBitmap::new(), |acc, b| acc ^ &b.bits),
            StoreOp::Not => {
                let source = operands[0];
                let mut inverted = RoaringBitmap::new();
                if source.span() > 0 {
                    let last = u32::try_from(source.span() - 1).unwrap_or(u32::MAX);
                    inverted.insert_range(0..=last);
                }
                inverted - &source.bits
            }
        };

        if len_bytes == 0 {
            keys.remove(result_key);
        } else {
            keys.insert(result_key.to_string(), Bitmap { bits, len_bytes });
        }
        trace!(%op, result_key, len_bytes, "BITOP");
        Ok(result_key.to_string())
    }

    fn bit_count(&self, key: &str) -> TrackerResult<u64> {
        Ok(self.keys.read().get(key).map_or(0, |b| b.bits.len()))
    }

    fn list_keys(&self, pattern: &str) -> TrackerResult<Vec<String>> {
        let mut found: Vec<String> = self
            .keys
            .read()
            .keys()
            .filter(|k| glob_match(pattern, k))
            .cloned()
            .collect();
        found.sort_unstable();
        Ok(found)
    }

    fn delete_keys(&self, keys: &[String]) -> TrackerResult<()> {
        let mut held = self.keys.write();
        for key in keys {
            held.remove(key);
        }
        Ok(())
    }

    fn max_position(&self) -> Option<u64> {
        Some(u64::from(u32::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(sets: &[(&str, &[u64])]) -> MemoryBitStore {
        let store = MemoryBitStore::new();
        for (key, positions) in sets {
            for &p in *positions {
                store.set_bit(key, p, true).unwrap();
            }
        }
        store
    }

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_set_and_get_bit() {
        let store = MemoryBitStore::new();
        store.set_bit("k", 12, true).unwrap();

        assert!(store.get_bit("k", 12).unwrap());
        assert!(!store.get_bit("k", 11).unwrap());
        assert!(!store.get_bit("missing", 12).unwrap());
        assert_eq!(store.byte_len("k"), 2);
    }

    #[test]
    fn test_clearing_a_bit_keeps_length() {
        let store = MemoryBitStore::new();
        store.set_bit("k", 20, true).unwrap();
        store.set_bit("k", 20, false).unwrap();

        assert!(store.contains_key("k"));
        assert_eq!(store.bit_count("k").unwrap(), 0);
        assert_eq!(store.byte_len("k"), 3);
    }

    #[test]
    fn test_get_bits_batch() {
        let store = store_with(&[("k", &[1, 3])]);
        assert_eq!(
            store.get_bits("k", &[1, 2, 3, 1 << 40]).unwrap(),
            vec![true, false, true, false]
        );
        assert_eq!(store.get_bits("missing", &[1]).unwrap(), vec![false]);
    }

    #[test]
    fn test_offset_out_of_range() {
        let store = MemoryBitStore::new();
        let err = store.set_bit("k", 1 << 40, true).unwrap_err();
        assert!(matches!(err, TrackerError::Store(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_bitop_and_or_xor() {
        let store = store_with(&[("a", &[1, 2, 100]), ("b", &[2, 3])]);

        store.combine(StoreOp::And, "and", &keys(&["a", "b"])).unwrap();
        store.combine(StoreOp::Or, "or", &keys(&["a", "b"])).unwrap();
        store.combine(StoreOp::Xor, "xor", &keys(&["a", "b"])).unwrap();

        assert_eq!(store.get_bits("and", &[1, 2, 3]).unwrap(), vec![false, true, false]);
        assert_eq!(store.bit_count("or").unwrap(), 4);
        assert_eq!(store.bit_count("xor").unwrap(), 3);
        // Result length is the longest operand.
        assert_eq!(store.byte_len("and"), store.byte_len("a"));
    }

    #[test]
    fn test_bitop_and_with_missing_key() {
        let store = store_with(&[("a", &[1, 2])]);
        store.combine(StoreOp::And, "r", &keys(&["a", "missing"])).unwrap();
        assert_eq!(store.bit_count("r").unwrap(), 0);
        assert!(store.contains_key("r"));
    }

    #[test]
    fn test_bitop_not_spans_operand_bytes() {
        let store = store_with(&[("a", &[0, 3])]);
        store.combine(StoreOp::Not, "n", &keys(&["a"])).unwrap();

        assert_eq!(store.bit_count("n").unwrap(), 6);
        assert!(!store.get_bit("n", 0).unwrap());
        assert!(store.get_bit("n", 7).unwrap());
        assert!(!store.get_bit("n", 8).unwrap());
    }

    #[test]
    fn test_bitop_on_missing_operands_removes_result() {
        let store = store_with(&[("r", &[5])]);
        store.combine(StoreOp::Or, "r", &keys(&["x", "y"])).unwrap();
        assert!(!store.contains_key("r"));
    }

    #[test]
    fn test_bitop_not_rejects_two_operands() {
        let store = MemoryBitStore::new();
        assert!(store.combine(StoreOp::Not, "r", &keys(&["a", "b"])).is_err());
        assert!(store.combine(StoreOp::And, "r", &[]).is_err());
    }

    #[test]
    fn test_list_and_delete_keys() {
        let store = store_with(&[("p:evt:a", &[1]), ("p:evt:b", &[1]), ("p:op:x", &[1]), ("q:evt:a", &[1])]);

        assert_eq!(store.list_keys("p:evt:*").unwrap(), vec!["p:evt:a", "p:evt:b"]);
        assert_eq!(store.list_keys("p:*").unwrap().len(), 3);

        store.delete_keys(&keys(&["p:evt:a", "nope"])).unwrap();
        assert_eq!(store.len(), 3);

        store.clear();
        assert!(store.is_empty());
    }
}

//! Store-backed sets and the combinator protocol.
//!
//! A [`BitSet`] is a handle to a bitmap held by the store. Combining two
//! handles produces a new handle to a derived key; nothing is read back into
//! memory. Combining a handle with a literal collection instead checks each
//! literal identifier against the store and returns an [`IdentifierList`].
//!
//! Which of the two happens is decided by the operand's type through the
//! [`Operand`] trait, so the compiler knows the result type of every call.
//!
//! ```text
//! &BitSet  & &BitSet       -> BitSet          (store combine, cached)
//! &BitSet  & &[Identifier] -> IdentifierList  (GETBIT per literal, no key created)
//! ```

use std::fmt;
use std::ops::{Add, BitAnd, BitOr, BitXor, Not, Sub};

use timebits::{Identifier, KeyCodec, KeyError, OperationKey, Operator, StoreOp};
use tracing::debug;

use crate::cache::OperationsCache;
use crate::error::{TrackerError, TrackerResult};
use crate::result::{Combination, IdentifierList};
use crate::traits::BitStore;

/// Borrowed collaborators shared by every set derived from one tracker.
#[derive(Clone, Copy)]
pub(crate) struct QueryContext<'a> {
    pub(crate) store: &'a dyn BitStore,
    pub(crate) codec: &'a KeyCodec,
    /// `None` when memoization is disabled.
    pub(crate) cache: Option<&'a OperationsCache>,
}

impl QueryContext<'_> {
    /// Maps an identifier to its bit position.
    pub(crate) fn position(&self, id: Identifier) -> TrackerResult<u64> {
        match self.store.max_position() {
            Some(max) if id > max => Err(TrackerError::InvalidIdentifier { identifier: id, max }),
            _ => Ok(id),
        }
    }
}

/// A queryable set of identifiers backed by a store key.
///
/// Obtained from the tracker's time accessors (`day`, `week`, ...) or from
/// combining other sets. Handles are cheap: they hold a key and borrowed
/// references to the store, codec and cache of the tracker that created them.
///
/// Counts and memberships are always read from the store, so a handle to a
/// base bucket observes bits tracked after it was created.
///
/// # Example
///
/// ```ignore
/// let week = tracker.week("login", now)?;
/// let last_week = tracker.week("login", now - Duration::weeks(1))?;
///
/// let returning = (&week & &last_week)?;      // BitSet
/// let churned = (&last_week - &week)?;         // BitSet
/// let known = (&week & &[2, 12, 43])?;         // IdentifierList
///
/// println!("{} returning users", returning.len()?);
/// ```
#[derive(Clone)]
pub struct BitSet<'a> {
    key: String,
    ctx: QueryContext<'a>,
}

impl<'a> BitSet<'a> {
    pub(crate) fn new(key: String, ctx: QueryContext<'a>) -> Self {
        Self { key, ctx }
    }

    /// Returns the storage key holding this set.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Checks whether `id` is in the set.
    pub fn contains(&self, id: Identifier) -> TrackerResult<bool> {
        let position = self.ctx.position(id)?;
        self.ctx.store.get_bit(&self.key, position)
    }

    /// Checks several identifiers in one call, preserving order.
    pub fn contains_all(&self, ids: &[Identifier]) -> TrackerResult<Vec<bool>> {
        let positions = ids
            .iter()
            .map(|&id| self.ctx.position(id))
            .collect::<TrackerResult<Vec<u64>>>()?;
        self.ctx.store.get_bits(&self.key, &positions)
    }

    /// Returns the number of identifiers in the set, as currently stored.
    pub fn len(&self) -> TrackerResult<u64> {
        self.ctx.store.bit_count(&self.key)
    }

    /// Returns true if the set has no members.
    pub fn is_empty(&self) -> TrackerResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Intersection with another set, or filtering of a literal collection.
    ///
    /// With a literal operand the result keeps the literal's elements that
    /// are members of `self`, in the literal's order.
    pub fn and<O: Operand<'a>>(&self, other: O) -> TrackerResult<O::Output> {
        other.intersect(self)
    }

    /// Difference with another set, or filtering of a literal collection.
    ///
    /// With a literal operand the result keeps the literal's elements that
    /// are *not* members of `self`, in the literal's order.
    pub fn subtract<O: Operand<'a>>(&self, other: O) -> TrackerResult<O::Output> {
        other.subtract_from(self)
    }

    /// Union with another set.
    pub fn or(&self, other: &BitSet<'a>) -> TrackerResult<BitSet<'a>> {
        self.derive(Operator::Or, vec![self.key.clone(), other.key.clone()])
    }

    /// Symmetric difference with another set.
    pub fn xor(&self, other: &BitSet<'a>) -> TrackerResult<BitSet<'a>> {
        self.derive(Operator::Xor, vec![self.key.clone(), other.key.clone()])
    }

    /// Complement of the set.
    ///
    /// The complement only spans the bits the store holds for this key, so
    /// it is meaningful for membership probes, not for counting.
    pub fn not(&self) -> TrackerResult<BitSet<'a>> {
        self.derive(Operator::Not, vec![self.key.clone()])
    }

    fn sibling(&self, key: String) -> BitSet<'a> {
        BitSet::new(key, self.ctx)
    }

    /// Resolves a set/set combination, through the cache when enabled.
    fn derive(&self, operator: Operator, operands: Vec<String>) -> TrackerResult<BitSet<'a>> {
        let op = OperationKey::new(operator, operands)?;

        if let Some(cache) = self.ctx.cache {
            if let Some(key) = cache.resolve(&op) {
                debug!(%operator, key = %key, "Operations cache hit");
                return Ok(self.sibling(key));
            }
        }

        let derived = self.ctx.codec.derived_key(&op);
        let stored = match operator.store_op() {
            Some(store_op) => self.ctx.store.combine(store_op, &derived, op.operands())?,
            None => self.store_difference(&op, &derived)?,
        };
        debug!(%operator, key = %stored, "Combined bitsets in store");

        if let Some(cache) = self.ctx.cache {
            cache.record(op, stored.clone());
        }
        Ok(self.sibling(stored))
    }

    /// Computes `A - B` as `A XOR (A AND B)`.
    ///
    /// `A AND (NOT B)` would lose members of `A` beyond the stored length of
    /// `B`, because a store-side NOT only spans its operand's bytes.
    ///
    /// The intersection is always recombined, never taken from the cache: a
    /// cached `A AND B` may predate bits tracked since.
    fn store_difference(&self, op: &OperationKey, derived: &str) -> TrackerResult<String> {
        let [minuend, subtrahend] = op.operands() else {
            return Err(KeyError::Arity {
                operator: Operator::Subtract,
                expected: "exactly 2",
                actual: op.operands().len(),
            }
            .into());
        };
        let common_op = OperationKey::new(Operator::And, vec![minuend.clone(), subtrahend.clone()])?;
        let common_key = self.ctx.codec.derived_key(&common_op);
        let common = self
            .ctx
            .store
            .combine(StoreOp::And, &common_key, common_op.operands())?;
        if let Some(cache) = self.ctx.cache {
            cache.record(common_op, common.clone());
        }
        self.ctx
            .store
            .combine(StoreOp::Xor, derived, &[minuend.clone(), common])
    }

    /// Filters a literal collection by membership in `self`.
    fn filter_literal(&self, ids: &[Identifier], keep_members: bool) -> TrackerResult<IdentifierList> {
        let flags = self.contains_all(ids)?;
        Ok(ids
            .iter()
            .zip(flags)
            .filter(|(_, member)| *member == keep_members)
            .map(|(&id, _)| id)
            .collect())
    }
}

impl fmt::Debug for BitSet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitSet").field("key", &self.key).finish()
    }
}

impl PartialEq for BitSet<'_> {
    /// Two handles are equal when they address the same store key.
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for BitSet<'_> {}

/// The right-hand side of `and` / `subtract`.
///
/// Implemented for `&BitSet` (result: [`BitSet`]) and for literal identifier
/// collections (result: [`IdentifierList`]).
pub trait Operand<'a> {
    /// The result of combining a set with this operand.
    type Output: Into<Combination<'a>>;

    /// `set AND self`.
    fn intersect(self, set: &BitSet<'a>) -> TrackerResult<Self::Output>;

    /// `set MINUS self`.
    fn subtract_from(self, set: &BitSet<'a>) -> TrackerResult<Self::Output>;
}

impl<'a> Operand<'a> for &BitSet<'a> {
    type Output = BitSet<'a>;

    fn intersect(self, set: &BitSet<'a>) -> TrackerResult<BitSet<'a>> {
        set.derive(Operator::And, vec![set.key.clone(), self.key.clone()])
    }

    fn subtract_from(self, set: &BitSet<'a>) -> TrackerResult<BitSet<'a>> {
        set.derive(Operator::Subtract, vec![set.key.clone(), self.key.clone()])
    }
}

impl<'a> Operand<'a> for &[Identifier] {
    type Output = IdentifierList;

    fn intersect(self, set: &BitSet<'a>) -> TrackerResult<IdentifierList> {
        set.filter_literal(self, true)
    }

    fn subtract_from(self, set: &BitSet<'a>) -> TrackerResult<IdentifierList> {
        set.filter_literal(self, false)
    }
}

impl<'a, const N: usize> Operand<'a> for &[Identifier; N] {
    type Output = IdentifierList;

    fn intersect(self, set: &BitSet<'a>) -> TrackerResult<IdentifierList> {
        set.filter_literal(self, true)
    }

    fn subtract_from(self, set: &BitSet<'a>) -> TrackerResult<IdentifierList> {
        set.filter_literal(self, false)
    }
}

impl<'a> Operand<'a> for &Vec<Identifier> {
    type Output = IdentifierList;

    fn intersect(self, set: &BitSet<'a>) -> TrackerResult<IdentifierList> {
        set.filter_literal(self, true)
    }

    fn subtract_from(self, set: &BitSet<'a>) -> TrackerResult<IdentifierList> {
        set.filter_literal(self, false)
    }
}

impl<'a> Operand<'a> for &IdentifierList {
    type Output = IdentifierList;

    fn intersect(self, set: &BitSet<'a>) -> TrackerResult<IdentifierList> {
        set.filter_literal(self.as_slice(), true)
    }

    fn subtract_from(self, set: &BitSet<'a>) -> TrackerResult<IdentifierList> {
        set.filter_literal(self.as_slice(), false)
    }
}

// Operator sugar. Every operator returns a `TrackerResult`, so chains read
// `(&(&a & &b)? | &c)?`.

impl<'a, O: Operand<'a>> BitAnd<O> for &BitSet<'a> {
    type Output = TrackerResult<O::Output>;

    fn bitand(self, rhs: O) -> Self::Output {
        self.and(rhs)
    }
}

impl<'a, O: Operand<'a>> BitAnd<O> for BitSet<'a> {
    type Output = TrackerResult<O::Output>;

    fn bitand(self, rhs: O) -> Self::Output {
        self.and(rhs)
    }
}

impl<'a, O: Operand<'a>> Sub<O> for &BitSet<'a> {
    type Output = TrackerResult<O::Output>;

    fn sub(self, rhs: O) -> Self::Output {
        self.subtract(rhs)
    }
}

impl<'a, O: Operand<'a>> Sub<O> for BitSet<'a> {
    type Output = TrackerResult<O::Output>;

    fn sub(self, rhs: O) -> Self::Output {
        self.subtract(rhs)
    }
}

impl<'a> BitOr<&BitSet<'a>> for &BitSet<'a> {
    type Output = TrackerResult<BitSet<'a>>;

    fn bitor(self, rhs: &BitSet<'a>) -> Self::Output {
        self.or(rhs)
    }
}

impl<'a> BitOr<&BitSet<'a>> for BitSet<'a> {
    type Output = TrackerResult<BitSet<'a>>;

    fn bitor(self, rhs: &BitSet<'a>) -> Self::Output {
        self.or(rhs)
    }
}

/// `+` is an alias for union.
impl<'a> Add<&BitSet<'a>> for &BitSet<'a> {
    type Output = TrackerResult<BitSet<'a>>;

    fn add(self, rhs: &BitSet<'a>) -> Self::Output {
        self.or(rhs)
    }
}

impl<'a> Add<&BitSet<'a>> for BitSet<'a> {
    type Output = TrackerResult<BitSet<'a>>;

    fn add(self, rhs: &BitSet<'a>) -> Self::Output {
        self.or(rhs)
    }
}

impl<'a> BitXor<&BitSet<'a>> for &BitSet<'a> {
    type Output = TrackerResult<BitSet<'a>>;

    fn bitxor(self, rhs: &BitSet<'a>) -> Self::Output {
        self.xor(rhs)
    }
}

impl<'a> Not for &BitSet<'a> {
    type Output = TrackerResult<BitSet<'a>>;

    fn not(self) -> Self::Output {
        BitSet::not(self)
    }
}

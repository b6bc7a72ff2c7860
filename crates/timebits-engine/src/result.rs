//! Result types for combinator operations.

use std::collections::HashSet;
use std::ops::Deref;

use timebits::Identifier;

use crate::bitset::BitSet;

/// A materialized, ordered list of identifiers.
///
/// Produced when a [`BitSet`] is combined with a literal collection. The list
/// owns its data and never touches the store again; further set arithmetic
/// on it is purely local.
///
/// # Example
///
/// ```rust
/// use timebits_engine::IdentifierList;
///
/// let ids = IdentifierList::from(vec![2, 12]);
/// assert_eq!(ids, [2, 12]);
/// assert_eq!(ids.len(), 2);
///
/// let doubled: Vec<u64> = ids.map(|id| id * 2);
/// assert_eq!(doubled, vec![4, 24]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct IdentifierList {
    ids: Vec<Identifier>,
}

impl IdentifierList {
    /// Creates a list from identifiers in the given order.
    pub fn new(ids: Vec<Identifier>) -> Self {
        Self { ids }
    }

    /// Returns the number of identifiers.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns an iterator over the identifiers in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Identifier> {
        self.ids.iter()
    }

    /// Maps every identifier into a new ordered vector.
    pub fn map<T, F: FnMut(Identifier) -> T>(&self, f: F) -> Vec<T> {
        self.ids.iter().copied().map(f).collect()
    }

    /// Returns true if `id` is in the list.
    pub fn contains(&self, id: Identifier) -> bool {
        self.ids.contains(&id)
    }

    /// Returns the identifiers as a slice.
    pub fn as_slice(&self) -> &[Identifier] {
        &self.ids
    }

    /// Consumes the list, returning the identifiers.
    pub fn into_vec(self) -> Vec<Identifier> {
        self.ids
    }

    /// Identifiers of `self` that also appear in `other`, in `self` order.
    pub fn intersection(&self, other: &[Identifier]) -> IdentifierList {
        let other: HashSet<Identifier> = other.iter().copied().collect();
        self.ids.iter().copied().filter(|id| other.contains(id)).collect()
    }

    /// Identifiers of `self` that do not appear in `other`, in `self` order.
    pub fn difference(&self, other: &[Identifier]) -> IdentifierList {
        let other: HashSet<Identifier> = other.iter().copied().collect();
        self.ids.iter().copied().filter(|id| !other.contains(id)).collect()
    }

    /// Identifiers of `self` followed by those of `other` not already seen.
    pub fn union(&self, other: &[Identifier]) -> IdentifierList {
        let mut seen = HashSet::with_capacity(self.ids.len() + other.len());
        self.ids
            .iter()
            .chain(other.iter())
            .copied()
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

impl Deref for IdentifierList {
    type Target = [Identifier];

    fn deref(&self) -> &Self::Target {
        &self.ids
    }
}

impl From<Vec<Identifier>> for IdentifierList {
    fn from(ids: Vec<Identifier>) -> Self {
        Self::new(ids)
    }
}

impl From<IdentifierList> for Vec<Identifier> {
    fn from(list: IdentifierList) -> Self {
        list.ids
    }
}

impl FromIterator<Identifier> for IdentifierList {
    fn from_iter<I: IntoIterator<Item = Identifier>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl IntoIterator for IdentifierList {
    type Item = Identifier;
    type IntoIter = std::vec::IntoIter<Identifier>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.into_iter()
    }
}

impl<'a> IntoIterator for &'a IdentifierList {
    type Item = &'a Identifier;
    type IntoIter = std::slice::Iter<'a, Identifier>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter()
    }
}

impl PartialEq<Vec<Identifier>> for IdentifierList {
    fn eq(&self, other: &Vec<Identifier>) -> bool {
        &self.ids == other
    }
}

impl PartialEq<[Identifier]> for IdentifierList {
    fn eq(&self, other: &[Identifier]) -> bool {
        self.ids.as_slice() == other
    }
}

impl PartialEq<&[Identifier]> for IdentifierList {
    fn eq(&self, other: &&[Identifier]) -> bool {
        self.ids.as_slice() == *other
    }
}

impl<const N: usize> PartialEq<[Identifier; N]> for IdentifierList {
    fn eq(&self, other: &[Identifier; N]) -> bool {
        self.ids.as_slice() == other.as_slice()
    }
}

impl PartialEq<IdentifierList> for Vec<Identifier> {
    fn eq(&self, other: &IdentifierList) -> bool {
        self == &other.ids
    }
}

/// The outcome of a combinator, for callers that handle both shapes.
///
/// The concrete shape is always known statically at the call site (see
/// [`Operand`](crate::Operand)); this enum exists for code that stores or
/// forwards results of mixed origin.
#[derive(Debug, Clone)]
pub enum Combination<'a> {
    /// A store-backed set that can be combined further.
    Set(BitSet<'a>),
    /// A materialized list of identifiers.
    List(IdentifierList),
}

impl<'a> Combination<'a> {
    /// Returns true for the store-backed variant.
    pub fn is_set(&self) -> bool {
        matches!(self, Combination::Set(_))
    }

    /// Returns the set, if this is the store-backed variant.
    pub fn as_set(&self) -> Option<&BitSet<'a>> {
        match self {
            Combination::Set(set) => Some(set),
            Combination::List(_) => None,
        }
    }

    /// Returns the list, if this is the materialized variant.
    pub fn as_list(&self) -> Option<&IdentifierList> {
        match self {
            Combination::Set(_) => None,
            Combination::List(list) => Some(list),
        }
    }
}

impl<'a> From<BitSet<'a>> for Combination<'a> {
    fn from(set: BitSet<'a>) -> Self {
        Combination::Set(set)
    }
}

impl From<IdentifierList> for Combination<'_> {
    fn from(list: IdentifierList) -> Self {
        Combination::List(list)
    }
}

//! Set semantics layered on top of any [`AnyHashMap`] whose values are [`SetEmpty`].
//!
//! [`MapSet`] forwards every operation to the map and projects the key out of each
//! `(key, SetEmpty)` pair on the way back. It has no state of its own, so the map's
//! growth policy, iteration order, and allocation failures all show through unchanged.

use core::fmt::{self, Debug};
use core::hash::{BuildHasher, Hash};
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::mem;
use std::collections::{BTreeSet, HashSet};

use hashbrown::{Equivalent, TryReserveError};

use crate::maps::{AnyHashMap, AnyOccupiedEntry};
use crate::sets::empty::{SetEmpty, assert_zero_overhead};

// ==================================================================================
// 1. The Interoperability Trait
// ==================================================================================

/// A trait for any collection that supports efficient containment checks.
///
/// This allows the sets of this crate to run set operations (like `difference` or
/// `is_subset`) against each other and against standard library sets without
/// converting them first.
pub trait AnySet<T> {
    /// Returns `true` if the collection contains the value.
    fn contains(&self, value: &T) -> bool;

    /// Returns the number of elements.
    fn len(&self) -> usize;
}

impl<T, S> AnySet<T> for HashSet<T, S>
where
    T: Eq + Hash,
    S: BuildHasher,
{
    fn contains(&self, value: &T) -> bool {
        self.contains(value)
    }

    fn len(&self) -> usize {
        self.len()
    }
}

impl<T, S> AnySet<T> for hashbrown::HashSet<T, S>
where
    T: Eq + Hash,
    S: BuildHasher,
{
    fn contains(&self, value: &T) -> bool {
        self.contains(value)
    }

    fn len(&self) -> usize {
        self.len()
    }
}

impl<T: Ord> AnySet<T> for BTreeSet<T> {
    fn contains(&self, value: &T) -> bool {
        self.contains(value)
    }

    fn len(&self) -> usize {
        self.len()
    }
}

// ==================================================================================
// 2. MapSet Implementation
// ==================================================================================

/// A set of `T` stored as the keys of a map `M: AnyHashMap<T, SetEmpty>`.
///
/// `DenseSet` and `SmallDenseSet` are this type with a particular map plugged in.
/// Use it directly to put a set on top of a custom map backend.
///
/// # Heterogeneous lookup
/// Every lookup takes `&Q` for any `Q: Hash + Equivalent<T>`, so a `MapSet<String, _>`
/// can be queried with `&str` without allocating. `Q` must hash exactly like the `T`
/// it is equivalent to. Breaking that makes lookups miss, nothing worse.
///
/// # Invalidation
/// References returned by `insert`, `find` or `iter` borrow the set, so any mutation
/// ends them. There are no dangling cursors to worry about.
pub struct MapSet<T, M> {
    map: M,
    marker: PhantomData<T>,
}

impl<T, M> MapSet<T, M>
where
    T: Eq + Hash,
    M: AnyHashMap<T, SetEmpty>,
{
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::from_map(M::default())
    }

    /// Creates an empty set able to hold `capacity` elements without reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_map(M::with_capacity(capacity))
    }

    /// Wraps an existing map. Its keys become the elements of the set.
    pub fn from_map(map: M) -> Self {
        const { assert_zero_overhead::<T>() }
        Self {
            map,
            marker: PhantomData,
        }
    }

    /// Returns the underlying map.
    pub fn as_map(&self) -> &M {
        &self.map
    }

    /// Unwraps the set into its map.
    pub fn into_map(self) -> M {
        self.map
    }

    /// Returns the number of elements in the set.
    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the set contains no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns how many elements fit before the map has to grow.
    pub fn capacity(&self) -> usize {
        self.map.capacity()
    }

    /// Approximate number of heap bytes held by the map's bucket storage.
    ///
    /// Storage kept inside the map value itself is not counted, so a `SmallMap` that
    /// has not spilled reports `0` whatever its inline capacity.
    pub fn memory_size(&self) -> usize {
        self.map.memory_size()
    }

    /// Adds a value to the set.
    ///
    /// Returns the stored element and `true` if `value` was newly inserted. If an equal
    /// element is already present it is kept, `value` is dropped, and `false` is
    /// returned.
    pub fn insert(&mut self, value: T) -> (&T, bool) {
        let ((key, _), inserted) = self.map.try_emplace(value, SetEmpty);
        (key, inserted)
    }

    /// Adds `value`, using `lookup` to check whether an equivalent element exists.
    ///
    /// `value` is stored only if nothing equivalent to `lookup` is present; it must be
    /// equivalent to `lookup` itself.
    pub fn insert_as<Q>(&mut self, value: T, lookup: &Q) -> (&T, bool)
    where
        Q: Hash + Equivalent<T> + ?Sized,
    {
        let ((key, _), inserted) = self.map.insert_as_with(lookup, move || (value, SetEmpty));
        (key, inserted)
    }

    /// Returns the element equivalent to `lookup`, building and inserting it with `f`
    /// when absent. `f` is not called on a hit.
    pub fn get_or_insert_with<Q, F>(&mut self, lookup: &Q, f: F) -> &T
    where
        Q: Hash + Equivalent<T> + ?Sized,
        F: FnOnce(&Q) -> T,
    {
        let ((key, _), _) = self.map.insert_as_with(lookup, || (f(lookup), SetEmpty));
        key
    }

    /// Returns the stored element equal to `value`.
    pub fn find(&self, value: &T) -> Option<&T> {
        self.find_as(value)
    }

    /// Returns the stored element equivalent to `lookup`, without building a `T`.
    pub fn find_as<Q>(&self, lookup: &Q) -> Option<&T>
    where
        Q: Hash + Equivalent<T> + ?Sized,
    {
        self.map.find_as(lookup).map(|(key, _)| key)
    }

    /// Returns `true` if the set contains an element equivalent to `lookup`.
    pub fn contains<Q>(&self, lookup: &Q) -> bool
    where
        Q: Hash + Equivalent<T> + ?Sized,
    {
        self.find_as(lookup).is_some()
    }

    /// Returns `1` if the set contains `lookup`, `0` otherwise.
    pub fn count<Q>(&self, lookup: &Q) -> usize
    where
        Q: Hash + Equivalent<T> + ?Sized,
    {
        usize::from(self.contains(lookup))
    }

    /// Removes the element equivalent to `lookup`. Returns whether it was present.
    pub fn remove<Q>(&mut self, lookup: &Q) -> bool
    where
        Q: Hash + Equivalent<T> + ?Sized,
    {
        self.take(lookup).is_some()
    }

    /// Removes and returns the element equivalent to `lookup`.
    pub fn take<Q>(&mut self, lookup: &Q) -> Option<T>
    where
        Q: Hash + Equivalent<T> + ?Sized,
    {
        self.map.remove_entry(lookup).map(|(key, _)| key)
    }

    /// Locates the element equivalent to `lookup` and returns a handle to it.
    ///
    /// The handle keeps the set borrowed; [`OccupiedEntry::remove`] erases the element
    /// it points at without a second lookup.
    pub fn find_entry<Q>(&mut self, lookup: &Q) -> Option<OccupiedEntry<'_, T, M>>
    where
        Q: Hash + Equivalent<T> + ?Sized,
    {
        self.map
            .find_entry(lookup)
            .map(|inner| OccupiedEntry { inner })
    }

    /// Clears the set, removing all values. Allocated storage is kept for reuse.
    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Exchanges the contents of two sets.
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(&mut self.map, &mut other.map);
    }

    /// Ensures the set can hold `capacity` elements in total without growing.
    ///
    /// Never lowers the current capacity.
    pub fn reserve(&mut self, capacity: usize) {
        let additional = capacity.saturating_sub(self.len());
        self.map.reserve(additional);
    }

    /// Fallible version of [`reserve`](Self::reserve).
    ///
    /// The map's error is returned as is and the set is left unchanged.
    pub fn try_reserve(&mut self, capacity: usize) -> Result<(), TryReserveError> {
        let additional = capacity.saturating_sub(self.len());
        self.map.try_reserve(additional)
    }

    /// Moves the capacity towards `capacity`: grows if it is larger than the current
    /// capacity, otherwise shrinks, but never below the number of stored elements.
    pub fn resize(&mut self, capacity: usize) {
        let before = self.capacity();
        if capacity > before {
            self.reserve(capacity);
        } else {
            self.map.shrink_to(capacity);
        }
        tracing::trace!(
            requested = capacity,
            before,
            after = self.capacity(),
            len = self.len(),
            "set resized"
        );
    }

    /// Retains only the elements specified by the predicate.
    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&T) -> bool,
    {
        self.map.retain(|key, _| f(key));
    }

    /// Returns an iterator visiting all elements in map-defined order.
    pub fn iter(&self) -> Iter<'_, T, M> {
        Iter {
            inner: self.map.iter(),
        }
    }

    // --- Set Operations ---

    /// Visits the values that are in `self` but not in `other`.
    ///
    /// `other` can be any collection implementing `AnySet`.
    pub fn difference<'a, S>(&'a self, other: &'a S) -> impl Iterator<Item = &'a T>
    where
        S: AnySet<T>,
    {
        self.iter().filter(move |v| !other.contains(v))
    }

    /// Visits the values that are both in `self` and `other`.
    pub fn intersection<'a, S>(&'a self, other: &'a S) -> impl Iterator<Item = &'a T>
    where
        S: AnySet<T>,
    {
        self.iter().filter(move |v| other.contains(v))
    }

    /// Visits all the values in `self` or `other`, without duplicates.
    ///
    /// `other` can be any iterator yielding `&T`.
    pub fn union<'a, I>(&'a self, other: I) -> impl Iterator<Item = &'a T>
    where
        I: IntoIterator<Item = &'a T>,
        I::IntoIter: 'a,
    {
        self.iter()
            .chain(other.into_iter().filter(move |v| !self.contains(*v)))
    }

    /// Visits the values that are in exactly one of `self` and `other`.
    pub fn symmetric_difference<'a, O>(&'a self, other: &'a O) -> impl Iterator<Item = &'a T>
    where
        O: AnySet<T>,
        &'a O: IntoIterator<Item = &'a T>,
    {
        self.difference(other)
            .chain(IntoIterator::into_iter(other).filter(move |v| !self.contains(*v)))
    }

    /// Returns `true` if `self` has no elements in common with `other`.
    pub fn is_disjoint<S>(&self, other: &S) -> bool
    where
        S: AnySet<T>,
    {
        self.iter().all(|v| !other.contains(v))
    }

    /// Returns `true` if every element of `self` is in `other`.
    pub fn is_subset<S>(&self, other: &S) -> bool
    where
        S: AnySet<T>,
    {
        self.len() <= other.len() && self.iter().all(|v| other.contains(v))
    }

    /// Returns `true` if every value yielded by `other` is in `self`.
    pub fn is_superset<'a, I>(&self, other: I) -> bool
    where
        T: 'a,
        I: IntoIterator<Item = &'a T>,
    {
        other.into_iter().all(|v| self.contains(v))
    }
}

// ==================================================================================
// 3. Entry Handle
// ==================================================================================

/// A handle to one element of a [`MapSet`], returned by [`MapSet::find_entry`].
pub struct OccupiedEntry<'a, T, M>
where
    M: AnyHashMap<T, SetEmpty> + 'a,
{
    inner: M::Occupied<'a>,
}

impl<'a, T, M> OccupiedEntry<'a, T, M>
where
    M: AnyHashMap<T, SetEmpty> + 'a,
{
    /// The element this handle points at.
    pub fn get(&self) -> &T {
        self.inner.key()
    }

    /// Erases the element from the set and returns it.
    pub fn remove(self) -> T {
        self.inner.remove_entry().0
    }
}

// ==================================================================================
// 4. Iterators
// ==================================================================================

/// An iterator over the elements of a [`MapSet`], projected out of the map's pairs.
pub struct Iter<'a, T, M>
where
    T: 'a,
    M: AnyHashMap<T, SetEmpty> + 'a,
{
    inner: M::Iter<'a>,
}

impl<'a, T, M> Iterator for Iter<'a, T, M>
where
    T: 'a,
    M: AnyHashMap<T, SetEmpty> + 'a,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        // The map yields (&Key, &SetEmpty). We only want the Key.
        self.inner.next().map(|(key, _)| key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, T, M> ExactSizeIterator for Iter<'a, T, M>
where
    T: 'a,
    M: AnyHashMap<T, SetEmpty> + 'a,
{
}

impl<'a, T, M> FusedIterator for Iter<'a, T, M>
where
    T: 'a,
    M: AnyHashMap<T, SetEmpty> + 'a,
{
}

impl<'a, T, M> Clone for Iter<'a, T, M>
where
    T: 'a,
    M: AnyHashMap<T, SetEmpty> + 'a,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// A consuming iterator for [`MapSet`].
pub struct IntoIter<T, M>
where
    M: AnyHashMap<T, SetEmpty>,
{
    inner: <M as IntoIterator>::IntoIter,
    marker: PhantomData<T>,
}

impl<T, M> Iterator for IntoIter<T, M>
where
    M: AnyHashMap<T, SetEmpty>,
{
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(key, _)| key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T, M> ExactSizeIterator for IntoIter<T, M> where M: AnyHashMap<T, SetEmpty> {}

impl<T, M> FusedIterator for IntoIter<T, M> where M: AnyHashMap<T, SetEmpty> {}

impl<T, M> IntoIterator for MapSet<T, M>
where
    T: Eq + Hash,
    M: AnyHashMap<T, SetEmpty>,
{
    type Item = T;
    type IntoIter = IntoIter<T, M>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.map.into_iter(),
            marker: PhantomData,
        }
    }
}

impl<'a, T, M> IntoIterator for &'a MapSet<T, M>
where
    T: Eq + Hash,
    M: AnyHashMap<T, SetEmpty>,
{
    type Item = &'a T;
    type IntoIter = Iter<'a, T, M>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ==================================================================================
// 5. Trait Implementations
// ==================================================================================

impl<T, M> AnySet<T> for MapSet<T, M>
where
    T: Eq + Hash,
    M: AnyHashMap<T, SetEmpty>,
{
    fn contains(&self, value: &T) -> bool {
        MapSet::contains(self, value)
    }

    fn len(&self) -> usize {
        MapSet::len(self)
    }
}

impl<T, M> Default for MapSet<T, M>
where
    T: Eq + Hash,
    M: AnyHashMap<T, SetEmpty>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, M: Clone> Clone for MapSet<T, M> {
    fn clone(&self) -> Self {
        Self {
            map: self.map.clone(),
            marker: PhantomData,
        }
    }
}

impl<T, M> Debug for MapSet<T, M>
where
    T: Debug + Eq + Hash,
    M: AnyHashMap<T, SetEmpty>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Two sets are equal when they hold the same elements, whatever their backends.
impl<T, M, M2> PartialEq<MapSet<T, M2>> for MapSet<T, M>
where
    T: Eq + Hash,
    M: AnyHashMap<T, SetEmpty>,
    M2: AnyHashMap<T, SetEmpty>,
{
    fn eq(&self, other: &MapSet<T, M2>) -> bool {
        self.len() == other.len() && self.iter().all(|v| other.contains(v))
    }
}

impl<T, M> Eq for MapSet<T, M>
where
    T: Eq + Hash,
    M: AnyHashMap<T, SetEmpty>,
{
}

// Allows `vec.into_iter().collect()`; duplicates collapse onto the first occurrence.
impl<T, M> FromIterator<T> for MapSet<T, M>
where
    T: Eq + Hash,
    M: AnyHashMap<T, SetEmpty>,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<T, M> Extend<T> for MapSet<T, M>
where
    T: Eq + Hash,
    M: AnyHashMap<T, SetEmpty>,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        // Only presize an empty set. Otherwise duplicates of stored elements could
        // force growth (or an inline spill) that the inserts themselves never need.
        if self.is_empty() {
            self.map.reserve(iter.size_hint().0);
        }
        for value in iter {
            self.insert(value);
        }
    }
}

impl<'a, T, M> Extend<&'a T> for MapSet<T, M>
where
    T: Eq + Hash + Copy + 'a,
    M: AnyHashMap<T, SetEmpty>,
{
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

// ==================================================================================
// 6. Tests
// ==================================================================================

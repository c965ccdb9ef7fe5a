use core::fmt::{self, Debug};
use core::hash::{BuildHasher, Hash};
use core::ops::{Deref, DerefMut};

use fnv::FnvBuildHasher;
use hashbrown::HashMap;

use crate::sets::empty::SetEmpty;
use crate::sets::map_set::{self, AnySet, MapSet};

type Backend<T, S> = HashMap<T, SetEmpty, S>;

/// A heap-backed hash set whose buckets are exactly as large as `T`.
///
/// All set operations live on [`MapSet`] and are reached through `Deref`. This type
/// only adds constructors and the standard trait impls.
///
/// # Examples
/// ```rust
/// use dense_set::DenseSet;
///
/// let mut set: DenseSet<String> = DenseSet::new();
/// assert!(set.insert("a".to_string()).1);
/// assert!(!set.insert("a".to_string()).1);
///
/// // Look up by &str, no String is built.
/// assert!(set.contains("a"));
/// assert_eq!(set.len(), 1);
/// ```
pub struct DenseSet<T, S = FnvBuildHasher> {
    inner: MapSet<T, Backend<T, S>>,
}

impl<T, S> DenseSet<T, S>
where
    T: Eq + Hash,
    S: BuildHasher + Default,
{
    /// Creates an empty set. Does not allocate.
    pub fn new() -> Self {
        Self {
            inner: MapSet::new(),
        }
    }

    /// Creates an empty set with room for `capacity` elements before rehashing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, S::default())
    }

    /// Creates an empty set that hashes with `hasher`.
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_capacity_and_hasher(0, hasher)
    }

    /// Creates an empty set with room for `capacity` elements that hashes with `hasher`.
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            inner: MapSet::from_map(HashMap::with_capacity_and_hasher(capacity, hasher)),
        }
    }

    /// Returns the set's hasher.
    pub fn hasher(&self) -> &S {
        self.inner.as_map().hasher()
    }

    // Inherent so that `AnySet` being in scope does not shadow the `Deref` target.

    /// Returns the number of elements in the set.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the set contains no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns `true` if the set contains an element equivalent to `lookup`.
    #[inline]
    pub fn contains<Q>(&self, lookup: &Q) -> bool
    where
        Q: Hash + hashbrown::Equivalent<T> + ?Sized,
    {
        self.inner.contains(lookup)
    }
}

impl<T, S> Deref for DenseSet<T, S> {
    type Target = MapSet<T, Backend<T, S>>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T, S> DerefMut for DenseSet<T, S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl<T, S> AnySet<T> for DenseSet<T, S>
where
    T: Eq + Hash,
    S: BuildHasher + Default,
{
    fn contains(&self, value: &T) -> bool {
        self.inner.contains(value)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<T, S> Default for DenseSet<T, S>
where
    T: Eq + Hash,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone, S: Clone> Clone for DenseSet<T, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T, S> Debug for DenseSet<T, S>
where
    T: Debug + Eq + Hash,
    S: BuildHasher + Default,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.inner, f)
    }
}

impl<T, S> PartialEq for DenseSet<T, S>
where
    T: Eq + Hash,
    S: BuildHasher + Default,
{
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<T, S> Eq for DenseSet<T, S>
where
    T: Eq + Hash,
    S: BuildHasher + Default,
{
}

impl<T, S> FromIterator<T> for DenseSet<T, S>
where
    T: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            inner: MapSet::from_iter(iter),
        }
    }
}

impl<T, S, const LEN: usize> From<[T; LEN]> for DenseSet<T, S>
where
    T: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from(values: [T; LEN]) -> Self {
        values.into_iter().collect()
    }
}

impl<T, S> Extend<T> for DenseSet<T, S>
where
    T: Eq + Hash,
    S: BuildHasher + Default,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.inner.extend(iter);
    }
}

impl<'a, T, S> Extend<&'a T> for DenseSet<T, S>
where
    T: Eq + Hash + Copy + 'a,
    S: BuildHasher + Default,
{
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.inner.extend(iter);
    }
}

impl<T, S> IntoIterator for DenseSet<T, S>
where
    T: Eq + Hash,
    S: BuildHasher + Default,
{
    type Item = T;
    type IntoIter = map_set::IntoIter<T, Backend<T, S>>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

impl<'a, T, S> IntoIterator for &'a DenseSet<T, S>
where
    T: Eq + Hash,
    S: BuildHasher + Default,
{
    type Item = &'a T;
    type IntoIter = map_set::Iter<'a, T, Backend<T, S>>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::RandomState;

    // --- 1. Basic Operations ---
    #[test]
    fn test_new_does_not_allocate() {
        let set: DenseSet<u32> = DenseSet::new();
        assert!(set.is_empty());
        assert_eq!(set.capacity(), 0);
        assert_eq!(set.memory_size(), 0);
    }

    #[test]
    fn test_insert_find_remove() {
        let mut set: DenseSet<i32> = DenseSet::new();
        assert!(set.insert(1).1);
        assert!(set.insert(2).1);
        assert!(set.insert(3).1);
        assert_eq!(set.len(), 3);

        assert!(!set.insert(2).1);
        assert_eq!(set.len(), 3);

        assert!(set.remove(&2));
        assert_eq!(set.count(&2), 0);
        assert_eq!(set.find(&1), Some(&1));
        assert_eq!(set.take(&3), Some(3));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_many_elements() {
        let mut set: DenseSet<u64> = DenseSet::new();
        for i in 0..10_000 {
            set.insert(i * 7);
        }
        assert_eq!(set.len(), 10_000);
        assert!(set.contains(&(9_999 * 7)));
        assert!(!set.contains(&1));
        assert!(set.memory_size() >= set.len() * core::mem::size_of::<u64>());
    }

    // --- 2. Construction ---
    #[test]
    fn test_with_capacity() {
        let mut set: DenseSet<i32> = DenseSet::with_capacity(100);
        let cap = set.capacity();
        assert!(cap >= 100);
        for i in 0..100 {
            set.insert(i);
        }
        assert_eq!(set.capacity(), cap);
    }

    #[test]
    fn test_custom_hasher() {
        let mut set: DenseSet<&str, RandomState> = DenseSet::with_hasher(RandomState::new());
        set.insert("x");
        assert!(set.contains("x"));
        let _ = set.hasher();

        let sized: DenseSet<&str, RandomState> =
            DenseSet::with_capacity_and_hasher(10, RandomState::new());
        assert!(sized.capacity() >= 10);
    }

    #[test]
    fn test_from_array_collapses_duplicates() {
        let set = DenseSet::<i32>::from([4, 1, 4, 2, 1]);
        assert_eq!(set.len(), 3);
        assert!([1, 2, 4].iter().all(|v| set.contains(v)));
    }

    // --- 3. Traits ---
    #[test]
    fn test_extend_by_value_and_ref() {
        let mut set: DenseSet<i32> = DenseSet::new();
        set.extend(vec![1, 2]);
        set.extend(&[2, 3]);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_clone_and_eq() {
        let a: DenseSet<String> = ["x", "y"].iter().map(|s| s.to_string()).collect();
        let mut b = a.clone();
        assert!(a == b);
        b.insert("z".to_string());
        assert!(a != b);
        assert!(a.is_subset(&b));
    }

    #[test]
    fn test_iteration() {
        let set = DenseSet::<i32>::from([1, 2, 3]);
        let mut by_ref: Vec<i32> = (&set).into_iter().copied().collect();
        by_ref.sort();
        assert_eq!(by_ref, vec![1, 2, 3]);

        let mut owned: Vec<i32> = set.into_iter().collect();
        owned.sort();
        assert_eq!(owned, vec![1, 2, 3]);
    }

    #[test]
    fn test_debug() {
        let set = DenseSet::<i32>::from([7]);
        assert_eq!(format!("{:?}", set), "{7}");
    }
}

use core::fmt::{self, Debug};
use core::hash::{BuildHasher, Hash};
use core::ops::{Deref, DerefMut};

use fnv::FnvBuildHasher;
use hashbrown::Equivalent;

use crate::maps::SmallMap;
use crate::sets::empty::SetEmpty;
use crate::sets::map_set::{self, AnySet, MapSet};

type Backend<T, const N: usize, S> = SmallMap<T, SetEmpty, N, S>;

/// A set that keeps up to `N` elements inline and spills to a heap table after that.
///
/// # Implementation Details
/// This is a [`MapSet`] over `SmallMap<T, SetEmpty, N, S>`. While inline, lookups are
/// a linear scan of at most `N` elements and nothing is allocated. Inserting element
/// `N + 1` moves every element into a `hashbrown` table; the set does not return to
/// the inline buffer afterwards, not even on `clear`.
///
/// # Examples
/// ```rust
/// use dense_set::SmallDenseSet;
///
/// let mut set: SmallDenseSet<i32, 2> = SmallDenseSet::new();
/// set.insert(1);
/// set.insert(2);
/// assert!(set.is_inline());
///
/// // Spills on the 3rd element
/// set.insert(3);
/// assert!(!set.is_inline());
/// assert_eq!(set.len(), 3);
/// ```
pub struct SmallDenseSet<T, const N: usize = 4, S = FnvBuildHasher> {
    inner: MapSet<T, Backend<T, N, S>>,
}

impl<T, const N: usize, S> SmallDenseSet<T, N, S>
where
    T: Eq + Hash,
    S: BuildHasher + Default,
{
    /// Creates an empty set in the inline state.
    pub fn new() -> Self {
        Self {
            inner: MapSet::new(),
        }
    }

    /// Creates an empty set with room for `capacity` elements.
    ///
    /// Starts on the heap when `capacity > N`.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: MapSet::with_capacity(capacity),
        }
    }

    /// Returns `true` while the elements live in the inline buffer.
    #[inline]
    pub fn is_inline(&self) -> bool {
        self.inner.as_map().is_inline()
    }

    /// The number of elements held before the first spill.
    #[inline]
    pub const fn inline_capacity(&self) -> usize {
        N
    }

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
        Q: Hash + Equivalent<T> + ?Sized,
    {
        self.inner.contains(lookup)
    }
}

impl<T, const N: usize, S> Deref for SmallDenseSet<T, N, S> {
    type Target = MapSet<T, Backend<T, N, S>>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T, const N: usize, S> DerefMut for SmallDenseSet<T, N, S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl<T, const N: usize, S> AnySet<T> for SmallDenseSet<T, N, S>
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

impl<T, const N: usize, S> Default for SmallDenseSet<T, N, S>
where
    T: Eq + Hash,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize, S> Clone for SmallDenseSet<T, N, S>
where
    T: Eq + Hash + Clone,
    S: BuildHasher + Default + Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T, const N: usize, S> Debug for SmallDenseSet<T, N, S>
where
    T: Debug + Eq + Hash,
    S: BuildHasher + Default,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.inner, f)
    }
}

impl<T, const N: usize, S> PartialEq for SmallDenseSet<T, N, S>
where
    T: Eq + Hash,
    S: BuildHasher + Default,
{
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<T, const N: usize, S> Eq for SmallDenseSet<T, N, S>
where
    T: Eq + Hash,
    S: BuildHasher + Default,
{
}

impl<T, const N: usize, S> FromIterator<T> for SmallDenseSet<T, N, S>
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

impl<T, const N: usize, S, const LEN: usize> From<[T; LEN]> for SmallDenseSet<T, N, S>
where
    T: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from(values: [T; LEN]) -> Self {
        values.into_iter().collect()
    }
}

impl<T, const N: usize, S> Extend<T> for SmallDenseSet<T, N, S>
where
    T: Eq + Hash,
    S: BuildHasher + Default,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.inner.extend(iter);
    }
}

impl<'a, T, const N: usize, S> Extend<&'a T> for SmallDenseSet<T, N, S>
where
    T: Eq + Hash + Copy + 'a,
    S: BuildHasher + Default,
{
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.inner.extend(iter);
    }
}

impl<T, const N: usize, S> IntoIterator for SmallDenseSet<T, N, S>
where
    T: Eq + Hash,
    S: BuildHasher + Default,
{
    type Item = T;
    type IntoIter = map_set::IntoIter<T, Backend<T, N, S>>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

impl<'a, T, const N: usize, S> IntoIterator for &'a SmallDenseSet<T, N, S>
where
    T: Eq + Hash,
    S: BuildHasher + Default,
{
    type Item = &'a T;
    type IntoIter = map_set::Iter<'a, T, Backend<T, N, S>>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sets::DenseSet;

    // --- 1. Inline State ---
    #[test]
    fn test_stays_inline_up_to_n() {
        let mut set: SmallDenseSet<i32, 4> = SmallDenseSet::new();
        for i in 0..4 {
            assert!(set.insert(i).1);
        }
        assert!(set.is_inline());
        assert_eq!(set.len(), 4);
        assert_eq!(set.memory_size(), 0);
        assert_eq!(set.inline_capacity(), 4);

        // A hit on a full buffer must not spill
        assert!(!set.insert(2).1);
        assert!(set.is_inline());
    }

    #[test]
    fn test_default_inline_capacity() {
        let set: SmallDenseSet<u8> = SmallDenseSet::default();
        assert_eq!(set.inline_capacity(), 4);
        assert_eq!(set.capacity(), 4);
    }

    #[test]
    fn test_remove_while_inline() {
        let mut set = SmallDenseSet::<i32, 4>::from([1, 2, 3]);
        assert!(set.remove(&1));
        assert!(!set.contains(&1));
        assert!(set.contains(&2) && set.contains(&3));
        assert!(set.is_inline());
    }

    // --- 2. Spilling ---
    #[test]
    fn test_spill_on_n_plus_one() {
        let mut set: SmallDenseSet<String, 2> = SmallDenseSet::new();
        set.insert("a".to_string());
        set.insert("b".to_string());
        assert!(set.is_inline());

        set.insert("c".to_string());
        assert!(!set.is_inline());
        assert!(set.memory_size() > 0);
        for key in ["a", "b", "c"] {
            assert!(set.contains(key));
        }
    }

    #[test]
    fn test_heap_is_sticky() {
        let mut set: SmallDenseSet<i32, 2> = (0..10).collect();
        assert!(!set.is_inline());

        set.clear();
        assert!(set.is_empty());
        assert!(!set.is_inline());
    }

    #[test]
    fn test_with_capacity_above_n_starts_on_heap() {
        let set: SmallDenseSet<i32, 4> = SmallDenseSet::with_capacity(32);
        assert!(!set.is_inline());
        assert!(set.capacity() >= 32);

        let small: SmallDenseSet<i32, 4> = SmallDenseSet::with_capacity(3);
        assert!(small.is_inline());
    }

    #[test]
    fn test_reserve_past_n_spills() {
        let mut set = SmallDenseSet::<i32, 4>::from([1, 2]);
        set.reserve(3);
        assert!(set.is_inline());

        set.reserve(20);
        assert!(!set.is_inline());
        assert!(set.capacity() >= 20);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_extend_with_stored_elements_stays_inline() {
        let mut set = SmallDenseSet::<i32, 4>::from([1, 2, 3]);
        set.extend([1, 2, 3]);
        assert_eq!(set.len(), 3);
        assert!(set.is_inline());
        assert_eq!(set.memory_size(), 0);

        // Filling the last slot through extend still fits
        set.extend([3, 4]);
        assert_eq!(set.len(), 4);
        assert!(set.is_inline());

        set.extend([5]);
        assert!(!set.is_inline());
        assert_eq!(set.len(), 5);
    }

    #[test]
    fn test_swap_inline_with_spilled() {
        let mut inline = SmallDenseSet::<i32, 4>::from([1, 2]);
        let mut spilled: SmallDenseSet<i32, 4> = (10..20).collect();
        assert!(inline.is_inline());
        assert!(!spilled.is_inline());

        inline.swap(&mut spilled);

        assert!(!inline.is_inline());
        assert_eq!(inline.len(), 10);
        assert!((10..20).all(|v| inline.contains(&v)));
        assert!(!inline.contains(&1));

        assert!(spilled.is_inline());
        assert_eq!(spilled.len(), 2);
        assert!(spilled.contains(&1) && spilled.contains(&2));
        assert!(!spilled.contains(&10));

        // Both sides keep working on their new storage
        assert!(inline.insert(99).1);
        assert!(inline.remove(&10));
        assert_eq!(inline.len(), 10);

        assert!(spilled.insert(3).1);
        assert!(spilled.remove(&1));
        assert_eq!(spilled.len(), 2);
        assert!(spilled.is_inline());
    }

    // --- 3. Agreement With The Heap Facade ---
    #[test]
    fn test_matches_dense_set() {
        let ops = [5, 1, 5, 9, 2, 1, 7, 3, 3, 8];
        let mut small: SmallDenseSet<i32, 4> = SmallDenseSet::new();
        let mut dense: DenseSet<i32> = DenseSet::new();

        for (i, v) in ops.iter().enumerate() {
            assert_eq!(small.insert(*v).1, dense.insert(*v).1);
            if i % 3 == 2 {
                assert_eq!(small.remove(v), dense.remove(v));
            }
            assert!(*small == *dense);
        }
    }

    #[test]
    fn test_find_entry_remove_both_states() {
        let mut set: SmallDenseSet<&str, 2> = SmallDenseSet::from(["x", "y"]);
        let entry = set.find_entry("x").expect("present");
        assert_eq!(entry.remove(), "x");
        assert_eq!(set.len(), 1);

        set.extend(["p", "q", "r"]);
        assert!(!set.is_inline());
        let entry = set.find_entry("q").expect("present");
        assert_eq!(*entry.get(), "q");
        entry.remove();
        assert!(!set.contains("q"));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_clone_and_debug() {
        let a = SmallDenseSet::<i32, 2>::from([1]);
        let b = a.clone();
        assert!(a == b);
        assert_eq!(format!("{:?}", b), "{1}");
    }
}

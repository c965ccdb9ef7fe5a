//! Map backends the set adapter can be layered on.
//!
//! [`AnyHashMap`] is the capability contract the adapter is written against. It is
//! implemented by `hashbrown::HashMap` (always heap) and by [`SmallMap`] (inline
//! until it spills).

pub mod small_map;

pub use small_map::SmallMap;

use core::hash::{BuildHasher, Hash, Hasher};
use core::iter::FusedIterator;
use core::mem;

use hashbrown::hash_map::{self, RawEntryMut, RawOccupiedEntryMut};
use hashbrown::{Equivalent, HashMap, TryReserveError};

/// An abstraction over hash map types that a set can project its keys out of.
///
/// Implemented by `hashbrown::HashMap<K, V, S>` (heap) and `SmallMap<K, V, N, S>`
/// (inline, then heap) so that [`MapSet`](crate::MapSet) is written once for both.
///
/// Lookups are heterogeneous: any `Q: Hash + Equivalent<K>` can stand in for a key.
/// The caller must make sure `Q` hashes exactly like the key it is equivalent to;
/// a mismatch makes lookups miss but never breaks memory safety.
pub trait AnyHashMap<K, V>:
    Default + IntoIterator<Item = (K, V), IntoIter: ExactSizeIterator + FusedIterator>
{
    /// Iterator over `(&K, &V)` pairs in map-defined order.
    type Iter<'a>: ExactSizeIterator<Item = (&'a K, &'a V)> + FusedIterator + Clone
    where
        Self: 'a,
        K: 'a,
        V: 'a;

    /// A handle to a single present entry, able to remove it.
    type Occupied<'a>: AnyOccupiedEntry<K, V>
    where
        Self: 'a;

    /// Creates an empty map able to hold `capacity` entries without reallocating.
    fn with_capacity(capacity: usize) -> Self;

    /// Returns the number of entries.
    fn len(&self) -> usize;

    /// Returns `true` if the map holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of entries the map can hold without reallocating.
    fn capacity(&self) -> usize;

    /// Approximate number of heap bytes held for bucket storage.
    fn memory_size(&self) -> usize;

    /// Looks up the entry whose key is equivalent to `key`.
    fn find_as<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        Q: Hash + Equivalent<K> + ?Sized;

    /// Inserts `(key, value)` unless an equal key is present.
    ///
    /// Never overwrites: on a hit the arguments are dropped and the existing entry
    /// is returned with `false`.
    fn try_emplace(&mut self, key: K, value: V) -> ((&K, &mut V), bool);

    /// Like [`try_emplace`](AnyHashMap::try_emplace) but presence is tested with
    /// `key`, and `make` is only called when a new entry has to be created.
    fn insert_as_with<Q, F>(&mut self, key: &Q, make: F) -> ((&K, &mut V), bool)
    where
        Q: Hash + Equivalent<K> + ?Sized,
        F: FnOnce() -> (K, V);

    /// Removes and returns the entry equivalent to `key`.
    fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        Q: Hash + Equivalent<K> + ?Sized;

    /// Locates the entry equivalent to `key` so it can be inspected or removed.
    fn find_entry<Q>(&mut self, key: &Q) -> Option<Self::Occupied<'_>>
    where
        Q: Hash + Equivalent<K> + ?Sized;

    /// Reserves room for at least `additional` more entries.
    fn reserve(&mut self, additional: usize);

    /// Fallible version of [`reserve`](AnyHashMap::reserve).
    fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError>;

    /// Shrinks capacity towards `min_capacity`, never below `len()`.
    fn shrink_to(&mut self, min_capacity: usize);

    /// Removes all entries, keeping allocated storage.
    fn clear(&mut self);

    /// Keeps only the entries for which `f` returns `true`.
    fn retain<F>(&mut self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool;

    /// Returns an iterator over all entries.
    fn iter(&self) -> Self::Iter<'_>;
}

/// A located map entry that can be read or removed.
pub trait AnyOccupiedEntry<K, V> {
    /// The key stored in the entry.
    fn key(&self) -> &K;

    /// Removes the entry from its map, consuming the handle.
    fn remove_entry(self) -> (K, V);
}

impl<'a, K, V, S> AnyOccupiedEntry<K, V> for RawOccupiedEntryMut<'a, K, V, S> {
    fn key(&self) -> &K {
        RawOccupiedEntryMut::key(self)
    }

    fn remove_entry(self) -> (K, V) {
        RawOccupiedEntryMut::remove_entry(self)
    }
}

pub(crate) fn make_hash<Q, S>(hash_builder: &S, key: &Q) -> u64
where
    Q: Hash + ?Sized,
    S: BuildHasher,
{
    let mut state = hash_builder.build_hasher();
    key.hash(&mut state);
    state.finish()
}

/// Estimates the bucket storage of a `hashbrown` table from its capacity.
///
/// Capacity is 7/8 of the bucket count for large tables, and each bucket carries
/// one control byte next to the entry.
pub(crate) fn heap_footprint<K, V, S>(map: &HashMap<K, V, S>) -> usize {
    let capacity = map.capacity();
    if capacity == 0 {
        return 0;
    }
    let buckets = (capacity * 8 / 7).max(capacity + 1).next_power_of_two();
    buckets * (mem::size_of::<(K, V)>() + 1)
}

impl<K, V, S> AnyHashMap<K, V> for HashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    type Iter<'a>
        = hash_map::Iter<'a, K, V>
    where
        Self: 'a,
        K: 'a,
        V: 'a;

    type Occupied<'a>
        = RawOccupiedEntryMut<'a, K, V, S>
    where
        Self: 'a;

    fn with_capacity(capacity: usize) -> Self {
        HashMap::with_capacity_and_hasher(capacity, S::default())
    }

    fn len(&self) -> usize {
        self.len()
    }

    fn capacity(&self) -> usize {
        self.capacity()
    }

    fn memory_size(&self) -> usize {
        heap_footprint(self)
    }

    fn find_as<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.get_key_value(key)
    }

    fn try_emplace(&mut self, key: K, value: V) -> ((&K, &mut V), bool) {
        let hash = make_hash(self.hasher(), &key);
        match self.raw_entry_mut().from_key_hashed_nocheck(hash, &key) {
            RawEntryMut::Occupied(entry) => {
                let (k, v) = entry.into_key_value();
                ((&*k, v), false)
            }
            RawEntryMut::Vacant(entry) => {
                let (k, v) = entry.insert_hashed_nocheck(hash, key, value);
                ((&*k, v), true)
            }
        }
    }

    fn insert_as_with<Q, F>(&mut self, key: &Q, make: F) -> ((&K, &mut V), bool)
    where
        Q: Hash + Equivalent<K> + ?Sized,
        F: FnOnce() -> (K, V),
    {
        let hash = make_hash(self.hasher(), key);
        match self.raw_entry_mut().from_hash(hash, |k| key.equivalent(k)) {
            RawEntryMut::Occupied(entry) => {
                let (k, v) = entry.into_key_value();
                ((&*k, v), false)
            }
            RawEntryMut::Vacant(entry) => {
                let (new_key, new_value) = make();
                let (k, v) = entry.insert_hashed_nocheck(hash, new_key, new_value);
                ((&*k, v), true)
            }
        }
    }

    fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.remove_entry(key)
    }

    fn find_entry<Q>(&mut self, key: &Q) -> Option<Self::Occupied<'_>>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        let hash = make_hash(self.hasher(), key);
        match self.raw_entry_mut().from_hash(hash, |k| key.equivalent(k)) {
            RawEntryMut::Occupied(entry) => Some(entry),
            RawEntryMut::Vacant(_) => None,
        }
    }

    fn reserve(&mut self, additional: usize) {
        self.reserve(additional);
    }

    fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        self.try_reserve(additional)
    }

    fn shrink_to(&mut self, min_capacity: usize) {
        self.shrink_to(min_capacity);
    }

    fn clear(&mut self) {
        self.clear();
    }

    fn retain<F>(&mut self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        self.retain(f);
    }

    fn iter(&self) -> Self::Iter<'_> {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fnv::FnvBuildHasher;

    type FnvMap<K, V> = HashMap<K, V, FnvBuildHasher>;

    #[test]
    fn test_try_emplace_does_not_overwrite() {
        let mut map: FnvMap<i32, &str> = FnvMap::with_capacity_and_hasher(4, Default::default());

        let ((_, v), inserted) = map.try_emplace(1, "first");
        assert!(inserted);
        assert_eq!(*v, "first");

        let ((k, v), inserted) = map.try_emplace(1, "second");
        assert!(!inserted);
        assert_eq!(*k, 1);
        assert_eq!(*v, "first");
        assert_eq!(AnyHashMap::len(&map), 1);
    }

    #[test]
    fn test_insert_as_with_is_lazy() {
        let mut map: FnvMap<String, u8> = FnvMap::default();
        let mut built = 0;

        let (_, inserted) = map.insert_as_with("key", || {
            built += 1;
            ("key".to_string(), 0)
        });
        assert!(inserted);

        let (_, inserted) = map.insert_as_with("key", || {
            built += 1;
            ("key".to_string(), 1)
        });
        assert!(!inserted);
        assert_eq!(built, 1);
    }

    #[test]
    fn test_find_entry_removes() {
        let mut map: FnvMap<String, ()> = FnvMap::default();
        map.try_emplace("a".to_string(), ());
        map.try_emplace("b".to_string(), ());

        let entry = AnyHashMap::find_entry(&mut map, "a").expect("entry exists");
        assert_eq!(entry.key(), "a");
        assert_eq!(AnyOccupiedEntry::remove_entry(entry), ("a".to_string(), ()));

        assert!(AnyHashMap::find_entry(&mut map, "a").is_none());
        assert_eq!(AnyHashMap::len(&map), 1);
    }

    #[test]
    fn test_memory_size_tracks_capacity() {
        let empty: FnvMap<u64, ()> = FnvMap::default();
        assert_eq!(AnyHashMap::memory_size(&empty), 0);

        let sized: FnvMap<u64, ()> = FnvMap::with_capacity_and_hasher(100, Default::default());
        let bytes = AnyHashMap::memory_size(&sized);
        // every usable slot costs at least the key and a control byte
        assert!(bytes >= AnyHashMap::capacity(&sized) * (mem::size_of::<u64>() + 1));
    }
}

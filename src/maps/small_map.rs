//! Hash map that keeps up to `N` entries inline and spills to the heap.
//!
//! [`SmallMap`] is the storage behind [`SmallDenseSet`](crate::SmallDenseSet). While
//! inline, entries sit in a `heapless::Vec` and are found by a linear scan; once the
//! buffer is full the entries are moved into a `hashbrown::HashMap`.

use core::fmt::{self, Debug};
use core::hash::{BuildHasher, Hash};
use core::iter::FusedIterator;
use core::mem::{self, ManuallyDrop};
use core::slice;

use fnv::FnvBuildHasher;
use hashbrown::hash_map::{self, RawOccupiedEntryMut};
use hashbrown::{Equivalent, HashMap, TryReserveError};
use heapless::Vec as HeaplessVec;

use super::{AnyHashMap, AnyOccupiedEntry, heap_footprint, make_hash};

/// A hash map that lives inline for `N` entries, then automatically spills to the heap.
///
/// # Overview
/// * **Inline State:** Zero allocations. Entries are stored in a fixed buffer inside the
///   struct and compared with `Equivalent`, no hashing involved.
/// * **Heap State:** `hashbrown::HashMap` performance with the hasher `S`.
/// * **Spill:** Occurs when a new key does not fit or when a capacity request exceeds
///   `N`. Keys and values are moved, never cloned. Once spilled the map stays on the heap.
///
/// # Generic parameters
/// | Parameter | Meaning |
/// |-----------|---------|
/// | `K` | Key type; `Eq + Hash` |
/// | `V` | Value type |
/// | `N` | Inline capacity, entries held before the spill |
/// | `S` | Hasher used by the heap side |
///
/// # Safety
/// `on_stack` determines which field of `MapData` is active. Only that field may be
/// accessed, and every unsafe union access checks the tag first.
pub struct SmallMap<K, V, const N: usize, S = FnvBuildHasher> {
    /// Tag of the union below.
    on_stack: bool,
    data: MapData<K, V, N, S>,
}

/// Internal storage union.
///
/// The fields are `ManuallyDrop` because the compiler cannot know which one is active;
/// `impl Drop for SmallMap` drops the right one.
union MapData<K, V, const N: usize, S> {
    stack: ManuallyDrop<HeaplessVec<(K, V), N>>,
    heap: ManuallyDrop<HashMap<K, V, S>>,
}

// --- 1. Storage-independent accessors ---

impl<K, V, const N: usize, S> SmallMap<K, V, N, S> {
    /// Returns `true` while the entries are stored inline.
    #[inline]
    pub fn is_inline(&self) -> bool {
        self.on_stack
    }

    /// Returns the number of entries in the map.
    pub fn len(&self) -> usize {
        unsafe {
            if self.on_stack {
                self.data.stack.len()
            } else {
                self.data.heap.len()
            }
        }
    }

    /// Returns `true` if the map contains no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns how many entries fit before the next reallocation (or the spill).
    pub fn capacity(&self) -> usize {
        unsafe {
            if self.on_stack {
                N
            } else {
                self.data.heap.capacity()
            }
        }
    }

    /// Approximate heap bytes used for bucket storage. Always `0` while inline.
    pub fn memory_size(&self) -> usize {
        if self.on_stack {
            0
        } else {
            unsafe { heap_footprint::<K, V, S>(&self.data.heap) }
        }
    }

    /// Removes every entry.
    ///
    /// * **Inline:** Resets the buffer length to 0.
    /// * **Heap:** Keeps the allocated table for reuse.
    pub fn clear(&mut self) {
        unsafe {
            if self.on_stack {
                (*self.data.stack).clear();
            } else {
                (*self.data.heap).clear();
            }
        }
    }

    /// Returns an iterator over the entries in arbitrary order.
    pub fn iter(&self) -> SmallMapIter<'_, K, V> {
        unsafe {
            let inner = if self.on_stack {
                IterInner::Inline(self.data.stack.iter())
            } else {
                IterInner::Heap(self.data.heap.iter())
            };
            SmallMapIter { inner }
        }
    }
}

// --- 2. Core Implementation ---

impl<K, V, const N: usize, S> SmallMap<K, V, N, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    /// The maximum allowed inline footprint in bytes (16 KB).
    ///
    /// A large `N` or large entry types would otherwise make the struct big enough to
    /// overflow the thread stack.
    pub const MAX_INLINE_SIZE: usize = 16 * 1024;

    /// Creates a new empty map in the inline state.
    ///
    /// # Compile-Time Safety Check
    /// The build fails if `size_of::<SmallMap<K, V, N, S>>()` exceeds
    /// [`MAX_INLINE_SIZE`](Self::MAX_INLINE_SIZE). Reduce `N` or box the key type.
    pub fn new() -> Self {
        const {
            assert!(
                mem::size_of::<Self>() <= Self::MAX_INLINE_SIZE,
                "SmallMap is too large! The total struct size exceeds the 16KB safety limit. \
                 Solution: Reduce N, or box the key type."
            );
        }

        Self {
            on_stack: true,
            data: MapData {
                stack: ManuallyDrop::new(HeaplessVec::new()),
            },
        }
    }

    /// Creates an empty map able to hold `capacity` entries.
    ///
    /// If `capacity <= N` this is [`new`](Self::new); otherwise the map starts on the heap.
    pub fn with_capacity(capacity: usize) -> Self {
        if capacity <= N {
            Self::new()
        } else {
            Self {
                on_stack: false,
                data: MapData {
                    heap: ManuallyDrop::new(HashMap::with_capacity_and_hasher(
                        capacity,
                        S::default(),
                    )),
                },
            }
        }
    }

    /// Returns the entry whose key is equivalent to `key`.
    ///
    /// `Q` can be any type implementing `Equivalent<K>`, e.g. `str` for `String` keys.
    pub fn find_as<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        unsafe {
            if self.on_stack {
                self.data
                    .stack
                    .iter()
                    .find(|(k, _)| key.equivalent(k))
                    .map(|(k, v)| (k, v))
            } else {
                self.data.heap.get_key_value(key)
            }
        }
    }

    /// Returns a reference to the value stored for `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.find_as(key).map(|(_, v)| v)
    }

    /// Returns `true` if the map contains an entry for `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.find_as(key).is_some()
    }

    /// Inserts `(key, value)` unless an equal key is already present.
    ///
    /// Returns the stored entry and whether it was created. An existing entry is left
    /// untouched and the arguments are dropped. Inserting a new key into a full inline
    /// buffer triggers the spill.
    pub fn try_emplace(&mut self, key: K, value: V) -> ((&K, &mut V), bool) {
        if self.on_stack {
            unsafe {
                if let Some(index) = self.inline_position(&key) {
                    let (k, v) = &mut (*self.data.stack)[index];
                    return ((&*k, v), false);
                }
                if !self.data.stack.is_full() {
                    return (self.push_inline((key, value)), true);
                }
                let len = self.len();
                self.spill_to_heap(len + 1);
            }
        }
        unsafe { AnyHashMap::try_emplace(&mut *self.data.heap, key, value) }
    }

    /// Inserts the entry built by `make` unless an entry equivalent to `key` exists.
    ///
    /// `make` runs only when a new entry is created. The key it returns must be
    /// equivalent to `key` and hash the same way.
    pub fn insert_as_with<Q, F>(&mut self, key: &Q, make: F) -> ((&K, &mut V), bool)
    where
        Q: Hash + Equivalent<K> + ?Sized,
        F: FnOnce() -> (K, V),
    {
        if self.on_stack {
            unsafe {
                if let Some(index) = self.inline_position(key) {
                    let (k, v) = &mut (*self.data.stack)[index];
                    return ((&*k, v), false);
                }
                let entry = make();
                if !self.data.stack.is_full() {
                    return (self.push_inline(entry), true);
                }
                let len = self.len();
                self.spill_to_heap(len + 1);
                return AnyHashMap::insert_as_with(&mut *self.data.heap, key, move || entry);
            }
        }
        unsafe { AnyHashMap::insert_as_with(&mut *self.data.heap, key, make) }
    }

    /// Removes the entry for `key`, returning it if it was present.
    ///
    /// Inline removal swaps the last entry into the hole, so iteration order changes.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        unsafe {
            if self.on_stack {
                let index = self.inline_position(key)?;
                Some((*self.data.stack).swap_remove(index))
            } else {
                (*self.data.heap).remove_entry(key)
            }
        }
    }

    /// Locates the entry for `key`, returning a handle that can remove it.
    pub fn find_entry<Q>(&mut self, key: &Q) -> Option<SmallMapOccupied<'_, K, V, N, S>>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        unsafe {
            if self.on_stack {
                let index = self.inline_position(key)?;
                Some(SmallMapOccupied {
                    inner: OccupiedInner::Inline {
                        entries: &mut *self.data.stack,
                        index,
                    },
                })
            } else {
                AnyHashMap::find_entry(&mut *self.data.heap, key).map(|entry| SmallMapOccupied {
                    inner: OccupiedInner::Heap(entry),
                })
            }
        }
    }

    /// Reserves room for `additional` more entries.
    ///
    /// While inline, a request beyond `N` spills to a heap table of the requested size.
    pub fn reserve(&mut self, additional: usize) {
        unsafe {
            if self.on_stack {
                let required = self.len().saturating_add(additional);
                if required > N {
                    self.spill_to_heap(required);
                }
            } else {
                (*self.data.heap).reserve(additional);
            }
        }
    }

    /// Fallible version of [`reserve`](Self::reserve).
    ///
    /// The error comes straight from `hashbrown`; on failure the map is unchanged.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        unsafe {
            if self.on_stack {
                let required = self
                    .len()
                    .checked_add(additional)
                    .ok_or(TryReserveError::CapacityOverflow)?;
                if required > N {
                    let mut heap = HashMap::with_hasher(S::default());
                    heap.try_reserve(required)?;
                    self.spill_into(heap);
                }
                Ok(())
            } else {
                (*self.data.heap).try_reserve(additional)
            }
        }
    }

    /// Shrinks the heap table towards `min_capacity`. No-op while inline.
    pub fn shrink_to(&mut self, min_capacity: usize) {
        if !self.on_stack {
            unsafe { (*self.data.heap).shrink_to(min_capacity) }
        }
    }

    /// Keeps only the entries for which `f` returns `true`.
    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        unsafe {
            if self.on_stack {
                (*self.data.stack).retain_mut(|(k, v)| f(k, v));
            } else {
                (*self.data.heap).retain(f);
            }
        }
    }

    /// # Safety
    /// The map must be inline.
    unsafe fn inline_position<Q>(&self, key: &Q) -> Option<usize>
    where
        Q: Equivalent<K> + ?Sized,
    {
        unsafe { self.data.stack.iter().position(|(k, _)| key.equivalent(k)) }
    }

    /// # Safety
    /// The map must be inline with at least one free slot.
    unsafe fn push_inline(&mut self, entry: (K, V)) -> (&K, &mut V) {
        unsafe {
            let stack = &mut *self.data.stack;
            if stack.push(entry).is_err() {
                unreachable!("Logic Error: Capacity available, push must succeed");
            }
            let index = stack.len() - 1;
            let (k, v) = &mut stack[index];
            (&*k, v)
        }
    }

    /// **Inline -> Heap Migration**
    ///
    /// Allocates a table for at least `capacity` entries (and never less than twice the
    /// current length, to leave room after the spill) and moves every entry into it.
    ///
    /// # Safety
    /// The map must be inline.
    #[inline(never)]
    unsafe fn spill_to_heap(&mut self, capacity: usize) {
        let capacity = capacity.max(self.len() * 2);
        let heap = HashMap::with_capacity_and_hasher(capacity, S::default());
        unsafe { self.spill_into(heap) }
    }

    /// # Safety
    /// The map must be inline.
    unsafe fn spill_into(&mut self, mut heap: HashMap<K, V, S>) {
        unsafe {
            // Leave an empty buffer behind so a panicking `Hash` impl cannot cause a
            // double drop.
            let stack = mem::replace(&mut *self.data.stack, HeaplessVec::new());
            let moved = stack.len();

            // Keys are distinct already, so skip the equality probe.
            for (key, value) in stack {
                let hash = make_hash(heap.hasher(), &key);
                heap.raw_entry_mut()
                    .from_key_hashed_nocheck(hash, &key)
                    .insert(key, value);
            }

            // The inline buffer is empty and owns nothing, so overwriting it is fine.
            self.data.heap = ManuallyDrop::new(heap);
            self.on_stack = false;

            tracing::trace!(
                moved,
                capacity = self.data.heap.capacity(),
                "small map spilled to heap"
            );
        }
    }
}

// --- 3. Occupied Entry ---

/// A located entry of a [`SmallMap`], borrowed from the map until it is dropped or
/// removed.
pub struct SmallMapOccupied<'a, K, V, const N: usize, S> {
    inner: OccupiedInner<'a, K, V, N, S>,
}

// Private so callers cannot reach the inline buffer and break key uniqueness.
enum OccupiedInner<'a, K, V, const N: usize, S> {
    Inline {
        entries: &'a mut HeaplessVec<(K, V), N>,
        index: usize,
    },
    Heap(RawOccupiedEntryMut<'a, K, V, S>),
}

impl<'a, K, V, const N: usize, S> AnyOccupiedEntry<K, V> for SmallMapOccupied<'a, K, V, N, S> {
    fn key(&self) -> &K {
        match &self.inner {
            OccupiedInner::Inline { entries, index } => &entries[*index].0,
            OccupiedInner::Heap(entry) => entry.key(),
        }
    }

    fn remove_entry(self) -> (K, V) {
        match self.inner {
            OccupiedInner::Inline { entries, index } => entries.swap_remove(index),
            OccupiedInner::Heap(entry) => entry.remove_entry(),
        }
    }
}

// --- 4. Iterator Support ---

/// Borrowing iterator over a [`SmallMap`], hiding the storage difference.
pub struct SmallMapIter<'a, K, V> {
    inner: IterInner<'a, K, V>,
}

enum IterInner<'a, K, V> {
    Inline(slice::Iter<'a, (K, V)>),
    Heap(hash_map::Iter<'a, K, V>),
}

impl<'a, K, V> Iterator for SmallMapIter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            IterInner::Inline(i) => i.next().map(|(k, v)| (k, v)),
            IterInner::Heap(i) => i.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.inner {
            IterInner::Inline(i) => i.size_hint(),
            IterInner::Heap(i) => i.size_hint(),
        }
    }
}

impl<K, V> ExactSizeIterator for SmallMapIter<'_, K, V> {}

impl<K, V> FusedIterator for SmallMapIter<'_, K, V> {}

// Manual impl: cloning the iterator must not require `K: Clone` or `V: Clone`.
impl<K, V> Clone for SmallMapIter<'_, K, V> {
    fn clone(&self) -> Self {
        let inner = match &self.inner {
            IterInner::Inline(i) => IterInner::Inline(i.clone()),
            IterInner::Heap(i) => IterInner::Heap(i.clone()),
        };
        Self { inner }
    }
}

/// Owning iterator over a [`SmallMap`].
pub struct SmallMapIntoIter<K, V, const N: usize> {
    inner: IntoIterInner<K, V, N>,
    remaining: usize,
}

enum IntoIterInner<K, V, const N: usize> {
    Inline(<HeaplessVec<(K, V), N> as IntoIterator>::IntoIter),
    Heap(hash_map::IntoIter<K, V>),
}

impl<K, V, const N: usize> Iterator for SmallMapIntoIter<K, V, N> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let entry = match &mut self.inner {
            IntoIterInner::Inline(i) => i.next(),
            IntoIterInner::Heap(i) => i.next(),
        };
        if entry.is_some() {
            self.remaining -= 1;
        }
        entry
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V, const N: usize> ExactSizeIterator for SmallMapIntoIter<K, V, N> {}

impl<K, V, const N: usize> FusedIterator for SmallMapIntoIter<K, V, N> {}

impl<K, V, const N: usize, S> IntoIterator for SmallMap<K, V, N, S> {
    type Item = (K, V);
    type IntoIter = SmallMapIntoIter<K, V, N>;

    fn into_iter(self) -> Self::IntoIter {
        // Move the active field out and make sure `Drop` does not run on `self`.
        let remaining = self.len();
        let mut this = ManuallyDrop::new(self);
        let inner = unsafe {
            if this.on_stack {
                IntoIterInner::Inline(ManuallyDrop::take(&mut this.data.stack).into_iter())
            } else {
                IntoIterInner::Heap(ManuallyDrop::take(&mut this.data.heap).into_iter())
            }
        };
        SmallMapIntoIter { inner, remaining }
    }
}

// --- 5. Trait Implementations ---

// Safety: ManuallyDrop fields inside the union are NOT dropped automatically.
impl<K, V, const N: usize, S> Drop for SmallMap<K, V, N, S> {
    fn drop(&mut self) {
        unsafe {
            if self.on_stack {
                ManuallyDrop::drop(&mut self.data.stack);
            } else {
                ManuallyDrop::drop(&mut self.data.heap);
            }
        }
    }
}

impl<K, V, const N: usize, S> Clone for SmallMap<K, V, N, S>
where
    K: Clone,
    V: Clone,
    S: Clone,
{
    fn clone(&self) -> Self {
        unsafe {
            if self.on_stack {
                SmallMap {
                    on_stack: true,
                    data: MapData {
                        stack: ManuallyDrop::new((*self.data.stack).clone()),
                    },
                }
            } else {
                SmallMap {
                    on_stack: false,
                    data: MapData {
                        heap: ManuallyDrop::new((*self.data.heap).clone()),
                    },
                }
            }
        }
    }
}

impl<K, V, const N: usize, S> Default for SmallMap<K, V, N, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Debug, V: Debug, const N: usize, S> Debug for SmallMap<K, V, N, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, const N: usize, S> AnyHashMap<K, V> for SmallMap<K, V, N, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    type Iter<'a>
        = SmallMapIter<'a, K, V>
    where
        Self: 'a,
        K: 'a,
        V: 'a;

    type Occupied<'a>
        = SmallMapOccupied<'a, K, V, N, S>
    where
        Self: 'a;

    fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity(capacity)
    }

    fn len(&self) -> usize {
        self.len()
    }

    fn capacity(&self) -> usize {
        self.capacity()
    }

    fn memory_size(&self) -> usize {
        self.memory_size()
    }

    fn find_as<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.find_as(key)
    }

    fn try_emplace(&mut self, key: K, value: V) -> ((&K, &mut V), bool) {
        self.try_emplace(key, value)
    }

    fn insert_as_with<Q, F>(&mut self, key: &Q, make: F) -> ((&K, &mut V), bool)
    where
        Q: Hash + Equivalent<K> + ?Sized,
        F: FnOnce() -> (K, V),
    {
        self.insert_as_with(key, make)
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
        self.find_entry(key)
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

// --- 6. Test Suite ---

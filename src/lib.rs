//! # Dense Set
//!
//! Hash sets that are projections of a key-to-unit map: every element is stored as the
//! key of a map entry whose value is the zero-sized [`SetEmpty`] marker, so a bucket
//! costs exactly `size_of::<T>()` plus the table's control byte.
//!
//! The set logic is written once in [`MapSet`] against the [`AnyHashMap`] trait and is
//! reused by two facades:
//!
//! * **[`DenseSet`]:** always backed by a `hashbrown` table on the heap.
//! * **[`SmallDenseSet`]:** keeps up to `N` elements inline (no allocation) and spills
//!   to a `hashbrown` table when element `N + 1` arrives.
//!
//! ## Key Features
//!
//! * **Heterogeneous Lookup:** `find_as`, `contains`, `remove` and friends accept any
//!   `Q: Hash + Equivalent<T>`, so a `DenseSet<String>` can be probed with `&str`.
//! * **No Overwrites:** inserting an element that is already present keeps the stored
//!   one and reports `false`.
//! * **Performance:** Uses `FnvBuildHasher` by default for fast hashing on small keys.
//! * **Compile-Time Safety:** `SmallMap` refuses to build if its inline footprint
//!   exceeds 16KB, and every set checks that the marker adds no bytes per entry.
//! * **Interoperability:** set algebra runs against anything implementing [`AnySet`],
//!   including the standard `HashSet` and `BTreeSet`.
//!
//! ## Examples
//!
//! ### DenseSet
//!
//! ```rust
//! use dense_set::DenseSet;
//!
//! let mut set: DenseSet<i32> = DenseSet::new();
//! set.insert(1);
//! set.insert(2);
//! set.insert(3);
//!
//! let (stored, inserted) = set.insert(2);
//! assert_eq!((*stored, inserted), (2, false));
//!
//! assert!(set.remove(&2));
//! assert_eq!(set.count(&2), 0);
//! assert_eq!(set.len(), 2);
//! ```
//!
//! ### SmallDenseSet
//!
//! ```rust
//! use dense_set::SmallDenseSet;
//!
//! let mut set: SmallDenseSet<&str, 2> = SmallDenseSet::new();
//! set.insert("a");
//! set.insert("b");
//! assert!(set.is_inline());
//!
//! // Spills on the 3rd element
//! set.insert("c");
//! assert!(!set.is_inline());
//! ```
//!
//! ### Custom lookup keys
//!
//! ```rust
//! use dense_set::{DenseSet, Equivalent};
//!
//! #[derive(PartialEq, Eq, Hash)]
//! struct Path(Vec<String>);
//!
//! // Borrowed view that hashes exactly like `Path`.
//! #[derive(Hash)]
//! struct PathRef<'a>(&'a [String]);
//!
//! impl Equivalent<Path> for PathRef<'_> {
//!     fn equivalent(&self, key: &Path) -> bool {
//!         self.0 == key.0.as_slice()
//!     }
//! }
//!
//! let parts = vec!["usr".to_string(), "bin".to_string()];
//! let mut set: DenseSet<Path> = DenseSet::new();
//! set.insert(Path(parts.clone()));
//!
//! assert!(set.find_as(&PathRef(&parts)).is_some());
//! ```

// --- Module Declarations ---

pub mod maps;
pub mod sets;

// --- Re-exports ---

pub use hashbrown::{Equivalent, TryReserveError};
pub use maps::{AnyHashMap, AnyOccupiedEntry, SmallMap};
pub use sets::{AnySet, DenseSet, MapSet, OccupiedEntry, SetEmpty, SmallDenseSet};

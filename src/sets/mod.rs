//! Set types built as projections of key-to-[`SetEmpty`] maps.

pub mod dense_set;
pub mod empty;
pub mod map_set;
pub mod small_dense_set;

pub use dense_set::DenseSet;
pub use empty::SetEmpty;
pub use map_set::{AnySet, MapSet, OccupiedEntry};
pub use small_dense_set::SmallDenseSet;

use core::mem;

/// The value half of every set entry.
///
/// A set is stored as a map from `T` to `SetEmpty`. Since `SetEmpty` is a zero-sized
/// type, `(T, SetEmpty)` has exactly the size of `T` and the map's value slot costs
/// nothing per entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SetEmpty;

/// Fails the build if pairing `T` with [`SetEmpty`] makes a bucket larger than `T`.
///
/// Meant to be evaluated inside a `const` block.
pub(crate) const fn assert_zero_overhead<T>() {
    assert!(
        mem::size_of::<(T, SetEmpty)>() == mem::size_of::<T>(),
        "Set buckets unexpectedly large: the SetEmpty marker must not add bytes to an entry."
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_is_zero_sized() {
        assert_eq!(mem::size_of::<SetEmpty>(), 0);
        assert_eq!(mem::align_of::<SetEmpty>(), 1);
    }

    #[test]
    fn test_entry_has_key_size() {
        assert_eq!(mem::size_of::<(u8, SetEmpty)>(), 1);
        assert_eq!(mem::size_of::<(u64, SetEmpty)>(), 8);
        assert_eq!(mem::size_of::<(String, SetEmpty)>(), mem::size_of::<String>());
        assert_eq!(mem::size_of::<([u16; 3], SetEmpty)>(), 6);

        // Same check as the constructors run at compile time.
        const { assert_zero_overhead::<(u32, u8)>() }
    }
}

//! Hash functions for table keys.
//!
//! The probe sequence of every key starts at `hash_key(key) & mask`, so the
//! choice of [`KeyHasher`] decides the slot layout. Lookup, insertion and
//! backward-shift removal are correct for any deterministic hasher; only the
//! amount of clustering changes.

/// Maps a key to the start of its probe sequence.
///
/// Implementations must be deterministic for the lifetime of a table: the
/// same key has to hash to the same value on every call, or stored entries
/// become unreachable.
pub trait KeyHasher {
    /// Hashes `key`. Only the low bits selected by the table mask are used.
    fn hash_key(&self, key: i32) -> usize;
}

/// The identity hash: `hash(key) = key`.
///
/// This is a placeholder with no mixing at all. Consecutive descriptors land in
/// consecutive slots, which is ideal for small dense descriptor ranges and
/// poor for keys sharing their low bits. It is the default because it makes
/// slot layouts predictable.
///
/// Negative keys are sign-extended, matching a C `int` converted to `size_t`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdentityHasher;

impl KeyHasher for IdentityHasher {
    #[inline(always)]
    fn hash_key(&self, key: i32) -> usize {
        key as usize
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        use core::hash::BuildHasher;

        use foldhash::fast::FixedState;

        /// A seeded hasher backed by foldhash.
        ///
        /// Spreads keys that collide in their low bits under
        /// [`IdentityHasher`], at the cost of a few multiplications per probe
        /// start.
        ///
        /// ```rust
        /// use fd_table::FdTable;
        /// use fd_table::FoldKeyHasher;
        ///
        /// let mut table = FdTable::with_hasher(FoldKeyHasher::with_seed(7));
        /// for fd in (0..64).map(|i| i * 1024) {
        ///     table.insert(fd, fd / 1024).unwrap();
        /// }
        /// assert_eq!(table.get(4096), Some(&4));
        /// ```
        #[derive(Clone, Default)]
        pub struct FoldKeyHasher {
            state: FixedState,
        }

        impl core::fmt::Debug for FoldKeyHasher {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.debug_struct("FoldKeyHasher").finish_non_exhaustive()
            }
        }

        impl FoldKeyHasher {
            /// Creates a hasher with a fixed seed, giving reproducible layouts.
            pub fn with_seed(seed: u64) -> Self {
                Self {
                    state: FixedState::with_seed(seed),
                }
            }
        }

        impl KeyHasher for FoldKeyHasher {
            #[inline]
            fn hash_key(&self, key: i32) -> usize {
                self.state.hash_one(key) as usize
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_keeps_non_negative_keys() {
        let hasher = IdentityHasher;
        for key in [0, 1, 5, 13, 21, i32::MAX] {
            assert_eq!(hasher.hash_key(key), key as usize);
        }
    }

    #[test]
    fn identity_sign_extends_negative_keys() {
        let hasher = IdentityHasher;
        assert_eq!(hasher.hash_key(-1), usize::MAX);
        assert_eq!(hasher.hash_key(-1) & 7, 7);
        assert_eq!(hasher.hash_key(i32::MIN) & 7, 0);
    }

    #[cfg(feature = "foldhash")]
    #[test]
    fn fold_hasher_is_deterministic_per_seed() {
        let a = FoldKeyHasher::with_seed(42);
        let b = FoldKeyHasher::with_seed(42);
        for key in -100..100 {
            assert_eq!(a.hash_key(key), b.hash_key(key));
        }
    }

    #[cfg(feature = "foldhash")]
    #[test]
    fn fold_hasher_clone_keeps_layout() {
        use crate::FdTable;

        let hasher = FoldKeyHasher::with_seed(9);
        let cloned = hasher.clone();
        for key in -50..50 {
            assert_eq!(hasher.hash_key(key), cloned.hash_key(key));
        }

        let mut table = FdTable::with_hasher(hasher);
        for fd in (0..40).map(|i| i * 16) {
            table.insert(fd, fd).unwrap();
        }
        let copy = table.clone();
        for fd in (0..40).map(|i| i * 16) {
            assert_eq!(copy.get(fd), Some(&fd));
        }
        assert_eq!(copy.len(), 40);
    }

    #[cfg(feature = "foldhash")]
    #[test]
    fn fold_hasher_spreads_low_bit_collisions() {
        let hasher = FoldKeyHasher::with_seed(1);
        let mut seen = [false; 8];
        for key in (0..64).map(|i| i * 8) {
            seen[hasher.hash_key(key) & 7] = true;
        }
        assert!(seen.iter().filter(|s| **s).count() > 1);
    }
}

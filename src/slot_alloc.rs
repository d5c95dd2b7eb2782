//! Fallible allocation of slot buffers.
//!
//! [`FdTable`](crate::FdTable) never aborts the process when memory runs out.
//! Every backing array is obtained through a [`SlotAllocator`], which either
//! hands back a fully initialised buffer or reports an [`AllocError`]. The
//! table treats that error as its only failure mode.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

/// The error returned when a slot buffer could not be allocated.
///
/// Carries the number of slots that was requested so callers can tell an
/// initial allocation apart from a growth step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocError {
    capacity: usize,
}

impl AllocError {
    /// Creates an error for a failed request of `capacity` slots.
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    /// The number of slots that was requested.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to allocate a table of {} slots", self.capacity)
    }
}

impl core::error::Error for AllocError {}

/// A source of default-initialised slot buffers.
///
/// Implementations must either return a buffer of exactly `len` elements, each
/// equal to `T::default()`, or fail without side effects. The table relies on
/// this to leave its previous array untouched when a resize fails.
///
/// # Examples
///
/// ```rust
/// use fd_table::slot_alloc::AllocError;
/// use fd_table::slot_alloc::SlotAllocator;
///
/// /// Refuses anything larger than a fixed number of slots.
/// struct Bounded(usize);
///
/// impl SlotAllocator for Bounded {
///     fn allocate<T: Default>(&mut self, len: usize) -> Result<Box<[T]>, AllocError> {
///         if len > self.0 {
///             return Err(AllocError::new(len));
///         }
///         Ok((0..len).map(|_| T::default()).collect())
///     }
/// }
///
/// let mut table = fd_table::FdTable::with_hasher_in(fd_table::IdentityHasher, Bounded(8));
/// for fd in 0..6 {
///     table.insert(fd, ()).unwrap();
/// }
/// // The seventh entry needs a 16-slot array.
/// assert!(table.insert(6, ()).is_err());
/// assert_eq!(table.len(), 6);
/// ```
pub trait SlotAllocator {
    /// Allocates `len` slots, each initialised to `T::default()`.
    fn allocate<T: Default>(&mut self, len: usize) -> Result<Box<[T]>, AllocError>;
}

/// The global allocator, accessed through fallible reservation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Global;

impl SlotAllocator for Global {
    fn allocate<T: Default>(&mut self, len: usize) -> Result<Box<[T]>, AllocError> {
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(len)
            .map_err(|_| AllocError::new(len))?;
        slots.resize_with(len, T::default);
        Ok(slots.into_boxed_slice())
    }
}

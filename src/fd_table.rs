//! An open-addressing table keyed by file-descriptor-like integers.
//!
//! Entries live directly in a power-of-two slot array and collisions are
//! resolved with linear probing. Removal uses backward-shift compaction
//! instead of tombstones, so a lookup can always stop at the first empty
//! slot it meets.

use alloc::boxed::Box;
#[cfg(any(test, feature = "stats"))]
use alloc::vec::Vec;
use core::fmt::Debug;
use core::mem;

use crate::hasher::IdentityHasher;
use crate::hasher::KeyHasher;
use crate::slot_alloc::AllocError;
use crate::slot_alloc::Global;
use crate::slot_alloc::SlotAllocator;

/// Smallest backing array the table will allocate.
pub const MIN_CAPACITY: usize = 8;

/// Largest backing array the table will allocate. Keeps `capacity - 1` a
/// valid mask and `2 * used` free of overflow.
pub const MAX_CAPACITY: usize = 1 << (usize::BITS - 1);

#[derive(Clone, Debug)]
struct Entry<V> {
    key: i32,
    variant: V,
}

type Slot<V> = Option<Entry<V>>;

/// Rounds a requested element count to a valid capacity.
#[inline]
fn capacity_for(target: usize) -> usize {
    target.clamp(MIN_CAPACITY, MAX_CAPACITY).next_power_of_two()
}

/// Entries allowed before a table of `capacity` slots must grow (75%).
#[inline(always)]
fn max_load(capacity: usize) -> usize {
    capacity - capacity / 4
}

/// Entries below which a table of `capacity` slots tries to shrink (25%).
#[inline(always)]
fn min_load(capacity: usize) -> usize {
    capacity / 4
}

/// Returns true if `ideal` lies in the circular interval `(hole, current]`.
///
/// An entry whose ideal slot is in that interval is still reachable from its
/// ideal slot after `hole` is emptied, so it must not be moved into the hole.
#[inline(always)]
fn reachable_past_hole(hole: usize, ideal: usize, current: usize) -> bool {
    if hole <= current {
        hole < ideal && ideal <= current
    } else {
        hole < ideal || ideal <= current
    }
}

/// Walks the probe sequence from `start` and returns the index of the slot
/// holding `key`, or of the first empty slot if the key is absent.
///
/// The table always keeps at least one slot empty, so this terminates.
#[inline]
fn probe<V>(slots: &[Slot<V>], start: usize, key: i32) -> usize {
    let mask = slots.len() - 1;
    let mut index = start & mask;
    loop {
        match &slots[index] {
            Some(entry) if entry.key != key => index = (index + 1) & mask,
            _ => return index,
        }
    }
}

/// An opaque position within a table's slot array.
///
/// Used with [`FdTable::next_entry`] to walk the table one entry at a time
/// without holding a borrow between steps. A cursor starts at the first slot
/// and only ever moves forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    index: usize,
}

impl Cursor {
    /// Creates a cursor positioned before the first slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// The raw slot index the next scan starts from.
    pub fn position(&self) -> usize {
        self.index
    }
}

/// A table mapping `i32` keys to variants of type `V`.
///
/// Storage is allocated lazily on the first insert, grows once more than 75%
/// of the slots are occupied and shrinks once fewer than 25% are, never below
/// [`MIN_CAPACITY`]. All allocation goes through the [`SlotAllocator`] `A`, and
/// an allocation failure during insertion leaves the table exactly as it was.
///
/// The table performs no internal synchronisation; share it across threads
/// only behind a lock.
///
/// ## Example
///
/// ```rust
/// use fd_table::FdTable;
///
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// enum Socket {
///     Listener,
///     Stream,
/// }
///
/// let mut table = FdTable::new();
/// table.insert(3, Socket::Listener).unwrap();
/// table.insert(11, Socket::Stream).unwrap();
///
/// assert_eq!(table.get(3), Some(&Socket::Listener));
/// assert_eq!(table.remove(3), Some(Socket::Listener));
/// assert_eq!(table.get(3), None);
/// assert_eq!(table.get(11), Some(&Socket::Stream));
/// ```
#[derive(Clone)]
pub struct FdTable<V, H = IdentityHasher, A = Global> {
    slots: Option<Box<[Slot<V>]>>,
    used: usize,
    hasher: H,
    alloc: A,
}

impl<V, H, A> Debug for FdTable<V, H, A>
where
    H: KeyHasher,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use alloc::format;
        use alloc::string::String;
        use alloc::vec::Vec;

        let Some(slots) = self.slots.as_deref() else {
            return f
                .debug_struct("FdTable")
                .field("layout", &"unallocated")
                .field("used", &self.used)
                .field("capacity", &0usize)
                .finish();
        };

        let mask = slots.len() - 1;
        f.debug_struct("FdTable")
            .field(
                "layout",
                &slots
                    .chunks(8)
                    .map(|row| {
                        row.iter()
                            .map(|slot| match slot {
                                Some(entry) => format!(
                                    "{}@{}",
                                    entry.key,
                                    self.hasher.hash_key(entry.key) & mask
                                ),
                                None => String::from(".."),
                            })
                            .collect::<Vec<_>>()
                            .join(", ")
                    })
                    .collect::<Vec<_>>(),
            )
            .field("used", &self.used)
            .field("capacity", &slots.len())
            .finish()
    }
}

impl<V> FdTable<V> {
    /// Creates an empty table with the identity hash and the global
    /// allocator. Nothing is allocated until the first insert.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use fd_table::FdTable;
    /// let table: FdTable<u8> = FdTable::new();
    /// assert!(table.is_empty());
    /// assert_eq!(table.capacity(), 0);
    /// ```
    pub fn new() -> Self {
        Self::with_hasher_in(IdentityHasher, Global)
    }
}

impl<V> Default for FdTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, H> FdTable<V, H> {
    /// Creates an empty table that hashes keys with `hasher`.
    pub fn with_hasher(hasher: H) -> Self {
        Self::with_hasher_in(hasher, Global)
    }
}

impl<V, H, A> FdTable<V, H, A> {
    /// Creates an empty table with the given hasher and slot allocator.
    pub fn with_hasher_in(hasher: H, alloc: A) -> Self {
        Self {
            slots: None,
            used: 0,
            hasher,
            alloc,
        }
    }

    /// Returns the number of entries in the table.
    pub fn len(&self) -> usize {
        self.used
    }

    /// Returns `true` if the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Returns the number of slots in the backing array, or 0 if no array has
    /// been allocated yet.
    ///
    /// The table holds at most `capacity - capacity / 4` entries before it
    /// grows.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use fd_table::FdTable;
    /// let mut table = FdTable::new();
    /// table.insert(0, 'a').unwrap();
    /// assert_eq!(table.capacity(), 8);
    /// ```
    pub fn capacity(&self) -> usize {
        self.slots.as_deref().map_or(0, <[Slot<V>]>::len)
    }

    /// Returns `true` once a backing array exists.
    pub fn is_allocated(&self) -> bool {
        self.slots.is_some()
    }

    /// Releases the backing array and forgets every entry.
    ///
    /// The table returns to its freshly created state and may be reused.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use fd_table::FdTable;
    /// let mut table = FdTable::new();
    /// table.insert(4, 1u8).unwrap();
    /// table.free();
    /// assert!(!table.is_allocated());
    /// assert_eq!(table.get(4), None);
    /// ```
    pub fn free(&mut self) {
        self.slots = None;
        self.used = 0;
    }

    /// Returns the next occupied slot at or after `cursor` and advances the
    /// cursor past it.
    ///
    /// Slots are visited in raw array order. Once the cursor reaches the end
    /// of the array, or if the table is unallocated, `None` is returned. If
    /// the table is mutated between calls, entries may be skipped or seen
    /// twice.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use fd_table::Cursor;
    /// # use fd_table::FdTable;
    /// let mut table = FdTable::new();
    /// table.insert(6, "six").unwrap();
    /// table.insert(2, "two").unwrap();
    ///
    /// let mut cursor = Cursor::new();
    /// assert_eq!(table.next_entry(&mut cursor), Some((2, &"two")));
    /// assert_eq!(table.next_entry(&mut cursor), Some((6, &"six")));
    /// assert_eq!(table.next_entry(&mut cursor), None);
    /// ```
    pub fn next_entry(&self, cursor: &mut Cursor) -> Option<(i32, &V)> {
        let slots = self.slots.as_deref()?;
        while cursor.index < slots.len() {
            let slot = &slots[cursor.index];
            cursor.index += 1;
            if let Some(entry) = slot {
                return Some((entry.key, &entry.variant));
            }
        }
        None
    }

    /// Returns an iterator over `(key, &variant)` pairs in slot order.
    pub fn iter(&self) -> Iter<'_, V, H, A> {
        Iter {
            table: self,
            cursor: Cursor::new(),
        }
    }
}

impl<V, H, A> FdTable<V, H, A>
where
    H: KeyHasher,
    A: SlotAllocator,
{
    /// Returns a reference to the variant stored for `key`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use fd_table::FdTable;
    /// let mut table = FdTable::new();
    /// assert_eq!(table.get(5), None);
    /// table.insert(5, 1).unwrap();
    /// assert_eq!(table.get(5), Some(&1));
    /// ```
    pub fn get(&self, key: i32) -> Option<&V> {
        let slots = self.slots.as_deref()?;
        let index = probe(slots, self.hasher.hash_key(key), key);
        slots[index].as_ref().map(|entry| &entry.variant)
    }

    /// Returns a mutable reference to the variant stored for `key`.
    pub fn get_mut(&mut self, key: i32) -> Option<&mut V> {
        let start = self.hasher.hash_key(key);
        let slots = self.slots.as_deref_mut()?;
        let index = probe(slots, start, key);
        slots[index].as_mut().map(|entry| &mut entry.variant)
    }

    /// Returns `true` if the table holds an entry for `key`.
    pub fn contains_key(&self, key: i32) -> bool {
        self.get(key).is_some()
    }

    /// Inserts `variant` under `key`, overwriting any existing variant.
    ///
    /// Returns the previous variant if the key was present. The first insert
    /// allocates the backing array, and an insert that pushes the load past
    /// 75% doubles it. If either allocation fails, an [`AllocError`] is
    /// returned and the table is left exactly as it was before the call.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use fd_table::FdTable;
    /// let mut table = FdTable::new();
    /// assert_eq!(table.insert(9, 'a'), Ok(None));
    /// assert_eq!(table.insert(9, 'b'), Ok(Some('a')));
    /// assert_eq!(table.len(), 1);
    /// ```
    pub fn insert(&mut self, key: i32, variant: V) -> Result<Option<V>, AllocError> {
        let start = self.hasher.hash_key(key);
        let slots = match self.slots {
            Some(ref mut slots) => &mut slots[..],
            None => self.resize(MIN_CAPACITY)?,
        };
        let capacity = slots.len();
        let index = probe(slots, start, key);

        if let Some(entry) = &mut slots[index] {
            return Ok(Some(mem::replace(&mut entry.variant, variant)));
        }
        slots[index] = Some(Entry { key, variant });
        self.used += 1;

        if self.used > max_load(capacity) {
            let grown = self.resize(2 * self.used).map(|_| ());
            if let Err(err) = grown {
                // The old array is untouched, so `index` still names the new
                // entry.
                self.used -= 1;
                if let Some(slots) = self.slots.as_deref_mut() {
                    slots[index] = None;
                }
                return Err(err);
            }
        }

        Ok(None)
    }

    /// Replaces the variant of an existing entry.
    ///
    /// Returns the previous variant, or `None` if `key` is absent, in which
    /// case nothing is inserted and `variant` is dropped. Never resizes.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use fd_table::FdTable;
    /// let mut table = FdTable::new();
    /// assert_eq!(table.update(1, 10), None);
    /// assert!(!table.contains_key(1));
    ///
    /// table.insert(1, 10).unwrap();
    /// assert_eq!(table.update(1, 20), Some(10));
    /// assert_eq!(table.get(1), Some(&20));
    /// ```
    pub fn update(&mut self, key: i32, variant: V) -> Option<V> {
        self.get_mut(key).map(|slot| mem::replace(slot, variant))
    }

    /// Removes `key` and returns its variant.
    ///
    /// The entries following the vacated slot are shifted back so that no
    /// probe chain is broken. If the load then drops below 25%, the table
    /// tries to halve its array; a failed shrink is ignored and the table is
    /// simply left larger than necessary.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use fd_table::FdTable;
    /// let mut table = FdTable::new();
    /// table.insert(5, 1).unwrap();
    /// table.insert(13, 2).unwrap();
    ///
    /// assert_eq!(table.remove(5), Some(1));
    /// assert_eq!(table.remove(5), None);
    /// assert_eq!(table.get(13), Some(&2));
    /// ```
    pub fn remove(&mut self, key: i32) -> Option<V> {
        let start = self.hasher.hash_key(key);
        let hasher = &self.hasher;
        let slots = self.slots.as_deref_mut()?;
        let capacity = slots.len();
        let mask = capacity - 1;

        let mut hole = probe(slots, start, key);
        let removed = slots[hole].take()?;

        let mut current = hole;
        loop {
            current = (current + 1) & mask;
            let Some(entry) = &slots[current] else {
                break;
            };
            let ideal = hasher.hash_key(entry.key) & mask;
            if reachable_past_hole(hole, ideal, current) {
                continue;
            }
            slots[hole] = slots[current].take();
            hole = current;
        }

        self.used -= 1;
        if self.used < min_load(capacity) && capacity > MIN_CAPACITY {
            // Shrinking is best effort; the removal has already succeeded.
            self.resize(capacity / 2).ok();
        }

        Some(removed.variant)
    }

    /// Reallocates the slot array to fit at least `target` elements and
    /// rehashes every entry into it, returning the new array.
    ///
    /// On failure the current array is left in place.
    fn resize(&mut self, target: usize) -> Result<&mut [Slot<V>], AllocError> {
        let capacity = capacity_for(target);
        let mut fresh: Box<[Slot<V>]> = self.alloc.allocate(capacity)?;
        let mask = capacity - 1;

        if let Some(old) = self.slots.take() {
            for entry in old.into_vec().into_iter().flatten() {
                let mut index = self.hasher.hash_key(entry.key) & mask;
                while fresh[index].is_some() {
                    index = (index + 1) & mask;
                }
                fresh[index] = Some(entry);
            }
        }

        Ok(self.slots.insert(fresh))
    }
}

#[cfg(any(test, feature = "stats"))]
impl<V, H, A> FdTable<V, H, A>
where
    H: KeyHasher,
{
    /// Distance of every occupied slot from its ideal slot, in slot order.
    fn probe_distances(&self) -> impl Iterator<Item = usize> + '_ {
        let slots = self.slots.as_deref().unwrap_or(&[]);
        let mask = slots.len().wrapping_sub(1);
        slots.iter().enumerate().filter_map(move |(index, slot)| {
            slot.as_ref().map(|entry| {
                let ideal = self.hasher.hash_key(entry.key) & mask;
                index.wrapping_sub(ideal) & mask
            })
        })
    }

    /// Counts entries by how far they sit from their ideal slot.
    ///
    /// Only available with the `stats` feature (and in tests). Index `n` of
    /// the returned histogram is the number of entries found `n` probes past
    /// the slot their hash selects.
    pub fn probe_histogram(&self) -> ProbeHistogram {
        let mut bins = Vec::new();
        for distance in self.probe_distances() {
            if bins.len() <= distance {
                bins.resize(distance + 1, 0);
            }
            bins[distance] += 1;
        }
        ProbeHistogram { bins }
    }

    /// Returns utilisation statistics for the current table state.
    ///
    /// Only available with the `stats` feature (and in tests).
    pub fn debug_stats(&self) -> DebugStats {
        let total_slots = self.capacity();
        let mut occupied_slots = 0;
        let mut total_probe = 0;
        let mut max_probe_length = 0;
        for distance in self.probe_distances() {
            occupied_slots += 1;
            total_probe += distance;
            max_probe_length = max_probe_length.max(distance);
        }

        DebugStats {
            populated: self.used,
            capacity: total_slots,
            max_load: if total_slots == 0 {
                0
            } else {
                max_load(total_slots)
            },
            occupied_slots,
            load_factor: if total_slots == 0 {
                0.0
            } else {
                self.used as f64 / total_slots as f64
            },
            max_probe_length,
            average_probe_length: if occupied_slots == 0 {
                0.0
            } else {
                total_probe as f64 / occupied_slots as f64
            },
            total_bytes: total_slots * core::mem::size_of::<Slot<V>>(),
        }
    }
}

/// Utilisation statistics for an [`FdTable`].
///
/// Only available with the `stats` feature (and in tests).
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of entries the table believes it holds
    pub populated: usize,
    /// Total number of slots allocated
    pub capacity: usize,
    /// Entries allowed before the next growth
    pub max_load: usize,
    /// Number of slots actually occupied
    pub occupied_slots: usize,
    /// populated / capacity
    pub load_factor: f64,
    /// Longest distance of any entry from its ideal slot
    pub max_probe_length: usize,
    /// Mean distance of entries from their ideal slot
    pub average_probe_length: f64,
    /// Bytes used by the slot array
    pub total_bytes: usize,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Prints the statistics to stdout.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== FdTable Debug Stats ===");
        println!("Populated: {}", self.populated);
        println!("Capacity: {} slots", self.capacity);
        println!("Max load before growth: {}", self.max_load);
        println!("Occupied slots: {}", self.occupied_slots);
        println!("Load factor: {:.2}%", self.load_factor * 100.0);
        println!("Max probe length: {}", self.max_probe_length);
        println!("Average probe length: {:.3}", self.average_probe_length);
        println!("Total bytes: {}", self.total_bytes);
    }
}

/// Number of entries at each probe distance.
///
/// Only available with the `stats` feature (and in tests).
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeHistogram {
    bins: Vec<usize>,
}

#[cfg(any(test, feature = "stats"))]
impl ProbeHistogram {
    /// Entry counts indexed by probe distance.
    pub fn bins(&self) -> &[usize] {
        &self.bins
    }

    /// Total number of entries counted.
    pub fn total(&self) -> usize {
        self.bins.iter().sum()
    }

    /// Pretty-prints the histogram as a horizontal bar chart on stdout.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        use alloc::string::String;

        let max = self.bins.iter().copied().max().unwrap_or(0);
        if max == 0 {
            println!("probe histogram: empty");
            return;
        }

        let max_bar = 60usize;
        let total_units = max_bar * 8;
        println!("probe histogram ({} entries):", self.total());

        let make_bar = |count: usize| -> String {
            if count == 0 {
                return String::new();
            }
            let units = (count as u128 * total_units as u128).div_ceil(max as u128) as usize;
            let mut bar = "█".repeat(units / 8);
            match units % 8 {
                0 => {}
                1 => bar.push('▏'),
                2 => bar.push('▎'),
                3 => bar.push('▍'),
                4 => bar.push('▌'),
                5 => bar.push('▋'),
                6 => bar.push('▊'),
                _ => bar.push('▉'),
            }
            bar
        };

        for (distance, &count) in self.bins.iter().enumerate() {
            println!("{:>3} | {} ({})", distance, make_bar(count), count);
        }
    }
}

/// An iterator over the entries of an [`FdTable`], in slot order.
///
/// Created by [`FdTable::iter`].
///
/// # Examples
///
/// ```rust
/// # use fd_table::FdTable;
/// let mut table = FdTable::new();
/// for fd in [4, 1, 7] {
///     table.insert(fd, fd * 10).unwrap();
/// }
///
/// let mut seen: Vec<_> = table.iter().map(|(fd, v)| (fd, *v)).collect();
/// seen.sort();
/// assert_eq!(seen, vec![(1, 10), (4, 40), (7, 70)]);
/// ```
pub struct Iter<'a, V, H = IdentityHasher, A = Global> {
    table: &'a FdTable<V, H, A>,
    cursor: Cursor,
}

impl<'a, V, H, A> Iterator for Iter<'a, V, H, A> {
    type Item = (i32, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.table.next_entry(&mut self.cursor)
    }
}

impl<'a, V, H, A> IntoIterator for &'a FdTable<V, H, A> {
    type IntoIter = Iter<'a, V, H, A>;
    type Item = (i32, &'a V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

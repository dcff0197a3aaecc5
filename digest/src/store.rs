use std::fmt;

/// log2 of [`PAGE_SLOTS`].
pub const PAGE_BITS: u32 = 6;
/// Number of bucket counters in a page.
pub const PAGE_SLOTS: usize = 1 << PAGE_BITS;

/// Page index and slot of a bucket key. Negative keys round towards negative infinity so
/// that pages sort like the keys they hold.
pub fn page_address(key: i64) -> (i64, usize) {
    (key >> PAGE_BITS, (key & (PAGE_SLOTS as i64 - 1)) as usize)
}

/// First bucket key of a page.
pub fn page_base_key(page_index: i64) -> i64 {
    page_index << PAGE_BITS
}

/// A fixed-size block of [`PAGE_SLOTS`] bucket counters.
///
/// Implementations differ in how a counter is laid out in memory and in the largest count it
/// can hold. Additions past that maximum saturate.
pub trait CounterPage: Clone + fmt::Debug + Send + Sync + 'static {
    /// Parameters shared by every page of a digest.
    type Layout: Copy + fmt::Debug + PartialEq + Send + Sync + 'static;

    fn zeroed(layout: Self::Layout) -> Self;

    fn get(&self, layout: Self::Layout, slot: usize) -> u64;

    /// Adds `n` to a counter and returns how much was actually stored.
    fn add(&mut self, layout: Self::Layout, slot: usize, n: u64) -> u64;

    /// Largest count a single counter can hold.
    fn max_count(layout: Self::Layout) -> u64;

    fn heap_size(&self) -> usize;

    fn total(&self, layout: Self::Layout) -> u64 {
        (0..PAGE_SLOTS).fold(0u64, |total, slot| total.saturating_add(self.get(layout, slot)))
    }
}

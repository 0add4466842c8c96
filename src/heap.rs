//! The fallback path of [`EmbeddedAllocator`](crate::EmbeddedAllocator).
//!
//! Requests that do not fit into the embedded region are forwarded, whole, to a
//! [`HeapAlloc`]. [`Global`] is the default and simply uses the global allocator.
//!
//! [`Tracked`] wraps any `HeapAlloc` and counts the delegated calls into a [`HeapStats`],
//! which is how tests and benchmarks observe how often the heap was actually touched.
//!
//! ```
//! # use embedvec::{EmbedVec, heap::{HeapStats, Tracked}};
//! let stats = HeapStats::new();
//! let mut vec: EmbedVec<u32, 4, _> = EmbedVec::new_in(Tracked::new(&stats));
//!
//! vec.extend([1, 2, 3, 4]);
//! assert_eq!(stats.allocations(), 0);
//!
//! vec.push(5);
//! assert_eq!(stats.allocations(), 1);
//! ```

use alloc::alloc::{alloc, dealloc};
use core::{alloc::Layout, cell::Cell, fmt, ptr::NonNull};

/// A general purpose heap used when the embedded region is exhausted.
///
/// # Safety
///
/// Implementors must return either `None` or a pointer to a fresh block that is valid
/// for `layout.size()` bytes and aligned to `layout.align()`, and that stays valid until
/// it is passed back to [`deallocate`](HeapAlloc::deallocate) of the same allocator.
///
/// Zero-sized layouts must be answered with a dangling, well-aligned pointer.
pub unsafe trait HeapAlloc {
    /// Allocates a block for `layout`, or returns `None` when the heap is exhausted.
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// Releases a block previously returned by [`allocate`](HeapAlloc::allocate).
    ///
    /// # Safety
    /// - `ptr` was returned by `self.allocate(layout)` with the same `layout`.
    /// - `ptr` has not been released yet.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// The global allocator.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Global;

#[inline(always)]
fn dangling(layout: Layout) -> NonNull<u8> {
    // SAFETY: alignment is never zero.
    unsafe { NonNull::new_unchecked(core::ptr::without_provenance_mut(layout.align())) }
}

unsafe impl HeapAlloc for Global {
    #[inline]
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        if layout.size() == 0 {
            return Some(dangling(layout));
        }
        // SAFETY: non-zero size.
        NonNull::new(unsafe { alloc(layout) })
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() != 0 {
            // SAFETY: see trait doc.
            unsafe { dealloc(ptr.as_ptr(), layout) }
        }
    }
}

/// Counters for heap calls made through [`Tracked`].
///
/// Uses [`Cell`], the allocator it observes is single-owner and never shared across threads.
#[derive(Default)]
pub struct HeapStats {
    allocations: Cell<usize>,
    deallocations: Cell<usize>,
    live: Cell<usize>,
}

impl HeapStats {
    /// Creates zeroed counters.
    #[inline]
    pub const fn new() -> Self {
        Self {
            allocations: Cell::new(0),
            deallocations: Cell::new(0),
            live: Cell::new(0),
        }
    }

    /// Number of successful heap allocations.
    #[inline]
    pub fn allocations(&self) -> usize {
        self.allocations.get()
    }

    /// Number of heap releases.
    #[inline]
    pub fn deallocations(&self) -> usize {
        self.deallocations.get()
    }

    /// Number of blocks currently held.
    ///
    /// Not affected by [`reset`](Self::reset).
    #[inline]
    pub fn live(&self) -> usize {
        self.live.get()
    }

    /// Resets the allocation and release counters to zero.
    ///
    /// Blocks still held stay counted in [`live`](Self::live).
    #[inline]
    pub fn reset(&self) {
        self.allocations.set(0);
        self.deallocations.set(0);
    }

    #[inline]
    fn record_allocation(&self) {
        self.allocations.set(self.allocations.get() + 1);
        self.live.set(self.live.get() + 1);
    }

    #[inline]
    fn record_deallocation(&self) {
        self.deallocations.set(self.deallocations.get() + 1);
        self.live.set(self.live.get().saturating_sub(1));
    }
}

impl fmt::Debug for HeapStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeapStats")
            .field("allocations", &self.allocations())
            .field("deallocations", &self.deallocations())
            .field("live", &self.live())
            .finish()
    }
}

/// A [`HeapAlloc`] that forwards to `H` and records every call in a [`HeapStats`].
#[derive(Debug, Clone, Copy)]
pub struct Tracked<'a, H = Global> {
    heap: H,
    stats: &'a HeapStats,
}

impl<'a> Tracked<'a, Global> {
    /// Tracks the global allocator.
    #[inline]
    pub const fn new(stats: &'a HeapStats) -> Self {
        Self { heap: Global, stats }
    }
}

impl<'a, H> Tracked<'a, H> {
    /// Tracks an arbitrary heap.
    #[inline]
    pub const fn with_heap(heap: H, stats: &'a HeapStats) -> Self {
        Self { heap, stats }
    }

    /// The counters this heap reports to.
    ///
    /// ```
    /// # use embedvec::{EmbedVec, heap::{HeapStats, Tracked}};
    /// let stats = HeapStats::new();
    /// let vec: EmbedVec<u8, 2, _> = EmbedVec::with_capacity_in(16, Tracked::new(&stats));
    ///
    /// let heap = vec.allocator().heap();
    /// assert_eq!(heap.stats().live(), 1);
    /// ```
    #[inline]
    pub const fn stats(&self) -> &'a HeapStats {
        self.stats
    }
}

unsafe impl<H: HeapAlloc> HeapAlloc for Tracked<'_, H> {
    #[inline]
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        let ptr = self.heap.allocate(layout)?;
        self.stats.record_allocation();
        Some(ptr)
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.stats.record_deallocation();
        // SAFETY: forwarded caller contract.
        unsafe { self.heap.deallocate(ptr, layout) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_zero_sized() {
        let layout = Layout::new::<()>();
        let ptr = Global.allocate(layout).unwrap();
        assert_eq!(ptr.as_ptr() as usize % layout.align(), 0);
        unsafe { Global.deallocate(ptr, layout) };
    }

    #[test]
    fn tracked_counts() {
        let stats = HeapStats::new();
        let heap = Tracked::new(&stats);
        let layout = Layout::array::<u64>(16).unwrap();

        let a = heap.allocate(layout).unwrap();
        let b = heap.allocate(layout).unwrap();
        assert_eq!(stats.allocations(), 2);
        assert_eq!(stats.live(), 2);

        unsafe {
            heap.deallocate(b, layout);
            heap.deallocate(a, layout);
        }
        assert_eq!(stats.deallocations(), 2);
        assert_eq!(stats.live(), 0);

        stats.reset();
        assert_eq!(stats.allocations(), 0);
    }

    #[test]
    fn reset_keeps_live_blocks() {
        let stats = HeapStats::new();
        let heap = Tracked::new(&stats);
        let layout = Layout::array::<u32>(4).unwrap();

        let a = heap.allocate(layout).unwrap();
        assert_eq!(heap.stats().live(), 1);

        stats.reset();
        assert_eq!(stats.allocations(), 0);
        assert_eq!(stats.live(), 1);

        unsafe { heap.deallocate(a, layout) };
        assert_eq!(stats.deallocations(), 1);
        assert_eq!(stats.live(), 0);
    }

    /// A heap that is always out of memory.
    struct Exhausted;

    unsafe impl HeapAlloc for Exhausted {
        fn allocate(&self, _: Layout) -> Option<NonNull<u8>> {
            None
        }
        unsafe fn deallocate(&self, _: NonNull<u8>, _: Layout) {
            unreachable!()
        }
    }

    #[test]
    fn tracked_ignores_failures() {
        let stats = HeapStats::new();
        let heap = Tracked::with_heap(Exhausted, &stats);
        assert!(heap.allocate(Layout::new::<u32>()).is_none());
        assert_eq!(stats.allocations(), 0);
    }
}

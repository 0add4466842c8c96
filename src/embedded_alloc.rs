use core::{
    alloc::Layout,
    fmt,
    mem::{self, MaybeUninit},
    ptr::{self, NonNull},
};

use crate::{
    Error,
    heap::{Global, HeapAlloc},
    utils::cold_path,
};

enum Place<T> {
    /// Slot offset into the embedded region of the issuing allocator.
    Region(usize),
    Heap(NonNull<T>),
}

/// A block of `len` contiguous element slots handed out by an [`EmbeddedAllocator`].
///
/// A block is either carved out of the allocator's embedded region or obtained from
/// its heap. Embedded blocks remember an *offset* rather than an address, so they
/// stay valid when the allocator (and whatever owns it) is moved.
///
/// Blocks are neither `Clone` nor `Copy`: giving one back through
/// [`EmbeddedAllocator::deallocate`] consumes it.
pub struct Block<T> {
    place: Place<T>,
    len: usize,
}

impl<T> Block<T> {
    /// Number of element slots in the block.
    #[inline(always)]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the block has no slots.
    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` if the block lives in the embedded region.
    #[inline(always)]
    pub const fn is_embedded(&self) -> bool {
        matches!(self.place, Place::Region(_))
    }

    /// The slot offset inside the embedded region, or `None` for heap blocks.
    #[inline(always)]
    pub const fn offset(&self) -> Option<usize> {
        match self.place {
            Place::Region(offset) => Some(offset),
            Place::Heap(_) => None,
        }
    }

    /// Translates the block into a pointer, given the base of the issuing region.
    ///
    /// The result only points at the block's slots when `region` is the base of
    /// the allocator that issued it. A foreign region gives an address that may
    /// lie outside that region and must not be dereferenced.
    #[inline(always)]
    pub(crate) fn resolve(&self, region: *mut T) -> *mut T {
        match self.place {
            // `wrapping_add`: a block from a larger region may land past the end.
            Place::Region(offset) => region.wrapping_add(offset),
            Place::Heap(ptr) => ptr.as_ptr(),
        }
    }
}

impl<T> fmt::Debug for Block<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.place {
            Place::Region(offset) => f
                .debug_struct("Block")
                .field("offset", &offset)
                .field("len", &self.len)
                .finish(),
            Place::Heap(ptr) => f
                .debug_struct("Block")
                .field("heap", &ptr)
                .field("len", &self.len)
                .finish(),
        }
    }
}

/// A stateful bump allocator over a region of `N` slots embedded in the allocator itself.
///
/// Requests are served from the embedded region while they fit behind the cursor;
/// anything else is forwarded, as a whole, to the heap `H`. The remaining embedded
/// span is never partially used for a request that does not fit entirely.
///
/// Releases are stack-like: an embedded block is only reclaimed when it is the
/// current tail (its end equals the cursor). Releasing any other embedded block is
/// a silent no-op; its slots stay unusable until the allocator is dropped.
///
/// # Lifecycle
///
/// A new allocator is *inactive* and behaves as a pass-through to the heap.
/// [`activate`](Self::activate) sets the cursor to the start of the region; the owning
/// container calls it once, before its first request.
///
/// # Examples
///
/// ```
/// # use embedvec::EmbeddedAllocator;
/// let mut alloc = EmbeddedAllocator::<u64, 8>::new();
/// alloc.activate();
///
/// // Initial buffer, fills the whole region.
/// let small = alloc.allocate(8).unwrap();
/// assert!(small.is_embedded());
/// assert_eq!(alloc.cursor(), Some(8));
///
/// // Growth: the larger buffer comes from the heap...
/// let large = alloc.allocate(16).unwrap();
/// assert!(!large.is_embedded());
///
/// // ...and releasing the old one, which is the tail, rewinds the cursor.
/// unsafe { alloc.deallocate(small) };
/// assert_eq!(alloc.cursor(), Some(0));
///
/// // The region can serve small requests again.
/// let again = alloc.allocate(4).unwrap();
/// assert_eq!(again.offset(), Some(0));
///
/// unsafe {
///     alloc.deallocate(again);
///     alloc.deallocate(large);
/// }
/// ```
pub struct EmbeddedAllocator<T, const N: usize, H: HeapAlloc = Global> {
    region: [MaybeUninit<T>; N],
    /// `None` while inactive, otherwise the next free slot, `0..=N`.
    cursor: Option<usize>,
    heap: H,
}

impl<T, const N: usize> EmbeddedAllocator<T, N, Global> {
    /// Creates an inactive allocator that falls back to the global allocator.
    #[inline]
    pub const fn new() -> Self {
        Self::new_in(Global)
    }
}

impl<T, const N: usize, H: HeapAlloc> EmbeddedAllocator<T, N, H> {
    /// Creates an inactive allocator that falls back to `heap`.
    #[inline]
    pub const fn new_in(heap: H) -> Self {
        Self {
            region: [const { MaybeUninit::uninit() }; N],
            cursor: None,
            heap,
        }
    }

    /// Binds the allocator to its owner by moving the cursor to the start of the region.
    ///
    /// Must be called once, before the first request that should use the region.
    /// Calling it again resets the cursor regardless of outstanding embedded blocks;
    /// this is not checked and is the caller's responsibility.
    #[inline]
    pub fn activate(&mut self) {
        self.cursor = Some(0);
    }

    /// Returns `true` once [`activate`](Self::activate) has been called.
    #[inline(always)]
    pub const fn is_active(&self) -> bool {
        self.cursor.is_some()
    }

    /// The next free slot of the region, or `None` while inactive.
    #[inline(always)]
    pub const fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Number of region slots still available behind the cursor.
    #[inline]
    pub const fn remaining(&self) -> usize {
        match self.cursor {
            Some(cursor) => N - cursor,
            None => 0,
        }
    }

    /// Number of slots in the embedded region.
    #[inline(always)]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// The fallback heap.
    #[inline(always)]
    pub const fn heap(&self) -> &H {
        &self.heap
    }

    /// Base address of the embedded region.
    ///
    /// The address changes whenever the allocator is moved.
    #[inline(always)]
    pub const fn as_ptr(&self) -> *const T {
        &raw const self.region as *const T
    }

    /// Mutable base address of the embedded region.
    #[inline(always)]
    pub const fn as_mut_ptr(&mut self) -> *mut T {
        &raw mut self.region as *mut T
    }

    /// Requests room for `n` contiguous elements.
    ///
    /// Served from the region when the allocator is active and `n` slots fit behind
    /// the cursor. This path is O(1) and never fails. Otherwise the whole request goes
    /// to the heap.
    ///
    /// # Errors
    /// - [`Error::CapacityOverflow`] if `n` elements exceed `isize::MAX` bytes.
    /// - [`Error::AllocFailed`] if the heap returned no memory.
    #[inline]
    pub fn allocate(&mut self, n: usize) -> Result<Block<T>, Error> {
        if let Some(cursor) = self.cursor {
            if n <= N - cursor {
                self.cursor = Some(cursor + n);
                return Ok(Block {
                    place: Place::Region(cursor),
                    len: n,
                });
            }
        }

        self.allocate_heap(n)
    }

    #[inline(never)]
    fn allocate_heap(&mut self, n: usize) -> Result<Block<T>, Error> {
        let layout = Layout::array::<T>(n).map_err(|_| Error::CapacityOverflow)?;
        let Some(ptr) = self.heap.allocate(layout) else {
            cold_path();
            return Err(Error::AllocFailed { layout });
        };

        tracing::trace!(
            requested = n,
            cursor = ?self.cursor,
            region = N,
            "embedded region exhausted, delegating to heap"
        );

        Ok(Block {
            place: Place::Heap(ptr.cast()),
            len: n,
        })
    }

    /// Releases a block.
    ///
    /// - An embedded block ending exactly at the cursor is the tail: the cursor
    ///   rewinds to its start.
    /// - Any other embedded block is ignored.
    /// - A heap block is handed back to the heap.
    ///
    /// # Safety
    /// - `block` was returned by [`allocate`](Self::allocate) of *this* allocator.
    /// - No live element is read through the block afterwards.
    pub unsafe fn deallocate(&mut self, block: Block<T>) {
        match block.place {
            Place::Region(offset) => match self.cursor {
                Some(cursor) if offset + block.len == cursor => {
                    self.cursor = Some(offset);
                    tracing::trace!(offset, len = block.len, "embedded tail released");
                }
                _ => {
                    tracing::trace!(
                        offset,
                        len = block.len,
                        cursor = ?self.cursor,
                        "embedded block is not the tail, release ignored"
                    );
                }
            },
            Place::Heap(ptr) => {
                // SAFETY: the same layout was valid when the block was allocated.
                unsafe {
                    let layout = Layout::from_size_align_unchecked(
                        mem::size_of::<T>() * block.len,
                        mem::align_of::<T>(),
                    );
                    self.heap.deallocate(ptr.cast(), layout);
                }
            }
        }
    }

    /// Pointer to the first slot of `block`.
    ///
    /// Computing the pointer is always sound. It is only valid to dereference
    /// when `block` came from this allocator: a block from another allocator
    /// yields an address that may lie outside this region.
    #[inline(always)]
    pub fn block_ptr(&self, block: &Block<T>) -> *const T {
        block.resolve(self.as_ptr() as *mut T)
    }

    /// Mutable pointer to the first slot of `block`.
    ///
    /// See [`block_ptr`](Self::block_ptr) for when the pointer may be dereferenced.
    #[inline(always)]
    pub fn block_mut_ptr(&mut self, block: &Block<T>) -> *mut T {
        block.resolve(self.as_mut_ptr())
    }
}

impl<T, const N: usize, H: HeapAlloc + Default> Default for EmbeddedAllocator<T, N, H> {
    #[inline]
    fn default() -> Self {
        Self::new_in(H::default())
    }
}

impl<T, const N: usize, H: HeapAlloc + Clone> Clone for EmbeddedAllocator<T, N, H> {
    /// Returns a fresh, inactive allocator.
    ///
    /// Neither the region contents nor the cursor are copied: embedded storage
    /// belongs to one object and is never shared.
    #[inline]
    fn clone(&self) -> Self {
        Self::new_in(self.heap.clone())
    }
}

impl<T, U, const N: usize, const M: usize, H: HeapAlloc, H2: HeapAlloc>
    PartialEq<EmbeddedAllocator<U, M, H2>> for EmbeddedAllocator<T, N, H>
{
    /// Two allocators are equal only if they are the same region, of the same size.
    #[inline]
    fn eq(&self, other: &EmbeddedAllocator<U, M, H2>) -> bool {
        N == M && ptr::addr_eq(self.as_ptr(), other.as_ptr())
    }
}

impl<T, const N: usize, H: HeapAlloc + fmt::Debug> fmt::Debug for EmbeddedAllocator<T, N, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddedAllocator")
            .field("capacity", &N)
            .field("cursor", &self.cursor)
            .field("heap", &self.heap)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::{HeapStats, Tracked};

    type Alloc<'a, const N: usize> = EmbeddedAllocator<u32, N, Tracked<'a>>;

    #[test]
    fn inactive_is_pass_through() {
        let stats = HeapStats::new();
        let mut alloc = Alloc::<8>::new_in(Tracked::new(&stats));
        assert!(!alloc.is_active());
        assert_eq!(alloc.remaining(), 0);

        let block = alloc.allocate(2).unwrap();
        assert!(!block.is_embedded());
        assert_eq!(stats.allocations(), 1);

        unsafe { alloc.deallocate(block) };
        assert_eq!(stats.deallocations(), 1);
    }

    #[test]
    fn bump_within_region() {
        let stats = HeapStats::new();
        let mut alloc = Alloc::<8>::new_in(Tracked::new(&stats));
        alloc.activate();

        let a = alloc.allocate(3).unwrap();
        let b = alloc.allocate(5).unwrap();
        assert_eq!(a.offset(), Some(0));
        assert_eq!(b.offset(), Some(3));
        assert_eq!(alloc.cursor(), Some(8));
        assert_eq!(alloc.remaining(), 0);

        let base = alloc.as_ptr();
        let end = base.wrapping_add(8);
        for block in [&a, &b] {
            let ptr = alloc.block_ptr(block);
            assert!(base <= ptr && ptr < end);
            assert!(ptr.wrapping_add(block.len()) <= end);
        }
        assert_eq!(stats.allocations(), 0);

        unsafe {
            alloc.deallocate(b);
            alloc.deallocate(a);
        }
        assert_eq!(alloc.cursor(), Some(0));
        assert_eq!(stats.deallocations(), 0);
    }

    #[test]
    fn request_that_does_not_fit_goes_to_heap_whole() {
        let stats = HeapStats::new();
        let mut alloc = Alloc::<8>::new_in(Tracked::new(&stats));
        alloc.activate();

        let a = alloc.allocate(6).unwrap();
        let b = alloc.allocate(3).unwrap();
        assert!(!b.is_embedded());
        assert_eq!(b.len(), 3);
        // The two spare slots are left untouched.
        assert_eq!(alloc.cursor(), Some(6));
        assert_eq!(stats.allocations(), 1);

        let c = alloc.allocate(2).unwrap();
        assert_eq!(c.offset(), Some(6));

        unsafe {
            alloc.deallocate(b);
            alloc.deallocate(c);
            alloc.deallocate(a);
        }
        assert_eq!(stats.live(), 0);
        assert_eq!(alloc.cursor(), Some(0));
    }

    #[test]
    fn non_tail_release_is_ignored() {
        let mut alloc = EmbeddedAllocator::<u32, 8>::new();
        alloc.activate();

        let a = alloc.allocate(2).unwrap();
        let b = alloc.allocate(2).unwrap();

        unsafe { alloc.deallocate(a) };
        assert_eq!(alloc.cursor(), Some(4));

        unsafe { alloc.deallocate(b) };
        assert_eq!(alloc.cursor(), Some(2));
    }

    #[test]
    fn growth_sequence_rewinds_region() {
        let stats = HeapStats::new();
        let mut alloc = Alloc::<4>::new_in(Tracked::new(&stats));
        alloc.activate();

        let initial = alloc.allocate(4).unwrap();
        assert!(initial.is_embedded());

        let grown = alloc.allocate(8).unwrap();
        assert_eq!(stats.allocations(), 1);

        unsafe { alloc.deallocate(initial) };
        assert_eq!(alloc.cursor(), Some(0));
        assert_eq!(stats.deallocations(), 0);

        let reused = alloc.allocate(4).unwrap();
        assert_eq!(reused.offset(), Some(0));
        assert_eq!(stats.allocations(), 1);

        unsafe {
            alloc.deallocate(reused);
            alloc.deallocate(grown);
        }
        assert_eq!(stats.deallocations(), 1);
    }

    #[test]
    fn errors() {
        let mut alloc = EmbeddedAllocator::<u64, 4>::new();
        alloc.activate();
        assert_eq!(alloc.allocate(usize::MAX).unwrap_err(), Error::CapacityOverflow);
        assert_eq!(alloc.cursor(), Some(0));

        struct Exhausted;
        unsafe impl HeapAlloc for Exhausted {
            fn allocate(&self, _: Layout) -> Option<NonNull<u8>> {
                None
            }
            unsafe fn deallocate(&self, _: NonNull<u8>, _: Layout) {}
        }

        let mut alloc = EmbeddedAllocator::<u64, 4, _>::new_in(Exhausted);
        alloc.activate();
        assert!(alloc.allocate(4).is_ok());
        assert_eq!(
            alloc.allocate(1).unwrap_err(),
            Error::AllocFailed {
                layout: Layout::new::<u64>()
            }
        );
    }

    #[test]
    fn block_from_larger_region_resolves_by_wrapping() {
        let mut large = EmbeddedAllocator::<u64, 64>::new();
        large.activate();
        let a = large.allocate(60).unwrap();
        let b = large.allocate(4).unwrap();
        assert_eq!(b.offset(), Some(60));

        let mut small = EmbeddedAllocator::<u64, 4>::new();
        small.activate();
        let base = small.as_ptr();
        assert_eq!(small.block_ptr(&b), base.wrapping_add(60));
        assert_eq!(small.block_mut_ptr(&b) as *const u64, base.wrapping_add(60));

        unsafe {
            large.deallocate(b);
            large.deallocate(a);
        }
        assert_eq!(large.cursor(), Some(0));
    }

    #[test]
    fn identity_equality() {
        let a = EmbeddedAllocator::<u32, 8>::new();
        let b = EmbeddedAllocator::<u32, 8>::new();
        let c = EmbeddedAllocator::<u64, 4>::new();

        assert!(a == a);
        assert!(a != b);
        assert!(a != c);
    }

    #[test]
    fn clone_is_fresh() {
        let mut a = EmbeddedAllocator::<u32, 8>::new();
        a.activate();
        let _block = a.allocate(3).unwrap();

        let b = a.clone();
        assert!(!b.is_active());
        assert!(a != b);
        assert_eq!(a.cursor(), Some(3));
    }

    #[test]
    fn zero_sized() {
        let mut alloc = EmbeddedAllocator::<(), 4>::new();
        alloc.activate();

        let a = alloc.allocate(4).unwrap();
        assert!(a.is_embedded());
        let b = alloc.allocate(100).unwrap();
        assert!(!b.is_embedded());

        unsafe {
            alloc.deallocate(b);
            alloc.deallocate(a);
        }
        assert_eq!(alloc.cursor(), Some(0));
    }
}

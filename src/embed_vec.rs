use alloc::vec::Vec;
use core::{
    cmp, fmt,
    iter::FusedIterator,
    mem::{self, ManuallyDrop},
    ptr, slice,
};

use crate::{
    EmbeddedAllocator, Error,
    embedded_alloc::Block,
    error::infallible,
    heap::{Global, HeapAlloc},
    utils::{IsZST, cold_path},
};

/// A vector whose first `N` elements live inside the object itself.
///
/// `EmbedVec` owns an [`EmbeddedAllocator`] with room for `N` elements and reserves
/// exactly that region when it is created. The first `N` pushes therefore never touch
/// the heap. When the vector outgrows the region it asks its allocator for a bigger
/// block, which comes from the heap `H`, moves the elements over and releases the old
/// block. Since the old block is the allocator's tail, the release rewinds the
/// allocator's cursor and the region becomes free again.
///
/// Apart from that the container behaves like [`Vec`]: elements are always in a single
/// contiguous block, removal never shrinks the capacity, and only capacity changes
/// call into the allocator.
///
/// # Examples
///
/// ```
/// use embedvec::EmbedVec;
///
/// let mut vec: EmbedVec<u32, 4> = EmbedVec::new();
/// assert_eq!(vec.capacity(), 4);
///
/// vec.extend([1, 2, 3, 4]);
/// assert!(vec.is_embedded());
///
/// // The fifth element moves everything to the heap.
/// vec.push(5);
/// assert!(!vec.is_embedded());
/// assert!(vec.capacity() > 4);
///
/// // The embedded region was given back when the old block was released.
/// assert_eq!(vec.allocator().cursor(), Some(0));
///
/// vec.remove(0);
/// assert_eq!(vec, [2, 3, 4, 5]);
/// ```
///
/// # Moving
///
/// Embedded blocks are addressed by offset, so an `EmbedVec` can be moved freely.
/// Raw pointers obtained from [`as_ptr`](EmbedVec::as_ptr) are invalidated by a move
/// while the data is embedded, the same as for an array.
pub struct EmbedVec<T, const N: usize, H: HeapAlloc = Global> {
    alloc: EmbeddedAllocator<T, N, H>,
    buf: Block<T>,
    len: usize,
}

unsafe impl<T: Send, const N: usize, H: HeapAlloc + Send> Send for EmbedVec<T, N, H> {}
unsafe impl<T: Sync, const N: usize, H: HeapAlloc + Sync> Sync for EmbedVec<T, N, H> {}

impl<T, const N: usize, H: HeapAlloc> Drop for EmbedVec<T, N, H> {
    fn drop(&mut self) {
        // SAFETY: `len` elements are initialized, `buf` is released exactly once.
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(self.as_mut_ptr(), self.len));
            let buf = ptr::read(&self.buf);
            self.alloc.deallocate(buf);
        }
    }
}

/// Creates an [`EmbedVec`] containing the arguments.
///
/// The syntax is similar to [`vec!`](https://doc.rust-lang.org/std/macro.vec.html).
/// The embedded capacity is taken from the annotated type.
///
/// # Examples
///
/// ```
/// # use embedvec::{embedvec, EmbedVec};
/// let vec: EmbedVec<String, 10> = embedvec![];
/// let vec: EmbedVec<i64, 10> = embedvec![1; 5]; // Need to support Clone.
/// let vec: EmbedVec<_, 10> = embedvec![1, 2, 3, 4];
/// ```
#[macro_export]
macro_rules! embedvec {
    [] => { $crate::EmbedVec::new() };
    [$elem:expr; $n:expr] => { $crate::EmbedVec::from_elem($elem, $n) };
    [$($item:expr),+ $(,)?] => { $crate::EmbedVec::from_buf([ $($item),+ ]) };
}

impl<T, const N: usize> EmbedVec<T, N, Global> {
    /// Constructs a new, empty `EmbedVec` with its embedded region reserved.
    ///
    /// No heap memory is allocated.
    ///
    /// # Examples
    ///
    /// ```
    /// # use embedvec::EmbedVec;
    /// let vec: EmbedVec<i32, 8> = EmbedVec::new();
    /// assert_eq!(vec.len(), 0);
    /// assert_eq!(vec.capacity(), 8);
    /// assert!(vec.is_embedded());
    /// ```
    #[inline]
    pub fn new() -> Self {
        Self::new_in(Global)
    }

    /// Constructs a new, empty `EmbedVec` with room for at least `capacity` elements.
    ///
    /// Up to `N` this is the same as [`new`](Self::new). A larger capacity is
    /// requested from the heap right away.
    ///
    /// # Examples
    ///
    /// ```
    /// # use embedvec::EmbedVec;
    /// let vec: EmbedVec<i32, 8> = EmbedVec::with_capacity(4);
    /// assert_eq!(vec.capacity(), 8);
    /// assert!(vec.is_embedded());
    ///
    /// let vec: EmbedVec<i32, 8> = EmbedVec::with_capacity(20);
    /// assert_eq!(vec.capacity(), 20);
    /// assert!(!vec.is_embedded());
    /// ```
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_in(capacity, Global)
    }

    /// Creates an `EmbedVec` from an array.
    ///
    /// # Examples
    ///
    /// ```
    /// # use embedvec::EmbedVec;
    /// let vec: EmbedVec<i32, 5> = EmbedVec::from_buf([1, 2, 3]);
    /// assert_eq!(vec.len(), 3);
    /// assert!(vec.is_embedded());
    /// ```
    #[inline]
    pub fn from_buf<const P: usize>(arr: [T; P]) -> Self {
        let mut vec = Self::with_capacity(P);
        let arr = ManuallyDrop::new(arr);
        // SAFETY: capacity >= P, the array is forgotten.
        unsafe {
            ptr::copy_nonoverlapping(arr.as_ptr(), vec.as_mut_ptr(), P);
            vec.set_len(P);
        }
        vec
    }
}

impl<T: Clone, const N: usize> EmbedVec<T, N, Global> {
    /// Creates an `EmbedVec` with `num` clones of `elem`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use embedvec::EmbedVec;
    /// let vec = EmbedVec::<_, 4>::from_elem("x", 6);
    /// assert_eq!(vec, ["x"; 6]);
    /// ```
    pub fn from_elem(elem: T, num: usize) -> Self {
        let mut vec = Self::with_capacity(num);
        if num > 0 {
            for _ in 1..num {
                vec.push(elem.clone());
            }
            vec.push(elem);
        }
        vec
    }
}

impl<T, const N: usize, H: HeapAlloc> EmbedVec<T, N, H> {
    /// Constructs a new, empty `EmbedVec` that falls back to `heap`.
    ///
    /// The allocator is activated and asked for exactly `N` slots, which always
    /// come from the embedded region.
    ///
    /// # Examples
    ///
    /// ```
    /// # use embedvec::{EmbedVec, heap::{HeapStats, Tracked}};
    /// let stats = HeapStats::new();
    /// let vec: EmbedVec<u8, 16, _> = EmbedVec::new_in(Tracked::new(&stats));
    /// assert_eq!(vec.capacity(), 16);
    /// assert_eq!(stats.allocations(), 0);
    /// ```
    #[inline]
    pub fn new_in(heap: H) -> Self {
        Self::with_capacity_in(N, heap)
    }

    /// Constructs a new, empty `EmbedVec` with room for at least `capacity` elements
    /// that falls back to `heap`.
    ///
    /// # Panics
    /// Panics if the capacity overflows `isize::MAX` bytes.
    #[inline]
    pub fn with_capacity_in(capacity: usize, heap: H) -> Self {
        infallible(Self::try_with_capacity_in(capacity, heap))
    }

    /// Fallible version of [`with_capacity_in`](Self::with_capacity_in).
    ///
    /// # Errors
    /// Fails if the heap request for a capacity above `N` cannot be satisfied.
    pub fn try_with_capacity_in(capacity: usize, heap: H) -> Result<Self, Error> {
        let mut alloc = EmbeddedAllocator::new_in(heap);
        alloc.activate();
        let buf = alloc.allocate(cmp::max(capacity, N))?;
        Ok(Self { alloc, buf, len: 0 })
    }

    /// Returns a raw pointer to the vector's buffer.
    ///
    /// While the data is embedded the pointer refers into `self`, so it dangles
    /// after the vector is moved.
    #[inline(always)]
    pub fn as_ptr(&self) -> *const T {
        self.alloc.block_ptr(&self.buf)
    }

    /// Returns a raw mutable pointer to the vector's buffer.
    ///
    /// See [`as_ptr`](Self::as_ptr).
    #[inline(always)]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.alloc.block_mut_ptr(&self.buf)
    }

    /// Forces the length of the vector to `new_len`.
    ///
    /// # Safety
    /// - `new_len <= capacity()`.
    /// - The elements at `old_len..new_len` must be initialized.
    ///
    /// See more information in [`Vec::set_len`].
    #[inline(always)]
    pub unsafe fn set_len(&mut self, new_len: usize) {
        debug_assert!(new_len <= self.capacity());
        self.len = new_len;
    }

    /// Returns the number of elements in the vector.
    #[inline(always)]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the vector contains no elements.
    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of elements the vector can hold without asking the allocator.
    ///
    /// # Examples
    ///
    /// ```
    /// # use embedvec::{embedvec, EmbedVec};
    /// let mut vec: EmbedVec<i32, 2> = embedvec![1, 2];
    /// assert_eq!(vec.capacity(), 2);
    ///
    /// vec.push(3);
    /// assert!(vec.capacity() >= 3);
    /// ```
    #[inline(always)]
    pub const fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if the elements are stored in the embedded region.
    #[inline(always)]
    pub const fn is_embedded(&self) -> bool {
        self.buf.is_embedded()
    }

    /// The allocator driving this vector.
    #[inline(always)]
    pub const fn allocator(&self) -> &EmbeddedAllocator<T, N, H> {
        &self.alloc
    }

    /// Extracts a slice containing the entire vector.
    #[inline(always)]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: `len` elements are initialized.
        unsafe { slice::from_raw_parts(self.as_ptr(), self.len) }
    }

    /// Extracts a mutable slice of the entire vector.
    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: `len` elements are initialized.
        unsafe { slice::from_raw_parts_mut(self.as_mut_ptr(), self.len) }
    }

    /// Moves the elements into a block of `new_cap` slots.
    ///
    /// New block first, then move, then release of the old block. Releasing the
    /// embedded block this way rewinds the allocator to the start of the region.
    #[inline(never)]
    fn grow_to(&mut self, new_cap: usize) -> Result<(), Error> {
        debug_assert!(new_cap > self.capacity());

        let new = self.alloc.allocate(new_cap)?;
        let old = mem::replace(&mut self.buf, new);

        // SAFETY: both blocks come from `self.alloc` and do not overlap,
        // `len <= old.len() < new_cap`.
        unsafe {
            let base = self.alloc.as_mut_ptr();
            ptr::copy_nonoverlapping(old.resolve(base), self.buf.resolve(base), self.len);
        }

        tracing::trace!(
            from = old.len(),
            to = new_cap,
            len = self.len,
            embedded = self.buf.is_embedded(),
            "buffer grown"
        );

        // SAFETY: elements were moved out, the block is not used again.
        unsafe { self.alloc.deallocate(old) };
        Ok(())
    }

    /// Tries to reserve capacity for at least `additional` more elements.
    ///
    /// The capacity at least doubles on every growth.
    ///
    /// # Errors
    /// - [`Error::CapacityOverflow`] if the new capacity overflows.
    /// - [`Error::AllocFailed`] if the heap cannot provide the new block.
    ///
    /// # Examples
    ///
    /// ```
    /// # use embedvec::EmbedVec;
    /// let mut vec: EmbedVec<u8, 4> = EmbedVec::new();
    /// vec.try_reserve(3).unwrap();
    /// assert_eq!(vec.capacity(), 4);
    ///
    /// vec.try_reserve(5).unwrap();
    /// assert_eq!(vec.capacity(), 8);
    ///
    /// assert!(vec.try_reserve(usize::MAX).is_err());
    /// ```
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), Error> {
        let required = self
            .len
            .checked_add(additional)
            .ok_or(Error::CapacityOverflow)?;
        let cap = self.capacity();
        if required <= cap {
            return Ok(());
        }
        self.grow_to(cmp::max(required, cap.saturating_mul(2)))
    }

    /// Tries to reserve the minimum capacity for exactly `additional` more elements.
    ///
    /// # Errors
    /// See [`try_reserve`](Self::try_reserve).
    pub fn try_reserve_exact(&mut self, additional: usize) -> Result<(), Error> {
        let required = self
            .len
            .checked_add(additional)
            .ok_or(Error::CapacityOverflow)?;
        if required <= self.capacity() {
            return Ok(());
        }
        self.grow_to(required)
    }

    /// Reserves capacity for at least `additional` more elements.
    ///
    /// # Panics
    /// Panics if the new capacity overflows `isize::MAX` bytes.
    #[inline]
    pub fn reserve(&mut self, additional: usize) {
        infallible(self.try_reserve(additional));
    }

    /// Reserves capacity for exactly `additional` more elements.
    ///
    /// # Panics
    /// Panics if the new capacity overflows `isize::MAX` bytes.
    #[inline]
    pub fn reserve_exact(&mut self, additional: usize) {
        infallible(self.try_reserve_exact(additional));
    }

    /// Appends an element to the back of the vector.
    ///
    /// No allocator call is made unless `len == capacity`.
    ///
    /// # Panics
    /// Panics if the new capacity overflows `isize::MAX` bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// # use embedvec::EmbedVec;
    /// let mut vec: EmbedVec<i32, 2> = EmbedVec::new();
    /// vec.push(1);
    /// vec.push(2);
    /// vec.push(3);
    /// assert_eq!(vec, [1, 2, 3]);
    /// ```
    #[inline]
    pub fn push(&mut self, value: T) {
        if self.len == self.capacity() {
            cold_path();
            self.reserve(1);
        }
        // SAFETY: len < capacity.
        unsafe { self.push_unchecked(value) };
    }

    /// Fallible version of [`push`](Self::push).
    ///
    /// # Errors
    /// See [`try_reserve`](Self::try_reserve). The value is dropped on error.
    #[inline]
    pub fn try_push(&mut self, value: T) -> Result<(), Error> {
        if self.len == self.capacity() {
            cold_path();
            self.try_reserve(1)?;
        }
        // SAFETY: len < capacity.
        unsafe { self.push_unchecked(value) };
        Ok(())
    }

    /// # Safety
    /// `len < capacity`
    #[inline(always)]
    unsafe fn push_unchecked(&mut self, value: T) {
        let len = self.len;
        if T::IS_ZST {
            mem::forget(value);
        } else {
            unsafe { ptr::write(self.as_mut_ptr().add(len), value) };
        }
        self.len = len + 1;
    }

    /// Removes the last element and returns it, or `None` if the vector is empty.
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            cold_path();
            None
        } else {
            self.len -= 1;
            // SAFETY: the element at `len` was initialized and is now outside the vector.
            unsafe { Some(ptr::read(self.as_ptr().add(self.len))) }
        }
    }

    /// Inserts an element at position `index`, shifting all elements after it to the right.
    ///
    /// # Panics
    /// Panics if `index > len`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use embedvec::{embedvec, EmbedVec};
    /// let mut vec: EmbedVec<i32, 3> = embedvec![1, 2, 3];
    /// vec.insert(1, 9);
    /// assert_eq!(vec, [1, 9, 2, 3]);
    /// ```
    pub fn insert(&mut self, index: usize, element: T) {
        assert!(index <= self.len, "insertion index should be <= len");

        if self.len == self.capacity() {
            self.reserve(1);
        }

        // SAFETY: index <= len < capacity.
        unsafe {
            let ptr = self.as_mut_ptr().add(index);
            if index < self.len {
                ptr::copy(ptr, ptr.add(1), self.len - index);
            }
            ptr::write(ptr, element);
        }
        self.len += 1;
    }

    /// Removes and returns the element at `index`, shifting all elements after it
    /// one slot towards the front.
    ///
    /// The capacity is unchanged and the allocator is not involved.
    ///
    /// # Panics
    /// Panics if `index >= len`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use embedvec::{embedvec, EmbedVec};
    /// let mut vec: EmbedVec<i32, 5> = embedvec![1, 2, 3];
    ///
    /// let x = vec.remove(1);
    /// assert_eq!(x, 2);
    /// assert_eq!(vec, [1, 3]);
    /// ```
    #[inline]
    pub fn remove(&mut self, index: usize) -> T {
        infallible(self.try_remove(index))
    }

    /// Checked version of [`remove`](Self::remove).
    ///
    /// # Errors
    /// [`Error::IndexOutOfRange`] if `index >= len`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use embedvec::{embedvec, EmbedVec, Error};
    /// let mut vec: EmbedVec<i32, 5> = embedvec![1, 2, 3];
    /// assert_eq!(vec.try_remove(0), Ok(1));
    /// assert_eq!(vec.try_remove(2), Err(Error::IndexOutOfRange { index: 2, len: 2 }));
    /// ```
    pub fn try_remove(&mut self, index: usize) -> Result<T, Error> {
        let len = self.len;
        if index >= len {
            cold_path();
            return Err(Error::IndexOutOfRange { index, len });
        }

        // SAFETY: index < len.
        unsafe {
            let ptr = self.as_mut_ptr().add(index);
            let value = ptr::read(ptr);
            ptr::copy(ptr.add(1), ptr, len - index - 1);
            self.len = len - 1;
            Ok(value)
        }
    }

    /// Removes an element and replaces it with the last one.
    ///
    /// This does not preserve ordering, but is O(1).
    ///
    /// # Panics
    /// Panics if `index >= len`.
    pub fn swap_remove(&mut self, index: usize) -> T {
        assert!(index < self.len, "removal index should be < len");

        // SAFETY: index < len.
        unsafe {
            let base = self.as_mut_ptr();
            let value = ptr::read(base.add(index));
            ptr::copy(base.add(self.len - 1), base.add(index), 1);
            self.len -= 1;
            value
        }
    }

    /// Checked element access.
    ///
    /// # Errors
    /// [`Error::IndexOutOfRange`] if `index >= len`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use embedvec::{embedvec, EmbedVec, Error};
    /// let vec: EmbedVec<i32, 4> = embedvec![10, 20];
    /// assert_eq!(vec.try_get(1), Ok(&20));
    /// assert_eq!(vec.try_get(2), Err(Error::IndexOutOfRange { index: 2, len: 2 }));
    /// ```
    #[inline]
    pub fn try_get(&self, index: usize) -> Result<&T, Error> {
        let len = self.len;
        self.as_slice()
            .get(index)
            .ok_or(Error::IndexOutOfRange { index, len })
    }

    /// Checked mutable element access.
    ///
    /// # Errors
    /// [`Error::IndexOutOfRange`] if `index >= len`.
    #[inline]
    pub fn try_get_mut(&mut self, index: usize) -> Result<&mut T, Error> {
        let len = self.len;
        self.as_mut_slice()
            .get_mut(index)
            .ok_or(Error::IndexOutOfRange { index, len })
    }

    /// Shortens the vector, keeping the first `len` elements and dropping the rest.
    ///
    /// The capacity is unchanged.
    pub fn truncate(&mut self, len: usize) {
        if self.len > len {
            let tail = self.len - len;
            self.len = len;
            // SAFETY: the tail was initialized and is now outside the vector.
            unsafe {
                ptr::drop_in_place(ptr::slice_from_raw_parts_mut(
                    self.as_mut_ptr().add(len),
                    tail,
                ));
            }
        }
    }

    /// Drops all elements. The capacity is unchanged.
    #[inline]
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Retains only the elements specified by the predicate.
    ///
    /// # Examples
    ///
    /// ```
    /// # use embedvec::{embedvec, EmbedVec};
    /// let mut vec: EmbedVec<_, 5> = embedvec![1, 2, 3, 4];
    /// vec.retain(|v| *v % 2 == 0);
    /// assert_eq!(vec, [2, 4]);
    /// ```
    #[inline]
    pub fn retain<F: FnMut(&T) -> bool>(&mut self, mut f: F) {
        self.retain_mut(|v| f(v));
    }

    /// Retains only the elements specified by the predicate, passing a mutable reference to it.
    ///
    /// If the predicate panics, the remaining elements are leaked.
    pub fn retain_mut<F: FnMut(&mut T) -> bool>(&mut self, mut f: F) {
        let len = self.len;
        self.len = 0;

        let mut count = 0usize;
        let base_ptr = self.as_mut_ptr();
        for index in 0..len {
            unsafe {
                let dst = base_ptr.add(index);
                if f(&mut *dst) {
                    ptr::copy(dst, base_ptr.add(count), 1);
                    count += 1;
                } else {
                    ptr::drop_in_place(dst);
                }
            }
        }
        self.len = count;
    }

    /// Converts the vector into a [`Vec`], allocating exactly `len` elements.
    ///
    /// # Examples
    ///
    /// ```
    /// # use embedvec::{embedvec, EmbedVec};
    /// let vec: EmbedVec<_, 4> = embedvec![1, 2, 3];
    /// let vec: Vec<i32> = vec.into_vec();
    /// assert_eq!(vec, [1, 2, 3]);
    /// ```
    pub fn into_vec(mut self) -> Vec<T> {
        let len = self.len;
        let mut vec = Vec::with_capacity(len);
        // SAFETY: elements are moved, `self` forgets them before dropping.
        unsafe {
            ptr::copy_nonoverlapping(self.as_ptr(), vec.as_mut_ptr(), len);
            vec.set_len(len);
            self.len = 0;
        }
        vec
    }
}

impl<T: Clone, const N: usize, H: HeapAlloc> EmbedVec<T, N, H> {
    /// Clones and appends all elements of `other`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use embedvec::{embedvec, EmbedVec};
    /// let mut vec: EmbedVec<i32, 2> = embedvec![1];
    /// vec.extend_from_slice(&[2, 3, 4]);
    /// assert_eq!(vec, [1, 2, 3, 4]);
    /// ```
    pub fn extend_from_slice(&mut self, other: &[T]) {
        self.reserve(other.len());
        for item in other {
            // SAFETY: reserved above.
            unsafe { self.push_unchecked(item.clone()) };
        }
    }
}

impl<T, const N: usize, H: HeapAlloc + Default> Default for EmbedVec<T, N, H> {
    /// Same as [`EmbedVec::new_in`] with a default heap.
    #[inline]
    fn default() -> Self {
        Self::new_in(H::default())
    }
}

impl<T: Clone, const N: usize, H: HeapAlloc + Clone> Clone for EmbedVec<T, N, H> {
    /// The clone gets its own, freshly activated allocator. No embedded state is shared.
    ///
    /// # Examples
    ///
    /// ```
    /// # use embedvec::{embedvec, EmbedVec};
    /// let vec: EmbedVec<i32, 5> = embedvec![1, 2, 3];
    ///
    /// let vec2 = vec.clone();
    /// assert_eq!(vec, vec2);
    /// assert!(vec.allocator() != vec2.allocator());
    /// ```
    fn clone(&self) -> Self {
        let mut vec = Self::with_capacity_in(self.len, self.alloc.heap().clone());
        vec.extend_from_slice(self.as_slice());
        vec
    }
}

impl<'a, T: 'a + Clone, const N: usize, H: HeapAlloc> Extend<&'a T> for EmbedVec<T, N, H> {
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        for item in iter {
            self.push(item.clone());
        }
    }
}

impl<T, const N: usize, H: HeapAlloc> Extend<T> for EmbedVec<T, N, H> {
    /// # Examples
    ///
    /// ```
    /// # use embedvec::EmbedVec;
    /// let mut vec: EmbedVec<i32, 5> = EmbedVec::new();
    ///
    /// vec.extend([1, 2, 3]);
    /// assert_eq!(vec, [1, 2, 3]);
    /// ```
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for item in iter {
            self.push(item);
        }
    }
}

crate::utils::impl_common_traits!(EmbedVec<T, N, H>);

impl<T, U, const N: usize, const M: usize, H: HeapAlloc, H2: HeapAlloc>
    PartialEq<EmbedVec<U, M, H2>> for EmbedVec<T, N, H>
where
    T: PartialEq<U>,
{
    #[inline]
    fn eq(&self, other: &EmbedVec<U, M, H2>) -> bool {
        PartialEq::eq(self.as_slice(), other.as_slice())
    }
}

impl<T, U, const N: usize, H: HeapAlloc> PartialEq<Vec<U>> for EmbedVec<T, N, H>
where
    T: PartialEq<U>,
{
    #[inline]
    fn eq(&self, other: &Vec<U>) -> bool {
        PartialEq::eq(self.as_slice(), other.as_slice())
    }
}

impl<T, const N: usize, H: HeapAlloc + Default> FromIterator<T> for EmbedVec<T, N, H> {
    /// # Examples
    ///
    /// ```
    /// # use embedvec::EmbedVec;
    /// let vec: EmbedVec<i32, 3> = (1..=5).collect();
    /// assert_eq!(vec, [1, 2, 3, 4, 5]);
    /// ```
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut vec = Self::default();
        vec.extend(iter);
        vec
    }
}

impl<T, const N: usize, const P: usize> From<[T; P]> for EmbedVec<T, N, Global> {
    #[inline]
    fn from(value: [T; P]) -> Self {
        Self::from_buf(value)
    }
}

impl<T: Clone, const N: usize> From<&[T]> for EmbedVec<T, N, Global> {
    /// # Examples
    ///
    /// ```
    /// # use embedvec::EmbedVec;
    /// let vec = <EmbedVec<i32, 2>>::from([1, 2, 3].as_slice());
    /// assert_eq!(vec, [1, 2, 3]);
    /// ```
    fn from(value: &[T]) -> Self {
        let mut vec = Self::with_capacity(value.len());
        vec.extend_from_slice(value);
        vec
    }
}

impl<T, const N: usize> From<Vec<T>> for EmbedVec<T, N, Global> {
    /// Moves the elements of `value` into a new `EmbedVec`.
    fn from(value: Vec<T>) -> Self {
        let mut value = ManuallyDrop::new(value);
        let len = value.len();
        let mut vec = Self::with_capacity(len);
        // SAFETY: elements are moved, `value` only releases its buffer.
        unsafe {
            ptr::copy_nonoverlapping(value.as_ptr(), vec.as_mut_ptr(), len);
            vec.set_len(len);
            value.set_len(0);
            ManuallyDrop::drop(&mut value);
        }
        vec
    }
}

impl<T, const N: usize, H: HeapAlloc> From<EmbedVec<T, N, H>> for Vec<T> {
    #[inline]
    fn from(value: EmbedVec<T, N, H>) -> Self {
        value.into_vec()
    }
}

/// An iterator that consumes an [`EmbedVec`] and yields its items by value.
///
/// # Examples
///
/// ```
/// # use embedvec::{embedvec, EmbedVec};
/// let vec: EmbedVec<&'static str, 3> = embedvec!["1", "2", "3"];
/// let mut iter = vec.into_iter();
///
/// assert_eq!(iter.next(), Some("1"));
///
/// let vec: Vec<&'static str> = iter.collect();
/// assert_eq!(vec, ["2", "3"]);
/// ```
pub struct IntoIter<T, const N: usize, H: HeapAlloc = Global> {
    vec: EmbedVec<T, N, H>,
    index: usize,
}

impl<T, const N: usize, H: HeapAlloc> IntoIterator for EmbedVec<T, N, H> {
    type Item = T;
    type IntoIter = IntoIter<T, N, H>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            vec: self,
            index: 0,
        }
    }
}

impl<T, const N: usize, H: HeapAlloc> Iterator for IntoIter<T, N, H> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.index < self.vec.len {
            self.index += 1;
            // SAFETY: `index - 1 < len`, the slot is initialized and read exactly once.
            unsafe { Some(ptr::read(self.vec.as_ptr().add(self.index - 1))) }
        } else {
            None
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let v = self.vec.len - self.index;
        (v, Some(v))
    }
}

impl<T, const N: usize, H: HeapAlloc> DoubleEndedIterator for IntoIter<T, N, H> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.index < self.vec.len {
            self.vec.len -= 1;
            // SAFETY: the slot at the old `len - 1` is initialized and now outside `index..len`.
            unsafe { Some(ptr::read(self.vec.as_ptr().add(self.vec.len))) }
        } else {
            None
        }
    }
}

impl<T, const N: usize, H: HeapAlloc> ExactSizeIterator for IntoIter<T, N, H> {}

impl<T, const N: usize, H: HeapAlloc> FusedIterator for IntoIter<T, N, H> {}

impl<T, const N: usize, H: HeapAlloc> Drop for IntoIter<T, N, H> {
    fn drop(&mut self) {
        let remaining = self.vec.len - self.index;
        // The vector releases its buffer afterwards, without touching any element.
        self.vec.len = 0;
        if remaining > 0 {
            // SAFETY: `index..index + remaining` holds the items not yet yielded.
            unsafe {
                ptr::drop_in_place(ptr::slice_from_raw_parts_mut(
                    self.vec.as_mut_ptr().add(self.index),
                    remaining,
                ));
            }
        }
    }
}

impl<T, const N: usize, H: HeapAlloc> IntoIter<T, N, H> {
    /// The remaining items as a slice.
    ///
    /// # Examples
    ///
    /// ```
    /// # use embedvec::{EmbedVec, embedvec};
    /// let vec: EmbedVec<i32, 4> = embedvec![1, 2, 3];
    /// let mut iter = vec.into_iter();
    /// iter.next();
    /// assert_eq!(iter.as_slice(), [2, 3]);
    /// ```
    pub fn as_slice(&self) -> &[T] {
        let len = self.vec.len - self.index;
        // SAFETY: `index..len` are initialized and not yet yielded.
        unsafe { slice::from_raw_parts(self.vec.as_ptr().add(self.index), len) }
    }

    /// The remaining items as a mutable slice.
    ///
    /// # Examples
    ///
    /// ```
    /// # use embedvec::{EmbedVec, embedvec};
    /// let vec: EmbedVec<i32, 4> = embedvec![1, 2, 3];
    /// let mut iter = vec.into_iter();
    /// iter.next_back();
    /// iter.as_mut_slice()[0] = 10;
    /// assert_eq!(iter.collect::<Vec<_>>(), [10, 2]);
    /// ```
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        let len = self.vec.len - self.index;
        // SAFETY: as in `as_slice`, and `&mut self` makes the borrow unique.
        unsafe { slice::from_raw_parts_mut(self.vec.as_mut_ptr().add(self.index), len) }
    }
}

impl<T: fmt::Debug, const N: usize, H: HeapAlloc> fmt::Debug for IntoIter<T, N, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IntoIter").field(&self.as_slice()).finish()
    }
}

use core::alloc::Layout;

use thiserror::Error;

/// Errors reported by the fallible APIs of [`EmbeddedAllocator`](crate::EmbeddedAllocator)
/// and [`EmbedVec`](crate::EmbedVec).
///
/// Releasing an embedded block that is not the current tail is *not* an error,
/// it is silently ignored by the allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// The requested element count overflows `isize::MAX` bytes.
    #[error("capacity overflow")]
    CapacityOverflow,

    /// The heap allocator could not satisfy the request.
    #[error("memory allocation of {} bytes failed", .layout.size())]
    AllocFailed {
        /// The layout that was passed to the heap allocator.
        layout: Layout,
    },

    /// Checked element access outside of `0..len`.
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// The length at the time of the request.
        len: usize,
    },
}

/// Unwraps the result of an allocation-related operation the way `Vec` does:
/// panics on overflow and aborts through [`handle_alloc_error`](alloc::alloc::handle_alloc_error)
/// when the heap is exhausted.
#[inline]
pub(crate) fn infallible<T>(result: Result<T, Error>) -> T {
    match result {
        Ok(x) => x,
        Err(Error::CapacityOverflow) => panic!("capacity overflow"),
        Err(Error::AllocFailed { layout }) => alloc::alloc::handle_alloc_error(layout),
        Err(Error::IndexOutOfRange { index, len }) => {
            panic!("index out of bounds: the len is {len} but the index is {index}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn display() {
        assert_eq!(Error::CapacityOverflow.to_string(), "capacity overflow");

        let layout = Layout::array::<u64>(4).unwrap();
        assert_eq!(
            Error::AllocFailed { layout }.to_string(),
            "memory allocation of 32 bytes failed"
        );

        assert_eq!(
            Error::IndexOutOfRange { index: 7, len: 3 }.to_string(),
            "index 7 out of range for length 3"
        );
    }

    #[test]
    #[should_panic(expected = "capacity overflow")]
    fn infallible_overflow_panics() {
        infallible::<()>(Err(Error::CapacityOverflow));
    }
}

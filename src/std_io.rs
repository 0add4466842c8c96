extern crate std;

use core::ptr;
use std::io::{IoSlice, Write};

use crate::{EmbedVec, HeapAlloc};

/// Write is implemented for `EmbedVec<u8, N, H>` by appending to the vector.
/// The vector will grow as needed.
impl<const N: usize, H: HeapAlloc> Write for EmbedVec<u8, N, H> {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let len = self.len();
        let num = buf.len();

        self.try_reserve(num).map_err(std::io::Error::other)?;

        unsafe {
            ptr::copy_nonoverlapping(buf.as_ptr(), self.as_mut_ptr().add(len), num);
            self.set_len(len + num);
        }

        Ok(num)
    }

    #[inline(always)]
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }

    #[inline]
    fn write_vectored(&mut self, bufs: &[IoSlice<'_>]) -> std::io::Result<usize> {
        let num = bufs.iter().map(|b| b.len()).sum::<usize>();

        self.try_reserve(num).map_err(std::io::Error::other)?;
        for buf in bufs {
            let buf_len = buf.len();
            let vec_len = self.len();
            unsafe {
                ptr::copy_nonoverlapping(buf.as_ptr(), self.as_mut_ptr().add(vec_len), buf_len);
                self.set_len(vec_len + buf_len);
            }
        }

        Ok(num)
    }

    #[inline]
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        Write::write(self, buf)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::{HeapStats, Tracked};

    #[test]
    fn write_and_vectored() {
        let mut v: EmbedVec<u8, 4> = EmbedVec::new();

        let n = v.write(b"hello").unwrap();
        assert_eq!(n, 5);
        assert_eq!(v.len(), 5);
        assert_eq!(v, b"hello");

        let bufs = [IoSlice::new(b" "), IoSlice::new(b"world")];
        let n = v.write_vectored(&bufs).unwrap();
        assert_eq!(n, 6);
        assert_eq!(v, b"hello world");
    }

    #[test]
    fn small_writes_stay_embedded() {
        let stats = HeapStats::new();
        let mut v: EmbedVec<u8, 16, _> = EmbedVec::new_in(Tracked::new(&stats));
        v.write_all(b"0123456789").unwrap();
        v.write_all(b"abcdef").unwrap();
        assert!(v.is_embedded());
        assert_eq!(stats.allocations(), 0);
    }

    #[test]
    fn write_all_grows() {
        let mut v: EmbedVec<u8, 3> = EmbedVec::new();
        let data = [b'y'; 257];
        v.write_all(&data).unwrap();
        assert_eq!(v.len(), 257);
        assert!(v.as_slice().iter().all(|&c| c == b'y'));
    }
}

//! Memory lifetimes.
//!
//! Two allocation domains exist and they never mix:
//!
//! ```text
//!   SharedArena   process-wide, byte budgeted, cross-worker
//!                 transaction buffers, dialog strings, retransmission buffers
//!
//!   ScratchArena  one per request-processing context, reset per transaction
//!                 branch set output, temporary header text
//! ```
//!
//! Shared allocations are handed out as [`ShmStr`] (immutable, cheap to clone
//! and to slice) or [`ShmBuf`] (an exact-size buffer being written). Each one
//! carries a lease on the arena's budget; the bytes return to the budget when
//! the last handle sharing the lease is dropped. Exhaustion is reported as
//! [`TmError::AllocationFailure`] and nothing is charged.

use std::fmt;
use std::ops::{Deref, RangeBounds};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::{Bytes, BytesMut};

use crate::error::{Result, TmError};

#[derive(Debug)]
struct Budget {
    limit: usize,
    used: AtomicUsize,
}

impl Budget {
    fn reserve(&self, size: usize) -> Result<()> {
        let mut current = self.used.load(Ordering::Relaxed);
        loop {
            let available = self.limit.saturating_sub(current);
            if size > available {
                return Err(TmError::AllocationFailure { requested: size, available });
            }
            match self.used.compare_exchange_weak(
                current,
                current + size,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Ok(()),
                Err(actual) => current = actual,
            }
        }
    }

    fn release(&self, size: usize) {
        self.used.fetch_sub(size, Ordering::AcqRel);
    }
}

#[derive(Debug)]
struct Lease {
    budget: Arc<Budget>,
    size: usize,
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.budget.release(self.size);
    }
}

/// Budgeted allocator for data shared between workers
#[derive(Debug, Clone)]
pub struct SharedArena {
    budget: Arc<Budget>,
}

impl SharedArena {
    pub fn new(limit: usize) -> Self {
        SharedArena {
            budget: Arc::new(Budget { limit, used: AtomicUsize::new(0) }),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(usize::MAX)
    }

    /// Bytes currently allocated
    pub fn used(&self) -> usize {
        self.budget.used.load(Ordering::Acquire)
    }

    pub fn limit(&self) -> usize {
        self.budget.limit
    }

    fn lease(&self, size: usize) -> Result<Arc<Lease>> {
        self.budget.reserve(size)?;
        Ok(Arc::new(Lease { budget: self.budget.clone(), size }))
    }

    /// Deep copy `s` into the arena
    pub fn dup(&self, s: &[u8]) -> Result<ShmStr> {
        let lease = self.lease(s.len())?;
        Ok(ShmStr { data: Bytes::copy_from_slice(s), lease: Some(lease) })
    }

    /// Reserve an exact-size buffer to be filled by [`ShmBuf::put`]
    pub fn alloc(&self, len: usize) -> Result<ShmBuf> {
        let lease = self.lease(len)?;
        Ok(ShmBuf { data: BytesMut::with_capacity(len), expected: len, lease })
    }
}

/// Immutable shared bytes
#[derive(Clone)]
pub struct ShmStr {
    data: Bytes,
    lease: Option<Arc<Lease>>,
}

impl ShmStr {
    /// Static text that is not charged to any arena
    pub fn from_static(s: &'static [u8]) -> Self {
        ShmStr { data: Bytes::from_static(s), lease: None }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Sub-range sharing this allocation
    pub fn slice(&self, range: impl RangeBounds<usize>) -> ShmStr {
        ShmStr { data: self.data.slice(range), lease: self.lease.clone() }
    }

    /// Re-wrap a sub-slice previously borrowed from this value
    pub fn slice_ref(&self, subset: &[u8]) -> ShmStr {
        ShmStr { data: self.data.slice_ref(subset), lease: self.lease.clone() }
    }

    pub fn to_bytes(&self) -> Bytes {
        self.data.clone()
    }
}

impl Deref for ShmStr {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl AsRef<[u8]> for ShmStr {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl PartialEq for ShmStr {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for ShmStr {}

impl PartialEq<[u8]> for ShmStr {
    fn eq(&self, other: &[u8]) -> bool {
        &self.data[..] == other
    }
}

impl PartialEq<&[u8]> for ShmStr {
    fn eq(&self, other: &&[u8]) -> bool {
        &self.data[..] == *other
    }
}

impl<const N: usize> PartialEq<[u8; N]> for ShmStr {
    fn eq(&self, other: &[u8; N]) -> bool {
        &self.data[..] == &other[..]
    }
}

impl<const N: usize> PartialEq<&[u8; N]> for ShmStr {
    fn eq(&self, other: &&[u8; N]) -> bool {
        &self.data[..] == &other[..]
    }
}

impl fmt::Debug for ShmStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(&self.data))
    }
}

impl fmt::Display for ShmStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.data))
    }
}

/// Exact-size shared buffer under construction.
///
/// Writers compute the final length first, allocate, then `put` the pieces;
/// overflowing or under-filling the computed length is an error.
#[derive(Debug)]
pub struct ShmBuf {
    data: BytesMut,
    expected: usize,
    lease: Arc<Lease>,
}

impl ShmBuf {
    pub fn put(&mut self, s: &[u8]) -> Result<()> {
        let written = self.data.len() + s.len();
        if written > self.expected {
            return Err(TmError::BufferTooSmall { expected: self.expected, written });
        }
        self.data.extend_from_slice(s);
        Ok(())
    }

    /// Bytes written so far; used to remember offsets of interesting headers
    pub fn position(&self) -> usize {
        self.data.len()
    }

    pub fn finish(self) -> Result<ShmStr> {
        if self.data.len() != self.expected {
            return Err(TmError::BufferTooSmall {
                expected: self.expected,
                written: self.data.len(),
            });
        }
        Ok(ShmStr { data: self.data.freeze(), lease: Some(self.lease) })
    }
}

/// Per-request scratch allocator.
///
/// Only accounts for what the current request-processing context has taken;
/// buffers are plain `BytesMut` and die with the context.
#[derive(Debug)]
pub struct ScratchArena {
    limit: usize,
    used: usize,
}

impl ScratchArena {
    pub fn new(limit: usize) -> Self {
        ScratchArena { limit, used: 0 }
    }

    pub fn alloc(&mut self, len: usize) -> Result<BytesMut> {
        let available = self.limit.saturating_sub(self.used);
        if len > available {
            return Err(TmError::AllocationFailure { requested: len, available });
        }
        self.used += len;
        Ok(BytesMut::with_capacity(len))
    }

    pub fn used(&self) -> usize {
        self.used
    }

    /// Start a new request-processing context
    pub fn reset(&mut self) {
        self.used = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dup_charges_and_releases() {
        let arena = SharedArena::new(64);
        let s = arena.dup(b"sip:alice@a.example").unwrap();
        assert_eq!(arena.used(), 19);
        let head = s.slice(..4);
        drop(s);
        // the slice still holds the lease
        assert_eq!(arena.used(), 19);
        assert_eq!(head, b"sip:");
        drop(head);
        assert_eq!(arena.used(), 0);
    }

    #[test]
    fn test_exhaustion() {
        let arena = SharedArena::new(8);
        let _a = arena.dup(b"12345").unwrap();
        match arena.dup(b"6789") {
            Err(TmError::AllocationFailure { requested, available }) => {
                assert_eq!(requested, 4);
                assert_eq!(available, 3);
            }
            other => panic!("unexpected {:?}", other.map(|s| s.to_bytes())),
        }
        assert_eq!(arena.used(), 5);
    }

    #[test]
    fn test_shm_buf_exact() {
        let arena = SharedArena::unbounded();
        let mut buf = arena.alloc(5).unwrap();
        buf.put(b"ab").unwrap();
        buf.put(b"cde").unwrap();
        assert!(matches!(buf.put(b"f"), Err(TmError::BufferTooSmall { expected: 5, written: 6 })));
        assert_eq!(buf.finish().unwrap(), b"abcde");
    }

    #[test]
    fn test_shm_buf_short_write() {
        let arena = SharedArena::unbounded();
        let mut buf = arena.alloc(4).unwrap();
        buf.put(b"ab").unwrap();
        assert!(matches!(buf.finish(), Err(TmError::BufferTooSmall { expected: 4, written: 2 })));
    }

    #[test]
    fn test_scratch_reset() {
        let mut scratch = ScratchArena::new(10);
        scratch.alloc(6).unwrap();
        assert!(scratch.alloc(6).is_err());
        scratch.reset();
        assert!(scratch.alloc(10).is_ok());
        assert_eq!(scratch.used(), 10);
    }
}

//! The unchecked storage engine under [`AnyBox`](super::AnyBox).
//!
//! A [`RawAny`] is just the four fields of a box: tag, length, buffer and the populated flag. It
//! doesn't know which allocator its buffer came from and doesn't free anything on drop, so every
//! operation that touches the buffer takes the allocator explicitly and is `unsafe` to call with
//! the wrong one. [`AnyBox`](super::AnyBox) pairs the two up and provides the safe API.

use crate::allocator::ByteAlloc;
use crate::any::TypeTag;
use crate::error::AnyError;
use sptr::Strict;
use std::fmt;
use std::mem;
use std::ptr::{self, NonNull};
use std::slice;
use tracing::{debug, trace};

/// Raw box state. Owns `ptr` when present, but leaks it if dropped without
/// [`RawAny::release`].
pub struct RawAny {
    tag: TypeTag,
    len: usize,
    ptr: Option<NonNull<u8>>,
    populated: bool,
}

// SAFETY: A `RawAny` uniquely owns its buffer, the same as a `Box<[u8]>`
unsafe impl Send for RawAny {}
// SAFETY: Shared access only ever reads the buffer
unsafe impl Sync for RawAny {}

impl RawAny {
    /// No buffer, no value, untyped. The state of a reset or moved-from box.
    pub const EMPTY: RawAny = RawAny {
        tag: TypeTag::UNTYPED,
        len: 0,
        ptr: None,
        populated: false,
    };

    /// Allocate a zero-filled buffer of `len` bytes. The result has storage but no value.
    pub fn allocate<A: ByteAlloc>(
        alloc: &A,
        tag: TypeTag,
        len: usize,
    ) -> Result<RawAny, AnyError> {
        let ptr = alloc.alloc_zeroed(len).ok_or_else(|| {
            debug!(len, "payload allocation failed");
            AnyError::AllocationFailure { size: len }
        })?;
        trace!(len, tag = tag.get(), "allocated payload buffer");

        Ok(RawAny {
            tag,
            len,
            ptr: Some(ptr),
            populated: false,
        })
    }

    #[must_use]
    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_populated(&self) -> bool {
        self.populated
    }

    #[must_use]
    pub fn has_storage(&self) -> bool {
        self.ptr.is_some()
    }

    /// Address of the owned buffer, if any. Only meaningful for identity checks.
    #[must_use]
    pub fn storage_addr(&self) -> Option<usize> {
        self.ptr.map(|ptr| Strict::addr(ptr.as_ptr()))
    }

    /// The whole buffer, populated or not.
    #[must_use]
    pub fn bytes(&self) -> Option<&[u8]> {
        // SAFETY: When present, `ptr` is a live, initialised buffer of exactly `len` bytes
        self.ptr.map(|ptr| unsafe { slice::from_raw_parts(ptr.as_ptr(), self.len) })
    }

    /// Resize the buffer to `src.len()` if needed, copy `src` in and mark the value populated.
    ///
    /// If the resize fails nothing changes.
    ///
    /// # Safety
    ///
    /// `alloc` must be the allocator (or a clone of it) that produced the current buffer.
    pub unsafe fn write<A: ByteAlloc>(
        &mut self,
        alloc: &A,
        tag: TypeTag,
        src: &[u8],
    ) -> Result<(), AnyError> {
        let len = src.len();
        let current = self.ptr;
        let dst = match current {
            Some(ptr) if self.len == len => ptr,
            _ => {
                let resized = match current {
                    // SAFETY: Caller guarantees `ptr` came from `alloc` with length `self.len`
                    Some(ptr) => unsafe { alloc.realloc(ptr, self.len, len) },
                    None => alloc.alloc_zeroed(len),
                };
                let resized = resized.ok_or_else(|| {
                    debug!(from = self.len, to = len, "payload resize failed");
                    AnyError::AllocationFailure { size: len }
                })?;
                trace!(from = self.len, to = len, "resized payload buffer");

                self.ptr = Some(resized);
                self.len = len;
                resized
            }
        };

        // SAFETY: `dst` holds `len` bytes, and `src` can't alias it while we hold `&mut self`
        unsafe { ptr::copy_nonoverlapping(src.as_ptr(), dst.as_ptr(), len) };
        self.tag = tag;
        self.populated = true;
        Ok(())
    }

    /// Allocate a populated duplicate of this state, bytes included.
    pub fn duplicate<A: ByteAlloc>(&self, alloc: &A) -> Result<RawAny, AnyError> {
        let mut copy = RawAny::allocate(alloc, self.tag, self.len)?;
        if let (Some(src), Some(dst)) = (self.ptr, copy.ptr) {
            // SAFETY: Both buffers are `len` bytes long and distinct allocations
            unsafe { ptr::copy_nonoverlapping(src.as_ptr(), dst.as_ptr(), self.len) };
        }
        copy.populated = true;
        Ok(copy)
    }

    /// Drop the value if there is one, freeing the buffer. Allocated-but-unassigned storage is
    /// left alone.
    ///
    /// # Safety
    ///
    /// Same as [`RawAny::write`].
    pub unsafe fn reset<A: ByteAlloc>(&mut self, alloc: &A) {
        if self.populated {
            // SAFETY: Forwarded caller contract
            unsafe { self.release(alloc) };
        }
    }

    /// Free the buffer, if any, and return to [`RawAny::EMPTY`].
    ///
    /// # Safety
    ///
    /// Same as [`RawAny::write`].
    pub unsafe fn release<A: ByteAlloc>(&mut self, alloc: &A) {
        if let Some(ptr) = self.ptr.take() {
            // SAFETY: Caller guarantees `ptr` came from `alloc` with length `self.len`
            unsafe { alloc.dealloc(ptr, self.len) };
            trace!(len = self.len, "freed payload buffer");
        }
        *self = RawAny::EMPTY;
    }

    /// Move the whole state out, leaving [`RawAny::EMPTY`] behind. The buffer is not freed, its
    /// ownership goes with the returned value.
    pub fn take(&mut self) -> RawAny {
        mem::replace(self, RawAny::EMPTY)
    }

    /// Bitwise equality of the observable state: populated flag, tag, length and bytes.
    #[must_use]
    pub fn content_eq(&self, other: &RawAny) -> bool {
        self.populated == other.populated
            && self.tag == other.tag
            && self.len == other.len
            && self.bytes().unwrap_or(&[]) == other.bytes().unwrap_or(&[])
    }
}

impl fmt::Debug for RawAny {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawAny")
            .field("tag", &self.tag)
            .field("len", &self.len)
            .field("populated", &self.populated)
            .field("storage", &self.ptr)
            .finish()
    }
}

//! The allocation hook every payload buffer goes through.
//!
//! [`AnyBox`](crate::any::AnyBox) never calls the system allocator directly. It is generic over a
//! [`ByteAlloc`], which defaults to [`Global`]. Swapping in [`Counting`] turns on allocation
//! diagnostics for a single box, or a whole test run, without recompiling and without changing
//! what the engine does.
//!
//! ```
//! use anybox::allocator::Counting;
//! use anybox::any::{AnyBox, TypeTag};
//!
//! let counter = Counting::new();
//! let mut a = AnyBox::new_in(TypeTag::UNTYPED, 4, counter.clone()).unwrap();
//! a.set(TypeTag::UNTYPED, &[1, 2, 3, 4, 5, 6]).unwrap();
//! assert_eq!(counter.outstanding(), 1);
//!
//! drop(a);
//! assert!(counter.report().is_clean());
//! ```

use crate::utils::{buffer_layout, dangling};
use std::cell::Cell;
use std::fmt;
use std::ptr::NonNull;
use std::rc::Rc;
use tracing::{info, warn};

/// Alignment of every payload buffer. Matches what `malloc` guarantees on common 64-bit targets,
/// so any primitive can be read in place.
pub const ALIGN: usize = 16;

/// An allocator for raw, [`ALIGN`]-aligned byte buffers.
///
/// Clones must be interchangeable: a buffer allocated through one clone may be resized or freed
/// through another.
pub trait ByteAlloc: Clone {
    /// Allocate a zero-filled buffer of `len` bytes. `len == 0` must still succeed with a
    /// non-null pointer. Returns `None` if the request can't be satisfied.
    fn alloc_zeroed(&self, len: usize) -> Option<NonNull<u8>>;

    /// Resize a buffer, preserving the first `min(old_len, new_len)` bytes. On `None` the
    /// original buffer is untouched and still owned by the caller.
    ///
    /// # Safety
    ///
    /// `ptr` must have come from this allocator (or a clone of it) with length `old_len`, and not
    /// have been freed since.
    unsafe fn realloc(
        &self,
        ptr: NonNull<u8>,
        old_len: usize,
        new_len: usize,
    ) -> Option<NonNull<u8>>;

    /// Free a buffer.
    ///
    /// # Safety
    ///
    /// Same requirements as [`ByteAlloc::realloc`]. The pointer must not be used afterwards.
    unsafe fn dealloc(&self, ptr: NonNull<u8>, len: usize);
}

/// The system allocator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Global;

impl ByteAlloc for Global {
    fn alloc_zeroed(&self, len: usize) -> Option<NonNull<u8>> {
        if len == 0 {
            return Some(dangling());
        }
        let layout = buffer_layout(len)?;
        // SAFETY: The layout has a non-zero size
        NonNull::new(unsafe { std::alloc::alloc_zeroed(layout) })
    }

    unsafe fn realloc(
        &self,
        ptr: NonNull<u8>,
        old_len: usize,
        new_len: usize,
    ) -> Option<NonNull<u8>> {
        match (old_len, new_len) {
            (0, _) => self.alloc_zeroed(new_len),
            (_, 0) => {
                // SAFETY: Caller guarantees `ptr` is a live buffer of `old_len` bytes from us
                unsafe { self.dealloc(ptr, old_len) };
                Some(dangling())
            }
            _ => {
                let old = buffer_layout(old_len)?;
                // Rejects sizes that would overflow `isize` once rounded up to `ALIGN`
                buffer_layout(new_len)?;
                // SAFETY: `ptr` was allocated with `old`, and `new_len` is non-zero and valid
                //         for this alignment
                NonNull::new(unsafe { std::alloc::realloc(ptr.as_ptr(), old, new_len) })
            }
        }
    }

    unsafe fn dealloc(&self, ptr: NonNull<u8>, len: usize) {
        if len == 0 {
            return;
        }
        if let Some(layout) = buffer_layout(len) {
            // SAFETY: Caller guarantees `ptr` was allocated by us with this layout
            unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) };
        }
    }
}

/// An allocator that counts outstanding buffers, for leak checks.
///
/// Every successful allocation adds one, every free subtracts one, and a resize leaves the count
/// alone. Clones share the same counter, so hand clones to every box under test and read the
/// count from the original afterwards.
///
/// The counter is an `Rc`, which keeps boxes using this allocator on one thread.
#[derive(Debug, Clone, Default)]
pub struct Counting<A: ByteAlloc = Global> {
    inner: A,
    live: Rc<Cell<usize>>,
}

impl Counting {
    /// A fresh counter over the system allocator, starting at zero.
    #[must_use]
    pub fn new() -> Counting {
        Counting::wrap(Global)
    }
}

impl<A: ByteAlloc> Counting<A> {
    /// Count the allocations made through `inner`.
    #[must_use]
    pub fn wrap(inner: A) -> Counting<A> {
        Counting {
            inner,
            live: Rc::new(Cell::new(0)),
        }
    }

    /// Number of buffers allocated through this counter and not yet freed.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.live.get()
    }

    /// Set the count back to zero, e.g. at the start of a test.
    pub fn reset(&self) {
        self.live.set(0);
    }

    /// Snapshot the current count.
    #[must_use]
    pub fn report(&self) -> MemoryReport {
        MemoryReport {
            outstanding: self.outstanding(),
        }
    }
}

impl<A: ByteAlloc> ByteAlloc for Counting<A> {
    fn alloc_zeroed(&self, len: usize) -> Option<NonNull<u8>> {
        let ptr = self.inner.alloc_zeroed(len)?;
        self.live.set(self.live.get() + 1);
        Some(ptr)
    }

    unsafe fn realloc(
        &self,
        ptr: NonNull<u8>,
        old_len: usize,
        new_len: usize,
    ) -> Option<NonNull<u8>> {
        // SAFETY: Forwarded caller contract
        unsafe { self.inner.realloc(ptr, old_len, new_len) }
    }

    unsafe fn dealloc(&self, ptr: NonNull<u8>, len: usize) {
        // SAFETY: Forwarded caller contract
        unsafe { self.inner.dealloc(ptr, len) };
        self.live.set(self.live.get().saturating_sub(1));
    }
}

/// Outcome of a [`Counting::report`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryReport {
    /// Buffers still allocated when the report was taken
    pub outstanding: usize,
}

impl MemoryReport {
    /// True when nothing is left allocated.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.outstanding == 0
    }

    /// Emit the report through `tracing`: `info` when clean, `warn` otherwise.
    pub fn log(&self) {
        if self.is_clean() {
            info!("{}", self);
        } else {
            warn!(outstanding = self.outstanding, "{}", self);
        }
    }
}

impl fmt::Display for MemoryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outstanding {
            0 => write!(f, "memory is clean, no allocations left"),
            1 => write!(f, "1 allocation left (memory leak)"),
            n => write!(f, "{n} allocations left (memory leak)"),
        }
    }
}

/// Allocator that fails once its budget of allocations and resizes is spent.
#[cfg(test)]
#[derive(Debug, Clone)]
pub(crate) struct Budget {
    remaining: Rc<Cell<usize>>,
}

#[cfg(test)]
impl Budget {
    pub(crate) fn new(remaining: usize) -> Budget {
        Budget {
            remaining: Rc::new(Cell::new(remaining)),
        }
    }

    pub(crate) fn refill(&self, remaining: usize) {
        self.remaining.set(remaining);
    }

    fn spend(&self) -> Option<()> {
        let left = self.remaining.get().checked_sub(1)?;
        self.remaining.set(left);
        Some(())
    }
}

#[cfg(test)]
impl ByteAlloc for Budget {
    fn alloc_zeroed(&self, len: usize) -> Option<NonNull<u8>> {
        self.spend()?;
        Global.alloc_zeroed(len)
    }

    unsafe fn realloc(
        &self,
        ptr: NonNull<u8>,
        old_len: usize,
        new_len: usize,
    ) -> Option<NonNull<u8>> {
        self.spend()?;
        // SAFETY: Forwarded caller contract
        unsafe { Global.realloc(ptr, old_len, new_len) }
    }

    unsafe fn dealloc(&self, ptr: NonNull<u8>, len: usize) {
        // SAFETY: Forwarded caller contract
        unsafe { Global.dealloc(ptr, len) }
    }
}

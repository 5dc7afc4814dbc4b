use crate::allocator::ALIGN;
use std::alloc::Layout;
use std::ptr::NonNull;

/// Layout of a payload buffer of `len` bytes. `None` if no allocator could ever satisfy it.
#[inline]
pub(crate) fn buffer_layout(len: usize) -> Option<Layout> {
    Layout::from_size_align(len, ALIGN).ok()
}

/// The stand-in pointer for zero-length buffers: aligned, non-null, never dereferenced for more
/// than zero bytes and never handed to the system allocator.
#[inline]
pub(crate) fn dangling() -> NonNull<u8> {
    // SAFETY: `ALIGN` is non-zero, so the pointer is non-null
    unsafe { NonNull::new_unchecked(sptr::invalid_mut(ALIGN)) }
}

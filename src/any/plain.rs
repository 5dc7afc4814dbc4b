use sptr::Strict;
use std::{mem, ptr, slice};

/// Types that can be erased into raw bytes and read back out of them.
///
/// This is the escape hatch between typed Rust values and the untyped payload of an
/// [`AnyBox`](super::AnyBox). It's implemented for every integer and float primitive, and for
/// arrays of implementors, which covers nested arrays too.
///
/// # Safety
///
/// Implementors must contain no padding and no uninitialised bytes, and every bit pattern of
/// `size_of::<Self>()` bytes must be a valid value. A `#[repr(C)]` struct of `Plain` fields laid
/// out without gaps qualifies. `bool`, `char`, references and pointers do not.
pub unsafe trait Plain: Copy + 'static {}

macro_rules! impl_plain {
    ($($ty:ty),* $(,)?) => {
        $(
            // SAFETY: Primitive numbers have no padding and no invalid bit patterns
            unsafe impl Plain for $ty {}
        )*
    };
}

impl_plain!(u8, u16, u32, u64, u128, usize);
impl_plain!(i8, i16, i32, i64, i128, isize);
impl_plain!(f32, f64);

// SAFETY: Arrays have no padding between elements, so an array of `Plain` is `Plain`
unsafe impl<T: Plain, const N: usize> Plain for [T; N] {}

#[inline]
pub(crate) fn bytes_of<T: Plain>(val: &T) -> &[u8] {
    // SAFETY: `Plain` guarantees every byte of `T` is initialised
    unsafe { slice::from_raw_parts((val as *const T).cast::<u8>(), mem::size_of::<T>()) }
}

#[inline]
pub(crate) fn bytes_of_slice<T: Plain>(vals: &[T]) -> &[u8] {
    // SAFETY: `Plain` guarantees every byte of every element is initialised
    unsafe { slice::from_raw_parts(vals.as_ptr().cast::<u8>(), mem::size_of_val(vals)) }
}

/// Copy a `T` out of `bytes`, which must be exactly one `T` long.
#[inline]
pub(crate) fn read<T: Plain>(bytes: &[u8]) -> Option<T> {
    if bytes.len() != mem::size_of::<T>() {
        return None;
    }
    // SAFETY: Length checked above, and `Plain` accepts any bit pattern
    Some(unsafe { ptr::read_unaligned(bytes.as_ptr().cast::<T>()) })
}

/// View `bytes` as a slice of `T` in place. Fails if the length isn't a whole number of `T`s or
/// the start isn't aligned for `T`. Zero-sized `T` is rejected, since the element count would be
/// meaningless.
#[inline]
pub(crate) fn cast_slice<T: Plain>(bytes: &[u8]) -> Option<&[T]> {
    let size = mem::size_of::<T>();
    if size == 0
        || bytes.len() % size != 0
        || Strict::addr(bytes.as_ptr()) % mem::align_of::<T>() != 0
    {
        return None;
    }
    // SAFETY: Alignment and length checked above, and `Plain` accepts any bit pattern
    Some(unsafe { slice::from_raw_parts(bytes.as_ptr().cast::<T>(), bytes.len() / size) })
}

//! A safe, owning wrapper around a [`RawAny`] and the allocator that backs it.

use crate::allocator::{ByteAlloc, Global};
use crate::any::plain::{self, Plain};
use crate::any::raw::RawAny;
use crate::any::TypeTag;
use crate::error::AnyError;
use std::{fmt, mem, ptr, str};
use tracing::trace;

static NULL: AnyBox = AnyBox {
    raw: RawAny::EMPTY,
    alloc: Global,
};

/// A heap box holding an arbitrary run of bytes and an opaque [`TypeTag`].
///
/// The box owns at most one buffer. It's allocated, zero-filled, when the box is created, resized
/// by [`AnyBox::set`] whenever the new payload has a different length, and freed by
/// [`AnyBox::reset`], [`AnyBox::move_from`] (on the destination), [`AnyBox::destroy`] or drop.
/// A freshly created box has storage but no value until the first `set`.
///
/// The contents are never interpreted: equality and [`AnyBox::copy`] are bitwise, and the tag is
/// only ever compared and passed back.
///
/// There is exactly one null box, returned by [`AnyBox::null`]. Nullness is identity: a box that
/// was reset or moved out of looks empty but stays a live, reusable handle.
pub struct AnyBox<A: ByteAlloc = Global> {
    raw: RawAny,
    alloc: A,
}

impl AnyBox {
    /// Create a box with a zeroed `len`-byte buffer on the system allocator. The box has no
    /// value yet.
    pub fn new(tag: TypeTag, len: usize) -> Result<AnyBox, AnyError> {
        AnyBox::new_in(tag, len, Global)
    }

    /// The null box. It owns nothing, can't be mutated, and every query on it gives the neutral
    /// answer: no bytes, size 0, untyped, no value, equal to nothing.
    #[must_use]
    pub fn null() -> &'static AnyBox {
        &NULL
    }

    /// Create a box holding a copy of `bytes`.
    pub fn with_bytes(tag: TypeTag, bytes: &[u8]) -> Result<AnyBox, AnyError> {
        AnyBox::with_bytes_in(tag, bytes, Global)
    }

    /// Create a box holding the bytes of `val`.
    pub fn with_value<T: Plain>(tag: TypeTag, val: &T) -> Result<AnyBox, AnyError> {
        AnyBox::with_bytes(tag, plain::bytes_of(val))
    }

    /// Create a box holding the bytes of every element of `vals`, back to back.
    pub fn with_slice<T: Plain>(tag: TypeTag, vals: &[T]) -> Result<AnyBox, AnyError> {
        AnyBox::with_bytes(tag, plain::bytes_of_slice(vals))
    }

    /// Create a box holding `s` as a NUL-terminated UTF-8 string.
    pub fn with_str(tag: TypeTag, s: &str) -> Result<AnyBox, AnyError> {
        let mut out = AnyBox::new(tag, s.len() + 1)?;
        out.set_str(tag, s)?;
        Ok(out)
    }
}

impl<A: ByteAlloc> AnyBox<A> {
    /// Create a box with a zeroed `len`-byte buffer from `alloc`. The box has no value yet.
    pub fn new_in(tag: TypeTag, len: usize, alloc: A) -> Result<AnyBox<A>, AnyError> {
        let raw = RawAny::allocate(&alloc, tag, len)?;
        Ok(AnyBox { raw, alloc })
    }

    /// Create a box holding a copy of `bytes`, allocated from `alloc`.
    pub fn with_bytes_in(tag: TypeTag, bytes: &[u8], alloc: A) -> Result<AnyBox<A>, AnyError> {
        let mut out = AnyBox::new_in(tag, bytes.len(), alloc)?;
        out.set(tag, bytes)?;
        Ok(out)
    }

    /// The allocator backing this box.
    #[must_use]
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Whether this is the [null box](AnyBox::null).
    #[must_use]
    pub fn is_null(&self) -> bool {
        ptr::eq(
            (self as *const AnyBox<A>).cast::<()>(),
            (&NULL as *const AnyBox).cast::<()>(),
        )
    }

    /// Whether the box currently holds a value written by [`AnyBox::set`].
    #[must_use]
    pub fn has_value(&self) -> bool {
        !self.is_null() && self.raw.is_populated()
    }

    /// Whether there is nothing to read: no value, or a zero-length one. The null box is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.has_value() || self.raw.len() == 0
    }

    /// Payload length in bytes, 0 for the null box.
    #[must_use]
    pub fn size(&self) -> usize {
        self.raw.len()
    }

    /// The tag of the current payload, [`TypeTag::UNTYPED`] for the null box.
    #[must_use]
    pub fn tag(&self) -> TypeTag {
        self.raw.tag()
    }

    /// The raw buffer. `None` if the box owns no storage: the null box, or a box that was reset
    /// or moved out of. A created-but-unset box gives its zero-filled buffer.
    #[must_use]
    pub fn get(&self) -> Option<&[u8]> {
        self.raw.bytes()
    }

    /// Address of the owned buffer, for checking that two handles do or don't share storage.
    #[must_use]
    pub fn storage_addr(&self) -> Option<usize> {
        self.raw.storage_addr()
    }

    /// Store a copy of `bytes` under `tag`, resizing the buffer if the length changed.
    ///
    /// On failure the box keeps its previous tag, length and contents.
    pub fn set(&mut self, tag: TypeTag, bytes: &[u8]) -> Result<(), AnyError> {
        // SAFETY: Our buffer, if any, was allocated by `self.alloc`
        unsafe { self.raw.write(&self.alloc, tag, bytes) }
    }

    /// Store the bytes of `val` under `tag`.
    pub fn set_value<T: Plain>(&mut self, tag: TypeTag, val: &T) -> Result<(), AnyError> {
        self.set(tag, plain::bytes_of(val))
    }

    /// Store the bytes of every element of `vals` under `tag`.
    pub fn set_slice<T: Plain>(&mut self, tag: TypeTag, vals: &[T]) -> Result<(), AnyError> {
        self.set(tag, plain::bytes_of_slice(vals))
    }

    /// Store `s` under `tag` as UTF-8 followed by a terminating NUL.
    pub fn set_str(&mut self, tag: TypeTag, s: &str) -> Result<(), AnyError> {
        let mut bytes = Vec::with_capacity(s.len() + 1);
        bytes.extend_from_slice(s.as_bytes());
        bytes.push(0);
        self.set(tag, &bytes)
    }

    /// Read the value back as a `T`. `None` unless the box holds a value exactly
    /// `size_of::<T>()` bytes long.
    #[must_use]
    pub fn value<T: Plain>(&self) -> Option<T> {
        self.value_bytes().and_then(plain::read)
    }

    /// View the value as a slice of `T`. `None` unless the box holds a value whose length is a
    /// whole number of `T`s.
    #[must_use]
    pub fn slice<T: Plain>(&self) -> Option<&[T]> {
        self.value_bytes().and_then(plain::cast_slice)
    }

    /// View the value as a string stored by [`AnyBox::set_str`].
    #[must_use]
    pub fn str_value(&self) -> Option<&str> {
        self.value_bytes()
            .and_then(|bytes| bytes.strip_suffix(&[0]))
            .and_then(|bytes| str::from_utf8(bytes).ok())
    }

    fn value_bytes(&self) -> Option<&[u8]> {
        if self.has_value() {
            self.raw.bytes()
        } else {
            None
        }
    }

    /// Drop the current value, freeing its buffer. The box goes back to untyped, zero length and
    /// no storage, but stays usable. Does nothing if the box holds no value.
    pub fn reset(&mut self) {
        // SAFETY: Our buffer, if any, was allocated by `self.alloc`
        unsafe { self.raw.reset(&self.alloc) };
    }

    /// Bitwise equality: same populated state, tag, length and bytes. A box always equals itself,
    /// and the null box equals nothing.
    #[must_use]
    pub fn equals<B: ByteAlloc>(&self, other: &AnyBox<B>) -> bool {
        if self.is_null() || other.is_null() {
            return false;
        }
        if ptr::eq(
            (self as *const AnyBox<A>).cast::<()>(),
            (other as *const AnyBox<B>).cast::<()>(),
        ) {
            return true;
        }
        self.raw.content_eq(&other.raw)
    }

    /// Deep-copy the value into a new box on the same allocator.
    ///
    /// Fails with [`AnyError::NullOperand`] for the null box and [`AnyError::NoValue`] for a box
    /// that was never set, so "nothing to copy" can't be mistaken for a zero-length copy.
    pub fn copy(&self) -> Result<AnyBox<A>, AnyError> {
        if self.is_null() {
            return Err(AnyError::NullOperand);
        }
        if !self.raw.is_populated() {
            return Err(AnyError::NoValue);
        }

        let raw = self.raw.duplicate(&self.alloc)?;
        Ok(AnyBox {
            raw,
            alloc: self.alloc.clone(),
        })
    }

    /// Take over `src`'s payload. Our old buffer is freed, `src`'s buffer becomes ours without
    /// being copied, and `src` is left with no value, no storage, zero length and no tag.
    pub fn move_from(&mut self, src: &mut AnyBox<A>) {
        // SAFETY: Our buffer, if any, was allocated by `self.alloc`
        unsafe { self.raw.release(&self.alloc) };
        self.raw = src.raw.take();
        // The buffer now belongs to us, so whoever allocated it must free it
        self.alloc = src.alloc.clone();
        trace!(len = self.raw.len(), "moved payload");
    }

    /// Exchange payloads with `other`. Nothing is allocated or copied, and both boxes keep
    /// whatever state the other had, value or not.
    pub fn swap(&mut self, other: &mut AnyBox<A>) {
        mem::swap(&mut self.raw, &mut other.raw);
        mem::swap(&mut self.alloc, &mut other.alloc);
    }

    /// Free the box and its buffer. Equivalent to dropping it.
    pub fn destroy(self) {
        drop(self);
    }
}

impl<A: ByteAlloc, B: ByteAlloc> PartialEq<AnyBox<B>> for AnyBox<A> {
    fn eq(&self, other: &AnyBox<B>) -> bool {
        self.equals(other)
    }
}

impl<A: ByteAlloc> fmt::Debug for AnyBox<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return f.write_str("AnyBox::Null");
        }

        let mut out = f.debug_struct("AnyBox");
        out.field("tag", &self.raw.tag())
            .field("len", &self.raw.len());
        match self.value_bytes() {
            Some(bytes) => out.field("value", &bytes),
            None => out.field("value", &format_args!("<none>")),
        };
        out.finish()
    }
}

impl<A: ByteAlloc> Drop for AnyBox<A> {
    fn drop(&mut self) {
        // SAFETY: Our buffer, if any, was allocated by `self.alloc`
        unsafe { self.raw.release(&self.alloc) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::{Budget, Counting};

    const UNTYPED: TypeTag = TypeTag::UNTYPED;

    #[test]
    fn test_create_then_set() {
        let mut a = AnyBox::new(UNTYPED, 4).unwrap();
        assert!(!a.has_value());
        assert_eq!(a.get(), Some(&[0u8; 4][..]));

        a.set(UNTYPED, &[0x2A, 0, 0, 0]).unwrap();
        assert!(a.has_value());
        assert_eq!(a.get(), Some(&[0x2A, 0, 0, 0][..]));
        assert_eq!(a.size(), 4);
    }

    #[test]
    fn test_create_failure() {
        let err = AnyBox::new(UNTYPED, usize::MAX).unwrap_err();
        assert_eq!(err, AnyError::AllocationFailure { size: usize::MAX });
    }

    #[test]
    fn test_copy_then_diverge() {
        let original = AnyBox::with_bytes(UNTYPED, &[0x2A, 0, 0, 0]).unwrap();
        let mut copy = original.copy().unwrap();
        assert!(original.equals(&copy));
        assert_ne!(original.storage_addr(), copy.storage_addr());

        copy.set(UNTYPED, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        assert!(!original.equals(&copy));
        assert_eq!(original.size(), 4);
        assert_eq!(copy.size(), 8);
        assert_eq!(original.get(), Some(&[0x2A, 0, 0, 0][..]));
    }

    #[test]
    fn test_copy_unset_or_null() {
        let a = AnyBox::new(UNTYPED, 4).unwrap();
        assert_eq!(a.copy().unwrap_err(), AnyError::NoValue);
        assert_eq!(AnyBox::null().copy().unwrap_err(), AnyError::NullOperand);
    }

    #[test]
    fn test_copy_zero_len_value() {
        let a = AnyBox::with_bytes(TypeTag::new(5), &[]).unwrap();
        let b = a.copy().unwrap();
        assert!(b.has_value());
        assert_eq!(b.size(), 0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_move_f64() {
        let mut src = AnyBox::with_value(UNTYPED, &6.25f64).unwrap();
        let mut dest = AnyBox::new(UNTYPED, 8).unwrap();
        let addr = src.storage_addr();

        dest.move_from(&mut src);
        assert!(!src.has_value());
        assert!(!src.is_null());
        assert_eq!(src.size(), 0);
        assert_eq!(src.tag(), UNTYPED);
        assert_eq!(src.get(), None);

        assert_eq!(dest.value::<f64>(), Some(6.25));
        assert_eq!(dest.size(), 8);
        assert_eq!(dest.storage_addr(), addr);
    }

    #[test]
    fn test_move_carries_unset_state() {
        let mut src = AnyBox::new(TypeTag::new(2), 3).unwrap();
        let mut dest = AnyBox::with_bytes(UNTYPED, &[1]).unwrap();

        dest.move_from(&mut src);
        assert!(!dest.has_value());
        assert_eq!(dest.size(), 3);
        assert_eq!(dest.tag(), TypeTag::new(2));
    }

    #[test]
    fn test_moved_from_is_reusable() {
        let mut src = AnyBox::with_value(UNTYPED, &1u32).unwrap();
        let mut dest = AnyBox::new(UNTYPED, 0).unwrap();
        dest.move_from(&mut src);

        src.set_value(TypeTag::new(1), &2u16).unwrap();
        assert_eq!(src.value::<u16>(), Some(2));
        assert_eq!(dest.value::<u32>(), Some(1));
    }

    #[test]
    fn test_swap() {
        let mut a = AnyBox::with_value(UNTYPED, &100i32).unwrap();
        let mut b = AnyBox::with_value(TypeTag::new(1), &2.5f64).unwrap();
        let (addr_a, addr_b) = (a.storage_addr(), b.storage_addr());

        a.swap(&mut b);
        assert_eq!(a.value::<f64>(), Some(2.5));
        assert_eq!(a.tag(), TypeTag::new(1));
        assert_eq!(b.value::<i32>(), Some(100));
        assert_eq!(a.storage_addr(), addr_b);
        assert_eq!(b.storage_addr(), addr_a);
    }

    #[test]
    fn test_swap_with_unset() {
        let mut a = AnyBox::with_value(UNTYPED, &7u8).unwrap();
        let mut b = AnyBox::new(UNTYPED, 2).unwrap();

        a.swap(&mut b);
        assert!(!a.has_value());
        assert_eq!(b.value::<u8>(), Some(7));
    }

    #[test]
    fn test_reset() {
        let mut a = AnyBox::with_value(TypeTag::new(4), &9u64).unwrap();
        a.reset();
        assert!(!a.has_value());
        assert!(!a.is_null());
        assert_eq!(a.size(), 0);
        assert_eq!(a.tag(), UNTYPED);
        assert_eq!(a.get(), None);

        a.set_value(UNTYPED, &1u8).unwrap();
        assert_eq!(a.value::<u8>(), Some(1));
    }

    #[test]
    fn test_reset_unset_keeps_buffer() {
        let mut a = AnyBox::new(TypeTag::new(4), 6).unwrap();
        a.reset();
        assert_eq!(a.size(), 6);
        assert_eq!(a.get(), Some(&[0u8; 6][..]));
    }

    #[test]
    fn test_null() {
        let null = AnyBox::null();
        assert!(null.is_null());
        assert!(!null.has_value());
        assert!(null.is_empty());
        assert_eq!(null.get(), None);
        assert_eq!(null.size(), 0);
        assert_eq!(null.tag(), UNTYPED);
        assert_eq!(null.value::<u8>(), None);
        assert!(!null.equals(null));
        assert_eq!(format!("{null:?}"), "AnyBox::Null");
    }

    #[test]
    fn test_null_is_identity_only() {
        let mut a = AnyBox::with_bytes(UNTYPED, &[1]).unwrap();
        a.reset();
        assert!(!a.is_null());

        let empty = AnyBox::new(UNTYPED, 0).unwrap();
        assert!(!empty.is_null());
        assert!(!empty.equals(AnyBox::null()));
        assert!(!AnyBox::null().equals(&empty));
    }

    #[test]
    fn test_equality() {
        let a = AnyBox::with_slice(TypeTag::new(1), &[1u16, 2, 3]).unwrap();
        let b = AnyBox::with_slice(TypeTag::new(1), &[1u16, 2, 3]).unwrap();
        let c = AnyBox::with_slice(TypeTag::new(2), &[1u16, 2, 3]).unwrap();
        let d = AnyBox::with_slice(TypeTag::new(1), &[1u16, 2, 4]).unwrap();
        let e = AnyBox::with_slice(TypeTag::new(1), &[1u16, 2]).unwrap();

        assert!(a.equals(&a));
        assert_eq!(a, b);
        assert_eq!(b, a);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_ne!(a, e);
    }

    #[test]
    fn test_equality_populated_state() {
        let unset = AnyBox::new(UNTYPED, 4).unwrap();
        let zeros = AnyBox::with_bytes(UNTYPED, &[0; 4]).unwrap();
        assert_ne!(unset, zeros);
        assert_eq!(unset, AnyBox::new(UNTYPED, 4).unwrap());
    }

    #[test]
    fn test_equality_across_allocators() {
        let counter = Counting::new();
        let a = AnyBox::with_bytes(UNTYPED, b"abc").unwrap();
        let b = AnyBox::with_bytes_in(UNTYPED, b"abc", counter).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_typed_roundtrips() {
        let a = AnyBox::with_value(UNTYPED, &-32768i16).unwrap();
        assert_eq!(a.value::<i16>(), Some(-32768));
        assert_eq!(a.value::<i32>(), None);

        let b = AnyBox::with_value(UNTYPED, &u64::MAX).unwrap();
        assert_eq!(b.value::<u64>(), Some(u64::MAX));

        let c = AnyBox::with_value(UNTYPED, &0.375f32).unwrap();
        assert_eq!(c.value::<f32>(), Some(0.375));
    }

    #[test]
    fn test_nested_array() {
        let grid = [[3.4f64, 5.6], [-6.5, -4.3]];
        let a = AnyBox::with_value(TypeTag::new(1), &grid).unwrap();
        assert_eq!(a.size(), 32);
        assert_eq!(a.value::<[[f64; 2]; 2]>(), Some(grid));
        assert_eq!(a.slice::<f64>(), Some(&[3.4, 5.6, -6.5, -4.3][..]));
        assert_eq!(a.slice::<[f64; 2]>().map(<[_]>::len), Some(2));
    }

    #[test]
    fn test_struct_payload() {
        #[derive(Debug, Clone, Copy, PartialEq)]
        #[repr(C)]
        struct Point {
            x: i32,
            y: i32,
        }
        // SAFETY: Two `i32`s, no padding
        unsafe impl Plain for Point {}

        let a = AnyBox::with_value(TypeTag::new(42), &Point { x: 1, y: -2 }).unwrap();
        assert_eq!(a.value::<Point>(), Some(Point { x: 1, y: -2 }));
        assert_eq!(a.tag(), TypeTag::new(42));
    }

    #[test]
    fn test_slice() {
        let mut a = AnyBox::new(UNTYPED, 0).unwrap();
        a.set_slice(UNTYPED, &[10i32, 20, 30]).unwrap();
        assert_eq!(a.size(), 12);
        assert_eq!(a.slice::<i32>(), Some(&[10, 20, 30][..]));
        assert_eq!(a.slice::<u64>(), None);
    }

    #[test]
    fn test_strings() {
        let mut a = AnyBox::with_str(UNTYPED, "Hello World").unwrap();
        assert_eq!(a.size(), 12);
        assert_eq!(a.get().and_then(|b| b.last()), Some(&0));
        assert_eq!(a.str_value(), Some("Hello World"));

        let copy = a.copy().unwrap();
        assert_eq!(copy.str_value(), Some("Hello World"));

        a.set_str(UNTYPED, "").unwrap();
        assert_eq!(a.str_value(), Some(""));
        assert_eq!(a.size(), 1);

        a.set(UNTYPED, b"no terminator").unwrap();
        assert_eq!(a.str_value(), None);
    }

    #[test]
    fn test_is_empty() {
        assert!(AnyBox::new(UNTYPED, 4).unwrap().is_empty());
        assert!(AnyBox::with_bytes(UNTYPED, &[]).unwrap().is_empty());
        assert!(!AnyBox::with_bytes(UNTYPED, &[0]).unwrap().is_empty());
    }

    #[test]
    fn test_set_failure_is_atomic() {
        let budget = Budget::new(1);
        let mut a = AnyBox::with_bytes_in(TypeTag::new(3), &[1, 2, 3, 4], budget.clone()).unwrap();

        let err = a.set(TypeTag::new(8), &[0; 4096]).unwrap_err();
        assert_eq!(err, AnyError::AllocationFailure { size: 4096 });
        assert_eq!(a.tag(), TypeTag::new(3));
        assert_eq!(a.get(), Some(&[1, 2, 3, 4][..]));
        assert!(a.has_value());

        budget.refill(1);
        a.set(TypeTag::new(8), &[0; 4096]).unwrap();
        assert_eq!(a.size(), 4096);
    }

    #[test]
    fn test_copy_failure() {
        let budget = Budget::new(1);
        let a = AnyBox::with_bytes_in(UNTYPED, &[1], budget).unwrap();
        assert_eq!(
            a.copy().unwrap_err(),
            AnyError::AllocationFailure { size: 1 }
        );
    }

    #[test]
    fn test_no_leaks() {
        let counter = Counting::new();
        {
            let mut a = AnyBox::new_in(UNTYPED, 4, counter.clone()).unwrap();
            let mut b = AnyBox::new_in(UNTYPED, 0, counter.clone()).unwrap();
            assert_eq!(counter.outstanding(), 2);

            for len in [4usize, 4096, 1] {
                a.set(UNTYPED, &vec![0xAB; len]).unwrap();
            }
            assert_eq!(a.get(), Some(&[0xAB][..]));
            assert_eq!(counter.outstanding(), 2);

            let c = a.copy().unwrap();
            assert_eq!(counter.outstanding(), 3);

            b.move_from(&mut a);
            assert_eq!(counter.outstanding(), 2);

            a.swap(&mut b);
            assert_eq!(counter.outstanding(), 2);

            c.destroy();
            assert_eq!(counter.outstanding(), 1);

            a.reset();
            assert_eq!(counter.outstanding(), 0);
        }
        assert!(counter.report().is_clean());
    }

    #[test]
    fn test_move_between_counters() {
        let first = Counting::new();
        let second = Counting::new();

        let mut src = AnyBox::with_bytes_in(UNTYPED, &[1, 2], first.clone()).unwrap();
        let mut dest = AnyBox::new_in(UNTYPED, 4, second.clone()).unwrap();

        dest.move_from(&mut src);
        assert_eq!(second.outstanding(), 0);
        assert_eq!(first.outstanding(), 1);

        drop(dest);
        assert_eq!(first.outstanding(), 0);
        drop(src);
        assert_eq!(first.outstanding(), 0);
    }

    #[test]
    fn test_debug() {
        let a = AnyBox::with_bytes(TypeTag::new(3), &[1, 2]).unwrap();
        assert_eq!(
            format!("{a:?}"),
            "AnyBox { tag: TypeTag(3), len: 2, value: [1, 2] }"
        );

        let b = AnyBox::new(UNTYPED, 1).unwrap();
        assert_eq!(
            format!("{b:?}"),
            "AnyBox { tag: TypeTag::UNTYPED, len: 1, value: <none> }"
        );
    }

    mod properties {
        use super::*;
        use proptest::collection::vec;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn set_then_get_roundtrips(
                tag in any::<u64>(),
                initial in 0usize..64,
                payload in vec(any::<u8>(), 0..512),
            ) {
                let mut a = AnyBox::new(TypeTag::new(tag), initial).unwrap();
                a.set(TypeTag::new(tag), &payload).unwrap();
                prop_assert_eq!(a.get(), Some(&payload[..]));
                prop_assert_eq!(a.tag(), TypeTag::new(tag));
                prop_assert_eq!(a.size(), payload.len());
                prop_assert!(a.has_value());
            }

            #[test]
            fn resizes_never_leak(lens in vec(0usize..2048, 1..16)) {
                let counter = Counting::new();
                let mut a = AnyBox::new_in(UNTYPED, 0, counter.clone()).unwrap();
                for (i, &len) in lens.iter().enumerate() {
                    let payload = vec![i as u8; len];
                    a.set(UNTYPED, &payload).unwrap();
                    prop_assert_eq!(a.get(), Some(&payload[..]));
                    prop_assert_eq!(counter.outstanding(), 1);
                }
                drop(a);
                prop_assert!(counter.report().is_clean());
            }

            #[test]
            fn copies_are_independent(
                original in vec(any::<u8>(), 0..128),
                replacement in vec(any::<u8>(), 0..128),
            ) {
                let mut a = AnyBox::with_bytes(UNTYPED, &original).unwrap();
                let mut b = a.copy().unwrap();
                b.set(UNTYPED, &replacement).unwrap();
                prop_assert_eq!(a.get(), Some(&original[..]));

                a.set(TypeTag::new(1), &[0xFF]).unwrap();
                prop_assert_eq!(b.get(), Some(&replacement[..]));
            }

            #[test]
            fn move_empties_source(tag in any::<u64>(), payload in vec(any::<u8>(), 0..128)) {
                let mut src = AnyBox::with_bytes(TypeTag::new(tag), &payload).unwrap();
                let before = src.copy().unwrap();
                let mut dest = AnyBox::new(UNTYPED, 3).unwrap();

                dest.move_from(&mut src);
                prop_assert!(!src.has_value());
                prop_assert_eq!(&dest, &before);
            }

            #[test]
            fn swap_is_involutive(
                a_bytes in vec(any::<u8>(), 0..64),
                b_bytes in vec(any::<u8>(), 0..64),
            ) {
                let mut a = AnyBox::with_bytes(TypeTag::new(1), &a_bytes).unwrap();
                let mut b = AnyBox::with_bytes(TypeTag::new(2), &b_bytes).unwrap();
                let (a0, b0) = (a.copy().unwrap(), b.copy().unwrap());

                a.swap(&mut b);
                prop_assert_eq!(&a, &b0);
                prop_assert_eq!(&b, &a0);

                a.swap(&mut b);
                prop_assert_eq!(&a, &a0);
                prop_assert_eq!(&b, &b0);
            }

            #[test]
            fn equality_is_bitwise(
                payload in vec(any::<u8>(), 1..128),
                index in any::<prop::sample::Index>(),
                flip in 1u8..=255,
            ) {
                let a = AnyBox::with_bytes(UNTYPED, &payload).unwrap();
                let b = AnyBox::with_bytes(UNTYPED, &payload).unwrap();
                prop_assert!(a.equals(&a));
                prop_assert!(a.equals(&b));
                prop_assert_eq!(a.equals(&b), b.equals(&a));

                let mut changed = payload.clone();
                changed[index.index(payload.len())] ^= flip;
                let c = AnyBox::with_bytes(UNTYPED, &changed).unwrap();
                prop_assert!(!a.equals(&c));
                prop_assert!(!c.equals(&a));
            }
        }
    }
}

//! A type-erased value box that stores bytes, not types.
//!
//! ## What is an `AnyBox`?
//!
//! An [`AnyBox`] is one heap buffer plus a little bookkeeping: the buffer's length, an opaque
//! [`TypeTag`] chosen by the caller, and whether a value has actually been written. It can hold a
//! scalar, a struct, an array or a string, because all it ever sees is a run of bytes. It never
//! interprets them: equality compares bytes, copying copies bytes, and the tag is only carried
//! along.
//!
//! ## Ownership
//!
//! Each box owns at most one buffer, and there's no sharing or reference counting.
//!
//! - [`AnyBox::set`] reuses the buffer when the length matches and resizes it otherwise.
//! - [`AnyBox::copy`] allocates a new, independent buffer.
//! - [`AnyBox::move_from`] hands a buffer from one box to another without copying, leaving the
//!   source empty.
//! - [`AnyBox::swap`] exchanges buffers without allocating.
//! - [`AnyBox::reset`], [`AnyBox::destroy`] and drop free it.
//!
//! Being allocated and holding a value are different things. [`AnyBox::new`] allocates a zeroed
//! buffer, but [`AnyBox::has_value`] stays `false` until something is written.
//!
//! ## The null box
//!
//! [`AnyBox::null`] is a single immutable sentinel. Queries on it return neutral answers and it
//! compares equal to nothing. Only that one instance is null: a box that was reset or moved out of
//! has no storage either, but it is still a live box that can be written to again.
//!
//! ## Examples
//!
//! ```
//! use anybox::any::{AnyBox, TypeTag};
//!
//! let mut original = AnyBox::new(TypeTag::UNTYPED, 4).unwrap();
//! assert!(!original.has_value());
//!
//! original.set(TypeTag::UNTYPED, &[0x2A, 0, 0, 0]).unwrap();
//! assert_eq!(original.value::<u32>(), Some(u32::from_ne_bytes([0x2A, 0, 0, 0])));
//!
//! // Copies are independent, and equality is bitwise
//! let mut copy = original.copy().unwrap();
//! assert_eq!(original, copy);
//! copy.set_value(TypeTag::UNTYPED, &1.5f64).unwrap();
//! assert_ne!(original, copy);
//! assert_eq!((original.size(), copy.size()), (4, 8));
//!
//! // Moving transfers the buffer and empties the source
//! let mut dest = AnyBox::new(TypeTag::UNTYPED, 0).unwrap();
//! dest.move_from(&mut copy);
//! assert!(!copy.has_value());
//! assert_eq!(dest.value::<f64>(), Some(1.5));
//!
//! // Tags are yours to define
//! const GREETING: TypeTag = TypeTag::new(7);
//! let s = AnyBox::with_str(GREETING, "Hello").unwrap();
//! assert_eq!(s.tag(), GREETING);
//! assert_eq!(s.str_value(), Some("Hello"));
//!
//! assert!(AnyBox::null().is_null());
//! assert!(!AnyBox::null().has_value());
//! ```

pub mod heap;
mod plain;
pub mod raw;
mod tag;

pub use heap::AnyBox;
pub use plain::Plain;
pub use raw::RawAny;
pub use tag::TypeTag;

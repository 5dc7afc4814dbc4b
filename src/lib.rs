//! A type-erased value box: one heap buffer of raw bytes, an opaque type tag, and strict
//! single-owner rules for copying, moving and swapping it.
//!
//! ## Examples
//!
//! For more detailed examples, see the [`any`] module documentation.
//!
//! ```
//! use anybox::any::{AnyBox, TypeTag};
//!
//! let mut a = AnyBox::with_value(TypeTag::UNTYPED, &10i32).unwrap();
//! let mut b = AnyBox::with_value(TypeTag::new(1), &2.5f64).unwrap();
//!
//! a.swap(&mut b);
//! assert_eq!(a.value::<f64>(), Some(2.5));
//! assert_eq!(b.value::<i32>(), Some(10));
//! assert_eq!(a.tag(), TypeTag::new(1));
//! ```
//!

#![warn(
    missing_docs,
    elided_lifetimes_in_paths,
    explicit_outlives_requirements,
    missing_abi,
    noop_method_call,
    semicolon_in_expressions_from_macros,
    unused_import_braces,
    unused_lifetimes,
    unsafe_op_in_unsafe_fn,
    clippy::cargo,
    clippy::missing_panics_doc,
    clippy::doc_markdown,
    clippy::ptr_as_ptr,
    clippy::cloned_instead_of_copied,
    clippy::unreadable_literal,
    clippy::undocumented_unsafe_blocks,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap
)]

pub mod allocator;
pub mod any;
pub mod error;
mod utils;

pub use error::AnyError;

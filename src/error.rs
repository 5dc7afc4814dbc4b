//! Errors reported by [`AnyBox`](crate::any::AnyBox) operations.

use thiserror::Error;

/// Failure of a fallible box operation. A box that reports one of these is left exactly as it was
/// before the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AnyError {
    /// The allocator could not provide a buffer of the requested size.
    #[error("failed to allocate {size} bytes")]
    AllocationFailure {
        /// Requested buffer length in bytes
        size: usize,
    },
    /// The operation needs a live box but was handed the null sentinel.
    #[error("operation requires a live box, got the null box")]
    NullOperand,
    /// The box was allocated but never assigned, so there is nothing to copy.
    #[error("box holds no value")]
    NoValue,
}

impl AnyError {
    /// Whether this error belongs to the invalid-operand class, as opposed to an allocation
    /// failure.
    #[must_use]
    pub fn is_invalid_operand(self) -> bool {
        matches!(self, AnyError::NullOperand | AnyError::NoValue)
    }
}

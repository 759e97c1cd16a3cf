//! Error types for emission.

use qlin_ir::{BitRef, QubitRef};
use thiserror::Error;

/// Errors that can occur while emitting instructions.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EmitError {
    /// An instruction names a qubit the register map does not cover.
    #[error("Qubit {0} has no register index")]
    UnmappedQubit(QubitRef),

    /// An instruction names a bit the register map does not cover.
    #[error("Bit {0} has no register index")]
    UnmappedBit(BitRef),
}

/// Result type for emission.
pub type EmitResult<T> = Result<T, EmitError>;

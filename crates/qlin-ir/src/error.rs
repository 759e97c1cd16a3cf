//! Error types for the IR crate.

use crate::qubit::QubitRef;
use thiserror::Error;

/// Errors raised when constructing IR values that violate their invariants.
///
/// These are internal consistency failures; defects in user programs are
/// reported as [`Diagnostic`](crate::diagnostic::Diagnostic)s instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// Gate requires a different number of qubits.
    #[error("Gate '{gate_name}' requires {expected} qubits, got {got}")]
    QubitCountMismatch {
        /// Name of the gate.
        gate_name: String,
        /// Expected number of qubits.
        expected: usize,
        /// Actual number of qubits provided.
        got: usize,
    },

    /// Duplicate qubit in operation.
    #[error("Duplicate qubit {qubit} in operation (gate: {gate_name})")]
    DuplicateQubit {
        /// The duplicate qubit.
        qubit: QubitRef,
        /// Gate name for context.
        gate_name: String,
    },

    /// Malformed serialized tree.
    #[error("Invalid program JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;

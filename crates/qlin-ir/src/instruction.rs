//! Target instructions produced by lowering.

use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::gate::GateSpec;
use crate::qubit::{BitRef, QubitRef};
use crate::span::Span;

/// A gate applied to an ordered list of qubits (controls first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateApplication {
    /// The catalog entry.
    pub gate: GateSpec,
    /// Operands; length equals `gate.arity()`.
    pub qubits: Vec<QubitRef>,
    /// Source position of the gate call.
    pub span: Span,
}

impl GateApplication {
    /// Create a gate application.
    pub fn new(gate: GateSpec, qubits: impl IntoIterator<Item = QubitRef>, span: Span) -> Self {
        Self {
            gate,
            qubits: qubits.into_iter().collect(),
            span,
        }
    }

    /// Create a gate application, checking arity and operand distinctness.
    pub fn try_new(
        gate: GateSpec,
        qubits: impl IntoIterator<Item = QubitRef>,
        span: Span,
    ) -> IrResult<Self> {
        let app = Self::new(gate, qubits, span);
        if app.qubits.len() != gate.arity() {
            return Err(IrError::QubitCountMismatch {
                gate_name: gate.name().to_string(),
                expected: gate.arity(),
                got: app.qubits.len(),
            });
        }
        for (i, qubit) in app.qubits.iter().enumerate() {
            if app.qubits[..i].contains(qubit) {
                return Err(IrError::DuplicateQubit {
                    qubit: *qubit,
                    gate_name: gate.name().to_string(),
                });
            }
        }
        Ok(app)
    }

    /// The target qubit (last operand).
    pub fn target(&self) -> Option<QubitRef> {
        self.qubits.last().copied()
    }
}

/// One target instruction. Sequences are kept in program order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// Unconditional gate.
    Gate(GateApplication),
    /// Measure `qubit` into `bit`.
    Measure {
        /// Measured qubit.
        qubit: QubitRef,
        /// Destination bit.
        bit: BitRef,
        /// Source position of the measurement.
        span: Span,
    },
    /// Gate applied only when `condition` holds 1.
    ConditionalGate {
        /// Classical condition.
        condition: BitRef,
        /// The guarded gate.
        application: GateApplication,
    },
}

impl Instruction {
    /// Create a measurement.
    pub fn measure(qubit: QubitRef, bit: BitRef, span: Span) -> Self {
        Instruction::Measure { qubit, bit, span }
    }

    /// Create a conditional gate.
    pub fn conditional(condition: BitRef, application: GateApplication) -> Self {
        Instruction::ConditionalGate {
            condition,
            application,
        }
    }

    /// Check if this is a measurement.
    pub fn is_measure(&self) -> bool {
        matches!(self, Instruction::Measure { .. })
    }

    /// Check if this is a gate (conditional or not).
    pub fn is_gate(&self) -> bool {
        !self.is_measure()
    }

    /// The gate application, if any.
    pub fn as_gate(&self) -> Option<&GateApplication> {
        match self {
            Instruction::Gate(app) | Instruction::ConditionalGate { application: app, .. } => {
                Some(app)
            }
            Instruction::Measure { .. } => None,
        }
    }

    /// Qubits touched by this instruction, in operand order.
    pub fn qubits(&self) -> Vec<QubitRef> {
        match self {
            Instruction::Gate(app) | Instruction::ConditionalGate { application: app, .. } => {
                app.qubits.clone()
            }
            Instruction::Measure { qubit, .. } => vec![*qubit],
        }
    }

    /// Classical bits touched by this instruction.
    pub fn bits(&self) -> Vec<BitRef> {
        match self {
            Instruction::Gate(_) => vec![],
            Instruction::Measure { bit, .. } => vec![*bit],
            Instruction::ConditionalGate { condition, .. } => vec![*condition],
        }
    }

    /// Source position of the originating operation.
    pub fn span(&self) -> Span {
        match self {
            Instruction::Gate(app) | Instruction::ConditionalGate { application: app, .. } => {
                app.span
            }
            Instruction::Measure { span, .. } => *span,
        }
    }

    /// Short name used in logs and tests.
    pub fn name(&self) -> &'static str {
        match self {
            Instruction::Gate(app) | Instruction::ConditionalGate { application: app, .. } => {
                app.gate.name()
            }
            Instruction::Measure { .. } => "measure",
        }
    }
}

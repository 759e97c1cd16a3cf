//! Diagnostics accumulated by the checking and lowering stages.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::span::Span;

/// What went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    // Linearity and no-cloning
    /// A qubit binding was initialized from something other than a fresh literal.
    IllegalQubitSource,
    /// Re-assignment of an initialized qubit binding.
    ImmutableQubitBinding,
    /// A qubit was passed by value.
    QubitMustBeByReference,
    /// A qubit reference was dereferenced.
    IllegalDereference,
    /// Gate or second measurement on a measured qubit.
    GateOnMeasuredQubit,
    /// Gate or measurement on a qubit that was never initialized.
    UninitializedQubit,
    /// The same qubit appears twice in one operation.
    AliasedQubitOperands,
    /// A user type carries a qubit.
    QubitInUserType,

    // Gate catalog
    /// Reference count does not match the gate's arity.
    ArityMismatch,
    /// The gate is not in the catalog.
    UnknownGate,

    // Names and classical typing
    /// Identifier not in scope.
    UnknownName,
    /// Called function not declared.
    UnknownFunction,
    /// Call argument count does not match the declaration.
    ArgumentCountMismatch,
    /// Classical type error.
    TypeMismatch,
    /// Re-assignment of an immutable classical binding.
    ImmutableBinding,

    // Tree shape
    /// Two nodes of the tree share an id.
    DuplicateNodeId,

    // Lowering
    /// Control flow the target's flat conditional form cannot express.
    UnsupportedControlFlow,
}

impl DiagnosticKind {
    /// Stable identifier for the kind.
    pub fn code(self) -> &'static str {
        match self {
            DiagnosticKind::IllegalQubitSource => "illegal-qubit-source",
            DiagnosticKind::ImmutableQubitBinding => "immutable-qubit-binding",
            DiagnosticKind::QubitMustBeByReference => "qubit-must-be-by-reference",
            DiagnosticKind::IllegalDereference => "illegal-dereference",
            DiagnosticKind::GateOnMeasuredQubit => "gate-on-measured-qubit",
            DiagnosticKind::UninitializedQubit => "uninitialized-qubit",
            DiagnosticKind::AliasedQubitOperands => "aliased-qubit-operands",
            DiagnosticKind::QubitInUserType => "qubit-in-user-type",
            DiagnosticKind::ArityMismatch => "arity-mismatch",
            DiagnosticKind::UnknownGate => "unknown-gate",
            DiagnosticKind::UnknownName => "unknown-name",
            DiagnosticKind::UnknownFunction => "unknown-function",
            DiagnosticKind::ArgumentCountMismatch => "argument-count-mismatch",
            DiagnosticKind::TypeMismatch => "type-mismatch",
            DiagnosticKind::ImmutableBinding => "immutable-binding",
            DiagnosticKind::DuplicateNodeId => "duplicate-node-id",
            DiagnosticKind::UnsupportedControlFlow => "unsupported-control-flow",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One reported defect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The kind of defect.
    pub kind: DiagnosticKind,
    /// Where it was found.
    pub span: Span,
    /// Human-readable explanation.
    pub message: String,
}

impl Diagnostic {
    /// Create a diagnostic.
    pub fn new(kind: DiagnosticKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: [{}] {}", self.span, self.kind, self.message)
    }
}

/// Ordered collection of diagnostics from one stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    /// Shorthand for `push(Diagnostic::new(..))`.
    pub fn report(&mut self, kind: DiagnosticKind, span: Span, message: impl Into<String>) {
        self.push(Diagnostic::new(kind, span, message));
    }

    pub fn extend(&mut self, iter: impl IntoIterator<Item = Diagnostic>) {
        self.0.extend(iter);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }

    /// Number of diagnostics of the given kind.
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.0.iter().filter(|d| d.kind == kind).count()
    }

    /// Kinds in report order.
    pub fn kinds(&self) -> Vec<DiagnosticKind> {
        self.0.iter().map(|d| d.kind).collect()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

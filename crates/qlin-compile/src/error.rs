//! Error types for the compilation pipeline.

use qlin_emit::EmitError;
use qlin_ir::{Diagnostics, IrError};
use thiserror::Error;

/// Errors that stop the pipeline.
///
/// Defects in the user program arrive as a whole [`Diagnostics`] list from
/// the stage that found them; the other variants are configuration or
/// internal failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompileError {
    /// The resource checker rejected the program.
    #[error("Resource check failed with {n} diagnostic(s):\n{0}", n = .0.len())]
    Check(Diagnostics),

    /// Lowering rejected the program.
    #[error("Lowering failed with {n} diagnostic(s):\n{0}", n = .0.len())]
    Lower(Diagnostics),

    /// An IR value violated its invariants.
    #[error("IR error: {0}")]
    Ir(#[from] IrError),

    /// Emission failed.
    #[error("Emission error: {0}")]
    Emit(#[from] EmitError),

    /// Options JSON could not be parsed.
    #[error("Invalid options JSON: {0}")]
    OptionsJson(#[from] serde_json::Error),

    /// Options YAML could not be parsed.
    #[error("Invalid options YAML: {0}")]
    OptionsYaml(#[from] serde_yaml_ng::Error),

    /// Annotations and tree disagree.
    #[error("Internal compiler error: {0}")]
    Internal(String),
}

impl CompileError {
    /// The diagnostics carried by a rejected program, if any.
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            CompileError::Check(d) | CompileError::Lower(d) => Some(d),
            _ => None,
        }
    }
}

/// Result type for compilation operations.
pub type CompileResult<T> = Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;
    use qlin_ir::{DiagnosticKind, Span};

    #[test]
    fn test_diagnostic_errors_display_count_and_list() {
        let mut diags = Diagnostics::new();
        diags.report(DiagnosticKind::ArityMismatch, Span::new(2, 1), "cx needs 2 qubits");
        diags.report(DiagnosticKind::UnknownGate, Span::new(3, 1), "no gate `ry`");

        let check = CompileError::Check(diags.clone()).to_string();
        assert!(check.starts_with("Resource check failed with 2 diagnostic(s):\n"));
        assert!(check.contains("arity-mismatch"));
        assert!(check.contains("unknown-gate"));

        let lower = CompileError::Lower(diags).to_string();
        assert!(lower.starts_with("Lowering failed with 2 diagnostic(s):\n"));
    }

    #[test]
    fn test_from_conversions() {
        let json = serde_json::from_str::<u8>("x").unwrap_err();
        let err: CompileError = json.into();
        assert!(matches!(err, CompileError::OptionsJson(_)));
        assert!(err.diagnostics().is_none());
    }
}

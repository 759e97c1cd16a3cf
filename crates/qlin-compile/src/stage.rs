//! Stage trait for the compilation pipeline.

use qlin_emit::{OutputFormat, RegisterMap, emit};
use qlin_ir::Program;

use crate::checker::{AnnotatedProgram, ResourceChecker};
use crate::error::{CompileError, CompileResult};
use crate::lower::{Lowerer, LoweredProgram};

/// One step of the pipeline.
///
/// Stages are the unit of compilation in Qlin. Each consumes the output of
/// the previous one and either produces its own output or stops the
/// pipeline with an error.
pub trait Stage<Input>: Send + Sync {
    /// What the stage produces.
    type Output;

    /// Get the name of this stage.
    fn name(&self) -> &'static str;

    /// Run the stage.
    fn run(&self, input: Input) -> CompileResult<Self::Output>;
}

impl<'p> Stage<&'p Program> for ResourceChecker {
    type Output = AnnotatedProgram<'p>;

    fn name(&self) -> &'static str {
        "resource-check"
    }

    fn run(&self, program: &'p Program) -> CompileResult<Self::Output> {
        self.check(program).map_err(CompileError::Check)
    }
}

impl<'a, 'p> Stage<&'a AnnotatedProgram<'p>> for Lowerer {
    type Output = LoweredProgram;

    fn name(&self) -> &'static str {
        "lower"
    }

    fn run(&self, annotated: &'a AnnotatedProgram<'p>) -> CompileResult<Self::Output> {
        self.lower(annotated)
    }
}

/// Register allocation followed by text emission.
#[derive(Debug, Clone, Copy, Default)]
pub struct Emission {
    pub format: OutputFormat,
    /// Precede register declarations with the source binding of each qubit.
    pub annotate_registers: bool,
}

/// Output of [`Emission`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emitted {
    pub registers: RegisterMap,
    pub text: String,
}

impl<'a> Stage<&'a LoweredProgram> for Emission {
    type Output = Emitted;

    fn name(&self) -> &'static str {
        "emit"
    }

    fn run(&self, lowered: &'a LoweredProgram) -> CompileResult<Self::Output> {
        let registers = RegisterMap::allocate(&lowered.instructions);
        let origins = self.annotate_registers.then_some(lowered.qubits.as_slice());
        let text = emit(self.format, &lowered.instructions, &registers, origins)?;
        Ok(Emitted { registers, text })
    }
}

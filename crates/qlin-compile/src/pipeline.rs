//! Pipeline orchestrating the compilation stages.

use tracing::{debug, info, instrument};

use qlin_emit::RegisterMap;
use qlin_ir::{Instruction, Origin, Program};

use crate::checker::{AnnotatedProgram, ResourceChecker};
use crate::error::CompileResult;
use crate::lower::{Lowerer, LoweredProgram};
use crate::options::CompileOptions;
use crate::stage::{Emission, Emitted, Stage};

/// Everything a successful compilation produces.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledProgram {
    /// Instructions in program order.
    pub instructions: Vec<Instruction>,
    /// Source binding of each allocated qubit, indexed by `QubitRef`.
    pub qubits: Vec<Origin>,
    /// Source of each measurement result, indexed by `BitRef`.
    pub bits: Vec<Origin>,
    /// Register indices used by the emitted text.
    pub registers: RegisterMap,
    /// The emitted program.
    pub text: String,
}

/// Runs resource checking, lowering and emission in order.
///
/// Each stage runs only if the previous one produced no diagnostics; the
/// first failing stage's error is returned as is.
#[derive(Debug, Clone)]
pub struct Pipeline {
    options: CompileOptions,
    checker: ResourceChecker,
    lowerer: Lowerer,
    emission: Emission,
}

impl Pipeline {
    /// Create a pipeline with the given options.
    pub fn new(options: CompileOptions) -> Self {
        Self {
            checker: ResourceChecker::new(),
            lowerer: Lowerer::new(options.max_inline_depth),
            emission: Emission {
                format: options.format,
                annotate_registers: options.annotate_registers,
            },
            options,
        }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compile a program to target text.
    #[instrument(skip_all, fields(format = %self.options.format))]
    pub fn run(&self, program: &Program) -> CompileResult<CompiledProgram> {
        info!(
            "Running pipeline on program with {} function(s) and {} statement(s)",
            program.functions.len(),
            program.body.len()
        );

        let annotated = run_stage(&self.checker, program)?;
        let lowered = run_stage(&self.lowerer, &annotated)?;
        let Emitted { registers, text } = run_stage(&self.emission, &lowered)?;

        info!(
            "Pipeline completed: {} instruction(s), {} qubit register(s), {} bit register(s)",
            lowered.instructions.len(),
            registers.num_qubits(),
            registers.num_bits()
        );

        let LoweredProgram {
            instructions,
            qubits,
            bits,
        } = lowered;
        Ok(CompiledProgram {
            instructions,
            qubits,
            bits,
            registers,
            text,
        })
    }

    /// Run only the resource checker.
    pub fn check<'p>(&self, program: &'p Program) -> CompileResult<AnnotatedProgram<'p>> {
        run_stage(&self.checker, program)
    }

    /// Run the checker and lowering, without emitting text.
    pub fn lower(&self, program: &Program) -> CompileResult<LoweredProgram> {
        let annotated = run_stage(&self.checker, program)?;
        run_stage(&self.lowerer, &annotated)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(CompileOptions::default())
    }
}

fn run_stage<I, S: Stage<I>>(stage: &S, input: I) -> CompileResult<S::Output> {
    debug!("Running stage: {}", stage.name());
    let output = stage.run(input);
    match &output {
        Ok(_) => debug!("Stage {} completed", stage.name()),
        Err(e) => debug!("Stage {} failed: {e}", stage.name()),
    }
    output
}

/// Compile `program` with the given options.
///
/// Shorthand for `Pipeline::new(options).run(program)`.
pub fn compile(program: &Program, options: CompileOptions) -> CompileResult<CompiledProgram> {
    Pipeline::new(options).run(program)
}

//! Qlin Compiler
//!
//! This crate checks Qlin programs against the linear resource rules for
//! qubits and lowers accepted programs to flat target instructions.
//!
//! # Stages
//!
//! | Stage | Input | Output |
//! |-------|-------|--------|
//! | [`ResourceChecker`] | [`Program`](qlin_ir::Program) | [`AnnotatedProgram`] |
//! | [`Lowerer`] | [`AnnotatedProgram`] | [`LoweredProgram`] |
//! | [`Emission`] | [`LoweredProgram`] | target text and [`RegisterMap`](qlin_emit::RegisterMap) |
//!
//! Each stage reports every defect it finds as a
//! [`Diagnostic`](qlin_ir::Diagnostic); a stage with diagnostics stops the
//! pipeline.
//!
//! # Resource Rules
//!
//! - A qubit binding is created only from a fresh literal (`0q0`, `0q1`).
//! - Qubits are passed to gates and functions only by reference.
//! - Qubit references are never dereferenced.
//! - A qubit moves `Uninitialized -> Live -> Measured` and never back; no
//!   gate or second measurement follows a measurement.
//!
//! # Example
//!
//! ```rust
//! use qlin_compile::{CompileOptions, Pipeline};
//! use qlin_ir::{Expr, ProgramBuilder, QubitLiteral, Stmt};
//!
//! let program = ProgramBuilder::new()
//!     .stmt(Stmt::val("q", Expr::qubit(QubitLiteral::Zero)))
//!     .stmt(Stmt::expr(Expr::gate("had", vec![Expr::ref_var("q")])))
//!     .stmt(Stmt::val("m", Expr::measure(Expr::ref_var("q"))))
//!     .build();
//!
//! let compiled = Pipeline::new(CompileOptions::default()).run(&program).unwrap();
//! assert_eq!(compiled.text, "HAD 0\nMEASURE 0 0\n");
//! ```

pub mod checker;
pub mod env;
pub mod error;
pub mod linearity;
pub mod lower;
pub mod options;
pub mod pipeline;
pub mod stage;

pub use checker::{
    AnnotatedProgram, FunctionSummary, ParamEffect, ParamSummary, ResourceAnnotations,
    ResourceChecker,
};
pub use env::{Binding, BindingId, FunctionSig, QubitHandle, TypeEnv};
pub use error::{CompileError, CompileResult};
pub use linearity::{
    LinearityEvent, LinearityTracker, QubitSlot, QubitState, Transition, transition,
};
pub use lower::{DEFAULT_MAX_INLINE_DEPTH, Lowerer, LoweredProgram};
pub use options::CompileOptions;
pub use pipeline::{CompiledProgram, Pipeline, compile};
pub use stage::{Emission, Emitted, Stage};

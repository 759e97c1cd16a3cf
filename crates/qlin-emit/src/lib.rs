//! Instruction Emission for Qlin
//!
//! Turns the flat instruction sequence produced by lowering into target
//! text. Register allocation happens first: every qubit an instruction
//! touches gets a dense index in order of first use, and every measurement
//! result a classical-register slot in order of first appearance.
//!
//! # Formats
//!
//! | Format | Gate | Measurement | Conditional |
//! |--------|------|-------------|-------------|
//! | [`OutputFormat::Flat`] | `CX 0 1` | `MEASURE 2 0` | `PZ 0 IF 0` |
//! | [`OutputFormat::OpenQasm3`] | `cx q[0], q[1];` | `c[0] = measure q[2];` | `if (c[0]) z q[0];` |
//!
//! # Example
//!
//! ```rust
//! use qlin_emit::{emit, OutputFormat, RegisterMap};
//! use qlin_ir::{BaseGate, BitRef, GateApplication, GateSpec, Instruction, QubitRef, Span};
//!
//! let instructions = vec![
//!     Instruction::Gate(GateApplication::new(
//!         GateSpec::single(BaseGate::Had),
//!         [QubitRef(0)],
//!         Span::default(),
//!     )),
//!     Instruction::measure(QubitRef(0), BitRef(0), Span::default()),
//! ];
//! let registers = RegisterMap::allocate(&instructions);
//! let qasm = emit(OutputFormat::OpenQasm3, &instructions, &registers, None).unwrap();
//! assert!(qasm.contains("c[0] = measure q[0];"));
//! ```

pub mod alloc;
pub mod emitter;
pub mod error;

pub use alloc::RegisterMap;
pub use emitter::{OutputFormat, emit, emit_flat, emit_qasm3};
pub use error::{EmitError, EmitResult};

//! Qlin Intermediate Representation
//!
//! This crate holds the data shared by every stage of the Qlin compiler:
//! the scope-resolved syntax tree handed over by a front end, the declared
//! [`Type`]s, the closed [`GateCatalog`], the [`Instruction`]s produced by
//! lowering, and the [`Diagnostic`]s every stage reports through.
//!
//! # Pipeline
//!
//! ```text
//! Program (ast) ──► resource checker ──► lowering ──► Vec<Instruction> ──► emitter
//!                         │                  │
//!                         └── Diagnostics ───┘
//! ```
//!
//! # Example: Building a Bell pair program
//!
//! ```rust
//! use qlin_ir::ast::{Expr, ProgramBuilder, QubitLiteral, Stmt};
//! use qlin_ir::GateCatalog;
//!
//! let program = ProgramBuilder::new()
//!     .stmt(Stmt::val("a", Expr::qubit(QubitLiteral::Zero)))
//!     .stmt(Stmt::val("b", Expr::qubit(QubitLiteral::Zero)))
//!     .stmt(Stmt::expr(Expr::gate("had", vec![Expr::ref_var("a")])))
//!     .stmt(Stmt::expr(Expr::gate(
//!         "cx",
//!         vec![Expr::ref_var("a"), Expr::ref_var("b")],
//!     )))
//!     .build();
//!
//! assert_eq!(program.body.len(), 4);
//! assert_eq!(GateCatalog::lookup("cx").unwrap().arity(), 2);
//! ```
//!
//! # Gate Catalog
//!
//! | Gate | Qubits | Description |
//! |------|--------|-------------|
//! | `had` | 1 | Hadamard |
//! | `px` | 1 | Pauli-X |
//! | `pz` | 1 | Pauli-Z |
//! | `chad` | 2 | Controlled Hadamard |
//! | `cx` (`cpx`) | 2 | Controlled Pauli-X |
//! | `cpz` | 2 | Controlled Pauli-Z |

pub mod ast;
pub mod diagnostic;
pub mod error;
pub mod gate;
pub mod instruction;
pub mod qubit;
pub mod span;
pub mod types;

pub use ast::{
    BinOp, Expr, ExprKind, Function, NodeId, Param, Program, ProgramBuilder, QubitLiteral, Stmt,
    StmtKind,
};
pub use diagnostic::{Diagnostic, DiagnosticKind, Diagnostics};
pub use error::{IrError, IrResult};
pub use gate::{BaseGate, GateCatalog, GateSpec, OperandRole};
pub use instruction::{GateApplication, Instruction};
pub use qubit::{BitRef, Origin, QubitRef};
pub use span::Span;
pub use types::{Mutability, Type};

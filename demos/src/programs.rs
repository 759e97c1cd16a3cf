//! Demonstration programs.
//!
//! Each constructor returns a scope-resolved [`Program`] built with
//! [`ProgramBuilder`], the same form a front end hands to the compiler.

use std::fmt;

use clap::ValueEnum;
use qlin_ir::{Expr, Function, Param, Program, ProgramBuilder, QubitLiteral, Stmt, Type};

/// `Quant.<name>(ref a, ref b, ...)` on local qubits.
fn gate(name: &str, qubits: &[&str]) -> Stmt {
    Stmt::expr(Expr::gate(
        name,
        qubits.iter().map(|q| Expr::ref_var(*q)).collect(),
    ))
}

fn qubit(name: &str, literal: QubitLiteral) -> Stmt {
    Stmt::val(name, Expr::qubit(literal))
}

fn measure(bit: &str, qubit: &str) -> Stmt {
    Stmt::val(bit, Expr::measure(Expr::ref_var(qubit)))
}

/// Teleport the state of `source` (prepared as `0q1`) onto `destination`.
///
/// The two classical corrections are single gates guarded by measurement
/// results, which is exactly what the flat target can express.
pub fn teleport() -> Program {
    ProgramBuilder::new()
        .stmt(qubit("source", QubitLiteral::One))
        .stmt(qubit("destination", QubitLiteral::Zero))
        .stmt(qubit("ancilla", QubitLiteral::Zero))
        .stmt(gate("had", &["destination"]))
        .stmt(gate("cx", &["destination", "ancilla"]))
        .stmt(gate("cx", &["source", "ancilla"]))
        .stmt(gate("had", &["source"]))
        .stmt(measure("b0", "source"))
        .stmt(measure("b1", "ancilla"))
        .stmt(Stmt::if_then(Expr::var("b0"), vec![gate("pz", &["destination"])]))
        .stmt(Stmt::if_then(Expr::var("b1"), vec![gate("px", &["destination"])]))
        .stmt(measure("result", "destination"))
        .build()
}

/// Prepare and measure a Bell pair.
pub fn bell() -> Program {
    ProgramBuilder::new()
        .stmt(qubit("a", QubitLiteral::Zero))
        .stmt(qubit("b", QubitLiteral::Zero))
        .stmt(gate("had", &["a"]))
        .stmt(gate("cx", &["a", "b"]))
        .stmt(measure("ma", "a"))
        .stmt(measure("mb", "b"))
        .build()
}

/// Prepare and measure an `n`-qubit GHZ state.
pub fn ghz(n: usize) -> Program {
    let names: Vec<String> = (0..n).map(|i| format!("q{i}")).collect();

    let mut builder = ProgramBuilder::new()
        .stmts(names.iter().map(|name| qubit(name, QubitLiteral::Zero)));
    if let Some(first) = names.first() {
        builder = builder.stmt(gate("had", &[first.as_str()]));
    }
    for pair in names.windows(2) {
        builder = builder.stmt(gate("cx", &[pair[0].as_str(), pair[1].as_str()]));
    }
    builder
        .stmts(
            names
                .iter()
                .enumerate()
                .map(|(i, name)| measure(&format!("m{i}"), name)),
        )
        .build()
}

/// A Bell pair built through `ref qubit` functions, with a correction on
/// the second qubit guarded by a bit returned from a call.
pub fn functions() -> Program {
    let entangle = Function::new(
        "entangle",
        vec![Param::qubit_ref("control"), Param::qubit_ref("target")],
        Type::Unit,
        vec![
            Stmt::expr(Expr::gate("had", vec![Expr::var("control")])),
            Stmt::expr(Expr::gate(
                "cx",
                vec![Expr::var("control"), Expr::var("target")],
            )),
        ],
    );
    let observe = Function::new(
        "observe",
        vec![Param::qubit_ref("q")],
        Type::Bit,
        vec![Stmt::ret(Some(Expr::measure(Expr::var("q"))))],
    );

    ProgramBuilder::new()
        .function(entangle)
        .function(observe)
        .stmt(qubit("a", QubitLiteral::Zero))
        .stmt(qubit("b", QubitLiteral::Zero))
        .stmt(Stmt::expr(Expr::call(
            "entangle",
            vec![Expr::ref_var("a"), Expr::ref_var("b")],
        )))
        .stmt(Stmt::val(
            "m",
            Expr::call("observe", vec![Expr::ref_var("a")]),
        ))
        .stmt(Stmt::if_then(Expr::var("m"), vec![gate("px", &["b"])]))
        .stmt(measure("result", "b"))
        .build()
}

/// Copies a qubit binding and applies a gate after measurement. Both are
/// reported.
pub fn no_cloning() -> Program {
    ProgramBuilder::new()
        .stmt(qubit("a", QubitLiteral::One))
        .stmt(Stmt::val("b", Expr::var("a")))
        .stmt(measure("m", "a"))
        .stmt(gate("had", &["a"]))
        .build()
}

/// The bundled demonstrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Demo {
    Teleport,
    Bell,
    Ghz,
    Functions,
    NoCloning,
}

impl Demo {
    pub const ALL: [Demo; 5] = [
        Demo::Teleport,
        Demo::Bell,
        Demo::Ghz,
        Demo::Functions,
        Demo::NoCloning,
    ];

    /// Build the program. `qubits` only affects [`Demo::Ghz`].
    pub fn program(self, qubits: usize) -> Program {
        match self {
            Demo::Teleport => teleport(),
            Demo::Bell => bell(),
            Demo::Ghz => ghz(qubits),
            Demo::Functions => functions(),
            Demo::NoCloning => no_cloning(),
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Demo::Teleport => "Quantum teleportation with classically controlled corrections",
            Demo::Bell => "Bell pair preparation and measurement",
            Demo::Ghz => "GHZ state over a chain of cx gates",
            Demo::Functions => "Bell pair built through ref qubit functions",
            Demo::NoCloning => "A program that copies a qubit and is rejected",
        }
    }

    /// Whether the resource checker is expected to reject the program.
    pub fn is_rejected(self) -> bool {
        matches!(self, Demo::NoCloning)
    }
}

impl fmt::Display for Demo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Demo::Teleport => "teleport",
            Demo::Bell => "bell",
            Demo::Ghz => "ghz",
            Demo::Functions => "functions",
            Demo::NoCloning => "no-cloning",
        };
        write!(f, "{name}")
    }
}

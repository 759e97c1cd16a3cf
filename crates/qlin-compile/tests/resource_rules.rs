//! Integration tests for the individual resource and typing rules.

use qlin_compile::{Pipeline, QubitState, ResourceChecker};
use qlin_ir::{
    DiagnosticKind, Expr, Function, Param, Program, ProgramBuilder, QubitLiteral, Stmt, StmtKind,
    Type,
};

use DiagnosticKind::*;

/// Helper: diagnostic kinds reported for a program, in order.
fn kinds(program: &Program) -> Vec<DiagnosticKind> {
    match ResourceChecker::new().check(program) {
        Ok(_) => vec![],
        Err(diags) => diags.kinds(),
    }
}

fn fresh(name: &str) -> Stmt {
    Stmt::val(name, Expr::qubit(QubitLiteral::Zero))
}

fn gate(name: &str, args: Vec<Expr>) -> Stmt {
    Stmt::expr(Expr::gate(name, args))
}

fn flip() -> Function {
    Function::new(
        "flip",
        vec![Param::qubit_ref("q")],
        Type::Unit,
        vec![gate("px", vec![Expr::var("q")])],
    )
}

fn observe() -> Function {
    Function::new(
        "observe",
        vec![Param::qubit_ref("q")],
        Type::Bit,
        vec![Stmt::ret(Some(Expr::measure(Expr::var("q"))))],
    )
}

// ============================================================================
// No-cloning
// ============================================================================

#[test]
fn test_qubit_from_function_result_is_rejected() {
    let program = ProgramBuilder::new()
        .function(observe())
        .stmt(fresh("a"))
        .stmt(Stmt::val_typed(
            "b",
            Type::Qubit,
            Expr::call("observe", vec![Expr::ref_var("a")]),
        ))
        .build();
    assert_eq!(kinds(&program), vec![IllegalQubitSource]);
}

#[test]
fn test_function_returning_qubit_is_rejected() {
    let program = ProgramBuilder::new()
        .function(Function::new("make", vec![], Type::Qubit, vec![]))
        .build();
    assert_eq!(kinds(&program), vec![IllegalQubitSource]);
}

#[test]
fn test_qubit_passed_by_value_to_gate() {
    let program = ProgramBuilder::new()
        .stmt(fresh("a"))
        .stmt(gate("had", vec![Expr::var("a")]))
        .build();
    assert_eq!(kinds(&program), vec![QubitMustBeByReference]);
}

#[test]
fn test_qubit_literal_passed_to_gate() {
    let program = ProgramBuilder::new()
        .stmt(gate("had", vec![Expr::qubit(QubitLiteral::One)]))
        .build();
    assert_eq!(kinds(&program), vec![QubitMustBeByReference]);
}

#[test]
fn test_by_value_qubit_parameter() {
    let program = ProgramBuilder::new()
        .function(Function::new(
            "consume",
            vec![Param::new("q", Type::Qubit)],
            Type::Unit,
            vec![],
        ))
        .stmt(fresh("a"))
        .stmt(Stmt::expr(Expr::call("consume", vec![Expr::var("a")])))
        .build();

    let diags = ResourceChecker::new().check(&program).unwrap_err();
    assert_eq!(diags.kinds(), vec![QubitMustBeByReference, QubitMustBeByReference]);
    assert_eq!(diags.as_slice()[0].span, program.functions[0].params[0].span);
}

#[test]
fn test_ref_param_needs_ref_argument() {
    let program = ProgramBuilder::new()
        .function(flip())
        .stmt(fresh("a"))
        .stmt(Stmt::expr(Expr::call("flip", vec![Expr::var("a")])))
        .build();
    assert_eq!(kinds(&program), vec![QubitMustBeByReference]);
}

#[test]
fn test_dereference_of_qubit_reference() {
    let program = ProgramBuilder::new()
        .stmt(fresh("a"))
        .stmt(Stmt::val("r", Expr::ref_var("a")))
        .stmt(gate("had", vec![Expr::deref(Expr::var("r"))]))
        .stmt(Stmt::val("b", Expr::deref(Expr::var("r"))))
        .build();
    assert_eq!(kinds(&program), vec![IllegalDereference, IllegalDereference]);
}

#[test]
fn test_dereference_inside_function() {
    let program = ProgramBuilder::new()
        .function(Function::new(
            "peek",
            vec![Param::qubit_ref("q")],
            Type::Unit,
            vec![Stmt::expr(Expr::deref(Expr::var("q")))],
        ))
        .build();
    assert_eq!(kinds(&program), vec![IllegalDereference]);
}

#[test]
fn test_qubit_in_user_type() {
    let program = ProgramBuilder::new()
        .function(Function::new(
            "pack",
            vec![Param::new("p", Type::user("Pair", vec![Type::Integer, Type::Qubit]))],
            Type::Unit,
            vec![],
        ))
        .function(Function::new(
            "fine",
            vec![Param::new("p", Type::user("Pair", vec![Type::Integer, Type::Bit]))],
            Type::Unit,
            vec![],
        ))
        .build();
    assert_eq!(kinds(&program), vec![QubitInUserType]);
}

// ============================================================================
// Single assignment
// ============================================================================

#[test]
fn test_reassigning_a_qubit() {
    let program = ProgramBuilder::new()
        .stmt(fresh("a"))
        .stmt(Stmt::assign("a", Expr::qubit(QubitLiteral::One)))
        .build();
    assert_eq!(kinds(&program), vec![ImmutableQubitBinding]);
}

#[test]
fn test_late_initialization() {
    let program = ProgramBuilder::new()
        .stmt(Stmt::declare("q", Type::Qubit))
        .stmt(Stmt::assign("q", Expr::qubit(QubitLiteral::One)))
        .stmt(gate("had", vec![Expr::ref_var("q")]))
        .build();

    let annotated = ResourceChecker::new().check(&program).unwrap();
    let init = annotated.annotations.transitions(program.body[1].id);
    assert_eq!(init.len(), 1);
    assert_eq!(init[0].to, QubitState::Live);

    let compiled = Pipeline::default().run(&program).unwrap();
    assert_eq!(compiled.text, "PX 0\nHAD 0\n");
}

#[test]
fn test_gate_on_uninitialized_qubit() {
    let program = ProgramBuilder::new()
        .stmt(Stmt::declare("q", Type::Qubit))
        .stmt(gate("had", vec![Expr::ref_var("q")]))
        .stmt(Stmt::expr(Expr::measure(Expr::ref_var("q"))))
        .build();
    assert_eq!(kinds(&program), vec![UninitializedQubit, UninitializedQubit]);
}

#[test]
fn test_rebinding_a_reference() {
    let program = ProgramBuilder::new()
        .stmt(fresh("a"))
        .stmt(fresh("b"))
        .stmt(Stmt::var("r", Expr::ref_var("a")))
        .stmt(Stmt::assign("r", Expr::ref_var("b")))
        .build();
    assert_eq!(kinds(&program), vec![ImmutableQubitBinding]);
}

#[test]
fn test_classical_bindings() {
    let program = ProgramBuilder::new()
        .stmt(Stmt::val("n", Expr::int(1)))
        .stmt(Stmt::var("m", Expr::int(1)))
        .stmt(Stmt::assign("m", Expr::int(2)))
        .stmt(Stmt::assign("n", Expr::int(2)))
        .build();
    assert_eq!(kinds(&program), vec![ImmutableBinding]);
}

// ============================================================================
// Measurement
// ============================================================================

#[test]
fn test_double_measurement() {
    let program = ProgramBuilder::new()
        .stmt(fresh("a"))
        .stmt(Stmt::val("m", Expr::measure(Expr::ref_var("a"))))
        .stmt(Stmt::val("n", Expr::measure(Expr::ref_var("a"))))
        .build();
    assert_eq!(kinds(&program), vec![GateOnMeasuredQubit]);
}

#[test]
fn test_measurement_through_callee() {
    let program = ProgramBuilder::new()
        .function(observe())
        .stmt(fresh("a"))
        .stmt(Stmt::val("m", Expr::call("observe", vec![Expr::ref_var("a")])))
        .stmt(gate("had", vec![Expr::ref_var("a")]))
        .build();
    assert_eq!(kinds(&program), vec![GateOnMeasuredQubit]);
}

#[test]
fn test_measured_qubit_passed_to_callee() {
    let program = ProgramBuilder::new()
        .function(flip())
        .stmt(fresh("a"))
        .stmt(Stmt::expr(Expr::measure(Expr::ref_var("a"))))
        .stmt(Stmt::expr(Expr::call("flip", vec![Expr::ref_var("a")])))
        .build();
    assert_eq!(kinds(&program), vec![GateOnMeasuredQubit]);
}

#[test]
fn test_callee_that_ignores_operand_accepts_measured_qubit() {
    let program = ProgramBuilder::new()
        .function(Function::new(
            "ignore",
            vec![Param::qubit_ref("q")],
            Type::Unit,
            vec![],
        ))
        .stmt(fresh("a"))
        .stmt(Stmt::expr(Expr::measure(Expr::ref_var("a"))))
        .stmt(Stmt::expr(Expr::call("ignore", vec![Expr::ref_var("a")])))
        .build();
    assert!(kinds(&program).is_empty());
}

#[test]
fn test_measurement_in_branch_is_joined() {
    let program = ProgramBuilder::new()
        .stmt(fresh("a"))
        .stmt(fresh("b"))
        .stmt(Stmt::val("m", Expr::measure(Expr::ref_var("b"))))
        .stmt(Stmt::if_then(
            Expr::var("m"),
            vec![Stmt::expr(Expr::measure(Expr::ref_var("a")))],
        ))
        .stmt(gate("had", vec![Expr::ref_var("a")]))
        .build();
    assert_eq!(kinds(&program), vec![GateOnMeasuredQubit]);
}

#[test]
fn test_alias_shares_state() {
    let program = ProgramBuilder::new()
        .stmt(fresh("a"))
        .stmt(Stmt::val("r", Expr::ref_var("a")))
        .stmt(Stmt::expr(Expr::measure(Expr::var("r"))))
        .stmt(gate("had", vec![Expr::ref_var("a")]))
        .build();
    assert_eq!(kinds(&program), vec![GateOnMeasuredQubit]);
}

// ============================================================================
// Operands and the catalog
// ============================================================================

#[test]
fn test_same_qubit_twice() {
    let program = ProgramBuilder::new()
        .stmt(fresh("a"))
        .stmt(Stmt::val("r", Expr::ref_var("a")))
        .stmt(gate("cx", vec![Expr::ref_var("a"), Expr::ref_var("a")]))
        .stmt(gate("cpz", vec![Expr::var("r"), Expr::ref_var("a")]))
        .build();
    assert_eq!(kinds(&program), vec![AliasedQubitOperands, AliasedQubitOperands]);
}

#[test]
fn test_catalog_errors() {
    let program = ProgramBuilder::new()
        .stmt(fresh("a"))
        .stmt(fresh("b"))
        .stmt(gate("toffoli", vec![Expr::ref_var("a")]))
        .stmt(gate("had", vec![Expr::ref_var("a"), Expr::ref_var("b")]))
        .build();
    assert_eq!(kinds(&program), vec![UnknownGate, ArityMismatch]);
}

#[test]
fn test_controlled_forms_are_accepted() {
    let program = ProgramBuilder::new()
        .stmt(fresh("a"))
        .stmt(fresh("b"))
        .stmt(gate("chad", vec![Expr::ref_var("a"), Expr::ref_var("b")]))
        .stmt(gate("cpx", vec![Expr::ref_var("b"), Expr::ref_var("a")]))
        .stmt(gate("cpz", vec![Expr::ref_var("a"), Expr::ref_var("b")]))
        .build();
    assert!(kinds(&program).is_empty());
}

// ============================================================================
// Names, calls and classical typing
// ============================================================================

#[test]
fn test_name_and_call_errors() {
    let program = ProgramBuilder::new()
        .function(flip())
        .stmt(fresh("a"))
        .stmt(gate("had", vec![Expr::ref_var("ghost")]))
        .stmt(Stmt::expr(Expr::call("teleport", vec![])))
        .stmt(Stmt::expr(Expr::call("flip", vec![])))
        .build();
    assert_eq!(kinds(&program), vec![UnknownName, UnknownFunction, ArgumentCountMismatch]);
}

#[test]
fn test_branch_locals_do_not_escape() {
    let program = ProgramBuilder::new()
        .stmt(Stmt::if_then(Expr::bit(true), vec![fresh("inner")]))
        .stmt(gate("had", vec![Expr::ref_var("inner")]))
        .build();
    assert_eq!(kinds(&program), vec![UnknownName]);
}

#[test]
fn test_qubit_as_classical_value() {
    let program = ProgramBuilder::new()
        .stmt(fresh("a"))
        .stmt(Stmt::if_then(Expr::var("a"), vec![]))
        .build();
    assert_eq!(kinds(&program), vec![TypeMismatch]);
}

#[test]
fn test_classical_type_errors() {
    let program = ProgramBuilder::new()
        .function(Function::new(
            "count",
            vec![],
            Type::Integer,
            vec![Stmt::ret(Some(Expr::bit(true)))],
        ))
        .stmt(Stmt::val_typed("n", Type::Integer, Expr::bit(false)))
        .stmt(Stmt::if_then(Expr::int(1), vec![]))
        .build();
    assert_eq!(kinds(&program), vec![TypeMismatch, TypeMismatch, TypeMismatch]);
}

#[test]
fn test_all_diagnostics_are_reported_together() {
    let program = ProgramBuilder::new()
        .stmt(fresh("a"))
        .stmt(Stmt::val("b", Expr::var("a")))
        .stmt(gate("cx", vec![Expr::ref_var("a")]))
        .stmt(Stmt::expr(Expr::measure(Expr::ref_var("a"))))
        .stmt(gate("had", vec![Expr::ref_var("a")]))
        .build();

    let diags = ResourceChecker::new().check(&program).unwrap_err();
    assert_eq!(
        diags.kinds(),
        vec![IllegalQubitSource, ArityMismatch, GateOnMeasuredQubit]
    );
    let lines: Vec<u32> = diags.iter().map(|d| d.span.line).collect();
    assert_eq!(lines, vec![2, 3, 5]);
}

#[test]
fn test_resolutions_point_at_declarations() {
    let program = ProgramBuilder::new()
        .stmt(fresh("a"))
        .stmt(gate("had", vec![Expr::ref_var("a")]))
        .build();
    let annotated = ResourceChecker::new().check(&program).unwrap();

    let StmtKind::Expr(call) = &program.body[1].kind else {
        panic!("expected expression statement");
    };
    let qlin_ir::ExprKind::Gate { args, .. } = &call.kind else {
        panic!("expected gate call");
    };
    let qlin_ir::ExprKind::Ref(var) = &args[0].kind else {
        panic!("expected reference");
    };
    let used = annotated.annotations.resolve(var.id).unwrap();
    let declared = annotated.annotations.declared(program.body[0].id).unwrap();
    assert_eq!(used.id, declared.id);
}

// ============================================================================
// Node identity
// ============================================================================

/// Two fresh qubits and a gate on each, with every node id left at zero.
fn hand_built() -> Program {
    Program {
        functions: vec![],
        body: vec![
            fresh("a"),
            fresh("b"),
            gate("had", vec![Expr::ref_var("a")]),
            gate("px", vec![Expr::ref_var("b")]),
        ],
    }
}

#[test]
fn test_colliding_node_ids_are_rejected() {
    let program = hand_built();
    let diags = ResourceChecker::new().check(&program).unwrap_err();
    assert!(!diags.is_empty());
    assert!(diags.iter().all(|d| d.kind == DuplicateNodeId));
    assert!(Pipeline::default().run(&program).is_err());
}

#[test]
fn test_json_tree_with_colliding_ids_compiles_on_the_right_qubits() {
    let json = hand_built().to_json().unwrap();
    let program = Program::from_json(&json).unwrap();

    let compiled = Pipeline::default().run(&program).unwrap();
    assert_eq!(compiled.text, "HAD 0\nPX 1\n");
    assert_eq!(compiled.qubits[0].name, "a");
    assert_eq!(compiled.qubits[1].name, "b");
}

//! Integration tests for the demo suite.
//!
//! Every bundled program is compiled through the full pipeline in both
//! output formats.

use qlin_compile::{CompileError, CompileOptions, Pipeline};
use qlin_demos::programs::{Demo, bell, functions, ghz, no_cloning, teleport};
use qlin_emit::OutputFormat;
use qlin_ir::{DiagnosticKind, Instruction, Program};

fn flat(program: &Program) -> String {
    Pipeline::default().run(program).unwrap().text
}

#[test]
fn test_bell_flat_text() {
    assert_eq!(flat(&bell()), "HAD 0\nCX 0 1\nMEASURE 0 0\nMEASURE 1 1\n");
}

#[test]
fn test_teleport_flat_text() {
    let text = flat(&teleport());
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 10);
    assert_eq!(lines[0], "PX 0");
    assert_eq!(lines[7], "PZ 1 IF 0");
    assert_eq!(lines[8], "PX 1 IF 1");
    assert_eq!(lines[9], "MEASURE 1 2");
}

#[test]
fn test_ghz_scaling() {
    for n in 1..=8 {
        let compiled = Pipeline::default().run(&ghz(n)).unwrap();
        assert_eq!(compiled.registers.num_qubits(), n);
        assert_eq!(compiled.registers.num_bits(), n);
        // had + (n - 1) cx + n measurements
        assert_eq!(compiled.instructions.len(), 2 * n);
    }
}

#[test]
fn test_functions_are_inlined() {
    assert_eq!(
        flat(&functions()),
        "HAD 0\nCX 0 1\nMEASURE 0 0\nPX 1 IF 0\nMEASURE 1 1\n"
    );
}

#[test]
fn test_no_cloning_reports_every_violation() {
    let err = Pipeline::default().run(&no_cloning()).unwrap_err();
    let diagnostics = match err {
        CompileError::Check(diagnostics) => diagnostics,
        other => panic!("expected a check error, got {other:?}"),
    };
    assert_eq!(
        diagnostics.kinds(),
        vec![
            DiagnosticKind::IllegalQubitSource,
            DiagnosticKind::GateOnMeasuredQubit
        ]
    );
}

#[test]
fn test_every_demo_in_both_formats() {
    for format in [OutputFormat::Flat, OutputFormat::OpenQasm3] {
        let pipeline = Pipeline::new(CompileOptions::new().with_format(format));
        for demo in Demo::ALL {
            let result = pipeline.run(&demo.program(3));
            assert_eq!(result.is_err(), demo.is_rejected(), "{demo} ({format})");
        }
    }
}

#[test]
fn test_demos_never_touch_measured_qubits() {
    for demo in Demo::ALL.into_iter().filter(|d| !d.is_rejected()) {
        let compiled = Pipeline::default().run(&demo.program(4)).unwrap();
        let mut measured = Vec::new();
        for instruction in &compiled.instructions {
            for qubit in instruction.qubits() {
                assert!(!measured.contains(&qubit), "{demo}: {qubit} used after measurement");
            }
            if let Instruction::Measure { qubit, .. } = instruction {
                measured.push(*qubit);
            }
        }
    }
}

#[test]
fn test_program_json_round_trip_compiles_identically() {
    let program = teleport();
    let json = program.to_json().unwrap();
    let decoded = Program::from_json(&json).unwrap();
    assert_eq!(flat(&decoded), flat(&program));
}

#[test]
fn test_annotated_qasm_names_bindings() {
    let options = CompileOptions::new()
        .with_format(OutputFormat::OpenQasm3)
        .with_register_annotations(true);
    let text = Pipeline::new(options).run(&bell()).unwrap().text;
    assert!(text.contains("// q[0] = a"));
    assert!(text.contains("// q[1] = b"));
}

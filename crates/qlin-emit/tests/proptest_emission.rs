//! Property tests for register allocation and emission.

use proptest::prelude::*;

use qlin_emit::{RegisterMap, emit_flat, emit_qasm3};
use qlin_ir::{BaseGate, BitRef, GateApplication, GateSpec, Instruction, QubitRef, Span};

fn arb_base() -> impl Strategy<Value = BaseGate> {
    prop_oneof![Just(BaseGate::Had), Just(BaseGate::Px), Just(BaseGate::Pz)]
}

/// Random well-formed instruction sequences over up to 6 qubits.
///
/// Each measurement writes a fresh bit; conditionals read a bit that was
/// written earlier.
fn arb_instructions() -> impl Strategy<Value = Vec<Instruction>> {
    prop::collection::vec((0u8..4, arb_base(), 0u32..6, 0u32..6), 1..24).prop_map(|ops| {
        let mut instructions = Vec::new();
        let mut next_bit = 0u32;
        for (kind, base, a, b) in ops {
            match kind {
                0 => instructions.push(Instruction::Gate(GateApplication::new(
                    GateSpec::single(base),
                    [QubitRef(a)],
                    Span::default(),
                ))),
                1 if a != b => instructions.push(Instruction::Gate(GateApplication::new(
                    GateSpec::controlled(base),
                    [QubitRef(a), QubitRef(b)],
                    Span::default(),
                ))),
                2 => {
                    instructions.push(Instruction::measure(
                        QubitRef(a),
                        BitRef(next_bit),
                        Span::default(),
                    ));
                    next_bit += 1;
                }
                3 if next_bit > 0 => instructions.push(Instruction::conditional(
                    BitRef(b % next_bit),
                    GateApplication::new(GateSpec::single(base), [QubitRef(a)], Span::default()),
                )),
                _ => {}
            }
        }
        instructions
    })
}

proptest! {
    #[test]
    fn prop_one_flat_line_per_instruction(instructions in arb_instructions()) {
        let registers = RegisterMap::allocate(&instructions);
        let text = emit_flat(&instructions, &registers).unwrap();
        prop_assert_eq!(text.lines().count(), instructions.len());
    }

    #[test]
    fn prop_register_indices_are_dense(instructions in arb_instructions()) {
        let registers = RegisterMap::allocate(&instructions);
        for instruction in &instructions {
            for qubit in instruction.qubits() {
                let index = registers.qubit(qubit).unwrap() as usize;
                prop_assert!(index < registers.num_qubits());
                prop_assert_eq!(registers.qubits()[index], qubit);
            }
            for bit in instruction.bits() {
                prop_assert!((registers.bit(bit).unwrap() as usize) < registers.num_bits());
            }
        }
    }

    #[test]
    fn prop_qasm3_mentions_every_measurement(instructions in arb_instructions()) {
        let registers = RegisterMap::allocate(&instructions);
        let text = emit_qasm3(&instructions, &registers, None).unwrap();
        let measures = instructions.iter().filter(|i| i.is_measure()).count();
        prop_assert_eq!(text.matches("= measure q[").count(), measures);
    }
}

#[test]
fn test_first_qubit_used_gets_index_zero() {
    let instructions = vec![
        Instruction::measure(QubitRef(9), BitRef(4), Span::default()),
        Instruction::Gate(GateApplication::new(
            GateSpec::single(BaseGate::Px),
            [QubitRef(2)],
            Span::default(),
        )),
    ];
    let registers = RegisterMap::allocate(&instructions);
    let text = emit_flat(&instructions, &registers).unwrap();
    assert_eq!(text, "MEASURE 0 0\nPX 1\n");
}

//! Register allocation.

use rustc_hash::FxHashMap;

use qlin_ir::{BitRef, Instruction, QubitRef};

use crate::error::{EmitError, EmitResult};

/// Maps abstract qubit and bit handles to dense register indices.
///
/// Qubits are numbered in order of first use, bits in order of first
/// appearance, so the same instruction sequence always yields the same map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterMap {
    qubits: FxHashMap<QubitRef, u32>,
    bits: FxHashMap<BitRef, u32>,
    qubit_order: Vec<QubitRef>,
    bit_order: Vec<BitRef>,
}

impl RegisterMap {
    /// Number every qubit and bit the instructions touch.
    pub fn allocate(instructions: &[Instruction]) -> Self {
        let mut map = Self::default();
        for instruction in instructions {
            if let Instruction::ConditionalGate { condition, .. } = instruction {
                map.insert_bit(*condition);
            }
            for qubit in instruction.qubits() {
                map.insert_qubit(qubit);
            }
            if let Instruction::Measure { bit, .. } = instruction {
                map.insert_bit(*bit);
            }
        }
        map
    }

    fn insert_qubit(&mut self, qubit: QubitRef) {
        if !self.qubits.contains_key(&qubit) {
            self.qubits.insert(qubit, self.qubit_order.len() as u32);
            self.qubit_order.push(qubit);
        }
    }

    fn insert_bit(&mut self, bit: BitRef) {
        if !self.bits.contains_key(&bit) {
            self.bits.insert(bit, self.bit_order.len() as u32);
            self.bit_order.push(bit);
        }
    }

    /// Register index of a qubit.
    pub fn qubit(&self, qubit: QubitRef) -> EmitResult<u32> {
        self.qubits
            .get(&qubit)
            .copied()
            .ok_or(EmitError::UnmappedQubit(qubit))
    }

    /// Register index of a bit.
    pub fn bit(&self, bit: BitRef) -> EmitResult<u32> {
        self.bits.get(&bit).copied().ok_or(EmitError::UnmappedBit(bit))
    }

    pub fn num_qubits(&self) -> usize {
        self.qubit_order.len()
    }

    pub fn num_bits(&self) -> usize {
        self.bit_order.len()
    }

    /// Qubits by register index.
    pub fn qubits(&self) -> &[QubitRef] {
        &self.qubit_order
    }

    /// Bits by register index.
    pub fn bits(&self) -> &[BitRef] {
        &self.bit_order
    }
}

//! Text emitters.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use qlin_ir::{GateApplication, Instruction, Origin};

use crate::alloc::RegisterMap;
use crate::error::{EmitError, EmitResult};

/// Target text format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One instruction per line: `HAD 0`, `CX 0 1`, `MEASURE 2 0`,
    /// `PZ 0 IF 0`.
    #[default]
    Flat,
    /// `OpenQASM` 3 source.
    #[serde(rename = "openqasm3")]
    OpenQasm3,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Flat => write!(f, "flat"),
            OutputFormat::OpenQasm3 => write!(f, "openqasm3"),
        }
    }
}

/// Emit instructions in the flat line format.
///
/// ```rust
/// use qlin_emit::{emit_flat, RegisterMap};
/// use qlin_ir::{BaseGate, GateApplication, GateSpec, Instruction, QubitRef, Span};
///
/// let instructions = vec![Instruction::Gate(GateApplication::new(
///     GateSpec::single(BaseGate::Had),
///     [QubitRef(4)],
///     Span::default(),
/// ))];
/// let registers = RegisterMap::allocate(&instructions);
/// assert_eq!(emit_flat(&instructions, &registers).unwrap(), "HAD 0\n");
/// ```
pub fn emit_flat(instructions: &[Instruction], registers: &RegisterMap) -> EmitResult<String> {
    let mut output = String::new();
    for instruction in instructions {
        let line = match instruction {
            Instruction::Gate(app) => flat_gate(app, registers)?,
            Instruction::Measure { qubit, bit, .. } => {
                format!("MEASURE {} {}", registers.qubit(*qubit)?, registers.bit(*bit)?)
            }
            Instruction::ConditionalGate {
                condition,
                application,
            } => format!(
                "{} IF {}",
                flat_gate(application, registers)?,
                registers.bit(*condition)?
            ),
        };
        output.push_str(&line);
        output.push('\n');
    }
    debug!("Emitted {} flat instruction(s)", instructions.len());
    Ok(output)
}

fn flat_gate(app: &GateApplication, registers: &RegisterMap) -> EmitResult<String> {
    let mut line = app.gate.name().to_uppercase();
    for qubit in &app.qubits {
        line.push(' ');
        line.push_str(&registers.qubit(*qubit)?.to_string());
    }
    Ok(line)
}

/// Emit instructions as `OpenQASM` 3 source.
///
/// With `origins`, each register slot is preceded by a comment naming the
/// source binding it came from.
pub fn emit_qasm3(
    instructions: &[Instruction],
    registers: &RegisterMap,
    origins: Option<&[Origin]>,
) -> EmitResult<String> {
    let mut emitter = Qasm3Emitter::new(registers);
    emitter.emit_program(instructions, origins)?;
    debug!("Emitted {} OpenQASM 3 instruction(s)", instructions.len());
    Ok(emitter.output)
}

/// Emit instructions in the requested format.
pub fn emit(
    format: OutputFormat,
    instructions: &[Instruction],
    registers: &RegisterMap,
    origins: Option<&[Origin]>,
) -> EmitResult<String> {
    match format {
        OutputFormat::Flat => emit_flat(instructions, registers),
        OutputFormat::OpenQasm3 => emit_qasm3(instructions, registers, origins),
    }
}

struct Qasm3Emitter<'r> {
    output: String,
    registers: &'r RegisterMap,
}

impl<'r> Qasm3Emitter<'r> {
    fn new(registers: &'r RegisterMap) -> Self {
        Self {
            output: String::new(),
            registers,
        }
    }

    fn emit_program(&mut self, instructions: &[Instruction], origins: Option<&[Origin]>) -> EmitResult<()> {
        self.writeln("OPENQASM 3.0;");
        self.writeln("include \"stdgates.inc\";");
        self.writeln("");

        let num_qubits = self.registers.num_qubits();
        if num_qubits > 0 {
            self.writeln(&format!("qubit[{num_qubits}] q;"));
        }
        let num_bits = self.registers.num_bits();
        if num_bits > 0 {
            self.writeln(&format!("bit[{num_bits}] c;"));
        }

        if let Some(origins) = origins {
            for (index, qubit) in self.registers.qubits().iter().enumerate() {
                if let Some(origin) = origins.get(qubit.0 as usize) {
                    self.writeln(&format!("// q[{index}] = {origin}"));
                }
            }
        }

        if num_qubits > 0 || num_bits > 0 {
            self.writeln("");
        }

        for instruction in instructions {
            self.emit_instruction(instruction)?;
        }
        Ok(())
    }

    fn emit_instruction(&mut self, instruction: &Instruction) -> EmitResult<()> {
        match instruction {
            Instruction::Gate(app) => {
                let gate = self.gate(app)?;
                self.writeln(&format!("{gate};"));
            }
            Instruction::Measure { qubit, bit, .. } => {
                let q = self.registers.qubit(*qubit)?;
                let c = self.registers.bit(*bit)?;
                self.writeln(&format!("c[{c}] = measure q[{q}];"));
            }
            Instruction::ConditionalGate {
                condition,
                application,
            } => {
                let c = self.registers.bit(*condition)?;
                let gate = self.gate(application)?;
                self.writeln(&format!("if (c[{c}]) {gate};"));
            }
        }
        Ok(())
    }

    fn gate(&self, app: &GateApplication) -> EmitResult<String> {
        let operands = app
            .qubits
            .iter()
            .map(|q| self.registers.qubit(*q).map(|i| format!("q[{i}]")))
            .collect::<Result<Vec<_>, EmitError>>()?;
        Ok(format!("{} {}", app.gate.qasm_name(), operands.join(", ")))
    }

    fn writeln(&mut self, line: &str) {
        self.output.push_str(line);
        self.output.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qlin_ir::{BaseGate, BitRef, GateSpec, QubitRef, Span};

    fn sample() -> Vec<Instruction> {
        vec![
            Instruction::Gate(GateApplication::new(
                GateSpec::single(BaseGate::Had),
                [QubitRef(1)],
                Span::default(),
            )),
            Instruction::Gate(GateApplication::new(
                GateSpec::controlled(BaseGate::Px),
                [QubitRef(1), QubitRef(0)],
                Span::default(),
            )),
            Instruction::measure(QubitRef(1), BitRef(0), Span::default()),
            Instruction::conditional(
                BitRef(0),
                GateApplication::new(GateSpec::single(BaseGate::Pz), [QubitRef(0)], Span::default()),
            ),
        ]
    }

    #[test]
    fn test_flat_format() {
        let instructions = sample();
        let registers = RegisterMap::allocate(&instructions);
        let text = emit_flat(&instructions, &registers).unwrap();
        assert_eq!(text, "HAD 0\nCX 0 1\nMEASURE 0 0\nPZ 1 IF 0\n");
    }

    #[test]
    fn test_qasm3_format() {
        let instructions = sample();
        let registers = RegisterMap::allocate(&instructions);
        let text = emit_qasm3(&instructions, &registers, None).unwrap();

        assert!(text.starts_with("OPENQASM 3.0;\n"));
        assert!(text.contains("qubit[2] q;"));
        assert!(text.contains("bit[1] c;"));
        assert!(text.contains("h q[0];"));
        assert!(text.contains("cx q[0], q[1];"));
        assert!(text.contains("c[0] = measure q[0];"));
        assert!(text.contains("if (c[0]) z q[1];"));
    }

    #[test]
    fn test_qasm3_register_comments() {
        let instructions = sample();
        let registers = RegisterMap::allocate(&instructions);
        let origins = vec![
            Origin::new("target", Span::new(2, 1)),
            Origin::new("control", Span::new(1, 1)),
        ];
        let text = emit_qasm3(&instructions, &registers, Some(&origins)).unwrap();
        assert!(text.contains("// q[0] = control (1:1)"));
        assert!(text.contains("// q[1] = target (2:1)"));
    }

    #[test]
    fn test_unmapped_bit_is_an_error() {
        let instructions = sample();
        let registers = RegisterMap::allocate(&instructions[..2]);
        assert!(matches!(
            emit_flat(&instructions, &registers),
            Err(EmitError::UnmappedBit(BitRef(0)))
        ));
    }

    #[test]
    fn test_output_format_serde() {
        let json = serde_json::to_string(&OutputFormat::OpenQasm3).unwrap();
        assert_eq!(json, "\"openqasm3\"");
        let back: OutputFormat = serde_json::from_str("\"flat\"").unwrap();
        assert_eq!(back, OutputFormat::Flat);
    }
}

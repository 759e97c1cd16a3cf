//! Qlin Demo Suite
//!
//! Ready-made programs that exercise the Qlin compiler end to end:
//!
//! - **Teleportation**: measurement-conditioned corrections
//! - **Bell pair**: the smallest entangling program
//! - **GHZ state**: a chain of `cx` gates over `n` qubits
//! - **Function calls**: `ref qubit` parameters inlined by lowering
//! - **No-cloning**: a program the resource checker rejects
//!
//! ```rust
//! use qlin_compile::Pipeline;
//! use qlin_demos::programs::bell;
//!
//! let compiled = Pipeline::default().run(&bell()).unwrap();
//! assert_eq!(compiled.registers.num_qubits(), 2);
//! ```

pub mod programs;

use console::style;
use qlin_ir::Diagnostics;

/// Print a demo header.
pub fn print_header(title: &str) {
    println!();
    println!("{}", style("═".repeat(60)).cyan());
    println!("{}", style(format!("  {title}")).cyan().bold());
    println!("{}", style("═".repeat(60)).cyan());
    println!();
}

/// Print a demo section.
pub fn print_section(title: &str) {
    println!();
    println!("{}", style(format!("▶ {title}")).green().bold());
    println!("{}", style("─".repeat(40)).dim());
}

/// Print a result line.
pub fn print_result(label: &str, value: impl std::fmt::Display) {
    println!("  {} {}", style(format!("{label}:")).dim(), value);
}

pub fn print_success(message: &str) {
    println!("{} {}", style("✓").green().bold(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", style("ℹ").blue(), message);
}

/// Print every diagnostic of a rejected program, one per line.
pub fn print_diagnostics(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics.iter() {
        println!(
            "  {} {} {}",
            style(format!("{}", diagnostic.span)).dim(),
            style(format!("[{}]", diagnostic.kind)).red().bold(),
            diagnostic.message
        );
    }
}

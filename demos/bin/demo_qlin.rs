//! Qlin Compiler Demo
//!
//! Compiles one of the bundled programs, or a program read from a JSON
//! file, and prints the target text or the diagnostics.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use qlin_compile::{CompileOptions, CompiledProgram, Pipeline};
use qlin_demos::programs::Demo;
use qlin_demos::{
    print_diagnostics, print_header, print_info, print_result, print_section, print_success,
};
use qlin_emit::OutputFormat;
use qlin_ir::Program;

#[derive(Parser, Debug)]
#[command(name = "demo-qlin")]
#[command(about = "Compile Qlin demonstration programs")]
struct Args {
    /// Program to compile
    #[arg(short, long, value_enum, default_value = "teleport")]
    demo: Demo,

    /// Compile a JSON-encoded program instead of a bundled one
    #[arg(short, long, conflicts_with = "demo")]
    input: Option<PathBuf>,

    /// Number of qubits for the GHZ demo
    #[arg(short = 'n', long, default_value = "3")]
    qubits: usize,

    /// Output format [default: flat]
    #[arg(short, long, value_enum)]
    format: Option<FormatArg>,

    /// Annotate OpenQASM 3 registers with their source bindings
    #[arg(long)]
    annotate: bool,

    /// Compile options file (JSON or YAML), overridden by flags
    #[arg(long, env = "QLIN_OPTIONS")]
    options: Option<PathBuf>,

    /// Also print the instruction list as JSON
    #[arg(long)]
    json: bool,

    /// Compile every bundled program
    #[arg(long)]
    all: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Flat,
    #[value(name = "openqasm3")]
    OpenQasm3,
}

impl From<FormatArg> for OutputFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Flat => OutputFormat::Flat,
            FormatArg::OpenQasm3 => OutputFormat::OpenQasm3,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let options = load_options(&args)?;
    info!(
        "Options: format={}, max_inline_depth={}, annotate_registers={}",
        options.format, options.max_inline_depth, options.annotate_registers
    );
    let pipeline = Pipeline::new(options);

    print_header("Qlin Compiler Demo");
    print_result("Format", pipeline.options().format);
    print_result("Max inline depth", pipeline.options().max_inline_depth);

    if args.all {
        let mut unexpected = 0;
        for demo in Demo::ALL {
            let program = demo.program(args.qubits);
            let name = demo.to_string();
            let accepted = run(&pipeline, &name, demo.description(), &program, args.json)?;
            if accepted == demo.is_rejected() {
                unexpected += 1;
            }
        }
        println!();
        if unexpected > 0 {
            anyhow::bail!("{unexpected} demo(s) did not behave as expected");
        }
        print_success("All demos behaved as expected");
        return Ok(());
    }

    let (name, description, program) = match &args.input {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let program = Program::from_json(&json)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            (path.display().to_string(), "Program read from file", program)
        }
        None => (
            args.demo.to_string(),
            args.demo.description(),
            args.demo.program(args.qubits),
        ),
    };

    if !run(&pipeline, &name, description, &program, args.json)? {
        std::process::exit(1);
    }
    Ok(())
}

fn load_options(args: &Args) -> anyhow::Result<CompileOptions> {
    let mut options = match &args.options {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let is_json = path.extension().is_some_and(|ext| ext == "json");
            if is_json {
                CompileOptions::from_json(&text)?
            } else {
                CompileOptions::from_yaml(&text)?
            }
        }
        None => CompileOptions::default(),
    };
    if let Some(format) = args.format {
        options.format = format.into();
    }
    if args.annotate {
        options.annotate_registers = true;
    }
    Ok(options)
}

/// Compile one program. Returns whether it was accepted.
fn run(
    pipeline: &Pipeline,
    name: &str,
    description: &str,
    program: &Program,
    json: bool,
) -> anyhow::Result<bool> {
    print_section(&format!("{name}: {description}"));
    info!("Compiling {name} ({} statement(s))", program.body.len());

    match pipeline.run(program) {
        Ok(compiled) => {
            info!(
                "Compiled {name} to {} instruction(s)",
                compiled.instructions.len()
            );
            report(&compiled, json)?;
            Ok(true)
        }
        Err(err) => match err.diagnostics() {
            Some(diagnostics) => {
                warn!("{name} rejected with {} diagnostic(s)", diagnostics.len());
                print_info(&format!("rejected with {} diagnostic(s)", diagnostics.len()));
                print_diagnostics(diagnostics);
                Ok(false)
            }
            None => Err(anyhow::Error::new(err).context(format!("compiling {name}"))),
        },
    }
}

fn report(compiled: &CompiledProgram, json: bool) -> anyhow::Result<()> {
    print_result("Instructions", compiled.instructions.len());
    print_result("Qubits", compiled.registers.num_qubits());
    print_result("Bits", compiled.registers.num_bits());
    println!();
    print!("{}", compiled.text);

    if json {
        println!();
        println!("{}", serde_json::to_string_pretty(&compiled.instructions)?);
    }
    Ok(())
}

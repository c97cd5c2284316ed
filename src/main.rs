//! Run a micro-lang program from the command line and print the resulting memory.
//!
//! ```ignore
//! micro-lang cake.micro --start bake_cake --cell 1,1=1 --cell 2,1=1 --cell 3,1=1
//! ```
//!
//! With no source path (or `-`), the program is read from stdin.

use std::error::Error;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use micro_lang::data::{Cell, Memory};
use micro_lang::eval::{run_with_config, EvalConfig};

#[derive(Parser, Debug)]
#[command(about = "Run a micro-lang program")]
struct Args {
    /// Source file; stdin if absent or "-".
    source: Option<PathBuf>,

    /// Program to start with.
    #[arg(short, long)]
    start: String,

    /// Initial memory, as ROW,COL=VALUE. May be repeated.
    #[arg(short, long = "cell", value_parser = parse_cell)]
    cells: Vec<((usize, usize), Cell)>,

    /// Most instructions to execute before giving up.
    #[arg(long)]
    max_steps: Option<u64>,
}

fn parse_cell(s: &str) -> Result<((usize, usize), Cell), String> {
    let (at, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ROW,COL=VALUE, got {s:?}"))?;
    let (row, col) = at
        .split_once(',')
        .ok_or_else(|| format!("expected ROW,COL before '=', got {at:?}"))?;
    let row = row
        .trim()
        .parse()
        .map_err(|e| format!("invalid row {row:?}: {e}"))?;
    let col = col
        .trim()
        .parse()
        .map_err(|e| format!("invalid column {col:?}: {e}"))?;
    Ok(((row, col), Cell::from_input(value)))
}

fn read_source(path: Option<&PathBuf>) -> std::io::Result<String> {
    match path {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path),
        _ => {
            let mut source = String::new();
            std::io::stdin().lock().read_to_string(&mut source)?;
            Ok(source)
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let source = read_source(args.source.as_ref())?;
    let programs = micro_lang::reader::read(&source)?;

    let mut memory: Memory = args.cells.into_iter().collect();
    let config = EvalConfig {
        max_steps: args.max_steps,
        ..Default::default()
    };
    let result = run_with_config(&programs, &args.start, &mut memory, config).map(|_| ());

    // Memory is printed even on failure; writes before the error stand.
    print!("{memory}");
    Ok(result?)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

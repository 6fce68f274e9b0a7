mod repl;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use brine_interpreter::error::Error;
use brine_interpreter::Evaluator;
use brine_parser::lexer;
use brine_parser::parser::Parser;

#[derive(Debug, ClapParser)]
#[command(
    name = "brine",
    about = "Runs brine scripts, or starts an interactive session.",
    version
)]
struct Args {
    /// Path to a script to run; starts the REPL when omitted.
    script: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    match args.script {
        Some(path) => run_script(&path),
        None => {
            repl::repl();
            Ok(())
        }
    }
}

fn run_script(path: &Path) -> Result<()> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    // Script output goes to stdout; diagnostics go to stderr
    if let Err(error) = execute(&source) {
        eprintln!("{}", error);
        process::exit(1);
    }

    Ok(())
}

/// Run one source text front to back against a fresh context.
fn execute(source: &str) -> Result<(), Error> {
    let tokens = lexer::tokenize(source)?;
    debug!(tokens = tokens.len(), "tokenized");

    let program = Parser::new(tokens).parse_program()?;
    debug!(statements = program.statements.len(), "parsed");

    let stdout = io::stdout();
    Evaluator::new(stdout.lock()).eval(&program)?;

    Ok(())
}

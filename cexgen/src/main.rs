//! Counterexample test synthesis CLI

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use cexgen::{CounterexampleBundle, Emission};

#[derive(Parser)]
#[command(
    name = "cexgen",
    version,
    about = "Counterexample-to-test synthesis for JVM verification traces"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Synthesize a JUnit test from a counterexample bundle
    Emit {
        /// Bundle file (JSON)
        bundle: PathBuf,
        /// Entry-function identifier override
        #[arg(long)]
        entry: Option<String>,
        /// Disable mock synthesis and construct every object for real
        #[arg(long)]
        no_mocks: bool,
        /// Additional class-name prefix excluded from mocking (repeatable)
        #[arg(long)]
        exclude: Vec<String>,
        /// Write the test source here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Parse a bundle and dump a summary (debug)
    Dump {
        /// Bundle file (JSON)
        bundle: PathBuf,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Emit {
            bundle,
            entry,
            no_mocks,
            exclude,
            output,
        } => emit(&bundle, entry, no_mocks, exclude, output.as_deref()),
        Command::Dump { bundle } => dump(&bundle),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn emit(
    path: &PathBuf,
    entry: Option<String>,
    no_mocks: bool,
    exclude: Vec<String>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let bundle = CounterexampleBundle::load(path)?;

    let mut options = bundle.options();
    if let Some(entry) = entry {
        options.entry_function = entry;
    }
    if no_mocks {
        options = options.without_mocks();
    }
    for prefix in exclude {
        options = options.with_excluded_namespace(prefix);
    }

    let test = bundle.synthesize(&options)?;
    if test.emission == Emission::SetupOnly {
        eprintln!("warning: missing parameter bindings, no call emitted");
    }

    match output {
        Some(path) => std::fs::write(path, &test.source)?,
        None => print!("{}", test.source),
    }
    Ok(())
}

fn dump(path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let bundle = CounterexampleBundle::load(path)?;

    println!("entry function: {}", bundle.entry_function);
    println!("trace entries: {}", bundle.trace.len());
    println!("opaque functions: {}", bundle.opaque_calls.len());
    for (function, records) in bundle.opaque_calls.iter() {
        println!("  {} x{}", function, records.len());
    }
    if !bundle.goals.is_empty() {
        println!("covered goals: {}", bundle.goals.join(", "));
    }
    Ok(())
}

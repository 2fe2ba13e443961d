//! Command-line driver: run or dump a compiled program.

use ariadne::{Color, Label, Report, ReportKind, Source};
use clap::{Parser, Subcommand};
use sable::ast::Program;
use sable::interp::{builtin, Bailout, FatalDiag, Run};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "sable", version, about = "Sable language runtime")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute a compiled program (JSON tree emitted by the front end)
    Run { file: PathBuf },
    /// Parse and pretty-print a compiled program
    Dump { file: PathBuf },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Run { file } => cmd_run(&file),
        Command::Dump { file } => cmd_dump(&file),
    };
    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn load_program(file: &Path) -> Result<Program, Box<dyn Error>> {
    let text = fs::read_to_string(file)?;
    let mut program: Program = serde_json::from_str(&text)?;
    builtin::install(&mut program);
    Ok(program)
}

fn cmd_run(file: &Path) -> Result<(), Box<dyn Error>> {
    let program = load_program(file)?;
    let mut run = Run::new(&program);
    match run.run_program() {
        Ok(()) => Ok(()),
        Err(Bailout::Fatal(diag)) => {
            report_fatal(&program, &diag);
            process::exit(1);
        }
        Err(_) => {
            eprintln!("error: execution interrupted");
            process::exit(1);
        }
    }
}

fn cmd_dump(file: &Path) -> Result<(), Box<dyn Error>> {
    let program = load_program(file)?;
    println!("{}", serde_json::to_string_pretty(&program)?);
    Ok(())
}

/// Render a fatal error, as a labeled source report when the program
/// carries its source text, otherwise as a plain message.
fn report_fatal(program: &Program, diag: &FatalDiag) {
    let msg = diag.error.to_string();
    match (&program.source, diag.span) {
        (Some(src), Some(span)) => {
            let file = src.name.as_str();
            let _ = Report::build(ReportKind::Error, (file, span.start..span.end))
                .with_message(&msg)
                .with_label(
                    Label::new((file, span.start..span.end))
                        .with_message(&msg)
                        .with_color(Color::Red),
                )
                .finish()
                .eprint((file, Source::from(src.text.as_str())));
        }
        (_, Some(span)) => eprintln!("error at {span}: {msg}"),
        _ => eprintln!("error: {msg}"),
    }
}

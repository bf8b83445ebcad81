//! The `lucario` command-line entry point.
//!
//! This binary is a thin external caller of `lucario-machine` and
//! `lucario-loader`: it owns argument parsing, logging setup, and mapping
//! a halt reason to a process exit code. Everything it does is documented
//! as an external contract in spec.md §6 — the interactive REPL, `debug`,
//! `monitor`, and `restart`/`shutdown` commands it does not implement are
//! out of the core's scope and remain contracts only.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use lucario_cpu::HaltReason;
use lucario_machine::Machine;

#[derive(Parser)]
#[command(name = "lucario", about = "Lucario decimal-word computer emulator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load and run one or more program images, each on a fresh machine.
    Run {
        /// Program image files, in spec.md §6's `_start`/`.NumeroPalabras`/`.NombreProg` format.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List program image files in a directory (default: the current directory).
    List {
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run { files } => run_files(&files),
        Command::List { dir } => list_dir(&dir),
    }
}

fn run_files(files: &[PathBuf]) -> ExitCode {
    let mut saw_failure = false;
    for path in files {
        match run_one(path) {
            Ok(reason) => {
                println!("{}: {}", path.display(), describe_halt(reason));
                if !matches!(reason, HaltReason::SyscallExit) {
                    saw_failure = true;
                }
            }
            Err(err) => {
                eprintln!("{}: {err:#}", path.display());
                saw_failure = true;
            }
        }
    }
    if saw_failure {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run_one(path: &Path) -> anyhow::Result<HaltReason> {
    let mut machine = Machine::new();
    let parsed = machine.load_program(path)?;
    log::info!(
        "running '{}' ({} words, start at line {})",
        parsed.name,
        parsed.word_count,
        parsed.start
    );
    Ok(machine.run())
}

fn describe_halt(reason: HaltReason) -> &'static str {
    match reason {
        HaltReason::InvalidInstruction => "halted: invalid instruction",
        HaltReason::InvalidAddress => "halted: invalid address",
        HaltReason::SyscallExit => "exited normally",
    }
}

fn list_dir(dir: &Path) -> ExitCode {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            eprintln!("{}: {err}", dir.display());
            return ExitCode::FAILURE;
        }
    };

    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| !name.starts_with('.'))
        .collect();
    names.sort();
    for name in names {
        println!("{name}");
    }
    ExitCode::SUCCESS
}

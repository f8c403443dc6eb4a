//! The `cool` binary: parses CLI arguments, runs the pipeline, writes the
//! emitted assembly, and maps pass failures onto the exit codes in spec.md
//! §6.

use std::io::Write;

use clap::Parser;
use cool::cli::Cli;
use cool::pipeline::{compile_file, CompileError};
use log::error;

const EXIT_WRONG_ARGS: i32 = -1;
const EXIT_MISSING_FILE: i32 = -2;
const EXIT_PARSE_ERROR: i32 = -3;
const EXIT_SEMANTIC_ERROR: i32 = -4;

fn main() {
    let args = match Cli::try_parse() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(EXIT_WRONG_ARGS);
        }
    };

    simple_logger::init_with_level((&args.verbosity).into()).unwrap();

    if !args.file.exists() {
        error!("input file {} does not exist", args.file.display());
        std::process::exit(EXIT_MISSING_FILE);
    }

    let asm = match compile_file(&args.file) {
        Ok(Ok(asm)) => asm,
        Ok(Err(CompileError::Parse(e))) => {
            error!("{e}");
            std::process::exit(EXIT_PARSE_ERROR);
        }
        Ok(Err(e)) => {
            error!("{e}");
            std::process::exit(EXIT_SEMANTIC_ERROR);
        }
        Err(io_err) => {
            error!("{io_err}");
            std::process::exit(EXIT_MISSING_FILE);
        }
    };

    match args.output {
        Some(path) => {
            std::fs::write(&path, asm).unwrap_or_else(|e| {
                error!("failed to write {}: {e}", path.display());
                std::process::exit(EXIT_MISSING_FILE);
            });
        }
        None => {
            std::io::stdout()
                .write_all(asm.as_bytes())
                .expect("stdout is writable");
        }
    }
}

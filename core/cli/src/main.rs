#![warn(clippy::pedantic)]

//! # wasm2cpp CLI
//!
//! Command line front end for the wasm2cpp transpiler.
//!
//! 1. Read the input wasm module (`--wasm`).
//! 2. Decode it into the module IR.
//! 3. Transpile it into C++ sources plus the runtime shim.
//! 4. Write everything into the output directory (`--out`).
//!
//! The phases run in order and the first failure stops the run; nothing
//! is written unless the whole module transpiled. Diagnostics go to
//! stderr, progress to stdout. `RUST_LOG=debug` enables section- and
//! function-level tracing.
//!
//! ## Exit codes
//! * 0 – success.
//! * 1 – I/O failure.
//! * 2 – malformed or invalid wasm module.
//! * 3 – unsupported wasm feature.

mod parser;

use clap::Parser;
use parser::Cli;
use std::{fs, process};
use wasm2cpp::Options;

fn main() {
    env_logger::init();
    let args = Cli::parse();

    if !args.wasm.exists() {
        eprintln!("Error: wasm file not found: {}", args.wasm.display());
        process::exit(1);
    }
    let bytes = match fs::read(&args.wasm) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Failed to read {}: {e}", args.wasm.display());
            process::exit(1);
        }
    };

    let module = match wasm2cpp::decode(&bytes) {
        Ok(module) => module,
        Err(e) => {
            eprintln!("Decode error: {e}");
            process::exit(2);
        }
    };
    println!(
        "Decoded: {} ({} functions, {} imports)",
        args.wasm.display(),
        module.func_count(),
        module.imports.len()
    );

    let options = Options {
        namespace: args.namespace,
        include_prefix: args.include,
    };
    let files = match wasm2cpp::transpile(&module, &options) {
        Ok(files) => files,
        Err(e) => {
            eprintln!("Transpile error: {e}");
            let code = if e.is_unsupported() { 3 } else { 2 };
            process::exit(code);
        }
    };

    if let Err(e) = wasm2cpp::write_output(&files, &args.out) {
        eprintln!("Failed to write output to {}: {e}", args.out.display());
        process::exit(1);
    }
    println!(
        "C++ sources generated at: {} ({} files)",
        args.out.display(),
        files.len()
    );
    process::exit(0);
}

#![warn(clippy::pedantic)]
//! Orchestration Crate for the wasm2cpp Transpiler
//!
//! wasm2cpp consumes a WebAssembly module produced by the Go toolchain
//! (`GOOS=js GOARCH=wasm`) and emits standalone C++17 sources that,
//! compiled together with the bundled runtime shim, execute the original
//! program natively, without a wasm runtime.
//!
//! ```text
//! app.wasm → decode → Module IR → transpile → C++ sources + runtime
//!                                              (this crate drives it)
//! ```
//!
//! Each phase is a standalone function delegating to a specialized crate:
//!
//! - [`decode`] — `wasm2cpp-decoder`: binary sections into a [`Module`].
//! - [`transpile`] — `wasm2cpp-codegen`: opcode lowering, control-flow
//!   restructuring, name mangling, runtime template rendering.
//! - [`write_output`] — writes the finished file set to a directory,
//!   only ever called after the whole module transpiled successfully, so
//!   a failing run leaves no partial output behind.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use wasm2cpp::{Options, decode, transpile, write_output};
//!
//! fn build(wasm: &[u8], out: &std::path::Path) -> anyhow::Result<()> {
//!     let module = decode(wasm)?;
//!     let files = transpile(&module, &Options::default())?;
//!     write_output(&files, out)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Error handling
//!
//! [`TranspileError`] keeps the two failure classes apart so the CLI can
//! map them to distinct exit codes: decode/validation failures (exit 2)
//! versus uses of wasm features outside the supported subset (exit 3).
//! Decode errors carry the byte offset of the offending construct.

use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

pub use wasm2cpp_codegen::{CodegenError, Options, OutputFile, StackVars};
pub use wasm2cpp_decoder::{DecodeError, DecodeErrorKind, Module};

/// A transpilation failure, decoding or code generation.
#[derive(Debug, Error)]
#[must_use = "errors must not be silently ignored"]
pub enum TranspileError {
    #[error("failed to decode wasm module: {0}")]
    Decode(#[from] DecodeError),

    #[error("failed to generate C++ sources: {0}")]
    Codegen(#[from] CodegenError),
}

impl TranspileError {
    /// Whether the failure is a use of an unsupported wasm feature
    /// rather than a malformed or invalid module.
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        match self {
            Self::Decode(_) => false,
            Self::Codegen(e) => e.is_unsupported(),
        }
    }
}

/// Decodes a wasm binary module into its IR.
///
/// # Errors
///
/// Returns the first malformed construct with its byte offset.
pub fn decode(bytes: &[u8]) -> Result<Module, TranspileError> {
    Ok(wasm2cpp_decoder::decode(bytes)?)
}

/// Lowers a decoded module into the full C++ file set (generated sources
/// plus rendered runtime templates), entirely in memory.
///
/// # Errors
///
/// See [`CodegenError`]; no files are produced on failure.
pub fn transpile(module: &Module, options: &Options) -> Result<Vec<OutputFile>, TranspileError> {
    Ok(wasm2cpp_codegen::transpile(module, options)?)
}

/// Decodes and transpiles in one step.
///
/// # Errors
///
/// Any [`TranspileError`] from the two phases.
pub fn transpile_bytes(
    bytes: &[u8],
    options: &Options,
) -> Result<Vec<OutputFile>, TranspileError> {
    transpile(&decode(bytes)?, options)
}

/// Writes the generated files into `out_dir`, creating it if needed.
///
/// # Errors
///
/// Any filesystem error, untouched.
pub fn write_output(files: &[OutputFile], out_dir: &Path) -> io::Result<()> {
    fs::create_dir_all(out_dir)?;
    for file in files {
        let path = out_dir.join(&file.name);
        log::debug!("writing {}", path.display());
        fs::write(path, &file.contents)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_module_bytes() -> Vec<u8> {
        let mut bytes = b"\0asm".to_vec();
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes
    }

    #[test]
    fn transpile_bytes_runs_both_phases() {
        let files = transpile_bytes(&minimal_module_bytes(), &Options::default()).unwrap();
        assert!(files.iter().any(|f| f.name == "module.h"));
        assert!(files.iter().any(|f| f.name == "go.cpp"));
    }

    #[test]
    fn decode_failures_are_not_unsupported() {
        let err = transpile_bytes(b"not wasm at all", &Options::default()).unwrap_err();
        assert!(matches!(err, TranspileError::Decode(_)));
        assert!(!err.is_unsupported());
    }
}

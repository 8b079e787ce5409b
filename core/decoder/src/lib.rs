#![warn(clippy::pedantic)]
//! WebAssembly binary decoder for the wasm2cpp transpiler.
//!
//! Parses a wasm binary module (magic `\0asm`, version 1) into the
//! in-memory IR consumed by `wasm2cpp-codegen`. The supported input is
//! the subset the Go wasm toolchain emits: MVP modules with a single
//! table of funcref, a single linear memory, single-result functions,
//! sign-extension and non-trapping float-to-int conversions, and
//! `memory.copy`/`memory.fill`.
//!
//! # Entry points
//!
//! - [`decode`] parses the section structure into a [`Module`]. Function
//!   bodies are kept as raw byte ranges ([`CodeEntry`]).
//! - [`decode_body`] decodes one function body on demand, so peak memory
//!   stays bounded by the largest single function.
//!
//! ```ignore
//! let bytes = std::fs::read("app.wasm")?;
//! let module = wasm2cpp_decoder::decode(&bytes)?;
//! for entry in &module.code {
//!     let body = wasm2cpp_decoder::decode_body(entry)?;
//!     // lower `body.instrs`
//! }
//! ```
//!
//! # Errors
//!
//! Every failure is a [`DecodeError`] carrying a [`DecodeErrorKind`] and
//! the absolute byte offset of the offending construct. Decoding is
//! all-or-nothing: no partially populated module is ever returned.

mod decode;
mod errors;
mod instr;
mod module;
mod reader;

pub use decode::decode;
pub use errors::{DecodeError, DecodeErrorKind};
pub use instr::{BlockType, FunctionBody, Instr, MemArg, decode_body};
pub use module::{
    CodeEntry, DataSegment, ElementSegment, Export, ExportKind, FuncType, Global, GlobalType,
    Import, ImportKind, InitExpr, MemoryType, Module, Names, TableType, ValType,
};

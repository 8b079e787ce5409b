#![warn(clippy::pedantic)]
//! C++ Code Generation for the wasm2cpp Transpiler
//!
//! Lowers a decoded wasm module ([`wasm2cpp_decoder::Module`]) into
//! standalone C++17 sources that, together with the runtime shim from
//! `wasm2cpp-runtime`, compile to a native program reproducing the wasm
//! semantics: integer wraparound, trapping division and conversions,
//! bounds-checked little-endian linear memory, and restructured control
//! flow.
//!
//! ## Lowering model
//!
//! wasm is a stack machine; C++ is not. During lowering the operand stack
//! is mirrored by [`StackVars`], a stack of C++ expression strings paired
//! with wasm types:
//!
//! - Pure operators fold operands into bigger expressions and emit
//!   nothing. `local.get 0; local.get 1; i32.add` becomes the single
//!   expression `(int32_t)((uint32_t)(local0) + (uint32_t)(local1))`.
//! - Side-effecting operators first materialize pending entries into
//!   numbered `stack{N}` temporaries so everything observable happens in
//!   wasm order, then emit a statement.
//!
//! Control flow is restructured with `goto`: each `block`/`loop`/`if`
//! frame gets a numbered label; branches to a loop jump to its
//! `label{N}_start`, branches to anything else jump past its
//! `label{N}_end`. Result-carrying frames copy the stack top into a
//! pre-declared temporary before jumping.
//!
//! ## Output
//!
//! [`transpile`] returns the full file set (generated `module.h`,
//! `module.cpp`, `functions.cpp` plus the rendered runtime templates) as
//! in-memory [`OutputFile`]s. Generation is deterministic: identical
//! input bytes yield byte-identical sources.

mod cpp;
mod emit;
mod errors;
mod func;
mod labels;
mod mangle;
mod stack;

pub use emit::{Options, OutputFile, transpile};
pub use errors::CodegenError;
pub use stack::StackVars;

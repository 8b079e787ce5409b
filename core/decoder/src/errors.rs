//! Error types for the wasm binary decoder.
//!
//! Every failure carries the absolute byte offset at which it was detected,
//! so CLI diagnostics can point into the input file.

use thiserror::Error;

/// The class of malformed input the decoder ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeErrorKind {
    /// The input does not start with `\0asm`.
    #[error("bad magic number")]
    BadMagic,

    /// The module version field is not 1.
    #[error("unsupported wasm version")]
    BadVersion,

    /// A section payload ended early, overran its declared size, or the
    /// input ended in the middle of a construct.
    #[error("truncated section")]
    TruncatedSection,

    /// A non-custom section id outside 1..=12.
    #[error("unknown section id")]
    UnknownSection,

    /// A malformed or out-of-range LEB128 integer.
    #[error("invalid LEB128 integer")]
    InvalidLEB,

    /// A byte that is not a valid value, reference, block, or limits type.
    #[error("invalid value type")]
    InvalidValType,

    /// A byte that is not an opcode of the supported instruction subset.
    #[error("invalid opcode")]
    InvalidOpcode,

    /// A vector length prefix larger than the remaining input could hold.
    #[error("oversized vector")]
    OversizedVector,
}

/// A decoding failure at a specific byte offset of the input module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{kind} at offset {offset:#x}")]
#[must_use = "errors must not be silently ignored"]
pub struct DecodeError {
    pub kind: DecodeErrorKind,
    pub offset: usize,
}

impl DecodeError {
    pub(crate) fn new(kind: DecodeErrorKind, offset: usize) -> Self {
        Self { kind, offset }
    }
}

//! Error types for C++ code generation.

use thiserror::Error;
use wasm2cpp_decoder::DecodeError;

/// A failure while lowering a decoded module to C++ sources.
#[derive(Debug, Error)]
#[must_use = "errors must not be silently ignored"]
pub enum CodegenError {
    /// The module uses a wasm construct outside the supported subset.
    #[error("unsupported wasm feature: {0}")]
    Unsupported(String),

    /// The module violates a validation invariant.
    #[error("invalid module: {0}")]
    Validation(String),

    /// An operand was popped from an empty symbolic stack.
    #[error("symbolic stack underflow in function {0}")]
    StackUnderflow(u32),

    /// A branch targeted a depth outside the label stack.
    #[error("branch depth {depth} out of range in function {func}")]
    BadBranchDepth { func: u32, depth: u32 },

    /// A lazily decoded function body was malformed.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl CodegenError {
    /// Whether this failure should map to the "unsupported wasm feature"
    /// exit code rather than the decode/validation one.
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }
}

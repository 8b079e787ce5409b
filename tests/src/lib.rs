//! End to end tests: assembled wasm modules driven through the full
//! decode and transpile pipeline.

#[cfg(test)]
pub(crate) mod utils;

#[cfg(test)]
mod decoder;

#[cfg(test)]
mod transpiler;

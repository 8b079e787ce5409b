//! Full-pipeline transpilation tests.

mod codegen;
mod hello;
mod runtime;

use wasm2cpp::{Options, OutputFile};

pub(crate) fn transpile_bytes(bytes: &[u8]) -> Vec<OutputFile> {
    wasm2cpp::transpile_bytes(bytes, &Options::default()).unwrap()
}

pub(crate) fn file<'a>(files: &'a [OutputFile], name: &str) -> &'a str {
    &files
        .iter()
        .find(|f| f.name == name)
        .unwrap_or_else(|| panic!("missing output file {name}"))
        .contents
}

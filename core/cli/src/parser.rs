//! Command line argument parsing for the wasm2cpp transpiler.
//!
//! Defines the CLI surface using `clap`. The `Cli` struct captures all
//! flags passed to the `wasm2cpp` binary.

use clap::Parser;

/// Command line interface definition for the wasm2cpp transpiler.
///
/// One invocation transpiles one wasm module into a directory of C++
/// sources plus the runtime shim. The output directory is created when
/// absent and is only written after the whole module transpiled, so a
/// failing run never leaves partial output behind.
///
/// ## Exit codes
///
/// * 0 – success.
/// * 1 – I/O failure (unreadable input, unwritable output).
/// * 2 – malformed or invalid wasm module.
/// * 3 – the module uses a wasm feature outside the supported subset.
///
/// ## Example
///
/// ```bash
/// wasm2cpp --wasm app.wasm --out out --namespace myapp
/// ```
#[derive(Parser)]
#[command(
    name = "wasm2cpp",
    author,
    version,
    about = "Go-wasm to C++ transpiler",
    long_about = "Transpiles a WebAssembly module produced by the Go toolchain \
(GOOS=js GOARCH=wasm) into standalone C++ sources. The generated program embeds \
the wasm semantics directly and links against the bundled runtime, so no wasm \
runtime is needed at execution time."
)]
pub(crate) struct Cli {
    /// Path to the input wasm module.
    #[clap(long = "wasm", value_name = "PATH")]
    pub(crate) wasm: std::path::PathBuf,

    /// Output directory for the generated sources. Created if absent.
    #[clap(long = "out", value_name = "DIR", default_value = "out")]
    pub(crate) out: std::path::PathBuf,

    /// C++ namespace for the generated program and runtime.
    #[clap(long = "namespace", value_name = "IDENT", default_value = "wasm2cpp")]
    pub(crate) namespace: String,

    /// Directory prefix for the generated #include directives, for
    /// projects that move the sources under an include root.
    #[clap(long = "include", value_name = "DIR")]
    pub(crate) include: Option<String>,
}

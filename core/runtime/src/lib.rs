#![warn(clippy::pedantic)]
//! The hand-written C++ runtime shim, embedded as templates.
//!
//! The generated program links against these sources: linear memory
//! (`mem.*`), the JS-style value model and host-binding registry
//! (`js.*`), the `syscall/js` bridge plus the cooperative goroutine
//! scheduler (`go.*`), trap handling (`trap.*`), and the inline numeric
//! helpers the lowered expressions call (`numeric.h`).
//!
//! Templates are verbatim C++ except for two placeholders substituted at
//! emit time: `{{ns}}` (the target namespace) and `{{include}}` (the
//! include-path prefix, empty or ending in `/`). [`render`] performs the
//! substitution; the emit driver writes the results next to the generated
//! sources, so the output directory is self-contained.

/// One embedded runtime source file.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeFile {
    /// File name relative to the output directory.
    pub name: &'static str,
    /// Template contents with `{{ns}}`/`{{include}}` placeholders.
    pub contents: &'static str,
}

/// Every runtime file, in the order they are written.
pub const FILES: &[RuntimeFile] = &[
    RuntimeFile {
        name: "trap.h",
        contents: include_str!("../cpp/trap.h"),
    },
    RuntimeFile {
        name: "trap.cpp",
        contents: include_str!("../cpp/trap.cpp"),
    },
    RuntimeFile {
        name: "numeric.h",
        contents: include_str!("../cpp/numeric.h"),
    },
    RuntimeFile {
        name: "mem.h",
        contents: include_str!("../cpp/mem.h"),
    },
    RuntimeFile {
        name: "mem.cpp",
        contents: include_str!("../cpp/mem.cpp"),
    },
    RuntimeFile {
        name: "js.h",
        contents: include_str!("../cpp/js.h"),
    },
    RuntimeFile {
        name: "js.cpp",
        contents: include_str!("../cpp/js.cpp"),
    },
    RuntimeFile {
        name: "go.h",
        contents: include_str!("../cpp/go.h"),
    },
    RuntimeFile {
        name: "go.cpp",
        contents: include_str!("../cpp/go.cpp"),
    },
];

/// Substitutes the namespace and include-prefix placeholders.
#[must_use]
pub fn render(template: &str, namespace: &str, include_prefix: &str) -> String {
    template
        .replace("{{ns}}", namespace)
        .replace("{{include}}", include_prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime_file(name: &str) -> &'static str {
        FILES
            .iter()
            .find(|f| f.name == name)
            .unwrap_or_else(|| panic!("missing runtime file {name}"))
            .contents
    }

    #[test]
    fn render_substitutes_all_placeholders() {
        for file in FILES {
            let rendered = render(file.contents, "demo", "gen/");
            assert!(!rendered.contains("{{ns}}"), "{}", file.name);
            assert!(!rendered.contains("{{include}}"), "{}", file.name);
            assert!(rendered.contains("namespace demo"), "{}", file.name);
        }
    }

    #[test]
    fn bridge_implements_the_full_import_set() {
        let go = runtime_file("go.cpp");
        for name in [
            "runtime.wasmExit",
            "runtime.wasmWrite",
            "runtime.resetMemoryDataView",
            "runtime.nanotime1",
            "runtime.walltime1",
            "runtime.scheduleTimeoutEvent",
            "runtime.clearTimeoutEvent",
            "runtime.getRandomData",
            "syscall/js.finalizeRef",
            "syscall/js.stringVal",
            "syscall/js.valueGet",
            "syscall/js.valueSet",
            "syscall/js.valueDelete",
            "syscall/js.valueIndex",
            "syscall/js.valueSetIndex",
            "syscall/js.valueCall",
            "syscall/js.valueInvoke",
            "syscall/js.valueNew",
            "syscall/js.valueLength",
            "syscall/js.valuePrepareString",
            "syscall/js.valueLoadString",
            "syscall/js.valueInstanceOf",
            "syscall/js.copyBytesToGo",
            "syscall/js.copyBytesToJS",
        ] {
            assert!(go.contains(&format!("\"{name}\"")), "missing import {name}");
        }
    }

    #[test]
    fn binding_surface_is_complete() {
        let js = runtime_file("js.h");
        for method in [
            "Get", "Set", "Delete", "Index", "SetIndex", "Call", "Invoke", "New", "InstanceOf",
            "Equal", "Length", "CopyBytesToGo", "CopyBytesToJS",
        ] {
            assert!(js.contains(method), "missing BindingValue::{method}");
        }
        assert!(runtime_file("go.h").contains("Bind("));
        assert!(runtime_file("go.cpp").contains("\"c++\""));
    }

    #[test]
    fn traps_use_the_canonical_messages() {
        let numeric = runtime_file("numeric.h");
        for message in [
            "integer divide by zero",
            "integer overflow",
            "invalid conversion to integer",
        ] {
            assert!(numeric.contains(message), "missing trap {message}");
        }
        assert!(runtime_file("mem.cpp").contains("out of bounds memory access"));
    }
}

//! Deterministic function name mangling.
//!
//! Every function is `f{index}`, suffixed with a sanitized debug name when
//! one is available: the import field for imported functions, the name
//! section entry for defined ones. The index prefix keeps names unique and
//! stable regardless of what the sanitized suffixes collapse to.

use wasm2cpp_decoder::Module;

use crate::cpp;

pub(crate) fn func_ident(module: &Module, func: u32) -> String {
    let suffix = if let Some(import) = module.func_import(func) {
        Some(cpp::sanitize(&import.field))
    } else {
        module.func_name(func).map(cpp::sanitize)
    };
    match suffix {
        Some(s) if !s.is_empty() => format!("f{func}_{s}"),
        _ => format!("f{func}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm2cpp_decoder::{FuncType, Import, ImportKind, Module};

    #[test]
    fn imports_use_field_names_and_locals_use_name_section() {
        let mut module = Module {
            types: vec![FuncType::default()],
            imports: vec![Import {
                module: "go".to_string(),
                field: "runtime.wasmExit".to_string(),
                kind: ImportKind::Func { type_index: 0 },
            }],
            functions: vec![0, 0],
            ..Module::default()
        };
        module
            .names
            .functions
            .insert(1, "runtime.alloc".to_string());

        assert_eq!(func_ident(&module, 0), "f0_runtime_wasmExit");
        assert_eq!(func_ident(&module, 1), "f1_runtime_alloc");
        assert_eq!(func_ident(&module, 2), "f2");
    }

    #[test]
    fn colliding_debug_names_stay_distinct() {
        let mut module = Module {
            types: vec![FuncType::default()],
            functions: vec![0, 0],
            ..Module::default()
        };
        module.names.functions.insert(0, "a.b".to_string());
        module.names.functions.insert(1, "a/b".to_string());
        assert_ne!(func_ident(&module, 0), func_ident(&module, 1));
    }
}

//! The emit contract between generated code and the runtime shim:
//! generated sources name runtime symbols, so both sides must agree.

use crate::transpiler::{file, transpile_bytes};
use crate::utils::hello_module;
use wasm2cpp_decoder::decode;

#[test]
fn every_imported_host_call_is_implemented_by_the_bridge() {
    let hello = hello_module();
    let module = decode(&hello.bytes).unwrap();
    let files = transpile_bytes(&hello.bytes);
    let bridge = file(&files, "go.cpp");
    for import in &module.imports {
        assert!(
            bridge.contains(&format!("\"{}\"", import.field)),
            "runtime bridge does not handle {}",
            import.field
        );
    }
}

#[test]
fn the_output_contains_every_runtime_template() {
    let files = transpile_bytes(&hello_module().bytes);
    for template in wasm2cpp_runtime::FILES {
        assert!(
            files.iter().any(|f| f.name == template.name),
            "runtime template {} missing from the output",
            template.name
        );
    }
}

#[test]
fn the_scheduler_primitives_are_present() {
    let files = transpile_bytes(&hello_module().bytes);
    let bridge = file(&files, "go.cpp");
    assert!(bridge.contains("\"runtime.scheduleTimeoutEvent\""));
    assert!(bridge.contains("\"runtime.clearTimeoutEvent\""));
    let header = file(&files, "go.h");
    assert!(header.contains("void Enqueue(std::function<void()> task);"));
    assert!(header.contains("int Run(std::unique_ptr<Inst> inst"));
}

#[test]
fn the_binding_registry_hangs_off_the_cpp_root_namespace() {
    let files = transpile_bytes(&hello_module().bytes);
    assert!(file(&files, "go.cpp").contains("global_.Set(\"c++\", bindings_);"));
    assert!(file(&files, "go.h").contains("void Bind(const std::string& name, BindingFunc fn);"));
    assert!(file(&files, "js.h").contains("using BindingFunc"));
}

#[test]
fn generated_code_and_runtime_share_one_namespace() {
    let files = transpile_bytes(&hello_module().bytes);
    for name in ["module.h", "functions.cpp", "go.h", "js.cpp", "mem.h"] {
        assert!(
            file(&files, name).contains("namespace wasm2cpp"),
            "{name} is not in the default namespace"
        );
    }
}

#[test]
fn the_interface_methods_match_the_generated_overrides() {
    let files = transpile_bytes(&hello_module().bytes);
    let interface = file(&files, "go.h");
    let header = file(&files, "module.h");
    for method in [
        "void run(int32_t argc, int32_t argv)",
        "void resume()",
        "int32_t getsp()",
        "Mem* mem()",
    ] {
        assert!(interface.contains(&format!("virtual {method} = 0;")));
        assert!(header.contains(&format!("{method} override;")));
    }
}

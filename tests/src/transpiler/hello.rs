//! The hello-world seed scenario, up to the C++ boundary: the generated
//! program must reference the runtime symbols that, once compiled, print
//! the greeting and exit.

use crate::transpiler::{file, transpile_bytes};
use crate::utils::hello_module;

#[test]
fn imports_are_bridged_by_name() {
    let files = transpile_bytes(&hello_module().bytes);
    let functions = file(&files, "functions.cpp");
    assert!(functions.contains("go_->InvokeImport(\"runtime.wasmWrite\", local0);"));
    assert!(functions.contains("go_->InvokeImport(\"runtime.wasmExit\", local0);"));
}

#[test]
fn the_greeting_lands_in_a_data_segment() {
    let hello = hello_module();
    let files = transpile_bytes(&hello.bytes);
    let source = file(&files, "module.cpp");
    assert!(source.contains("const uint8_t kData0[] = {"));
    // "Hello, World!\n" starts with 0x48 and ends with 0x0a.
    assert!(source.contains("0x48,"));
    assert!(source.contains("0x0a,"));
    assert!(source.contains("mem_->WriteBytes(4096, kData0, sizeof(kData0));"));
}

#[test]
fn the_export_trio_is_wired_to_the_runtime_interface() {
    let files = transpile_bytes(&hello_module().bytes);
    let source = file(&files, "module.cpp");
    // Function 2 carries the name-section name "runtime.run".
    assert!(source.contains(
        "void ModuleInst::run(int32_t argc, int32_t argv) { f2_runtime_run(argc, argv); }"
    ));
    assert!(source.contains("void ModuleInst::resume() { f3(); }"));
    assert!(source.contains("int32_t ModuleInst::getsp() { return f4(); }"));
    assert!(source.contains("Mem* ModuleInst::mem() { return mem_.get(); }"));
}

#[test]
fn table_memory_and_globals_are_initialized() {
    let files = transpile_bytes(&hello_module().bytes);
    let source = file(&files, "module.cpp");
    assert!(source.contains("std::make_unique<Mem>(16, -1)"));
    assert!(source.contains("table_.assign(4, -1);"));
    assert!(source.contains("table_[1] = 3;"));
    assert!(source.contains("global0 = INT64_C(7);"));
}

#[test]
fn header_forward_declares_all_functions() {
    let files = transpile_bytes(&hello_module().bytes);
    let header = file(&files, "module.h");
    for decl in [
        "void f0_runtime_wasmWrite(int32_t local0);",
        "void f1_runtime_wasmExit(int32_t local0);",
        "void f2_runtime_run(int32_t local0, int32_t local1);",
        "void f3();",
        "int32_t f4();",
    ] {
        assert!(header.contains(decl), "missing declaration: {decl}");
    }
}

#[test]
fn same_input_bytes_give_byte_identical_output() {
    let hello = hello_module();
    let first = transpile_bytes(&hello.bytes);
    let second = transpile_bytes(&hello.bytes);
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.name, b.name);
        assert_eq!(a.contents, b.contents, "{} differs between runs", a.name);
    }
}

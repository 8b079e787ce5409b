//! Control flow and numeric lowering through the full byte pipeline.

use crate::transpiler::{file, transpile_bytes};
use crate::utils::{F64, I32, code_entry, export, func_type, module, section, uleb, vec_of};

/// Four local functions: signed division, trapping truncation, a counting
/// loop, and an indirect dispatch through a two-slot table.
fn fixture() -> Vec<u8> {
    let types = section(
        1,
        &vec_of(&[
            func_type(&[], &[I32]),         // 0: thunk, used by call_indirect
            func_type(&[I32, I32], &[I32]), // 1: arith
            func_type(&[F64], &[I32]),      // 2: conv
            func_type(&[I32], &[I32]),      // 3: dispatch
        ]),
    );
    let functions = section(3, &vec_of(&[uleb(1), uleb(2), uleb(0), uleb(3)]));
    let table = section(4, &[0x01, 0x70, 0x00, 0x02]);
    let exports = section(7, &vec_of(&[export("arith", 0x00, 0)]));
    // table[0] = the counting loop thunk
    let elements = section(9, &[0x01, 0x00, 0x41, 0x00, 0x0B, 0x01, 0x02]);
    let code = section(
        10,
        &vec_of(&[
            // arith: local0 / local1, signed
            code_entry(&[], &[0x20, 0x00, 0x20, 0x01, 0x6D, 0x0B]),
            // conv: i32.trunc_f64_s(local0)
            code_entry(&[], &[0x20, 0x00, 0xAA, 0x0B]),
            // thunk: loop { local0 += 1; br_if local0 < 10 } -> local0
            code_entry(
                &[(1, I32)],
                &[
                    0x03, 0x40, // loop
                    0x20, 0x00, 0x41, 0x01, 0x6A, // local0 + 1
                    0x22, 0x00, // local.tee 0
                    0x41, 0x0A, 0x48, // < 10
                    0x0D, 0x00, // br_if 0
                    0x0B, // end loop
                    0x20, 0x00, 0x0B,
                ],
            ),
            // dispatch: call_indirect (type 0) via local0
            code_entry(&[], &[0x20, 0x00, 0x11, 0x00, 0x00, 0x0B]),
        ]),
    );
    module(&[types, functions, table, exports, elements, code])
}

#[test]
fn numeric_edges_go_through_trapping_helpers() {
    let files = transpile_bytes(&fixture());
    let functions = file(&files, "functions.cpp");
    assert!(functions.contains("DivS32((local0), (local1))"));
    assert!(functions.contains("TruncF64ToI32S((local0))"));
}

#[test]
fn loops_restructure_to_labels_and_gotos() {
    let files = transpile_bytes(&fixture());
    let functions = file(&files, "functions.cpp");
    assert!(functions.contains("label0_start:;"));
    assert!(functions.contains("goto label0_start;"));
    // Declared locals are zero-initialized.
    assert!(functions.contains("int32_t local0 = 0;"));
}

#[test]
fn call_indirect_gets_a_checked_dispatcher() {
    let files = transpile_bytes(&fixture());
    let functions = file(&files, "functions.cpp");
    assert!(functions.contains("int32_t ModuleInst::callIndirect0(int32_t index) {"));
    assert!(functions.contains("Trap(\"undefined element\");"));
    assert!(functions.contains("Trap(\"uninitialized element\");"));
    assert!(functions.contains("Trap(\"indirect call type mismatch\");"));
    // Only the thunk matches the dispatched signature.
    assert!(functions.contains("case 2:\n    return f2();"));
    assert!(!functions.contains("case 0:\n    return f0("));
}

#[test]
fn exported_functions_get_public_wrappers() {
    let files = transpile_bytes(&fixture());
    let header = file(&files, "module.h");
    let source = file(&files, "module.cpp");
    assert!(header.contains("int32_t export_arith(int32_t local0, int32_t local1);"));
    assert!(source.contains("int32_t ModuleInst::export_arith(int32_t local0, int32_t local1) {"));
    assert!(source.contains("return f0(local0, local1);"));
    // The standard trio is absent from this module, so the runtime
    // entry points trap instead.
    assert!(source.contains("Trap(\"missing export: run\")"));
}

#[test]
fn every_helper_the_lowering_emits_exists_in_the_runtime() {
    let files = transpile_bytes(&fixture());
    let functions = file(&files, "functions.cpp");
    let numeric = file(&files, "numeric.h");
    for helper in ["DivS32", "TruncF64ToI32S"] {
        assert!(functions.contains(helper));
        assert!(
            numeric.contains(&format!("{helper}(")),
            "{helper} missing from numeric.h"
        );
    }
}

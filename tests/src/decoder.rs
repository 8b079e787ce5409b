//! Decoding the assembled fixtures back into the module IR.

use wasm2cpp_decoder::{DecodeErrorKind, ExportKind, InitExpr, ValType, decode, decode_body};

use crate::utils::{self, hello_module};

#[test]
fn hello_module_decodes_completely() -> anyhow::Result<()> {
    let hello = hello_module();
    let module = decode(&hello.bytes)?;

    assert_eq!(module.types.len(), 4);
    assert_eq!(module.imports.len(), 2);
    assert_eq!(module.imports[0].module, "go");
    assert_eq!(module.imports[0].field, "runtime.wasmWrite");
    assert_eq!(module.func_count(), 5);
    assert_eq!(module.table().unwrap().initial, 4);
    assert_eq!(module.memory().unwrap().initial_pages, 16);
    assert_eq!(module.globals.len(), 1);
    assert_eq!(module.globals[0].init, InitExpr::I64Const(7));

    let run = module.export("run").unwrap();
    assert_eq!(run.kind, ExportKind::Func);
    assert_eq!(run.index, 2);
    assert_eq!(module.exported_func("getsp"), Some(4));

    assert_eq!(module.elements.len(), 1);
    assert_eq!(module.elements[0].func_indices, vec![3]);

    assert_eq!(module.data.len(), 1);
    assert_eq!(module.data[0].offset, Some(InitExpr::I32Const(4096)));
    assert_eq!(module.data[0].bytes, hello.greeting);

    assert_eq!(module.func_name(2), Some("runtime.run"));
    Ok(())
}

#[test]
fn function_bodies_decode_lazily_from_stored_slices() {
    let hello = hello_module();
    let module = decode(&hello.bytes).unwrap();
    assert_eq!(module.code.len(), 3);

    let run = decode_body(&module.code[0]).unwrap();
    assert!(run.locals.is_empty());
    assert_eq!(run.instrs.len(), 5);

    let getsp = decode_body(&module.code[2]).unwrap();
    assert_eq!(
        getsp.instrs[0],
        wasm2cpp_decoder::Instr::I32Const(4096)
    );

    // The stored slices point back into the original file.
    for entry in &module.code {
        assert_eq!(
            &hello.bytes[entry.offset..entry.offset + entry.bytes.len()],
            &entry.bytes[..]
        );
    }
}

#[test]
fn signatures_resolve_through_the_index_space() {
    let module = decode(&hello_module().bytes).unwrap();
    // Imports come first.
    assert_eq!(
        module.func_type(0).unwrap().params,
        vec![ValType::I32]
    );
    // run is the first defined function.
    assert_eq!(
        module.func_type(2).unwrap().params,
        vec![ValType::I32, ValType::I32]
    );
    assert_eq!(module.func_type(4).unwrap().results, vec![ValType::I32]);
}

#[test]
fn a_flipped_byte_reports_its_offset() {
    let hello = hello_module();
    let mut bytes = hello.bytes;
    // Corrupt the type section's first form byte (0x60).
    let pos = bytes.iter().position(|b| *b == 0x60).unwrap();
    bytes[pos] = 0x59;
    let err = decode(&bytes).unwrap_err();
    assert_eq!(err.kind, DecodeErrorKind::InvalidValType);
    assert_eq!(err.offset, pos);
}

#[test]
fn truncated_module_fails_cleanly() {
    let hello = hello_module();
    let cut = hello.bytes.len() - 10;
    let err = decode(&hello.bytes[..cut]).unwrap_err();
    // Somewhere in the trailing sections, with a meaningful offset.
    assert!(err.offset <= cut);
}

#[test]
fn unknown_section_ids_are_rejected() {
    let bytes = utils::module(&[utils::section(13, &[])]);
    let err = decode(&bytes).unwrap_err();
    assert_eq!(err.kind, DecodeErrorKind::UnknownSection);
}

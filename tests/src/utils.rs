//! Byte-level wasm assembly helpers for the end to end tests.
//!
//! Fixtures are built in code rather than checked in as binaries, so a
//! failing test shows exactly which bytes produced the behavior.

pub(crate) const I32: u8 = 0x7F;
pub(crate) const I64: u8 = 0x7E;
pub(crate) const F64: u8 = 0x7C;

pub(crate) fn uleb(mut value: u32) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            break;
        }
        out.push(byte | 0x80);
    }
    out
}

pub(crate) fn name(s: &str) -> Vec<u8> {
    let mut out = uleb(u32::try_from(s.len()).unwrap());
    out.extend_from_slice(s.as_bytes());
    out
}

pub(crate) fn section(id: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = vec![id];
    out.extend(uleb(u32::try_from(payload.len()).unwrap()));
    out.extend_from_slice(payload);
    out
}

/// `0x60` function type with raw value-type bytes.
pub(crate) fn func_type(params: &[u8], results: &[u8]) -> Vec<u8> {
    let mut out = vec![0x60];
    out.extend(uleb(u32::try_from(params.len()).unwrap()));
    out.extend_from_slice(params);
    out.extend(uleb(u32::try_from(results.len()).unwrap()));
    out.extend_from_slice(results);
    out
}

/// A vector payload: count prefix followed by the encoded items.
pub(crate) fn vec_of(items: &[Vec<u8>]) -> Vec<u8> {
    let mut out = uleb(u32::try_from(items.len()).unwrap());
    for item in items {
        out.extend_from_slice(item);
    }
    out
}

/// Wasm header plus the given sections.
pub(crate) fn module(sections: &[Vec<u8>]) -> Vec<u8> {
    let mut out = b"\0asm".to_vec();
    out.extend_from_slice(&1u32.to_le_bytes());
    for s in sections {
        out.extend_from_slice(s);
    }
    out
}

/// A function import of the given type from the `go` pseudo-module.
pub(crate) fn go_import(field: &str, type_index: u32) -> Vec<u8> {
    let mut out = name("go");
    out.extend(name(field));
    out.push(0x00);
    out.extend(uleb(type_index));
    out
}

pub(crate) fn export(export_name: &str, kind: u8, index: u32) -> Vec<u8> {
    let mut out = name(export_name);
    out.push(kind);
    out.extend(uleb(index));
    out
}

/// A code entry: declared local groups plus body bytes (including `end`).
pub(crate) fn code_entry(local_groups: &[(u32, u8)], body: &[u8]) -> Vec<u8> {
    let mut payload = uleb(u32::try_from(local_groups.len()).unwrap());
    for (count, ty) in local_groups {
        payload.extend(uleb(*count));
        payload.push(*ty);
    }
    payload.extend_from_slice(body);
    let mut out = uleb(u32::try_from(payload.len()).unwrap());
    out.extend_from_slice(&payload);
    out
}

/// The shape a Go build produces: two host imports, linear memory with a
/// greeting in a data segment, a funcref table, and the run/resume/getsp
/// export trio.
pub(crate) struct HelloModule {
    pub(crate) bytes: Vec<u8>,
    pub(crate) greeting: &'static [u8],
}

pub(crate) fn hello_module() -> HelloModule {
    let greeting: &[u8] = b"Hello, World!\n";

    let types = section(
        1,
        &vec_of(&[
            func_type(&[I32], &[]),       // 0: host import shape
            func_type(&[I32, I32], &[]),  // 1: run
            func_type(&[], &[]),          // 2: resume
            func_type(&[], &[I32]),       // 3: getsp
        ]),
    );
    let imports = section(
        2,
        &vec_of(&[
            go_import("runtime.wasmWrite", 0),
            go_import("runtime.wasmExit", 0),
        ]),
    );
    let functions = section(3, &vec_of(&[uleb(1), uleb(2), uleb(3)]));
    let table = section(4, &[0x01, 0x70, 0x00, 0x04]);
    let memory = section(5, &[0x01, 0x00, 0x10]);
    let globals = section(6, &[0x01, I64, 0x01, 0x42, 0x07, 0x0B]);
    let exports = section(
        7,
        &vec_of(&[
            export("run", 0x00, 2),
            export("resume", 0x00, 3),
            export("getsp", 0x00, 4),
            export("mem", 0x02, 0),
        ]),
    );
    // table[1] = resume
    let elements = section(9, &[0x01, 0x00, 0x41, 0x01, 0x0B, 0x01, 0x03]);
    let code = section(
        10,
        &vec_of(&[
            // run: forward the stack pointer to both imports.
            code_entry(&[], &[0x20, 0x00, 0x10, 0x00, 0x20, 0x00, 0x10, 0x01, 0x0B]),
            // resume: nothing pending.
            code_entry(&[], &[0x0B]),
            // getsp: a fixed stack pointer.
            code_entry(&[], &[0x41, 0x80, 0x20, 0x0B]),
        ]),
    );
    let mut data_payload = vec![0x01, 0x00, 0x41, 0x80, 0x20, 0x0B];
    data_payload.extend(uleb(u32::try_from(greeting.len()).unwrap()));
    data_payload.extend_from_slice(greeting);
    let data = section(11, &data_payload);

    // Custom name section: function 2 is "runtime.run".
    let mut name_payload = name("name");
    let mut sub = uleb(1);
    sub.extend(uleb(2));
    sub.extend(name("runtime.run"));
    name_payload.push(1);
    name_payload.extend(uleb(u32::try_from(sub.len()).unwrap()));
    name_payload.extend_from_slice(&sub);
    let names = section(0, &name_payload);

    HelloModule {
        bytes: module(&[
            types, imports, functions, table, memory, globals, exports, elements, code, data,
            names,
        ]),
        greeting,
    }
}

//! Top-level module decoding: magic, version, and the section loop.
//!
//! Sections are length-prefixed; every section payload must end exactly at
//! its declared boundary. Custom sections are skipped, except `name`,
//! which is mined for debug names (best effort: a malformed name section
//! is logged and dropped, never fatal).

use rustc_hash::FxHashMap;

use crate::errors::{DecodeError, DecodeErrorKind};
use crate::instr::read_val_type;
use crate::module::{
    CodeEntry, DataSegment, ElementSegment, Export, ExportKind, FuncType, Global, GlobalType,
    Import, ImportKind, InitExpr, MemoryType, Module, TableType,
};
use crate::reader::Reader;

const WASM_MAGIC: &[u8; 4] = b"\0asm";
const WASM_VERSION: u32 = 1;

/// Decodes a wasm binary module into its in-memory IR.
///
/// # Errors
///
/// Returns a [`DecodeError`] with the byte offset of the first malformed
/// construct. No partial module is ever produced.
pub fn decode(bytes: &[u8]) -> Result<Module, DecodeError> {
    let mut r = Reader::new(bytes);

    let magic_offset = r.offset();
    if r.read_exact(4).map_err(|mut e| {
        e.kind = DecodeErrorKind::BadMagic;
        e.offset = magic_offset;
        e
    })? != WASM_MAGIC
    {
        return Err(r.fail_at(DecodeErrorKind::BadMagic, magic_offset));
    }
    let version_offset = r.offset();
    if r.read_u32_le().map_err(|mut e| {
        e.kind = DecodeErrorKind::BadVersion;
        e.offset = version_offset;
        e
    })? != WASM_VERSION
    {
        return Err(r.fail_at(DecodeErrorKind::BadVersion, version_offset));
    }

    let mut module = Module::default();
    while !r.is_empty() {
        let id_offset = r.offset();
        let id = r.read_u8()?;
        let size_offset = r.offset();
        let size = r.read_var_u32()? as usize;
        if size > r.remaining() {
            return Err(r.fail_at(DecodeErrorKind::TruncatedSection, size_offset));
        }
        let mut section = r.sub_reader(size)?;
        log::debug!("section {id} at {id_offset:#x} ({size} bytes)");
        match id {
            0 => decode_custom_section(&mut section, &mut module),
            1 => decode_type_section(&mut section, &mut module)?,
            2 => decode_import_section(&mut section, &mut module)?,
            3 => decode_function_section(&mut section, &mut module)?,
            4 => decode_table_section(&mut section, &mut module)?,
            5 => decode_memory_section(&mut section, &mut module)?,
            6 => decode_global_section(&mut section, &mut module)?,
            7 => decode_export_section(&mut section, &mut module)?,
            8 => module.start = Some(section.read_var_u32()?),
            9 => decode_element_section(&mut section, &mut module)?,
            10 => decode_code_section(&mut section, &mut module)?,
            11 => decode_data_section(&mut section, &mut module)?,
            12 => module.data_count = Some(section.read_var_u32()?),
            _ => return Err(r.fail_at(DecodeErrorKind::UnknownSection, id_offset)),
        }
        if id != 0 && !section.is_empty() {
            return Err(section.fail(DecodeErrorKind::TruncatedSection));
        }
    }
    Ok(module)
}

fn decode_type_section(r: &mut Reader<'_>, module: &mut Module) -> Result<(), DecodeError> {
    let count = r.read_vec_len()?;
    for _ in 0..count {
        let form_offset = r.offset();
        if r.read_u8()? != 0x60 {
            return Err(r.fail_at(DecodeErrorKind::InvalidValType, form_offset));
        }
        let mut ty = FuncType::default();
        for _ in 0..r.read_vec_len()? {
            ty.params.push(read_val_type(r)?);
        }
        for _ in 0..r.read_vec_len()? {
            ty.results.push(read_val_type(r)?);
        }
        module.types.push(ty);
    }
    Ok(())
}

fn decode_limits(r: &mut Reader<'_>) -> Result<(u32, Option<u32>), DecodeError> {
    let flag_offset = r.offset();
    match r.read_u8()? {
        0x00 => Ok((r.read_var_u32()?, None)),
        0x01 => {
            let min = r.read_var_u32()?;
            let max = r.read_var_u32()?;
            Ok((min, Some(max)))
        }
        _ => Err(r.fail_at(DecodeErrorKind::InvalidValType, flag_offset)),
    }
}

fn decode_table_type(r: &mut Reader<'_>) -> Result<TableType, DecodeError> {
    let elem_offset = r.offset();
    if r.read_u8()? != 0x70 {
        return Err(r.fail_at(DecodeErrorKind::InvalidValType, elem_offset));
    }
    let (initial, maximum) = decode_limits(r)?;
    Ok(TableType { initial, maximum })
}

fn decode_memory_type(r: &mut Reader<'_>) -> Result<MemoryType, DecodeError> {
    let (initial_pages, maximum_pages) = decode_limits(r)?;
    Ok(MemoryType {
        initial_pages,
        maximum_pages,
    })
}

fn decode_global_type(r: &mut Reader<'_>) -> Result<GlobalType, DecodeError> {
    let content = read_val_type(r)?;
    let mut_offset = r.offset();
    let mutable = match r.read_u8()? {
        0x00 => false,
        0x01 => true,
        _ => return Err(r.fail_at(DecodeErrorKind::InvalidValType, mut_offset)),
    };
    Ok(GlobalType { content, mutable })
}

fn decode_import_section(r: &mut Reader<'_>, module: &mut Module) -> Result<(), DecodeError> {
    let count = r.read_vec_len()?;
    for _ in 0..count {
        let import_module = r.read_name()?;
        let field = r.read_name()?;
        let kind_offset = r.offset();
        let kind = match r.read_u8()? {
            0x00 => ImportKind::Func {
                type_index: r.read_var_u32()?,
            },
            0x01 => ImportKind::Table(decode_table_type(r)?),
            0x02 => ImportKind::Memory(decode_memory_type(r)?),
            0x03 => ImportKind::Global(decode_global_type(r)?),
            _ => return Err(r.fail_at(DecodeErrorKind::InvalidValType, kind_offset)),
        };
        module.imports.push(Import {
            module: import_module,
            field,
            kind,
        });
    }
    Ok(())
}

fn decode_function_section(r: &mut Reader<'_>, module: &mut Module) -> Result<(), DecodeError> {
    let count = r.read_vec_len()?;
    for _ in 0..count {
        module.functions.push(r.read_var_u32()?);
    }
    Ok(())
}

fn decode_table_section(r: &mut Reader<'_>, module: &mut Module) -> Result<(), DecodeError> {
    let count = r.read_vec_len()?;
    for _ in 0..count {
        module.tables.push(decode_table_type(r)?);
    }
    Ok(())
}

fn decode_memory_section(r: &mut Reader<'_>, module: &mut Module) -> Result<(), DecodeError> {
    let count = r.read_vec_len()?;
    for _ in 0..count {
        module.memories.push(decode_memory_type(r)?);
    }
    Ok(())
}

/// A constant expression: a single const or `global.get` followed by `end`.
fn decode_init_expr(r: &mut Reader<'_>) -> Result<InitExpr, DecodeError> {
    let opcode_offset = r.offset();
    let init = match r.read_u8()? {
        0x41 => InitExpr::I32Const(r.read_var_i32()?),
        0x42 => InitExpr::I64Const(r.read_var_i64()?),
        0x43 => InitExpr::F32Const(r.read_f32_bits()?),
        0x44 => InitExpr::F64Const(r.read_f64_bits()?),
        0x23 => InitExpr::GlobalGet(r.read_var_u32()?),
        _ => return Err(r.fail_at(DecodeErrorKind::InvalidOpcode, opcode_offset)),
    };
    let end_offset = r.offset();
    if r.read_u8()? != 0x0B {
        return Err(r.fail_at(DecodeErrorKind::InvalidOpcode, end_offset));
    }
    Ok(init)
}

fn decode_global_section(r: &mut Reader<'_>, module: &mut Module) -> Result<(), DecodeError> {
    let count = r.read_vec_len()?;
    for _ in 0..count {
        let ty = decode_global_type(r)?;
        let init = decode_init_expr(r)?;
        module.globals.push(Global { ty, init });
    }
    Ok(())
}

fn decode_export_section(r: &mut Reader<'_>, module: &mut Module) -> Result<(), DecodeError> {
    let count = r.read_vec_len()?;
    for _ in 0..count {
        let name = r.read_name()?;
        let kind_offset = r.offset();
        let kind = match r.read_u8()? {
            0x00 => ExportKind::Func,
            0x01 => ExportKind::Table,
            0x02 => ExportKind::Memory,
            0x03 => ExportKind::Global,
            _ => return Err(r.fail_at(DecodeErrorKind::InvalidValType, kind_offset)),
        };
        let index = r.read_var_u32()?;
        module.exports.push(Export { name, kind, index });
    }
    Ok(())
}

fn decode_element_section(r: &mut Reader<'_>, module: &mut Module) -> Result<(), DecodeError> {
    let count = r.read_vec_len()?;
    for _ in 0..count {
        let flags_offset = r.offset();
        // Only the MVP shape (active, table 0, funcref indices) occurs in
        // the supported subset.
        if r.read_var_u32()? != 0 {
            return Err(r.fail_at(DecodeErrorKind::InvalidOpcode, flags_offset));
        }
        let offset = decode_init_expr(r)?;
        let func_count = r.read_vec_len()?;
        let mut func_indices = Vec::with_capacity(func_count);
        for _ in 0..func_count {
            func_indices.push(r.read_var_u32()?);
        }
        module.elements.push(ElementSegment {
            offset,
            func_indices,
        });
    }
    Ok(())
}

fn decode_code_section(r: &mut Reader<'_>, module: &mut Module) -> Result<(), DecodeError> {
    let count = r.read_vec_len()?;
    for _ in 0..count {
        let size_offset = r.offset();
        let size = r.read_var_u32()? as usize;
        if size > r.remaining() {
            return Err(r.fail_at(DecodeErrorKind::TruncatedSection, size_offset));
        }
        let offset = r.offset();
        let bytes = r.read_exact(size)?.to_vec();
        module.code.push(CodeEntry { offset, bytes });
    }
    Ok(())
}

fn decode_data_section(r: &mut Reader<'_>, module: &mut Module) -> Result<(), DecodeError> {
    let count = r.read_vec_len()?;
    for _ in 0..count {
        let flags_offset = r.offset();
        let offset = match r.read_var_u32()? {
            0 => Some(decode_init_expr(r)?),
            1 => None,
            _ => return Err(r.fail_at(DecodeErrorKind::InvalidOpcode, flags_offset)),
        };
        let len = r.read_vec_len()?;
        let bytes = r.read_exact(len)?.to_vec();
        module.data.push(DataSegment { offset, bytes });
    }
    Ok(())
}

fn decode_custom_section(r: &mut Reader<'_>, module: &mut Module) {
    let result = (|| -> Result<(), DecodeError> {
        let name = r.read_name()?;
        if name == "name" {
            decode_name_section(r, module)?;
        }
        Ok(())
    })();
    if let Err(e) = result {
        log::debug!("ignoring malformed custom section: {e}");
    }
    // Whatever remains of a custom section is uninterpreted.
    let _ = r.read_exact(r.remaining());
}

fn decode_name_section(r: &mut Reader<'_>, module: &mut Module) -> Result<(), DecodeError> {
    while !r.is_empty() {
        let id = r.read_u8()?;
        let size = r.read_vec_len()?;
        let mut sub = r.sub_reader(size)?;
        match id {
            0 => module.names.module = Some(sub.read_name()?),
            1 => {
                for _ in 0..sub.read_vec_len()? {
                    let index = sub.read_var_u32()?;
                    let name = sub.read_name()?;
                    module.names.functions.insert(index, name);
                }
            }
            2 => {
                for _ in 0..sub.read_vec_len()? {
                    let func = sub.read_var_u32()?;
                    let mut names = FxHashMap::default();
                    for _ in 0..sub.read_vec_len()? {
                        let local = sub.read_var_u32()?;
                        names.insert(local, sub.read_name()?);
                    }
                    module.names.locals.insert(func, names);
                }
            }
            _ => {}
        }
    }
    Ok(())
}

//! Function body decoding.
//!
//! Bodies are decoded on demand from the raw slices stored in
//! [`crate::CodeEntry`], one function at a time, so a large module never
//! holds every decoded instruction stream in memory at once.
//!
//! The opcode set is the subset the Go wasm toolchain emits: the full MVP
//! numeric/memory/control set, sign extension, non-trapping float-to-int
//! (`0xFC 0x00..=0x07`), `memory.copy`/`memory.fill`, and the funcref
//! `ref.null`/`ref.is_null` pair. Anything else is an `InvalidOpcode`.

use crate::errors::{DecodeError, DecodeErrorKind};
use crate::module::{CodeEntry, ValType};
use crate::reader::Reader;

/// Result annotation of a `block`/`loop`/`if`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    Empty,
    Value(ValType),
    /// Multi-value block signature by type index. Decoded so the offset in
    /// diagnostics is exact, rejected by the code generator.
    TypeIndex(u32),
}

/// Alignment hint and constant offset of a load/store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemArg {
    pub align: u32,
    pub offset: u32,
}

/// A decoded instruction. Float immediates carry raw bit patterns.
#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    // Control.
    Unreachable,
    Nop,
    Block(BlockType),
    Loop(BlockType),
    If(BlockType),
    Else,
    End,
    Br(u32),
    BrIf(u32),
    BrTable { targets: Vec<u32>, default: u32 },
    Return,
    Call(u32),
    CallIndirect { type_index: u32 },

    // Parametric.
    Drop,
    Select,

    // Variables.
    LocalGet(u32),
    LocalSet(u32),
    LocalTee(u32),
    GlobalGet(u32),
    GlobalSet(u32),

    // Memory.
    I32Load(MemArg),
    I64Load(MemArg),
    F32Load(MemArg),
    F64Load(MemArg),
    I32Load8S(MemArg),
    I32Load8U(MemArg),
    I32Load16S(MemArg),
    I32Load16U(MemArg),
    I64Load8S(MemArg),
    I64Load8U(MemArg),
    I64Load16S(MemArg),
    I64Load16U(MemArg),
    I64Load32S(MemArg),
    I64Load32U(MemArg),
    I32Store(MemArg),
    I64Store(MemArg),
    F32Store(MemArg),
    F64Store(MemArg),
    I32Store8(MemArg),
    I32Store16(MemArg),
    I64Store8(MemArg),
    I64Store16(MemArg),
    I64Store32(MemArg),
    MemorySize,
    MemoryGrow,
    MemoryCopy,
    MemoryFill,

    // Constants.
    I32Const(i32),
    I64Const(i64),
    F32Const(u32),
    F64Const(u64),

    // i32 comparisons.
    I32Eqz,
    I32Eq,
    I32Ne,
    I32LtS,
    I32LtU,
    I32GtS,
    I32GtU,
    I32LeS,
    I32LeU,
    I32GeS,
    I32GeU,

    // i64 comparisons.
    I64Eqz,
    I64Eq,
    I64Ne,
    I64LtS,
    I64LtU,
    I64GtS,
    I64GtU,
    I64LeS,
    I64LeU,
    I64GeS,
    I64GeU,

    // f32 comparisons.
    F32Eq,
    F32Ne,
    F32Lt,
    F32Gt,
    F32Le,
    F32Ge,

    // f64 comparisons.
    F64Eq,
    F64Ne,
    F64Lt,
    F64Gt,
    F64Le,
    F64Ge,

    // i32 arithmetic.
    I32Clz,
    I32Ctz,
    I32Popcnt,
    I32Add,
    I32Sub,
    I32Mul,
    I32DivS,
    I32DivU,
    I32RemS,
    I32RemU,
    I32And,
    I32Or,
    I32Xor,
    I32Shl,
    I32ShrS,
    I32ShrU,
    I32Rotl,
    I32Rotr,

    // i64 arithmetic.
    I64Clz,
    I64Ctz,
    I64Popcnt,
    I64Add,
    I64Sub,
    I64Mul,
    I64DivS,
    I64DivU,
    I64RemS,
    I64RemU,
    I64And,
    I64Or,
    I64Xor,
    I64Shl,
    I64ShrS,
    I64ShrU,
    I64Rotl,
    I64Rotr,

    // f32 arithmetic.
    F32Abs,
    F32Neg,
    F32Ceil,
    F32Floor,
    F32Trunc,
    F32Nearest,
    F32Sqrt,
    F32Add,
    F32Sub,
    F32Mul,
    F32Div,
    F32Min,
    F32Max,
    F32Copysign,

    // f64 arithmetic.
    F64Abs,
    F64Neg,
    F64Ceil,
    F64Floor,
    F64Trunc,
    F64Nearest,
    F64Sqrt,
    F64Add,
    F64Sub,
    F64Mul,
    F64Div,
    F64Min,
    F64Max,
    F64Copysign,

    // Conversions.
    I32WrapI64,
    I32TruncF32S,
    I32TruncF32U,
    I32TruncF64S,
    I32TruncF64U,
    I64ExtendI32S,
    I64ExtendI32U,
    I64TruncF32S,
    I64TruncF32U,
    I64TruncF64S,
    I64TruncF64U,
    F32ConvertI32S,
    F32ConvertI32U,
    F32ConvertI64S,
    F32ConvertI64U,
    F32DemoteF64,
    F64ConvertI32S,
    F64ConvertI32U,
    F64ConvertI64S,
    F64ConvertI64U,
    F64PromoteF32,
    I32ReinterpretF32,
    I64ReinterpretF64,
    F32ReinterpretI32,
    F64ReinterpretI64,

    // Sign extension.
    I32Extend8S,
    I32Extend16S,
    I64Extend8S,
    I64Extend16S,
    I64Extend32S,

    // Saturating truncation.
    I32TruncSatF32S,
    I32TruncSatF32U,
    I32TruncSatF64S,
    I32TruncSatF64U,
    I64TruncSatF32S,
    I64TruncSatF32U,
    I64TruncSatF64S,
    I64TruncSatF64U,

    // References (funcref subset).
    RefNull,
    RefIsNull,
}

/// A fully decoded function body.
#[derive(Debug, Clone)]
pub struct FunctionBody {
    /// Declared locals, expanded (one entry per local, parameters excluded).
    pub locals: Vec<ValType>,
    pub instrs: Vec<Instr>,
}

// The Go toolchain never declares anywhere near this many locals; a prefix
// asking for more is corrupt input.
const MAX_LOCALS: u64 = 100_000;

/// Decodes the locals and instruction stream of one code section entry.
pub fn decode_body(entry: &CodeEntry) -> Result<FunctionBody, DecodeError> {
    let mut r = Reader::at_offset(&entry.bytes, entry.offset);

    let group_count = r.read_vec_len()?;
    let mut locals = Vec::new();
    let mut total: u64 = 0;
    for _ in 0..group_count {
        let start = r.offset();
        let count = u64::from(r.read_var_u32()?);
        let ty = read_val_type(&mut r)?;
        total += count;
        if total > MAX_LOCALS {
            return Err(r.fail_at(DecodeErrorKind::OversizedVector, start));
        }
        locals.extend(std::iter::repeat_n(ty, count as usize));
    }

    let mut instrs = Vec::new();
    let mut depth: u32 = 1;
    loop {
        let instr = read_instr(&mut r)?;
        match instr {
            Instr::Block(_) | Instr::Loop(_) | Instr::If(_) => depth += 1,
            Instr::End => depth -= 1,
            _ => {}
        }
        instrs.push(instr);
        if depth == 0 {
            break;
        }
    }
    if !r.is_empty() {
        return Err(r.fail(DecodeErrorKind::TruncatedSection));
    }

    Ok(FunctionBody { locals, instrs })
}

pub(crate) fn read_val_type(r: &mut Reader<'_>) -> Result<ValType, DecodeError> {
    let offset = r.offset();
    match r.read_u8()? {
        0x7F => Ok(ValType::I32),
        0x7E => Ok(ValType::I64),
        0x7D => Ok(ValType::F32),
        0x7C => Ok(ValType::F64),
        0x70 => Ok(ValType::FuncRef),
        _ => Err(r.fail_at(DecodeErrorKind::InvalidValType, offset)),
    }
}

fn read_block_type(r: &mut Reader<'_>) -> Result<BlockType, DecodeError> {
    let offset = r.offset();
    // A block type is a signed 33-bit LEB: negative one-byte encodings are
    // shorthand for value types, non-negative values are type indices.
    let raw = r.read_var_i64()?;
    if raw >= 0 {
        let index =
            u32::try_from(raw).map_err(|_| r.fail_at(DecodeErrorKind::InvalidLEB, offset))?;
        return Ok(BlockType::TypeIndex(index));
    }
    match (raw & 0x7F) as u8 {
        0x40 => Ok(BlockType::Empty),
        0x7F => Ok(BlockType::Value(ValType::I32)),
        0x7E => Ok(BlockType::Value(ValType::I64)),
        0x7D => Ok(BlockType::Value(ValType::F32)),
        0x7C => Ok(BlockType::Value(ValType::F64)),
        0x70 => Ok(BlockType::Value(ValType::FuncRef)),
        _ => Err(r.fail_at(DecodeErrorKind::InvalidValType, offset)),
    }
}

fn read_mem_arg(r: &mut Reader<'_>) -> Result<MemArg, DecodeError> {
    let align = r.read_var_u32()?;
    let offset = r.read_var_u32()?;
    Ok(MemArg { align, offset })
}

/// Reads the zero byte reserved for the memory index.
fn read_mem_index(r: &mut Reader<'_>) -> Result<(), DecodeError> {
    let offset = r.offset();
    if r.read_u8()? != 0 {
        return Err(r.fail_at(DecodeErrorKind::InvalidOpcode, offset));
    }
    Ok(())
}

#[allow(clippy::too_many_lines)]
fn read_instr(r: &mut Reader<'_>) -> Result<Instr, DecodeError> {
    let offset = r.offset();
    let opcode = r.read_u8()?;
    let instr = match opcode {
        0x00 => Instr::Unreachable,
        0x01 => Instr::Nop,
        0x02 => Instr::Block(read_block_type(r)?),
        0x03 => Instr::Loop(read_block_type(r)?),
        0x04 => Instr::If(read_block_type(r)?),
        0x05 => Instr::Else,
        0x0B => Instr::End,
        0x0C => Instr::Br(r.read_var_u32()?),
        0x0D => Instr::BrIf(r.read_var_u32()?),
        0x0E => {
            let count = r.read_vec_len()?;
            let mut targets = Vec::with_capacity(count);
            for _ in 0..count {
                targets.push(r.read_var_u32()?);
            }
            let default = r.read_var_u32()?;
            Instr::BrTable { targets, default }
        }
        0x0F => Instr::Return,
        0x10 => Instr::Call(r.read_var_u32()?),
        0x11 => {
            let type_index = r.read_var_u32()?;
            read_mem_index(r)?; // reserved table index
            Instr::CallIndirect { type_index }
        }
        0x1A => Instr::Drop,
        0x1B => Instr::Select,
        0x1C => {
            // Typed select with a one-entry type vector; same semantics.
            let count = r.read_vec_len()?;
            if count != 1 {
                return Err(r.fail_at(DecodeErrorKind::InvalidOpcode, offset));
            }
            read_val_type(r)?;
            Instr::Select
        }
        0x20 => Instr::LocalGet(r.read_var_u32()?),
        0x21 => Instr::LocalSet(r.read_var_u32()?),
        0x22 => Instr::LocalTee(r.read_var_u32()?),
        0x23 => Instr::GlobalGet(r.read_var_u32()?),
        0x24 => Instr::GlobalSet(r.read_var_u32()?),
        0x28 => Instr::I32Load(read_mem_arg(r)?),
        0x29 => Instr::I64Load(read_mem_arg(r)?),
        0x2A => Instr::F32Load(read_mem_arg(r)?),
        0x2B => Instr::F64Load(read_mem_arg(r)?),
        0x2C => Instr::I32Load8S(read_mem_arg(r)?),
        0x2D => Instr::I32Load8U(read_mem_arg(r)?),
        0x2E => Instr::I32Load16S(read_mem_arg(r)?),
        0x2F => Instr::I32Load16U(read_mem_arg(r)?),
        0x30 => Instr::I64Load8S(read_mem_arg(r)?),
        0x31 => Instr::I64Load8U(read_mem_arg(r)?),
        0x32 => Instr::I64Load16S(read_mem_arg(r)?),
        0x33 => Instr::I64Load16U(read_mem_arg(r)?),
        0x34 => Instr::I64Load32S(read_mem_arg(r)?),
        0x35 => Instr::I64Load32U(read_mem_arg(r)?),
        0x36 => Instr::I32Store(read_mem_arg(r)?),
        0x37 => Instr::I64Store(read_mem_arg(r)?),
        0x38 => Instr::F32Store(read_mem_arg(r)?),
        0x39 => Instr::F64Store(read_mem_arg(r)?),
        0x3A => Instr::I32Store8(read_mem_arg(r)?),
        0x3B => Instr::I32Store16(read_mem_arg(r)?),
        0x3C => Instr::I64Store8(read_mem_arg(r)?),
        0x3D => Instr::I64Store16(read_mem_arg(r)?),
        0x3E => Instr::I64Store32(read_mem_arg(r)?),
        0x3F => {
            read_mem_index(r)?;
            Instr::MemorySize
        }
        0x40 => {
            read_mem_index(r)?;
            Instr::MemoryGrow
        }
        0x41 => Instr::I32Const(r.read_var_i32()?),
        0x42 => Instr::I64Const(r.read_var_i64()?),
        0x43 => Instr::F32Const(r.read_f32_bits()?),
        0x44 => Instr::F64Const(r.read_f64_bits()?),
        0x45 => Instr::I32Eqz,
        0x46 => Instr::I32Eq,
        0x47 => Instr::I32Ne,
        0x48 => Instr::I32LtS,
        0x49 => Instr::I32LtU,
        0x4A => Instr::I32GtS,
        0x4B => Instr::I32GtU,
        0x4C => Instr::I32LeS,
        0x4D => Instr::I32LeU,
        0x4E => Instr::I32GeS,
        0x4F => Instr::I32GeU,
        0x50 => Instr::I64Eqz,
        0x51 => Instr::I64Eq,
        0x52 => Instr::I64Ne,
        0x53 => Instr::I64LtS,
        0x54 => Instr::I64LtU,
        0x55 => Instr::I64GtS,
        0x56 => Instr::I64GtU,
        0x57 => Instr::I64LeS,
        0x58 => Instr::I64LeU,
        0x59 => Instr::I64GeS,
        0x5A => Instr::I64GeU,
        0x5B => Instr::F32Eq,
        0x5C => Instr::F32Ne,
        0x5D => Instr::F32Lt,
        0x5E => Instr::F32Gt,
        0x5F => Instr::F32Le,
        0x60 => Instr::F32Ge,
        0x61 => Instr::F64Eq,
        0x62 => Instr::F64Ne,
        0x63 => Instr::F64Lt,
        0x64 => Instr::F64Gt,
        0x65 => Instr::F64Le,
        0x66 => Instr::F64Ge,
        0x67 => Instr::I32Clz,
        0x68 => Instr::I32Ctz,
        0x69 => Instr::I32Popcnt,
        0x6A => Instr::I32Add,
        0x6B => Instr::I32Sub,
        0x6C => Instr::I32Mul,
        0x6D => Instr::I32DivS,
        0x6E => Instr::I32DivU,
        0x6F => Instr::I32RemS,
        0x70 => Instr::I32RemU,
        0x71 => Instr::I32And,
        0x72 => Instr::I32Or,
        0x73 => Instr::I32Xor,
        0x74 => Instr::I32Shl,
        0x75 => Instr::I32ShrS,
        0x76 => Instr::I32ShrU,
        0x77 => Instr::I32Rotl,
        0x78 => Instr::I32Rotr,
        0x79 => Instr::I64Clz,
        0x7A => Instr::I64Ctz,
        0x7B => Instr::I64Popcnt,
        0x7C => Instr::I64Add,
        0x7D => Instr::I64Sub,
        0x7E => Instr::I64Mul,
        0x7F => Instr::I64DivS,
        0x80 => Instr::I64DivU,
        0x81 => Instr::I64RemS,
        0x82 => Instr::I64RemU,
        0x83 => Instr::I64And,
        0x84 => Instr::I64Or,
        0x85 => Instr::I64Xor,
        0x86 => Instr::I64Shl,
        0x87 => Instr::I64ShrS,
        0x88 => Instr::I64ShrU,
        0x89 => Instr::I64Rotl,
        0x8A => Instr::I64Rotr,
        0x8B => Instr::F32Abs,
        0x8C => Instr::F32Neg,
        0x8D => Instr::F32Ceil,
        0x8E => Instr::F32Floor,
        0x8F => Instr::F32Trunc,
        0x90 => Instr::F32Nearest,
        0x91 => Instr::F32Sqrt,
        0x92 => Instr::F32Add,
        0x93 => Instr::F32Sub,
        0x94 => Instr::F32Mul,
        0x95 => Instr::F32Div,
        0x96 => Instr::F32Min,
        0x97 => Instr::F32Max,
        0x98 => Instr::F32Copysign,
        0x99 => Instr::F64Abs,
        0x9A => Instr::F64Neg,
        0x9B => Instr::F64Ceil,
        0x9C => Instr::F64Floor,
        0x9D => Instr::F64Trunc,
        0x9E => Instr::F64Nearest,
        0x9F => Instr::F64Sqrt,
        0xA0 => Instr::F64Add,
        0xA1 => Instr::F64Sub,
        0xA2 => Instr::F64Mul,
        0xA3 => Instr::F64Div,
        0xA4 => Instr::F64Min,
        0xA5 => Instr::F64Max,
        0xA6 => Instr::F64Copysign,
        0xA7 => Instr::I32WrapI64,
        0xA8 => Instr::I32TruncF32S,
        0xA9 => Instr::I32TruncF32U,
        0xAA => Instr::I32TruncF64S,
        0xAB => Instr::I32TruncF64U,
        0xAC => Instr::I64ExtendI32S,
        0xAD => Instr::I64ExtendI32U,
        0xAE => Instr::I64TruncF32S,
        0xAF => Instr::I64TruncF32U,
        0xB0 => Instr::I64TruncF64S,
        0xB1 => Instr::I64TruncF64U,
        0xB2 => Instr::F32ConvertI32S,
        0xB3 => Instr::F32ConvertI32U,
        0xB4 => Instr::F32ConvertI64S,
        0xB5 => Instr::F32ConvertI64U,
        0xB6 => Instr::F32DemoteF64,
        0xB7 => Instr::F64ConvertI32S,
        0xB8 => Instr::F64ConvertI32U,
        0xB9 => Instr::F64ConvertI64S,
        0xBA => Instr::F64ConvertI64U,
        0xBB => Instr::F64PromoteF32,
        0xBC => Instr::I32ReinterpretF32,
        0xBD => Instr::I64ReinterpretF64,
        0xBE => Instr::F32ReinterpretI32,
        0xBF => Instr::F64ReinterpretI64,
        0xC0 => Instr::I32Extend8S,
        0xC1 => Instr::I32Extend16S,
        0xC2 => Instr::I64Extend8S,
        0xC3 => Instr::I64Extend16S,
        0xC4 => Instr::I64Extend32S,
        0xD0 => {
            let ref_ty = r.offset();
            if r.read_u8()? != 0x70 {
                return Err(r.fail_at(DecodeErrorKind::InvalidValType, ref_ty));
            }
            Instr::RefNull
        }
        0xD1 => Instr::RefIsNull,
        0xFC => {
            let sub_offset = r.offset();
            match r.read_var_u32()? {
                0 => Instr::I32TruncSatF32S,
                1 => Instr::I32TruncSatF32U,
                2 => Instr::I32TruncSatF64S,
                3 => Instr::I32TruncSatF64U,
                4 => Instr::I64TruncSatF32S,
                5 => Instr::I64TruncSatF32U,
                6 => Instr::I64TruncSatF64S,
                7 => Instr::I64TruncSatF64U,
                10 => {
                    read_mem_index(r)?;
                    read_mem_index(r)?;
                    Instr::MemoryCopy
                }
                11 => {
                    read_mem_index(r)?;
                    Instr::MemoryFill
                }
                _ => return Err(r.fail_at(DecodeErrorKind::InvalidOpcode, sub_offset)),
            }
        }
        _ => return Err(r.fail_at(DecodeErrorKind::InvalidOpcode, offset)),
    };
    Ok(instr)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(bytes: &[u8]) -> CodeEntry {
        CodeEntry {
            offset: 0,
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn decode_add_body() {
        // (local.get 0) (local.get 1) (i32.add) end, no locals
        let decoded = decode_body(&body(&[0x00, 0x20, 0x00, 0x20, 0x01, 0x6A, 0x0B])).unwrap();
        assert!(decoded.locals.is_empty());
        assert_eq!(
            decoded.instrs,
            vec![
                Instr::LocalGet(0),
                Instr::LocalGet(1),
                Instr::I32Add,
                Instr::End,
            ]
        );
    }

    #[test]
    fn decode_locals_are_expanded() {
        // 2 groups: 2 x i32, 1 x f64; body: end
        let decoded = decode_body(&body(&[0x02, 0x02, 0x7F, 0x01, 0x7C, 0x0B])).unwrap();
        assert_eq!(
            decoded.locals,
            vec![ValType::I32, ValType::I32, ValType::F64]
        );
        assert_eq!(decoded.instrs, vec![Instr::End]);
    }

    #[test]
    fn decode_nested_blocks_terminate_at_body_end() {
        // block(empty) loop(empty) br 1 end end end
        let decoded =
            decode_body(&body(&[0x00, 0x02, 0x40, 0x03, 0x40, 0x0C, 0x01, 0x0B, 0x0B, 0x0B]))
                .unwrap();
        assert_eq!(decoded.instrs.len(), 6);
        assert_eq!(decoded.instrs[0], Instr::Block(BlockType::Empty));
        assert_eq!(decoded.instrs[1], Instr::Loop(BlockType::Empty));
        assert_eq!(decoded.instrs[2], Instr::Br(1));
    }

    #[test]
    fn decode_br_table() {
        // br_table [0 1] default 2, inside enough Ends to close
        let decoded = decode_body(&body(&[0x00, 0x0E, 0x02, 0x00, 0x01, 0x02, 0x0B])).unwrap();
        assert_eq!(
            decoded.instrs[0],
            Instr::BrTable {
                targets: vec![0, 1],
                default: 2
            }
        );
    }

    #[test]
    fn decode_trunc_sat_prefix() {
        let decoded = decode_body(&body(&[0x00, 0xFC, 0x02, 0x0B])).unwrap();
        assert_eq!(decoded.instrs[0], Instr::I32TruncSatF64S);
    }

    #[test]
    fn unknown_opcode_reports_offset() {
        let entry = CodeEntry {
            offset: 100,
            bytes: vec![0x00, 0xF0, 0x0B],
        };
        let err = decode_body(&entry).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::InvalidOpcode);
        assert_eq!(err.offset, 101);
    }

    #[test]
    fn trailing_bytes_after_end_rejected() {
        let err = decode_body(&body(&[0x00, 0x0B, 0x01])).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::TruncatedSection);
    }
}

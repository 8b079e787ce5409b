//! C++ spellings: type keywords, literals, identifiers.
//!
//! Float literals always go through the runtime bit-cast helpers so the
//! emitted program reproduces the exact bit pattern of the wasm immediate,
//! NaN payloads included.

use wasm2cpp_decoder::ValType;

/// The C++ type keyword a wasm value type lowers to. Funcref values are
/// function-table indices.
pub(crate) fn type_keyword(ty: ValType) -> &'static str {
    match ty {
        ValType::I32 | ValType::FuncRef => "int32_t",
        ValType::I64 => "int64_t",
        ValType::F32 => "float",
        ValType::F64 => "double",
    }
}

pub(crate) fn i32_literal(value: i32) -> String {
    if value == i32::MIN {
        // INT32_MIN cannot be spelled as a single decimal literal.
        "(-2147483647 - 1)".to_string()
    } else {
        value.to_string()
    }
}

pub(crate) fn i64_literal(value: i64) -> String {
    if value == i64::MIN {
        "(-INT64_C(9223372036854775807) - 1)".to_string()
    } else {
        format!("INT64_C({value})")
    }
}

pub(crate) fn f32_literal(bits: u32) -> String {
    format!("BitsToF32(0x{bits:08x}u)")
}

pub(crate) fn f64_literal(bits: u64) -> String {
    format!("BitsToF64(0x{bits:016x}ull)")
}

/// Whether an expression is a bare identifier or plain number, i.e. free
/// of side effects and cheap to repeat.
pub(crate) fn is_trivial(expr: &str) -> bool {
    !expr.is_empty()
        && expr
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Maps an arbitrary wasm name to a C++ identifier fragment. Collisions
/// are acceptable here; callers append a unique index.
pub(crate) fn sanitize(name: &str) -> String {
    const MAX_LEN: usize = 60;
    name.chars()
        .take(MAX_LEN)
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extreme_integer_literals() {
        assert_eq!(i32_literal(i32::MIN), "(-2147483647 - 1)");
        assert_eq!(i32_literal(42), "42");
        assert_eq!(i64_literal(-5), "INT64_C(-5)");
        assert_eq!(
            i64_literal(i64::MIN),
            "(-INT64_C(9223372036854775807) - 1)"
        );
    }

    #[test]
    fn float_literals_use_bit_patterns() {
        assert_eq!(f32_literal(0x3f80_0000), "BitsToF32(0x3f800000u)");
        assert_eq!(
            f64_literal(0x3ff0_0000_0000_0000),
            "BitsToF64(0x3ff0000000000000ull)"
        );
    }

    #[test]
    fn trivial_expressions() {
        assert!(is_trivial("local0"));
        assert!(is_trivial("stack12"));
        assert!(is_trivial("42"));
        assert!(!is_trivial("(a + b)"));
        assert!(!is_trivial(""));
    }

    #[test]
    fn sanitize_maps_punctuation_to_underscores() {
        assert_eq!(sanitize("runtime.wasmExit"), "runtime_wasmExit");
        assert_eq!(sanitize("syscall/js.valueGet"), "syscall_js_valueGet");
    }
}

//! In-memory module IR produced by [`crate::decode`].
//!
//! Mirrors the wasm binary section structure: one field per section, in
//! file order, plus the name tables extracted from the custom `name`
//! section. Function bodies stay as raw byte ranges and are decoded lazily
//! through [`crate::decode_body`].

use rustc_hash::FxHashMap;

/// A wasm value type of the supported subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValType {
    I32,
    I64,
    F32,
    F64,
    FuncRef,
}

/// A function signature: parameter and result types, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FuncType {
    pub params: Vec<ValType>,
    pub results: Vec<ValType>,
}

/// Size limits of a table, in elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableType {
    pub initial: u32,
    pub maximum: Option<u32>,
}

/// Size limits of a linear memory, in 64 KiB pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryType {
    pub initial_pages: u32,
    pub maximum_pages: Option<u32>,
}

/// Type and mutability of a global variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalType {
    pub content: ValType,
    pub mutable: bool,
}

/// A constant initializer expression, as allowed in global, element, and
/// data segment positions. Float payloads are raw bit patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitExpr {
    I32Const(i32),
    I64Const(i64),
    F32Const(u32),
    F64Const(u64),
    GlobalGet(u32),
}

#[derive(Debug, Clone)]
pub struct Global {
    pub ty: GlobalType,
    pub init: InitExpr,
}

#[derive(Debug, Clone)]
pub enum ImportKind {
    Func { type_index: u32 },
    Table(TableType),
    Memory(MemoryType),
    Global(GlobalType),
}

#[derive(Debug, Clone)]
pub struct Import {
    pub module: String,
    pub field: String,
    pub kind: ImportKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Func,
    Table,
    Memory,
    Global,
}

#[derive(Debug, Clone)]
pub struct Export {
    pub name: String,
    pub kind: ExportKind,
    pub index: u32,
}

/// An active element segment: function indices written into the table
/// starting at `offset`.
#[derive(Debug, Clone)]
pub struct ElementSegment {
    pub offset: InitExpr,
    pub func_indices: Vec<u32>,
}

/// A data segment. `offset` is `None` for passive segments.
#[derive(Debug, Clone)]
pub struct DataSegment {
    pub offset: Option<InitExpr>,
    pub bytes: Vec<u8>,
}

/// One entry of the code section: the undecoded body (local declarations
/// plus instructions) and its absolute offset in the input file.
#[derive(Debug, Clone)]
pub struct CodeEntry {
    pub offset: usize,
    pub bytes: Vec<u8>,
}

/// Debug names from the custom `name` section.
#[derive(Debug, Clone, Default)]
pub struct Names {
    pub module: Option<String>,
    pub functions: FxHashMap<u32, String>,
    pub locals: FxHashMap<u32, FxHashMap<u32, String>>,
}

/// A decoded wasm module.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub types: Vec<FuncType>,
    pub imports: Vec<Import>,
    /// Type indices of locally defined functions, in index order.
    pub functions: Vec<u32>,
    pub tables: Vec<TableType>,
    pub memories: Vec<MemoryType>,
    pub globals: Vec<Global>,
    pub exports: Vec<Export>,
    pub start: Option<u32>,
    pub elements: Vec<ElementSegment>,
    pub data: Vec<DataSegment>,
    pub data_count: Option<u32>,
    pub code: Vec<CodeEntry>,
    pub names: Names,
}

impl Module {
    /// Number of imported functions; locally defined functions follow
    /// these in the function index space.
    #[must_use]
    pub fn num_imported_funcs(&self) -> usize {
        self.imports
            .iter()
            .filter(|import| matches!(import.kind, ImportKind::Func { .. }))
            .count()
    }

    /// Total size of the function index space.
    #[must_use]
    pub fn func_count(&self) -> usize {
        self.num_imported_funcs() + self.functions.len()
    }

    /// Type index of a function, resolving imports first.
    #[must_use]
    pub fn func_type_index(&self, func: u32) -> Option<u32> {
        let imported = self.num_imported_funcs();
        let func = func as usize;
        if func < imported {
            self.imports
                .iter()
                .filter_map(|import| match import.kind {
                    ImportKind::Func { type_index } => Some(type_index),
                    _ => None,
                })
                .nth(func)
        } else {
            self.functions.get(func - imported).copied()
        }
    }

    /// Resolved signature of a function.
    #[must_use]
    pub fn func_type(&self, func: u32) -> Option<&FuncType> {
        self.types.get(self.func_type_index(func)? as usize)
    }

    /// The import backing a function index, if it is imported.
    #[must_use]
    pub fn func_import(&self, func: u32) -> Option<&Import> {
        self.imports
            .iter()
            .filter(|import| matches!(import.kind, ImportKind::Func { .. }))
            .nth(func as usize)
    }

    /// The single table of the supported subset, if present.
    #[must_use]
    pub fn table(&self) -> Option<&TableType> {
        self.tables.first()
    }

    /// The single linear memory of the supported subset, if present.
    #[must_use]
    pub fn memory(&self) -> Option<&MemoryType> {
        self.memories.first()
    }

    #[must_use]
    pub fn export(&self, name: &str) -> Option<&Export> {
        self.exports.iter().find(|export| export.name == name)
    }

    /// The exported function of the given name, if any.
    #[must_use]
    pub fn exported_func(&self, name: &str) -> Option<u32> {
        self.exports
            .iter()
            .find(|export| export.kind == ExportKind::Func && export.name == name)
            .map(|export| export.index)
    }

    /// Debug name of a function from the name section.
    #[must_use]
    pub fn func_name(&self, func: u32) -> Option<&str> {
        self.names.functions.get(&func).map(String::as_str)
    }
}

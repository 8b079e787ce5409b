//! The emit driver: whole-module C++ source assembly.
//!
//! Produces three generated files plus the runtime templates:
//!
//! - `module.h` — the `ModuleInst` class declaration. Declaring every
//!   function up front doubles as the forward declarations the bodies
//!   need, so definition order never matters.
//! - `module.cpp` — constructor (memory, globals, table, data segments,
//!   start function), the standard export wiring (`run`/`resume`/
//!   `getsp`), and wrappers for the remaining exported functions.
//! - `functions.cpp` — every lowered function body and the
//!   `call_indirect` dispatchers.
//!
//! Everything is assembled in memory; callers write files only after the
//! whole module lowered successfully. Output is deterministic: identical
//! input bytes produce byte-identical sources.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use wasm2cpp_decoder::{
    ExportKind, FuncType, ImportKind, InitExpr, Module, ValType, decode_body,
};

use crate::cpp::{self, type_keyword};
use crate::errors::CodegenError;
use crate::func::lower_function;
use crate::mangle;

const WASM_PAGE_SIZE: u64 = 65536;

/// Code generation options.
#[derive(Debug, Clone)]
pub struct Options {
    /// C++ namespace wrapping the generated program and its runtime.
    pub namespace: String,
    /// Directory prefix for generated `#include` directives.
    pub include_prefix: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            namespace: "wasm2cpp".to_string(),
            include_prefix: None,
        }
    }
}

/// One generated source file, named relative to the output directory.
#[derive(Debug, Clone)]
pub struct OutputFile {
    pub name: String,
    pub contents: String,
}

/// Transpiles a decoded module into C++ sources plus the runtime shim.
///
/// # Errors
///
/// [`CodegenError::Unsupported`] for constructs outside the supported
/// wasm subset, [`CodegenError::Validation`] (and friends) for modules
/// that violate validation invariants.
pub fn transpile(module: &Module, options: &Options) -> Result<Vec<OutputFile>, CodegenError> {
    validate(module)?;

    let include = match &options.include_prefix {
        Some(dir) if !dir.is_empty() => format!("{}/", dir.trim_end_matches('/')),
        _ => String::new(),
    };
    let ns = options.namespace.as_str();

    let imported = u32::try_from(module.num_imported_funcs()).expect("validated import count");
    let mut dispatch = BTreeSet::new();
    let mut method_decls = Vec::new();
    let mut method_defs = Vec::new();

    for func in 0..u32::try_from(module.func_count()).expect("validated function count") {
        let ty = module
            .func_type(func)
            .expect("validated function type")
            .clone();
        let name = mangle::func_ident(module, func);
        let (ret, params) = signature(&ty, func)?;
        method_decls.push(format!("  {ret} {name}({params});"));

        if func < imported {
            let import = module.func_import(func).expect("validated import");
            if ty.params != [ValType::I32] || !ty.results.is_empty() {
                return Err(CodegenError::Unsupported(format!(
                    "import {}.{} does not use the (i32) -> () host ABI shape",
                    import.module, import.field
                )));
            }
            method_defs.push(format!(
                "void ModuleInst::{name}(int32_t local0) {{\n  go_->InvokeImport(\"{}\", local0);\n}}\n",
                cpp_string(&import.field)
            ));
        } else {
            let entry = &module.code[(func - imported) as usize];
            let body = decode_body(entry)?;
            log::debug!(
                "lowering function {func} ({} instructions)",
                body.instrs.len()
            );
            let lines = lower_function(module, func, &body, &mut dispatch)?;
            let mut def = format!("{ret} ModuleInst::{name}({params}) {{\n");
            for line in &lines {
                def.push_str(line);
                def.push('\n');
            }
            def.push_str("}\n");
            method_defs.push(def);
        }
    }

    let mut dispatcher_decls = Vec::new();
    let mut dispatcher_defs = Vec::new();
    for type_index in &dispatch {
        let ty = &module.types[*type_index as usize];
        let (decl, def) = dispatcher(module, *type_index, ty)?;
        dispatcher_decls.push(decl);
        dispatcher_defs.push(def);
    }

    let export_wrappers = export_wrappers(module)?;

    let mut files = Vec::new();
    for file in wasm2cpp_runtime::FILES {
        files.push(OutputFile {
            name: file.name.to_string(),
            contents: wasm2cpp_runtime::render(file.contents, ns, &include),
        });
    }
    files.push(OutputFile {
        name: "module.h".to_string(),
        contents: module_header(
            module,
            ns,
            &include,
            &method_decls,
            &dispatcher_decls,
            &export_wrappers,
        ),
    });
    files.push(OutputFile {
        name: "module.cpp".to_string(),
        contents: module_source(module, ns, &include, &export_wrappers)?,
    });
    files.push(OutputFile {
        name: "functions.cpp".to_string(),
        contents: functions_source(ns, &include, &method_defs, &dispatcher_defs),
    });
    Ok(files)
}

/// Return-type keyword and parameter list of a function signature.
fn signature(ty: &FuncType, func: u32) -> Result<(&'static str, String), CodegenError> {
    let ret = match ty.results.len() {
        0 => "void",
        1 => type_keyword(ty.results[0]),
        _ => {
            return Err(CodegenError::Unsupported(format!(
                "function {func} returns multiple values"
            )));
        }
    };
    let params = ty
        .params
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{} local{i}", type_keyword(*p)))
        .collect::<Vec<_>>()
        .join(", ");
    Ok((ret, params))
}

fn cpp_string(s: &str) -> String {
    s.chars()
        .flat_map(|c| match c {
            '\\' => vec!['\\', '\\'],
            '"' => vec!['\\', '"'],
            c => vec![c],
        })
        .collect()
}

fn dispatcher(
    module: &Module,
    type_index: u32,
    ty: &FuncType,
) -> Result<(String, String), CodegenError> {
    let (ret, params) = signature(ty, u32::MAX)?;
    let params_with_index = if params.is_empty() {
        "int32_t index".to_string()
    } else {
        format!("int32_t index, {params}")
    };
    let decl = format!("  {ret} callIndirect{type_index}({params_with_index});");

    let args = (0..ty.params.len())
        .map(|i| format!("local{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let mut def = format!("{ret} ModuleInst::callIndirect{type_index}({params_with_index}) {{\n");
    def.push_str("  if ((uint32_t)(index) >= table_.size()) {\n");
    def.push_str("    Trap(\"undefined element\");\n  }\n");
    def.push_str("  switch (table_[index]) {\n");
    def.push_str("  case -1:\n    Trap(\"uninitialized element\");\n");
    for func in 0..u32::try_from(module.func_count()).expect("validated function count") {
        let func_ty = module.func_type(func).expect("validated function type");
        if func_ty != ty {
            continue;
        }
        let name = mangle::func_ident(module, func);
        if ty.results.is_empty() {
            let _ = writeln!(def, "  case {func}:\n    {name}({args});\n    return;");
        } else {
            let _ = writeln!(def, "  case {func}:\n    return {name}({args});");
        }
    }
    def.push_str("  default:\n    Trap(\"indirect call type mismatch\");\n  }\n}\n");
    Ok((decl, def))
}

struct ExportWrapper {
    decl: String,
    def: String,
}

/// Public wrapper methods for exported functions beyond the standard
/// `run`/`resume`/`getsp` trio the runtime drives directly.
fn export_wrappers(module: &Module) -> Result<Vec<ExportWrapper>, CodegenError> {
    let mut wrappers = Vec::new();
    let mut used_names: Vec<String> = Vec::new();
    for export in &module.exports {
        if export.kind != ExportKind::Func {
            continue;
        }
        if matches!(export.name.as_str(), "run" | "resume" | "getsp") {
            continue;
        }
        let ty = module
            .func_type(export.index)
            .ok_or_else(|| {
                CodegenError::Validation(format!("export {} has no function", export.name))
            })?
            .clone();
        let mut name = format!("export_{}", cpp::sanitize(&export.name));
        if used_names.contains(&name) {
            name = format!("{name}_{}", export.index);
        }
        used_names.push(name.clone());
        let (ret, params) = signature(&ty, export.index)?;
        let target = mangle::func_ident(module, export.index);
        let args = (0..ty.params.len())
            .map(|i| format!("local{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let body = if ty.results.is_empty() {
            format!("{target}({args});")
        } else {
            format!("return {target}({args});")
        };
        wrappers.push(ExportWrapper {
            decl: format!("  {ret} {name}({params});"),
            def: format!("{ret} ModuleInst::{name}({params}) {{\n  {body}\n}}\n"),
        });
    }
    Ok(wrappers)
}

fn file_banner() -> &'static str {
    "// Generated by wasm2cpp from a WebAssembly module. DO NOT EDIT.\n"
}

fn module_header(
    module: &Module,
    ns: &str,
    include: &str,
    method_decls: &[String],
    dispatcher_decls: &[String],
    export_wrappers: &[ExportWrapper],
) -> String {
    let mut out = String::new();
    out.push_str(file_banner());
    out.push_str("#pragma once\n\n");
    out.push_str("#include <cstdint>\n#include <memory>\n#include <vector>\n\n");
    let _ = writeln!(out, "#include \"{include}go.h\"");
    let _ = writeln!(out, "#include \"{include}mem.h\"");
    let _ = writeln!(out, "\nnamespace {ns} {{\n");
    out.push_str("// The transpiled wasm module instance.\n");
    out.push_str("class ModuleInst final : public Inst {\n public:\n");
    out.push_str("  explicit ModuleInst(Go* go);\n");
    out.push_str("  ~ModuleInst() override;\n\n");
    out.push_str("  void run(int32_t argc, int32_t argv) override;\n");
    out.push_str("  void resume() override;\n");
    out.push_str("  int32_t getsp() override;\n");
    out.push_str("  Mem* mem() override;\n");
    if !export_wrappers.is_empty() {
        out.push('\n');
        for wrapper in export_wrappers {
            out.push_str(&wrapper.decl);
            out.push('\n');
        }
    }
    out.push_str("\n private:\n");
    out.push_str("  void initGlobals();\n");
    out.push_str("  void initTable();\n");
    out.push_str("  void initData();\n\n");
    for decl in dispatcher_decls {
        out.push_str(decl);
        out.push('\n');
    }
    if !dispatcher_decls.is_empty() {
        out.push('\n');
    }
    for decl in method_decls {
        out.push_str(decl);
        out.push('\n');
    }
    out.push('\n');
    out.push_str("  Go* go_;\n");
    out.push_str("  std::unique_ptr<Mem> mem_;\n");
    out.push_str("  std::vector<int32_t> table_;\n");
    for (i, global) in module.globals.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {} global{i} = 0;",
            type_keyword(global.ty.content)
        );
    }
    out.push_str("};\n\n");
    out.push_str("// Creates an instance of the transpiled module.\n");
    out.push_str("std::unique_ptr<Inst> NewInst(Go* go);\n");
    let _ = write!(out, "\n}}  // namespace {ns}\n");
    out
}

#[allow(clippy::too_many_lines)]
fn module_source(
    module: &Module,
    ns: &str,
    include: &str,
    export_wrappers: &[ExportWrapper],
) -> Result<String, CodegenError> {
    let mut out = String::new();
    out.push_str(file_banner());
    let _ = writeln!(out, "#include \"{include}module.h\"\n");
    let _ = writeln!(out, "#include \"{include}numeric.h\"");
    let _ = writeln!(out, "#include \"{include}trap.h\"");
    let _ = writeln!(out, "\nnamespace {ns} {{");

    // Data segment payloads.
    let mut arrays = String::new();
    for (i, segment) in module.data.iter().enumerate() {
        if segment.bytes.is_empty() {
            continue;
        }
        let _ = writeln!(arrays, "const uint8_t kData{i}[] = {{");
        for chunk in segment.bytes.chunks(12) {
            let line = chunk
                .iter()
                .map(|b| format!("0x{b:02x},"))
                .collect::<Vec<_>>()
                .join(" ");
            let _ = writeln!(arrays, "    {line}");
        }
        arrays.push_str("};\n");
    }
    if !arrays.is_empty() {
        out.push_str("\nnamespace {\n\n");
        out.push_str(&arrays);
        out.push_str("\n}  // namespace\n");
    }

    let (initial_pages, max_pages) = module
        .memory()
        .map_or((0, -1), |m| {
            (
                i64::from(m.initial_pages),
                m.maximum_pages.map_or(-1, i64::from),
            )
        });
    out.push_str("\nModuleInst::ModuleInst(Go* go)\n");
    let _ = writeln!(
        out,
        "    : go_(go), mem_(std::make_unique<Mem>({initial_pages}, {max_pages})) {{"
    );
    out.push_str("  initGlobals();\n  initTable();\n  initData();\n");
    if let Some(start) = module.start {
        let _ = writeln!(out, "  {}();", mangle::func_ident(module, start));
    }
    out.push_str("}\n\n");
    out.push_str("ModuleInst::~ModuleInst() = default;\n\n");

    out.push_str("void ModuleInst::initGlobals() {\n");
    for (i, global) in module.globals.iter().enumerate() {
        let value = match global.init {
            InitExpr::I32Const(v) => cpp::i32_literal(v),
            InitExpr::I64Const(v) => cpp::i64_literal(v),
            InitExpr::F32Const(bits) => cpp::f32_literal(bits),
            InitExpr::F64Const(bits) => cpp::f64_literal(bits),
            InitExpr::GlobalGet(_) => {
                return Err(CodegenError::Unsupported(format!(
                    "global {i} uses a global.get initializer"
                )));
            }
        };
        let _ = writeln!(out, "  global{i} = {value};");
    }
    out.push_str("}\n\n");

    out.push_str("void ModuleInst::initTable() {\n");
    if let Some(table) = module.table() {
        let _ = writeln!(out, "  table_.assign({}, -1);", table.initial);
        for segment in &module.elements {
            let InitExpr::I32Const(offset) = segment.offset else {
                return Err(CodegenError::Unsupported(
                    "element segment with a non-constant offset".to_string(),
                ));
            };
            for (j, func) in segment.func_indices.iter().enumerate() {
                let slot = offset as u32 + u32::try_from(j).expect("validated element count");
                let _ = writeln!(out, "  table_[{slot}] = {func};");
            }
        }
    }
    out.push_str("}\n\n");

    out.push_str("void ModuleInst::initData() {\n");
    for (i, segment) in module.data.iter().enumerate() {
        if segment.bytes.is_empty() {
            continue;
        }
        let Some(InitExpr::I32Const(offset)) = segment.offset else {
            return Err(CodegenError::Unsupported(format!(
                "data segment {i} is passive or has a non-constant offset"
            )));
        };
        let _ = writeln!(
            out,
            "  mem_->WriteBytes({}, kData{i}, sizeof(kData{i}));",
            offset as u32
        );
    }
    out.push_str("}\n\n");

    // The standard Go ABI exports. Missing or mismatched exports trap at
    // the call site instead of failing the whole transpilation.
    out.push_str(&standard_export(
        module,
        "run",
        &[ValType::I32, ValType::I32],
        None,
        "void ModuleInst::run(int32_t argc, int32_t argv)",
        "(argc, argv)",
    ));
    out.push_str(&standard_export(
        module,
        "resume",
        &[],
        None,
        "void ModuleInst::resume()",
        "()",
    ));
    out.push_str(&standard_export(
        module,
        "getsp",
        &[],
        Some(ValType::I32),
        "int32_t ModuleInst::getsp()",
        "()",
    ));
    out.push_str("Mem* ModuleInst::mem() { return mem_.get(); }\n\n");

    for wrapper in export_wrappers {
        out.push_str(&wrapper.def);
        out.push('\n');
    }

    out.push_str("std::unique_ptr<Inst> NewInst(Go* go) {\n");
    out.push_str("  return std::make_unique<ModuleInst>(go);\n}\n");
    let _ = write!(out, "\n}}  // namespace {ns}\n");
    Ok(out)
}

fn standard_export(
    module: &Module,
    name: &str,
    params: &[ValType],
    result: Option<ValType>,
    signature: &str,
    args: &str,
) -> String {
    let target = module.exported_func(name).and_then(|index| {
        let ty = module.func_type(index)?;
        let matches =
            ty.params == params && ty.results == result.map(|t| vec![t]).unwrap_or_default();
        matches.then(|| mangle::func_ident(module, index))
    });
    match target {
        Some(target) => {
            let call = if result.is_some() {
                format!("return {target}{args};")
            } else {
                format!("{target}{args};")
            };
            format!("{signature} {{ {call} }}\n\n")
        }
        None => {
            // Unused parameters are silenced through the signature names.
            let silence = if signature.contains("argc") {
                "(void)argc;\n  (void)argv;\n  "
            } else {
                ""
            };
            format!("{signature} {{\n  {silence}Trap(\"missing export: {name}\");\n}}\n\n")
        }
    }
}

fn functions_source(
    ns: &str,
    include: &str,
    method_defs: &[String],
    dispatcher_defs: &[String],
) -> String {
    let mut out = String::new();
    out.push_str(file_banner());
    out.push_str("#include <cmath>\n#include <cstdint>\n\n");
    let _ = writeln!(out, "#include \"{include}module.h\"");
    let _ = writeln!(out, "#include \"{include}numeric.h\"");
    let _ = writeln!(out, "#include \"{include}trap.h\"");
    let _ = writeln!(out, "\nnamespace {ns} {{\n");
    for def in method_defs {
        out.push_str(def);
        out.push('\n');
    }
    for def in dispatcher_defs {
        out.push_str(def);
        out.push('\n');
    }
    let _ = write!(out, "}}  // namespace {ns}\n");
    out
}

#[allow(clippy::too_many_lines)]
fn validate(module: &Module) -> Result<(), CodegenError> {
    if module.functions.len() != module.code.len() {
        return Err(CodegenError::Validation(format!(
            "function section declares {} functions but the code section has {} bodies",
            module.functions.len(),
            module.code.len()
        )));
    }
    for (i, type_index) in module.functions.iter().enumerate() {
        if *type_index as usize >= module.types.len() {
            return Err(CodegenError::Validation(format!(
                "function {i} references unknown type {type_index}"
            )));
        }
    }
    for import in &module.imports {
        match &import.kind {
            ImportKind::Func { type_index } => {
                if *type_index as usize >= module.types.len() {
                    return Err(CodegenError::Validation(format!(
                        "import {}.{} references unknown type {type_index}",
                        import.module, import.field
                    )));
                }
            }
            ImportKind::Table(_) | ImportKind::Memory(_) | ImportKind::Global(_) => {
                return Err(CodegenError::Unsupported(format!(
                    "non-function import {}.{}",
                    import.module, import.field
                )));
            }
        }
    }
    if module.tables.len() > 1 {
        return Err(CodegenError::Unsupported("multiple tables".to_string()));
    }
    if module.memories.len() > 1 {
        return Err(CodegenError::Unsupported("multiple memories".to_string()));
    }

    let func_count = module.func_count();
    let mut seen_exports: Vec<&str> = Vec::new();
    for export in &module.exports {
        if seen_exports.contains(&export.name.as_str()) {
            return Err(CodegenError::Validation(format!(
                "duplicate export name {:?}",
                export.name
            )));
        }
        seen_exports.push(&export.name);
        let in_range = match export.kind {
            ExportKind::Func => (export.index as usize) < func_count,
            ExportKind::Table => (export.index as usize) < module.tables.len(),
            ExportKind::Memory => (export.index as usize) < module.memories.len(),
            ExportKind::Global => (export.index as usize) < module.globals.len(),
        };
        if !in_range {
            return Err(CodegenError::Validation(format!(
                "export {:?} references index {} out of range",
                export.name, export.index
            )));
        }
    }

    if let Some(start) = module.start {
        let ty = module.func_type(start).ok_or_else(|| {
            CodegenError::Validation(format!("start function {start} does not exist"))
        })?;
        if !ty.params.is_empty() || !ty.results.is_empty() {
            return Err(CodegenError::Validation(format!(
                "start function {start} must have no parameters or results"
            )));
        }
    }

    match module.table() {
        Some(table) => {
            for segment in &module.elements {
                let InitExpr::I32Const(offset) = segment.offset else {
                    return Err(CodegenError::Unsupported(
                        "element segment with a non-constant offset".to_string(),
                    ));
                };
                let end = u64::from(offset as u32) + segment.func_indices.len() as u64;
                if end > u64::from(table.initial) {
                    return Err(CodegenError::Validation(format!(
                        "element segment at {offset} overflows the table"
                    )));
                }
                for func in &segment.func_indices {
                    if (*func as usize) >= func_count {
                        return Err(CodegenError::Validation(format!(
                            "element segment references unknown function {func}"
                        )));
                    }
                }
            }
        }
        None => {
            if !module.elements.is_empty() {
                return Err(CodegenError::Validation(
                    "element segments without a table".to_string(),
                ));
            }
        }
    }

    if let Some(count) = module.data_count {
        if count as usize != module.data.len() {
            return Err(CodegenError::Validation(format!(
                "data count section declares {count} segments but the data section has {}",
                module.data.len()
            )));
        }
    }
    let memory_bytes = module
        .memory()
        .map_or(0, |m| u64::from(m.initial_pages) * WASM_PAGE_SIZE);
    for (i, segment) in module.data.iter().enumerate() {
        match segment.offset {
            Some(InitExpr::I32Const(offset)) => {
                let end = u64::from(offset as u32) + segment.bytes.len() as u64;
                if end > memory_bytes {
                    return Err(CodegenError::Validation(format!(
                        "data segment {i} does not fit in the initial memory"
                    )));
                }
            }
            Some(_) => {
                return Err(CodegenError::Unsupported(format!(
                    "data segment {i} has a non-constant offset"
                )));
            }
            None => {
                return Err(CodegenError::Unsupported(format!(
                    "passive data segment {i}"
                )));
            }
        }
    }
    Ok(())
}

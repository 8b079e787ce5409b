//! Per-function lowering: wasm instruction streams to C++ statements.
//!
//! Pure operators fold into expression strings on the symbolic stack;
//! side-effecting operators (calls, stores, `memory.grow`, assignments
//! that alias pending reads) first spill the stack into `stack{N}`
//! temporaries so everything is evaluated in wasm order. Control flow is
//! restructured with `goto` and numbered labels: loops re-enter at
//! `label{N}_start`, every other frame is left at `label{N}_end`.

use std::collections::BTreeSet;

use wasm2cpp_decoder::{BlockType, FuncType, FunctionBody, Instr, MemArg, Module, ValType};

use crate::cpp::{self, type_keyword};
use crate::errors::CodegenError;
use crate::labels::{FrameKind, Frames};
use crate::stack::StackVars;

/// Lowers one decoded function body into indented C++ statement lines.
/// Type indices needing a `call_indirect` dispatcher are collected into
/// `dispatch`.
pub(crate) fn lower_function(
    module: &Module,
    func: u32,
    body: &FunctionBody,
    dispatch: &mut BTreeSet<u32>,
) -> Result<Vec<String>, CodegenError> {
    let ty = module
        .func_type(func)
        .ok_or_else(|| CodegenError::Validation(format!("function {func} has no type")))?;
    if ty.results.len() > 1 {
        return Err(CodegenError::Unsupported(format!(
            "function {func} returns multiple values"
        )));
    }

    let mut locals = ty.params.clone();
    locals.extend_from_slice(&body.locals);

    let mut lowerer = Lowerer {
        module,
        func,
        result: ty.results.first().copied(),
        locals,
        stack: StackVars::new(),
        frames: Frames::new(),
        out: Vec::new(),
        indent: 1,
        dead: false,
        dead_depth: 0,
        dispatch,
    };

    // The wasm spec zero-initializes declared locals.
    for (i, local_ty) in body.locals.iter().enumerate() {
        let index = ty.params.len() + i;
        lowerer.emit(format!("{} local{index} = 0;", type_keyword(*local_ty)));
    }

    for instr in &body.instrs {
        lowerer.lower(instr)?;
    }

    if !lowerer.frames.is_empty() {
        return Err(CodegenError::Validation(format!(
            "function {func} has unbalanced control frames"
        )));
    }
    if lowerer.dead && lowerer.result.is_some() {
        // The body ended behind an unconditional branch; keep the C++
        // control flow well-formed for value-returning functions.
        lowerer.emit("return 0;");
    }
    Ok(lowerer.out)
}

struct Lowerer<'m, 'd> {
    module: &'m Module,
    func: u32,
    result: Option<ValType>,
    locals: Vec<ValType>,
    stack: StackVars,
    frames: Frames,
    out: Vec<String>,
    indent: usize,
    dead: bool,
    dead_depth: u32,
    dispatch: &'d mut BTreeSet<u32>,
}

impl Lowerer<'_, '_> {
    fn emit(&mut self, line: impl AsRef<str>) {
        self.out
            .push(format!("{}{}", "  ".repeat(self.indent), line.as_ref()));
    }

    fn emit_all(&mut self, lines: Vec<String>) {
        for line in lines {
            self.emit(line);
        }
    }

    fn pop(&mut self) -> Result<(String, ValType), CodegenError> {
        self.stack
            .pop()
            .ok_or(CodegenError::StackUnderflow(self.func))
    }

    fn peep(&mut self) -> Result<String, CodegenError> {
        let (lines, name) = self
            .stack
            .peep()
            .ok_or(CodegenError::StackUnderflow(self.func))?;
        self.emit_all(lines);
        Ok(name)
    }

    fn local_type(&self, index: u32) -> Result<ValType, CodegenError> {
        self.locals.get(index as usize).copied().ok_or_else(|| {
            CodegenError::Validation(format!(
                "local {index} out of range in function {}",
                self.func
            ))
        })
    }

    fn global_type(&self, index: u32) -> Result<ValType, CodegenError> {
        self.module
            .globals
            .get(index as usize)
            .map(|g| g.ty.content)
            .ok_or_else(|| {
                CodegenError::Validation(format!(
                    "global {index} out of range in function {}",
                    self.func
                ))
            })
    }

    fn unary(
        &mut self,
        ty: ValType,
        f: impl FnOnce(&str) -> String,
    ) -> Result<(), CodegenError> {
        let (a, _) = self.pop()?;
        self.stack.push(f(&a), ty);
        Ok(())
    }

    fn binary(
        &mut self,
        ty: ValType,
        f: impl FnOnce(&str, &str) -> String,
    ) -> Result<(), CodegenError> {
        let (b, _) = self.pop()?;
        let (a, _) = self.pop()?;
        self.stack.push(f(&a, &b), ty);
        Ok(())
    }

    fn block_result(&self, bt: BlockType) -> Result<Option<ValType>, CodegenError> {
        match bt {
            BlockType::Empty => Ok(None),
            BlockType::Value(ty) => Ok(Some(ty)),
            BlockType::TypeIndex(_) => Err(CodegenError::Unsupported(format!(
                "multi-value block type in function {}",
                self.func
            ))),
        }
    }

    /// Declares the zero-initialized result temporary of a frame, ahead of
    /// the scope it belongs to, so the value survives the closing brace.
    fn declare_result_var(&mut self, result: Option<ValType>) -> Option<String> {
        let ty = result?;
        let name = self.stack.alloc_temp();
        self.emit(format!("{} {name} = 0;", type_keyword(ty)));
        Some(name)
    }

    fn enter_frame(&mut self, kind: FrameKind, bt: BlockType) -> Result<(), CodegenError> {
        let result = self.block_result(bt)?;
        let result_var = self.declare_result_var(result);
        let height = self.stack.len();
        let label = self.frames.push(kind, result, height, result_var);
        match kind {
            FrameKind::Block => self.emit("{"),
            FrameKind::Loop => {
                self.emit(format!("label{label}_start:;"));
                self.emit("{");
            }
            FrameKind::If => {
                unreachable!("if frames open their own conditional scope");
            }
        }
        self.indent += 1;
        Ok(())
    }

    /// Whether a branch to `depth` copies the stack top; depth equal to
    /// the frame count addresses the function body itself.
    fn branch_carries_value(&self, depth: u32) -> Result<bool, CodegenError> {
        if depth as usize == self.frames.len() {
            return Ok(self.result.is_some());
        }
        self.frames
            .get(depth)
            .map(|frame| frame.branch_carries_value())
            .ok_or(CodegenError::BadBranchDepth {
                func: self.func,
                depth,
            })
    }

    /// The statements performing one branch: the result copy, if the
    /// target expects one, then the jump.
    fn branch_stmts(&self, depth: u32, value: Option<&str>) -> Result<Vec<String>, CodegenError> {
        if depth as usize == self.frames.len() {
            return Ok(match value {
                Some(v) => vec![format!("return {v};")],
                None => vec!["return;".to_string()],
            });
        }
        let frame = self.frames.get(depth).ok_or(CodegenError::BadBranchDepth {
            func: self.func,
            depth,
        })?;
        let mut stmts = Vec::new();
        if frame.branch_carries_value() {
            let var = frame
                .result_var
                .as_ref()
                .expect("value-carrying frame always has a result temporary");
            let value = value.expect("branch value was materialized");
            stmts.push(format!("{var} = {value};"));
        }
        stmts.push(format!("goto {};", frame.branch_target()));
        Ok(stmts)
    }

    fn spill_if_aliases(&mut self, needle: &str) {
        if self.stack.includes_in_non_top(needle) {
            let lines = self.stack.spill();
            self.emit_all(lines);
        }
    }

    fn call(&mut self, callee: String, ty: &FuncType) -> Result<(), CodegenError> {
        let lines = self.stack.spill();
        self.emit_all(lines);
        let mut args = Vec::with_capacity(ty.params.len());
        for _ in 0..ty.params.len() {
            args.push(self.pop()?.0);
        }
        args.reverse();
        let call = format!("{callee}({})", args.join(", "));
        match ty.results.len() {
            0 => self.emit(format!("{call};")),
            1 => {
                let result_ty = ty.results[0];
                let name = self.stack.push_lhs(result_ty);
                self.emit(format!("{} {name} = {call};", type_keyword(result_ty)));
            }
            _ => {
                return Err(CodegenError::Unsupported(format!(
                    "multi-value call result in function {}",
                    self.func
                )));
            }
        }
        Ok(())
    }

    fn load(
        &mut self,
        arg: MemArg,
        method: &str,
        cast: &str,
        ty: ValType,
    ) -> Result<(), CodegenError> {
        let (addr, _) = self.pop()?;
        self.stack.push(
            format!(
                "{cast}mem_->{method}((int64_t)(uint32_t)({addr}) + {})",
                arg.offset
            ),
            ty,
        );
        Ok(())
    }

    fn store(&mut self, arg: MemArg, method: &str, cast: &str) -> Result<(), CodegenError> {
        // A store invalidates reads still sitting on the symbolic stack.
        self.spill_if_aliases("mem_->");
        let (value, _) = self.pop()?;
        let (addr, _) = self.pop()?;
        self.emit(format!(
            "mem_->{method}((int64_t)(uint32_t)({addr}) + {}, {cast}({value}));",
            arg.offset
        ));
        Ok(())
    }

    #[allow(clippy::too_many_lines)]
    fn lower(&mut self, instr: &Instr) -> Result<(), CodegenError> {
        use ValType::{F32, F64, I32, I64};

        // Inside a dead region only structural instructions matter.
        if self.dead {
            match instr {
                Instr::Block(_) | Instr::Loop(_) | Instr::If(_) => {
                    self.dead_depth += 1;
                    return Ok(());
                }
                Instr::Else | Instr::End => {}
                _ => return Ok(()),
            }
        }

        match instr {
            Instr::Unreachable => {
                self.emit("Trap(\"unreachable\");");
                self.dead = true;
            }
            Instr::Nop => {}

            Instr::Block(bt) => self.enter_frame(FrameKind::Block, *bt)?,
            Instr::Loop(bt) => self.enter_frame(FrameKind::Loop, *bt)?,
            Instr::If(bt) => {
                let (cond, _) = self.pop()?;
                let result = self.block_result(*bt)?;
                let result_var = self.declare_result_var(result);
                let height = self.stack.len();
                self.frames.push(FrameKind::If, result, height, result_var);
                self.emit(format!("if (({cond}) != 0) {{"));
                self.indent += 1;
            }
            Instr::Else => {
                if self.dead && self.dead_depth > 0 {
                    return Ok(());
                }
                let (height, result_var) = {
                    let frame = self
                        .frames
                        .top()
                        .ok_or_else(|| {
                            CodegenError::Validation(format!(
                                "else without an open frame in function {}",
                                self.func
                            ))
                        })?;
                    (frame.height, frame.result_var.clone())
                };
                if self.dead {
                    self.stack.truncate(height);
                    self.dead = false;
                } else {
                    if let Some(var) = result_var {
                        let (value, _) = self.pop()?;
                        self.emit(format!("{var} = ({value});"));
                    }
                    if self.stack.len() != height {
                        return Err(CodegenError::Validation(format!(
                            "unbalanced then-branch in function {}",
                            self.func
                        )));
                    }
                }
                self.indent -= 1;
                self.emit("} else {");
                self.indent += 1;
            }
            Instr::End => {
                if self.dead && self.dead_depth > 0 {
                    self.dead_depth -= 1;
                    return Ok(());
                }
                if self.frames.is_empty() {
                    // End of the function body.
                    if !self.dead {
                        if self.result.is_some() {
                            let (value, _) = self.pop()?;
                            self.emit(format!("return ({value});"));
                        }
                        if !self.stack.is_empty() {
                            return Err(CodegenError::Validation(format!(
                                "operand stack not empty at end of function {}",
                                self.func
                            )));
                        }
                    }
                    return Ok(());
                }
                let frame = self.frames.pop().expect("frame stack checked above");
                if self.dead {
                    self.stack.truncate(frame.height);
                    self.dead = false;
                } else {
                    if let Some(var) = &frame.result_var {
                        let (value, _) = self.pop()?;
                        self.emit(format!("{var} = ({value});"));
                    }
                    if self.stack.len() != frame.height {
                        return Err(CodegenError::Validation(format!(
                            "unbalanced frame in function {}",
                            self.func
                        )));
                    }
                }
                self.indent -= 1;
                self.emit("}");
                if !matches!(frame.kind, FrameKind::Loop) {
                    self.emit(format!("label{}_end:;", frame.label));
                }
                if let (Some(ty), Some(var)) = (frame.result, frame.result_var) {
                    self.stack.push(var, ty);
                }
            }

            Instr::Br(depth) => {
                let value = if self.branch_carries_value(*depth)? {
                    Some(self.peep()?)
                } else {
                    None
                };
                let stmts = self.branch_stmts(*depth, value.as_deref())?;
                self.emit_all(stmts);
                self.dead = true;
            }
            Instr::BrIf(depth) => {
                let (cond, _) = self.pop()?;
                let value = if self.branch_carries_value(*depth)? {
                    Some(self.peep()?)
                } else {
                    None
                };
                let stmts = self.branch_stmts(*depth, value.as_deref())?;
                if stmts.len() == 1 {
                    self.emit(format!("if (({cond}) != 0) {{ {} }}", stmts[0]));
                } else {
                    self.emit(format!("if (({cond}) != 0) {{"));
                    self.indent += 1;
                    self.emit_all(stmts);
                    self.indent -= 1;
                    self.emit("}");
                }
            }
            Instr::BrTable { targets, default } => {
                let (index, _) = self.pop()?;
                let needs_value = targets
                    .iter()
                    .chain(std::iter::once(default))
                    .try_fold(false, |acc, depth| {
                        Ok::<_, CodegenError>(acc | self.branch_carries_value(*depth)?)
                    })?;
                let value = if needs_value {
                    Some(self.peep()?)
                } else {
                    None
                };
                self.emit(format!("switch (({index})) {{"));
                for (i, depth) in targets.iter().enumerate() {
                    let carried = self.branch_carries_value(*depth)?;
                    let stmts = self.branch_stmts(*depth, carried.then_some(()).and(value.as_deref()))?;
                    self.emit(format!("case {i}:"));
                    self.indent += 1;
                    self.emit_all(stmts);
                    self.indent -= 1;
                }
                let carried = self.branch_carries_value(*default)?;
                let stmts = self.branch_stmts(*default, carried.then_some(()).and(value.as_deref()))?;
                self.emit("default:");
                self.indent += 1;
                self.emit_all(stmts);
                self.indent -= 1;
                self.emit("}");
                self.dead = true;
            }
            Instr::Return => {
                if self.result.is_some() {
                    let (value, _) = self.pop()?;
                    self.emit(format!("return ({value});"));
                } else {
                    self.emit("return;");
                }
                self.dead = true;
            }
            Instr::Call(index) => {
                let ty = self
                    .module
                    .func_type(*index)
                    .ok_or_else(|| {
                        CodegenError::Validation(format!(
                            "call to unknown function {index} in function {}",
                            self.func
                        ))
                    })?
                    .clone();
                let callee = crate::mangle::func_ident(self.module, *index);
                self.call(callee, &ty)?;
            }
            Instr::CallIndirect { type_index } => {
                let ty = self
                    .module
                    .types
                    .get(*type_index as usize)
                    .ok_or_else(|| {
                        CodegenError::Validation(format!(
                            "call_indirect to unknown type {type_index} in function {}",
                            self.func
                        ))
                    })?
                    .clone();
                if self.module.table().is_none() {
                    return Err(CodegenError::Validation(format!(
                        "call_indirect without a table in function {}",
                        self.func
                    )));
                }
                self.dispatch.insert(*type_index);
                let lines = self.stack.spill();
                self.emit_all(lines);
                let (index, _) = self.pop()?;
                let mut args = Vec::with_capacity(ty.params.len() + 1);
                for _ in 0..ty.params.len() {
                    args.push(self.pop()?.0);
                }
                args.reverse();
                args.insert(0, index);
                let call = format!("callIndirect{type_index}({})", args.join(", "));
                match ty.results.len() {
                    0 => self.emit(format!("{call};")),
                    1 => {
                        let result_ty = ty.results[0];
                        let name = self.stack.push_lhs(result_ty);
                        self.emit(format!("{} {name} = {call};", type_keyword(result_ty)));
                    }
                    _ => {
                        return Err(CodegenError::Unsupported(format!(
                            "multi-value call_indirect result in function {}",
                            self.func
                        )));
                    }
                }
            }

            Instr::Drop => {
                let (value, _) = self.pop()?;
                if !cpp::is_trivial(&value) {
                    // The dropped expression may still trap; evaluate it.
                    self.emit(format!("(void)({value});"));
                }
            }
            Instr::Select => {
                let (cond, _) = self.pop()?;
                let (v2, t2) = self.pop()?;
                let (v1, t1) = self.pop()?;
                // Both operands are evaluated before the selection in wasm.
                let n1 = if cpp::is_trivial(&v1) {
                    v1
                } else {
                    let name = self.stack.alloc_temp();
                    self.emit(format!("{} {name} = ({v1});", type_keyword(t1)));
                    name
                };
                let n2 = if cpp::is_trivial(&v2) {
                    v2
                } else {
                    let name = self.stack.alloc_temp();
                    self.emit(format!("{} {name} = ({v2});", type_keyword(t2)));
                    name
                };
                self.stack
                    .push(format!("((({cond}) != 0) ? {n1} : {n2})"), t1);
            }

            Instr::LocalGet(index) => {
                let ty = self.local_type(*index)?;
                self.stack.push(format!("local{index}"), ty);
            }
            Instr::LocalSet(index) => {
                self.local_type(*index)?;
                self.spill_if_aliases(&format!("local{index}"));
                let (value, _) = self.pop()?;
                self.emit(format!("local{index} = ({value});"));
            }
            Instr::LocalTee(index) => {
                let ty = self.local_type(*index)?;
                self.spill_if_aliases(&format!("local{index}"));
                let (value, _) = self.pop()?;
                self.emit(format!("local{index} = ({value});"));
                self.stack.push(format!("local{index}"), ty);
            }
            Instr::GlobalGet(index) => {
                let ty = self.global_type(*index)?;
                self.stack.push(format!("global{index}"), ty);
            }
            Instr::GlobalSet(index) => {
                self.global_type(*index)?;
                self.spill_if_aliases(&format!("global{index}"));
                let (value, _) = self.pop()?;
                self.emit(format!("global{index} = ({value});"));
            }

            Instr::I32Load(arg) => self.load(*arg, "LoadInt32", "", I32)?,
            Instr::I64Load(arg) => self.load(*arg, "LoadInt64", "", I64)?,
            Instr::F32Load(arg) => self.load(*arg, "LoadFloat32", "", F32)?,
            Instr::F64Load(arg) => self.load(*arg, "LoadFloat64", "", F64)?,
            Instr::I32Load8S(arg) => self.load(*arg, "LoadInt8", "(int32_t)", I32)?,
            Instr::I32Load8U(arg) => self.load(*arg, "LoadUint8", "(int32_t)", I32)?,
            Instr::I32Load16S(arg) => self.load(*arg, "LoadInt16", "(int32_t)", I32)?,
            Instr::I32Load16U(arg) => self.load(*arg, "LoadUint16", "(int32_t)", I32)?,
            Instr::I64Load8S(arg) => self.load(*arg, "LoadInt8", "(int64_t)", I64)?,
            Instr::I64Load8U(arg) => self.load(*arg, "LoadUint8", "(int64_t)", I64)?,
            Instr::I64Load16S(arg) => self.load(*arg, "LoadInt16", "(int64_t)", I64)?,
            Instr::I64Load16U(arg) => self.load(*arg, "LoadUint16", "(int64_t)", I64)?,
            Instr::I64Load32S(arg) => self.load(*arg, "LoadInt32", "(int64_t)", I64)?,
            Instr::I64Load32U(arg) => self.load(*arg, "LoadUint32", "(int64_t)", I64)?,
            Instr::I32Store(arg) => self.store(*arg, "StoreInt32", "")?,
            Instr::I64Store(arg) => self.store(*arg, "StoreInt64", "")?,
            Instr::F32Store(arg) => self.store(*arg, "StoreFloat32", "")?,
            Instr::F64Store(arg) => self.store(*arg, "StoreFloat64", "")?,
            Instr::I32Store8(arg) => {
                self.store(*arg, "StoreInt8", "(int8_t)(uint8_t)(uint32_t)")?;
            }
            Instr::I32Store16(arg) => {
                self.store(*arg, "StoreInt16", "(int16_t)(uint16_t)(uint32_t)")?;
            }
            Instr::I64Store8(arg) => {
                self.store(*arg, "StoreInt8", "(int8_t)(uint8_t)(uint64_t)")?;
            }
            Instr::I64Store16(arg) => {
                self.store(*arg, "StoreInt16", "(int16_t)(uint16_t)(uint64_t)")?;
            }
            Instr::I64Store32(arg) => {
                self.store(*arg, "StoreInt32", "(int32_t)(uint32_t)(uint64_t)")?;
            }
            Instr::MemorySize => self.stack.push("mem_->Size()".to_string(), I32),
            Instr::MemoryGrow => {
                self.spill_if_aliases("mem_->");
                let (delta, _) = self.pop()?;
                let name = self.stack.push_lhs(I32);
                self.emit(format!("int32_t {name} = mem_->Grow(({delta}));"));
            }
            Instr::MemoryCopy => {
                self.spill_if_aliases("mem_->");
                let (len, _) = self.pop()?;
                let (src, _) = self.pop()?;
                let (dest, _) = self.pop()?;
                self.emit(format!(
                    "mem_->Copy((int64_t)(uint32_t)({dest}), (int64_t)(uint32_t)({src}), (int64_t)(uint32_t)({len}));"
                ));
            }
            Instr::MemoryFill => {
                self.spill_if_aliases("mem_->");
                let (len, _) = self.pop()?;
                let (value, _) = self.pop()?;
                let (dest, _) = self.pop()?;
                self.emit(format!(
                    "mem_->Fill((int64_t)(uint32_t)({dest}), ({value}), (int64_t)(uint32_t)({len}));"
                ));
            }

            Instr::I32Const(v) => self.stack.push(cpp::i32_literal(*v), I32),
            Instr::I64Const(v) => self.stack.push(cpp::i64_literal(*v), I64),
            Instr::F32Const(bits) => self.stack.push(cpp::f32_literal(*bits), F32),
            Instr::F64Const(bits) => self.stack.push(cpp::f64_literal(*bits), F64),

            Instr::I32Eqz => self.unary(I32, |a| format!("((({a}) == 0) ? 1 : 0)"))?,
            Instr::I32Eq => self.binary(I32, |a, b| format!("((({a}) == ({b})) ? 1 : 0)"))?,
            Instr::I32Ne => self.binary(I32, |a, b| format!("((({a}) != ({b})) ? 1 : 0)"))?,
            Instr::I32LtS => self.binary(I32, |a, b| format!("((({a}) < ({b})) ? 1 : 0)"))?,
            Instr::I32LtU => self.binary(I32, |a, b| {
                format!("(((uint32_t)({a}) < (uint32_t)({b})) ? 1 : 0)")
            })?,
            Instr::I32GtS => self.binary(I32, |a, b| format!("((({a}) > ({b})) ? 1 : 0)"))?,
            Instr::I32GtU => self.binary(I32, |a, b| {
                format!("(((uint32_t)({a}) > (uint32_t)({b})) ? 1 : 0)")
            })?,
            Instr::I32LeS => self.binary(I32, |a, b| format!("((({a}) <= ({b})) ? 1 : 0)"))?,
            Instr::I32LeU => self.binary(I32, |a, b| {
                format!("(((uint32_t)({a}) <= (uint32_t)({b})) ? 1 : 0)")
            })?,
            Instr::I32GeS => self.binary(I32, |a, b| format!("((({a}) >= ({b})) ? 1 : 0)"))?,
            Instr::I32GeU => self.binary(I32, |a, b| {
                format!("(((uint32_t)({a}) >= (uint32_t)({b})) ? 1 : 0)")
            })?,

            Instr::I64Eqz => self.unary(I32, |a| format!("((({a}) == 0) ? 1 : 0)"))?,
            Instr::I64Eq => self.binary(I32, |a, b| format!("((({a}) == ({b})) ? 1 : 0)"))?,
            Instr::I64Ne => self.binary(I32, |a, b| format!("((({a}) != ({b})) ? 1 : 0)"))?,
            Instr::I64LtS => self.binary(I32, |a, b| format!("((({a}) < ({b})) ? 1 : 0)"))?,
            Instr::I64LtU => self.binary(I32, |a, b| {
                format!("(((uint64_t)({a}) < (uint64_t)({b})) ? 1 : 0)")
            })?,
            Instr::I64GtS => self.binary(I32, |a, b| format!("((({a}) > ({b})) ? 1 : 0)"))?,
            Instr::I64GtU => self.binary(I32, |a, b| {
                format!("(((uint64_t)({a}) > (uint64_t)({b})) ? 1 : 0)")
            })?,
            Instr::I64LeS => self.binary(I32, |a, b| format!("((({a}) <= ({b})) ? 1 : 0)"))?,
            Instr::I64LeU => self.binary(I32, |a, b| {
                format!("(((uint64_t)({a}) <= (uint64_t)({b})) ? 1 : 0)")
            })?,
            Instr::I64GeS => self.binary(I32, |a, b| format!("((({a}) >= ({b})) ? 1 : 0)"))?,
            Instr::I64GeU => self.binary(I32, |a, b| {
                format!("(((uint64_t)({a}) >= (uint64_t)({b})) ? 1 : 0)")
            })?,

            Instr::F32Eq | Instr::F64Eq => {
                self.binary(I32, |a, b| format!("((({a}) == ({b})) ? 1 : 0)"))?;
            }
            Instr::F32Ne | Instr::F64Ne => {
                self.binary(I32, |a, b| format!("((({a}) != ({b})) ? 1 : 0)"))?;
            }
            Instr::F32Lt | Instr::F64Lt => {
                self.binary(I32, |a, b| format!("((({a}) < ({b})) ? 1 : 0)"))?;
            }
            Instr::F32Gt | Instr::F64Gt => {
                self.binary(I32, |a, b| format!("((({a}) > ({b})) ? 1 : 0)"))?;
            }
            Instr::F32Le | Instr::F64Le => {
                self.binary(I32, |a, b| format!("((({a}) <= ({b})) ? 1 : 0)"))?;
            }
            Instr::F32Ge | Instr::F64Ge => {
                self.binary(I32, |a, b| format!("((({a}) >= ({b})) ? 1 : 0)"))?;
            }

            Instr::I32Clz => self.unary(I32, |a| format!("Clz32(({a}))"))?,
            Instr::I32Ctz => self.unary(I32, |a| format!("Ctz32(({a}))"))?,
            Instr::I32Popcnt => self.unary(I32, |a| format!("Popcnt32(({a}))"))?,
            Instr::I32Add => self.binary(I32, |a, b| {
                format!("(int32_t)((uint32_t)({a}) + (uint32_t)({b}))")
            })?,
            Instr::I32Sub => self.binary(I32, |a, b| {
                format!("(int32_t)((uint32_t)({a}) - (uint32_t)({b}))")
            })?,
            Instr::I32Mul => self.binary(I32, |a, b| {
                format!("(int32_t)((uint32_t)({a}) * (uint32_t)({b}))")
            })?,
            Instr::I32DivS => self.binary(I32, |a, b| format!("DivS32(({a}), ({b}))"))?,
            Instr::I32DivU => self.binary(I32, |a, b| format!("DivU32(({a}), ({b}))"))?,
            Instr::I32RemS => self.binary(I32, |a, b| format!("RemS32(({a}), ({b}))"))?,
            Instr::I32RemU => self.binary(I32, |a, b| format!("RemU32(({a}), ({b}))"))?,
            Instr::I32And => self.binary(I32, |a, b| format!("(({a}) & ({b}))"))?,
            Instr::I32Or => self.binary(I32, |a, b| format!("(({a}) | ({b}))"))?,
            Instr::I32Xor => self.binary(I32, |a, b| format!("(({a}) ^ ({b}))"))?,
            Instr::I32Shl => self.binary(I32, |a, b| format!("Shl32(({a}), ({b}))"))?,
            Instr::I32ShrS => self.binary(I32, |a, b| format!("ShrS32(({a}), ({b}))"))?,
            Instr::I32ShrU => self.binary(I32, |a, b| format!("ShrU32(({a}), ({b}))"))?,
            Instr::I32Rotl => self.binary(I32, |a, b| format!("Rotl32(({a}), ({b}))"))?,
            Instr::I32Rotr => self.binary(I32, |a, b| format!("Rotr32(({a}), ({b}))"))?,

            Instr::I64Clz => self.unary(I64, |a| format!("Clz64(({a}))"))?,
            Instr::I64Ctz => self.unary(I64, |a| format!("Ctz64(({a}))"))?,
            Instr::I64Popcnt => self.unary(I64, |a| format!("Popcnt64(({a}))"))?,
            Instr::I64Add => self.binary(I64, |a, b| {
                format!("(int64_t)((uint64_t)({a}) + (uint64_t)({b}))")
            })?,
            Instr::I64Sub => self.binary(I64, |a, b| {
                format!("(int64_t)((uint64_t)({a}) - (uint64_t)({b}))")
            })?,
            Instr::I64Mul => self.binary(I64, |a, b| {
                format!("(int64_t)((uint64_t)({a}) * (uint64_t)({b}))")
            })?,
            Instr::I64DivS => self.binary(I64, |a, b| format!("DivS64(({a}), ({b}))"))?,
            Instr::I64DivU => self.binary(I64, |a, b| format!("DivU64(({a}), ({b}))"))?,
            Instr::I64RemS => self.binary(I64, |a, b| format!("RemS64(({a}), ({b}))"))?,
            Instr::I64RemU => self.binary(I64, |a, b| format!("RemU64(({a}), ({b}))"))?,
            Instr::I64And => self.binary(I64, |a, b| format!("(({a}) & ({b}))"))?,
            Instr::I64Or => self.binary(I64, |a, b| format!("(({a}) | ({b}))"))?,
            Instr::I64Xor => self.binary(I64, |a, b| format!("(({a}) ^ ({b}))"))?,
            Instr::I64Shl => self.binary(I64, |a, b| format!("Shl64(({a}), ({b}))"))?,
            Instr::I64ShrS => self.binary(I64, |a, b| format!("ShrS64(({a}), ({b}))"))?,
            Instr::I64ShrU => self.binary(I64, |a, b| format!("ShrU64(({a}), ({b}))"))?,
            Instr::I64Rotl => self.binary(I64, |a, b| format!("Rotl64(({a}), ({b}))"))?,
            Instr::I64Rotr => self.binary(I64, |a, b| format!("Rotr64(({a}), ({b}))"))?,

            Instr::F32Abs => self.unary(F32, |a| format!("std::fabs(({a}))"))?,
            Instr::F32Neg => self.unary(F32, |a| format!("(-({a}))"))?,
            Instr::F32Ceil => self.unary(F32, |a| format!("std::ceil(({a}))"))?,
            Instr::F32Floor => self.unary(F32, |a| format!("std::floor(({a}))"))?,
            Instr::F32Trunc => self.unary(F32, |a| format!("std::trunc(({a}))"))?,
            Instr::F32Nearest => self.unary(F32, |a| format!("FNearest32(({a}))"))?,
            Instr::F32Sqrt => self.unary(F32, |a| format!("std::sqrt(({a}))"))?,
            Instr::F32Add => self.binary(F32, |a, b| format!("(({a}) + ({b}))"))?,
            Instr::F32Sub => self.binary(F32, |a, b| format!("(({a}) - ({b}))"))?,
            Instr::F32Mul => self.binary(F32, |a, b| format!("(({a}) * ({b}))"))?,
            Instr::F32Div => self.binary(F32, |a, b| format!("(({a}) / ({b}))"))?,
            Instr::F32Min => self.binary(F32, |a, b| format!("FMin32(({a}), ({b}))"))?,
            Instr::F32Max => self.binary(F32, |a, b| format!("FMax32(({a}), ({b}))"))?,
            Instr::F32Copysign => {
                self.binary(F32, |a, b| format!("std::copysign(({a}), ({b}))"))?;
            }

            Instr::F64Abs => self.unary(F64, |a| format!("std::fabs(({a}))"))?,
            Instr::F64Neg => self.unary(F64, |a| format!("(-({a}))"))?,
            Instr::F64Ceil => self.unary(F64, |a| format!("std::ceil(({a}))"))?,
            Instr::F64Floor => self.unary(F64, |a| format!("std::floor(({a}))"))?,
            Instr::F64Trunc => self.unary(F64, |a| format!("std::trunc(({a}))"))?,
            Instr::F64Nearest => self.unary(F64, |a| format!("FNearest64(({a}))"))?,
            Instr::F64Sqrt => self.unary(F64, |a| format!("std::sqrt(({a}))"))?,
            Instr::F64Add => self.binary(F64, |a, b| format!("(({a}) + ({b}))"))?,
            Instr::F64Sub => self.binary(F64, |a, b| format!("(({a}) - ({b}))"))?,
            Instr::F64Mul => self.binary(F64, |a, b| format!("(({a}) * ({b}))"))?,
            Instr::F64Div => self.binary(F64, |a, b| format!("(({a}) / ({b}))"))?,
            Instr::F64Min => self.binary(F64, |a, b| format!("FMin64(({a}), ({b}))"))?,
            Instr::F64Max => self.binary(F64, |a, b| format!("FMax64(({a}), ({b}))"))?,
            Instr::F64Copysign => {
                self.binary(F64, |a, b| format!("std::copysign(({a}), ({b}))"))?;
            }

            Instr::I32WrapI64 => {
                self.unary(I32, |a| format!("(int32_t)(uint32_t)(uint64_t)({a})"))?;
            }
            Instr::I32TruncF32S => self.unary(I32, |a| format!("TruncF32ToI32S(({a}))"))?,
            Instr::I32TruncF32U => self.unary(I32, |a| format!("TruncF32ToI32U(({a}))"))?,
            Instr::I32TruncF64S => self.unary(I32, |a| format!("TruncF64ToI32S(({a}))"))?,
            Instr::I32TruncF64U => self.unary(I32, |a| format!("TruncF64ToI32U(({a}))"))?,
            Instr::I64ExtendI32S => self.unary(I64, |a| format!("(int64_t)({a})"))?,
            Instr::I64ExtendI32U => self.unary(I64, |a| format!("(int64_t)(uint32_t)({a})"))?,
            Instr::I64TruncF32S => self.unary(I64, |a| format!("TruncF32ToI64S(({a}))"))?,
            Instr::I64TruncF32U => self.unary(I64, |a| format!("TruncF32ToI64U(({a}))"))?,
            Instr::I64TruncF64S => self.unary(I64, |a| format!("TruncF64ToI64S(({a}))"))?,
            Instr::I64TruncF64U => self.unary(I64, |a| format!("TruncF64ToI64U(({a}))"))?,
            Instr::F32ConvertI32S => self.unary(F32, |a| format!("(float)({a})"))?,
            Instr::F32ConvertI32U => self.unary(F32, |a| format!("(float)(uint32_t)({a})"))?,
            Instr::F32ConvertI64S => self.unary(F32, |a| format!("(float)({a})"))?,
            Instr::F32ConvertI64U => self.unary(F32, |a| format!("(float)(uint64_t)({a})"))?,
            Instr::F32DemoteF64 => self.unary(F32, |a| format!("(float)({a})"))?,
            Instr::F64ConvertI32S => self.unary(F64, |a| format!("(double)({a})"))?,
            Instr::F64ConvertI32U => self.unary(F64, |a| format!("(double)(uint32_t)({a})"))?,
            Instr::F64ConvertI64S => self.unary(F64, |a| format!("(double)({a})"))?,
            Instr::F64ConvertI64U => self.unary(F64, |a| format!("(double)(uint64_t)({a})"))?,
            Instr::F64PromoteF32 => self.unary(F64, |a| format!("(double)({a})"))?,
            Instr::I32ReinterpretF32 => {
                self.unary(I32, |a| format!("(int32_t)F32Bits(({a}))"))?;
            }
            Instr::I64ReinterpretF64 => {
                self.unary(I64, |a| format!("(int64_t)F64Bits(({a}))"))?;
            }
            Instr::F32ReinterpretI32 => {
                self.unary(F32, |a| format!("BitsToF32((uint32_t)({a}))"))?;
            }
            Instr::F64ReinterpretI64 => {
                self.unary(F64, |a| format!("BitsToF64((uint64_t)({a}))"))?;
            }

            Instr::I32Extend8S => {
                self.unary(I32, |a| format!("(int32_t)(int8_t)(uint8_t)(uint32_t)({a})"))?;
            }
            Instr::I32Extend16S => {
                self.unary(I32, |a| {
                    format!("(int32_t)(int16_t)(uint16_t)(uint32_t)({a})")
                })?;
            }
            Instr::I64Extend8S => {
                self.unary(I64, |a| format!("(int64_t)(int8_t)(uint8_t)(uint64_t)({a})"))?;
            }
            Instr::I64Extend16S => {
                self.unary(I64, |a| {
                    format!("(int64_t)(int16_t)(uint16_t)(uint64_t)({a})")
                })?;
            }
            Instr::I64Extend32S => {
                self.unary(I64, |a| {
                    format!("(int64_t)(int32_t)(uint32_t)(uint64_t)({a})")
                })?;
            }

            Instr::I32TruncSatF32S => self.unary(I32, |a| format!("TruncSatF32ToI32S(({a}))"))?,
            Instr::I32TruncSatF32U => self.unary(I32, |a| format!("TruncSatF32ToI32U(({a}))"))?,
            Instr::I32TruncSatF64S => self.unary(I32, |a| format!("TruncSatF64ToI32S(({a}))"))?,
            Instr::I32TruncSatF64U => self.unary(I32, |a| format!("TruncSatF64ToI32U(({a}))"))?,
            Instr::I64TruncSatF32S => self.unary(I64, |a| format!("TruncSatF32ToI64S(({a}))"))?,
            Instr::I64TruncSatF32U => self.unary(I64, |a| format!("TruncSatF32ToI64U(({a}))"))?,
            Instr::I64TruncSatF64S => self.unary(I64, |a| format!("TruncSatF64ToI64S(({a}))"))?,
            Instr::I64TruncSatF64U => self.unary(I64, |a| format!("TruncSatF64ToI64U(({a}))"))?,

            Instr::RefNull => self.stack.push("-1".to_string(), ValType::FuncRef),
            Instr::RefIsNull => {
                self.unary(I32, |a| format!("((({a}) == -1) ? 1 : 0)"))?;
            }
        }
        Ok(())
    }
}

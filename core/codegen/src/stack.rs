//! The symbolic evaluation stack.
//!
//! Lowering keeps wasm's operand stack as a stack of C++ expression
//! strings paired with their wasm types. Pure operators combine entries
//! into larger expressions without emitting anything; side-effecting
//! operators materialize pending entries into numbered `stack{N}`
//! temporaries so evaluation order stays the wasm order.

use wasm2cpp_decoder::ValType;

use crate::cpp;

/// Expression stack mirroring the wasm operand stack during lowering.
///
/// The expression and type sequences always have the same length. The
/// temporary counter only ever grows, so every `stack{N}` name a function
/// body sees is unique.
#[derive(Debug, Default)]
pub struct StackVars {
    exprs: Vec<String>,
    types: Vec<ValType>,
    counter: usize,
    peeped: bool,
}

impl StackVars {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    /// Pushes an expression of the given type.
    pub fn push(&mut self, expr: String, ty: ValType) {
        self.exprs.push(expr);
        self.types.push(ty);
        self.peeped = false;
    }

    /// Pops the top expression. `None` when the stack is empty.
    pub fn pop(&mut self) -> Option<(String, ValType)> {
        let expr = self.exprs.pop()?;
        let ty = self.types.pop()?;
        self.peeped = false;
        Some((expr, ty))
    }

    /// Allocates a fresh `stack{N}` temporary and pushes it as the new
    /// top. The caller emits the assignment that gives it a value.
    pub fn push_lhs(&mut self, ty: ValType) -> String {
        let name = self.alloc_temp();
        self.push(name.clone(), ty);
        name
    }

    /// Allocates a temporary name without touching the stack.
    pub(crate) fn alloc_temp(&mut self) -> String {
        let name = format!("stack{}", self.counter);
        self.counter += 1;
        name
    }

    /// Makes the top of the stack a bare temporary and returns the lines
    /// that materialize it plus its name. Calling `peep` again without an
    /// intervening mutation emits nothing and returns the same name.
    pub fn peep(&mut self) -> Option<(Vec<String>, String)> {
        if self.peeped {
            return Some((Vec::new(), self.exprs.last()?.clone()));
        }
        let (expr, ty) = self.pop()?;
        let name = self.push_lhs(ty);
        let line = format!("{} {} = ({});", cpp::type_keyword(ty), name, expr);
        self.peeped = true;
        Some((vec![line], name))
    }

    /// Whether any entry below the top contains `needle`. Used to detect
    /// pending reads that a store or assignment would invalidate.
    #[must_use]
    pub fn includes_in_non_top(&self, needle: &str) -> bool {
        let len = self.exprs.len();
        if len < 2 {
            return false;
        }
        self.exprs[..len - 1].iter().any(|e| e.contains(needle))
    }

    /// Whether an entry may stay on the stack across a side effect:
    /// constants never change and `stack{N}` temporaries are assigned
    /// exactly once. Bare locals and globals are NOT safe; an assignment
    /// or call may overwrite them while the read is still pending.
    fn is_spill_safe(expr: &str) -> bool {
        let number = expr
            .strip_prefix('-')
            .unwrap_or(expr)
            .chars()
            .all(|c| c.is_ascii_digit());
        let temp = expr
            .strip_prefix("stack")
            .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()));
        (number && !expr.is_empty()) || temp
    }

    /// Materializes every unsafe entry into a temporary, preserving
    /// stack order, and returns the assignment lines to emit.
    pub fn spill(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        for i in 0..self.exprs.len() {
            if Self::is_spill_safe(&self.exprs[i]) {
                continue;
            }
            let name = self.alloc_temp();
            lines.push(format!(
                "{} {} = ({});",
                cpp::type_keyword(self.types[i]),
                name,
                self.exprs[i]
            ));
            self.exprs[i] = name;
        }
        if !lines.is_empty() {
            self.peeped = false;
        }
        lines
    }

    /// Drops entries down to `height`. Used when resuming after an
    /// unconditional branch left the stack in a dead state.
    pub(crate) fn truncate(&mut self, height: usize) {
        self.exprs.truncate(height);
        self.types.truncate(height);
        self.peeped = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_preserves_types() {
        let mut s = StackVars::new();
        s.push("a".to_string(), ValType::I32);
        s.push("b".to_string(), ValType::I64);
        assert_eq!(s.len(), 2);
        assert_eq!(s.pop(), Some(("b".to_string(), ValType::I64)));
        assert_eq!(s.pop(), Some(("a".to_string(), ValType::I32)));
        assert_eq!(s.pop(), None);
    }

    #[test]
    fn push_lhs_numbers_temporaries_monotonically() {
        let mut s = StackVars::new();
        assert_eq!(s.push_lhs(ValType::I32), "stack0");
        assert_eq!(s.push_lhs(ValType::F64), "stack1");
        s.pop();
        s.pop();
        // The counter never rewinds, even after pops.
        assert_eq!(s.push_lhs(ValType::I32), "stack2");
    }

    #[test]
    fn peep_materializes_then_idempotent() {
        let mut s = StackVars::new();
        s.push("foo".to_string(), ValType::F32);
        s.push("bar".to_string(), ValType::F64);

        let (lines, name) = s.peep().unwrap();
        assert_eq!(lines, vec!["double stack0 = (bar);".to_string()]);
        assert_eq!(name, "stack0");

        let (lines, name) = s.peep().unwrap();
        assert!(lines.is_empty());
        assert_eq!(name, "stack0");

        assert_eq!(s.pop(), Some(("stack0".to_string(), ValType::F64)));

        let (lines, name) = s.peep().unwrap();
        assert_eq!(lines, vec!["float stack1 = (foo);".to_string()]);
        assert_eq!(name, "stack1");
    }

    #[test]
    fn push_resets_the_peeped_state() {
        let mut s = StackVars::new();
        s.push("x".to_string(), ValType::I32);
        let (_, first) = s.peep().unwrap();
        s.push("y".to_string(), ValType::I32);
        s.pop();
        let (lines, second) = s.peep().unwrap();
        assert_eq!(lines.len(), 1);
        assert_ne!(first, second);
    }

    #[test]
    fn includes_in_non_top_ignores_the_top() {
        let mut s = StackVars::new();
        s.push("mem_->LoadInt32(local0)".to_string(), ValType::I32);
        assert!(!s.includes_in_non_top("mem_->"));
        s.push("(local1 + 1)".to_string(), ValType::I32);
        assert!(s.includes_in_non_top("mem_->"));
        assert!(!s.includes_in_non_top("local9"));
    }

    #[test]
    fn spill_keeps_constants_and_temporaries_only() {
        let mut s = StackVars::new();
        s.push("42".to_string(), ValType::I32);
        s.push("local0".to_string(), ValType::I32);
        s.push("stack9".to_string(), ValType::I32);
        s.push("mem_->LoadFloat64(8)".to_string(), ValType::F64);
        let lines = s.spill();
        // A pending local read is not safe across a side effect, while
        // constants and earlier temporaries are.
        assert_eq!(
            lines,
            vec![
                "int32_t stack0 = (local0);".to_string(),
                "double stack1 = (mem_->LoadFloat64(8));".to_string(),
            ]
        );
        assert_eq!(s.pop(), Some(("stack1".to_string(), ValType::F64)));
        assert_eq!(s.pop(), Some(("stack9".to_string(), ValType::I32)));
        assert_eq!(s.pop(), Some(("stack0".to_string(), ValType::I32)));
        assert_eq!(s.pop(), Some(("42".to_string(), ValType::I32)));
    }

    #[test]
    fn expression_and_type_lengths_stay_equal() {
        let mut s = StackVars::new();
        s.push("a".to_string(), ValType::I32);
        s.push_lhs(ValType::F32);
        s.peep();
        s.spill();
        assert_eq!(s.exprs.len(), s.types.len());
        s.pop();
        s.pop();
        assert_eq!(s.exprs.len(), s.types.len());
    }
}

//! Shared state for the codegen pass family (spec.md §4.4): a stack
//! position counter, per-prefix label counters, and literal interning
//! tables, plus the codegen-time options threaded through every pass.

use std::collections::HashMap;
use std::rc::Rc;

use crate::env::Context;
use crate::registry::ClassRegistry;

/// Codegen-time knobs. The only one that currently varies is whether
/// `.align` padding is emitted after string payloads; it is always on, but
/// keeping it as a field (rather than a bare constant) leaves room for a
/// future `--no-align` flag without touching every pass's signature.
#[derive(Debug, Clone, Copy)]
pub struct CodegenOptions {
    pub emit_align: bool,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self { emit_align: true }
    }
}

pub struct CodegenContext {
    pub registry: Rc<ClassRegistry>,
    pub env: Context,
    pub options: CodegenOptions,
    /// Words currently pushed below the frame pointer in the expression
    /// being lowered right now; reset per method body.
    pub stack_position: i32,
    label_counters: HashMap<String, u32>,
    int_literals: HashMap<i32, String>,
    int_literal_order: Vec<i32>,
    string_literals: HashMap<String, String>,
    string_literal_order: Vec<String>,
}

impl CodegenContext {
    pub fn new(registry: Rc<ClassRegistry>, env: Context, options: CodegenOptions) -> Self {
        Self {
            registry,
            env,
            options,
            stack_position: 0,
            label_counters: HashMap::new(),
            int_literals: HashMap::new(),
            int_literal_order: Vec::new(),
            string_literals: HashMap::new(),
            string_literal_order: Vec::new(),
        }
    }

    /// Fresh label `<prefix><n>`, where `n` increments on every call for
    /// that prefix (spec.md §4.4's "Counter increments on every call to the
    /// label factory").
    pub fn fresh_label(&mut self, prefix: &str) -> String {
        let counter = self.label_counters.entry(prefix.to_string()).or_insert(0);
        let label = format!("{prefix}{counter}");
        *counter += 1;
        label
    }

    pub fn intern_int(&mut self, value: i32) -> String {
        if let Some(label) = self.int_literals.get(&value) {
            return label.clone();
        }
        let label = format!("int_const{}", self.int_literal_order.len());
        self.int_literals.insert(value, label.clone());
        self.int_literal_order.push(value);
        label
    }

    pub fn intern_string(&mut self, value: &str) -> String {
        if let Some(label) = self.string_literals.get(value) {
            return label.clone();
        }
        let label = format!("str_const{}", self.string_literal_order.len());
        self.string_literals.insert(value.to_string(), label.clone());
        self.string_literal_order.push(value.to_string());
        label
    }

    pub fn interned_ints(&self) -> impl Iterator<Item = (i32, &str)> {
        self.int_literal_order
            .iter()
            .map(|v| (*v, self.int_literals[v].as_str()))
    }

    pub fn interned_strings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.string_literal_order
            .iter()
            .map(|s| (s.as_str(), self.string_literals[s].as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_counters_are_per_prefix() {
        let registry = Rc::new(ClassRegistry::with_builtins());
        let env = Context::new(registry.clone());
        let mut ctx = CodegenContext::new(registry, env, CodegenOptions::default());
        assert_eq!(ctx.fresh_label("ElseBranch"), "ElseBranch0");
        assert_eq!(ctx.fresh_label("ElseBranch"), "ElseBranch1");
        assert_eq!(ctx.fresh_label("EndIf"), "EndIf0");
    }

    #[test]
    fn integer_literals_are_deduplicated() {
        let registry = Rc::new(ClassRegistry::with_builtins());
        let env = Context::new(registry.clone());
        let mut ctx = CodegenContext::new(registry, env, CodegenOptions::default());
        let a = ctx.intern_int(42);
        let b = ctx.intern_int(42);
        assert_eq!(a, b);
        let c = ctx.intern_int(7);
        assert_ne!(a, c);
    }
}

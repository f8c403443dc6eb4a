//! ClassImplementationPass (spec.md §4.3): walks classes parent-before-child,
//! validates attributes and methods, and populates each class's identifier
//! and method tables in `Context`.

use crate::ast::types::{OBJECT, SELF_TYPE, SELF_VAR};
use crate::env::{Context, IdentifierCodegenInfo, MethodCodegenInfo, MethodRecord};
use crate::registry::ClassRegistry;

use super::builtins::BUILTIN_METHODS;
use super::error::{AccumulatedErrors, ImplementationError};

pub fn run(
    registry: &ClassRegistry,
    ctx: &mut Context,
) -> Result<(), AccumulatedErrors<ImplementationError>> {
    let mut errors = Vec::new();

    for class_id in registry.topological_order() {
        ctx.enter_class(class_id);
        ctx.define_identifier(
            class_id,
            SELF_VAR.to_string(),
            crate::ast::ExprType::self_type(class_id),
            IdentifierCodegenInfo {
                is_attribute: false,
                position: -1,
            },
        );

        let class_name = registry.class_name(class_id).to_string();
        if class_name == crate::ast::types::OBJECT
            || crate::ast::types::BUILTIN_CLASSES.contains(&class_name.as_str())
        {
            register_builtin_methods(registry, ctx, class_id, &class_name);
            let parent_id = registry.parent_id(class_id);
            let parent_count = parent_id.map(|p| ctx.attribute_count(p)).unwrap_or(0);
            ctx.set_attribute_count(class_id, parent_count);
            let parent_layout = parent_id
                .map(|p| ctx.attribute_layout(p).to_vec())
                .unwrap_or_default();
            ctx.set_attribute_layout(class_id, parent_layout);
            continue;
        }

        let class_node = registry.class_node(class_id);
        let parent_id = registry.parent_id(class_id).unwrap_or(0);
        let mut next_position = ctx.attribute_count(parent_id);
        let mut layout = ctx.attribute_layout(parent_id).to_vec();

        for attr in class_node.attributes() {
            if attr.id == SELF_VAR {
                errors.push(ImplementationError {
                    message: "self cannot be used as an attribute name".to_string(),
                    loc: attr.loc.clone(),
                });
                continue;
            }
            if ctx.lookup_identifier_type(class_id, &attr.id).is_some() {
                errors.push(ImplementationError {
                    message: format!(
                        "attribute {} redefines an attribute already present in an ancestor",
                        attr.id
                    ),
                    loc: attr.loc.clone(),
                });
                continue;
            }
            let ty = match resolve_type(registry, &attr.type_name, class_id) {
                Some(ty) => ty,
                None => {
                    errors.push(ImplementationError {
                        message: format!("unknown type {} for attribute {}", attr.type_name, attr.id),
                        loc: attr.loc.clone(),
                    });
                    continue;
                }
            };
            ctx.define_identifier(
                class_id,
                attr.id.clone(),
                ty,
                IdentifierCodegenInfo {
                    is_attribute: true,
                    position: next_position,
                },
            );
            layout.push((attr.id.clone(), ty));
            next_position += 1;
        }
        ctx.set_attribute_count(class_id, next_position);
        ctx.set_attribute_layout(class_id, layout);

        for method in class_node.methods() {
            if ctx.contains_method_in_class_frame(class_id, &method.id) {
                errors.push(ImplementationError {
                    message: format!("method {} is already defined in this class", method.id),
                    loc: method.loc.clone(),
                });
                continue;
            }

            let mut seen_formals = std::collections::HashSet::new();
            let mut formal_error = false;
            let mut formal_types = Vec::new();
            for formal in &method.formals {
                if formal.id == SELF_VAR {
                    errors.push(ImplementationError {
                        message: "self cannot be used as a formal parameter name".to_string(),
                        loc: formal.loc.clone(),
                    });
                    formal_error = true;
                    continue;
                }
                if !seen_formals.insert(formal.id.clone()) {
                    errors.push(ImplementationError {
                        message: format!("duplicate formal parameter name {}", formal.id),
                        loc: formal.loc.clone(),
                    });
                    formal_error = true;
                    continue;
                }
                if formal.type_name == SELF_TYPE || !registry.has_class(&formal.type_name) {
                    errors.push(ImplementationError {
                        message: format!("unknown formal type {}", formal.type_name),
                        loc: formal.loc.clone(),
                    });
                    formal_error = true;
                    continue;
                }
                formal_types.push(crate::ast::ExprType::concrete(
                    registry.type_id(&formal.type_name).unwrap(),
                ));
            }
            if formal_error {
                continue;
            }

            let return_type = match resolve_type(registry, &method.return_type, class_id) {
                Some(ty) => ty,
                None => {
                    errors.push(ImplementationError {
                        message: format!("unknown return type {}", method.return_type),
                        loc: method.loc.clone(),
                    });
                    continue;
                }
            };

            if let Some(parent_record) = ctx.lookup_method(parent_id, &method.id) {
                let return_type_matches = parent_record.return_type.is_self == return_type.is_self
                    && (return_type.is_self
                        || parent_record.return_type.type_id == return_type.type_id);
                let matches = parent_record.formal_types == formal_types && return_type_matches;
                if !matches {
                    errors.push(ImplementationError {
                        message: format!(
                            "method {} overrides ancestor with a different signature",
                            method.id
                        ),
                        loc: method.loc.clone(),
                    });
                    continue;
                }
            }

            ctx.define_method(
                class_id,
                method.id.clone(),
                MethodRecord {
                    owning_class: class_id,
                    formal_types,
                    return_type,
                    codegen: None::<MethodCodegenInfo>,
                },
            );
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AccumulatedErrors { errors })
    }
}

fn resolve_type(
    registry: &ClassRegistry,
    type_name: &str,
    enclosing_class: u32,
) -> Option<crate::ast::ExprType> {
    if type_name == SELF_TYPE {
        Some(crate::ast::ExprType::self_type(enclosing_class))
    } else {
        registry
            .type_id(type_name)
            .map(crate::ast::ExprType::concrete)
    }
}

fn register_builtin_methods(
    registry: &ClassRegistry,
    ctx: &mut Context,
    class_id: u32,
    class_name: &str,
) {
    for builtin in BUILTIN_METHODS.iter().filter(|m| m.class == class_name) {
        let formal_types = builtin
            .formals
            .iter()
            .map(|name| crate::ast::ExprType::concrete(registry.type_id(name).unwrap()))
            .collect();
        let return_type = resolve_type(registry, builtin.return_type, class_id)
            .unwrap_or(crate::ast::ExprType::concrete(
                registry.type_id(OBJECT).unwrap(),
            ));
        ctx.define_method(
            class_id,
            builtin.name.to_string(),
            MethodRecord {
                owning_class: class_id,
                formal_types,
                return_type,
                codegen: None,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::OBJECT;
    use std::rc::Rc;

    fn build_registry(classes: Vec<crate::ast::Class<()>>) -> ClassRegistry {
        let mut registry = ClassRegistry::with_builtins();
        for class in classes {
            registry.add_class(class).unwrap();
        }
        registry.check_inheritance().unwrap();
        registry
    }

    fn loc() -> crate::ast::Loc {
        crate::ast::Loc::new(Rc::from("t.cl"), 1, 1)
    }

    #[test]
    fn object_gets_builtin_methods() {
        let registry = build_registry(vec![]);
        let mut ctx = Context::new(Rc::new(registry));
        let registry = ctx.registry.clone();
        run(&registry, &mut ctx).unwrap();
        let object_id = registry.type_id(OBJECT).unwrap();
        assert!(ctx.lookup_method(object_id, "abort").is_some());
    }

    #[test]
    fn duplicate_attribute_in_ancestor_fails() {
        use crate::ast::{Attribute, Class, Feature};
        let a = Class {
            name: "A".to_string(),
            parent: None,
            features: vec![Feature::Attribute(Attribute {
                id: "x".to_string(),
                type_name: "Int".to_string(),
                init: None,
                loc: loc(),
            })],
            loc: loc(),
        };
        let b = Class {
            name: "B".to_string(),
            parent: Some("A".to_string()),
            features: vec![Feature::Attribute(Attribute {
                id: "x".to_string(),
                type_name: "Int".to_string(),
                init: None,
                loc: loc(),
            })],
            loc: loc(),
        };
        let registry = build_registry(vec![a, b]);
        let mut ctx = Context::new(Rc::new(registry));
        let registry = ctx.registry.clone();
        assert!(run(&registry, &mut ctx).is_err());
    }

    #[test]
    fn method_override_signature_mismatch_fails() {
        use crate::ast::{Class, Expr, ExprKind, Feature, Method};
        let a = Class {
            name: "A".to_string(),
            parent: None,
            features: vec![Feature::Method(Method {
                id: "m".to_string(),
                formals: Vec::new(),
                return_type: "Int".to_string(),
                body: Expr::new(ExprKind::IntLit(0), loc()),
                loc: loc(),
            })],
            loc: loc(),
        };
        let b = Class {
            name: "B".to_string(),
            parent: Some("A".to_string()),
            features: vec![Feature::Method(Method {
                id: "m".to_string(),
                formals: Vec::new(),
                return_type: "String".to_string(),
                body: Expr::new(ExprKind::StringLit(String::new()), loc()),
                loc: loc(),
            })],
            loc: loc(),
        };
        let registry = build_registry(vec![a, b]);
        let mut ctx = Context::new(Rc::new(registry));
        let registry = ctx.registry.clone();
        assert!(run(&registry, &mut ctx).is_err());
    }
}

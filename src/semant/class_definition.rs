//! ClassDefinitionPass (spec.md §4.3): validates global class structure and
//! produces the populated `ClassRegistry`. Mirrors the six numbered rules
//! verbatim; `ClassRegistry::add_class` already enforces reserved names,
//! duplicates and forbidden parents (rules 1, 2, 4), so this pass layers the
//! remaining checks (parent existence, acyclicity, `Main.main`) on top.

use crate::ast::types::OBJECT;
use crate::ast::Program;
use crate::registry::ClassRegistry;

use super::error::DefinitionError;

const MAIN_CLASS: &str = "Main";
const MAIN_METHOD: &str = "main";

pub fn run(program: &Program<()>) -> Result<ClassRegistry, DefinitionError> {
    let mut registry = ClassRegistry::with_builtins();

    for class in &program.classes {
        registry
            .add_class(class.clone())
            .map_err(|e| DefinitionError {
                message: e.message,
                loc: e.loc,
            })?;
    }

    for class in &program.classes {
        let parent = class.parent.as_deref().unwrap_or(OBJECT);
        if !registry.has_class(parent) {
            return Err(DefinitionError {
                message: format!("class {} inherits from undefined class {parent}", class.name),
                loc: class.loc.clone(),
            });
        }
    }

    registry
        .check_inheritance()
        .map_err(|e| DefinitionError {
            message: e.message,
            loc: e.loc,
        })?;

    let main = registry.class_node_by_name(MAIN_CLASS).ok_or(DefinitionError {
        message: format!("program must define a class named {MAIN_CLASS}"),
        loc: crate::ast::Loc::synthetic(),
    })?;
    if main.methods().all(|m| m.id != MAIN_METHOD) {
        return Err(DefinitionError {
            message: format!("class {MAIN_CLASS} must define a method named {MAIN_METHOD}"),
            loc: main.loc.clone(),
        });
    }

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Class, Loc};
    use std::rc::Rc;

    fn loc() -> Loc {
        Loc::new(Rc::from("test.cl"), 1, 1)
    }

    fn class(name: &str, parent: Option<&str>, main_method: bool) -> Class<()> {
        use crate::ast::{Feature, Method};
        let features = if main_method {
            vec![Feature::Method(Method {
                id: "main".to_string(),
                formals: Vec::new(),
                return_type: "Object".to_string(),
                body: crate::ast::Expr::new(crate::ast::ExprKind::IntLit(0), loc()),
                loc: loc(),
            })]
        } else {
            Vec::new()
        };
        Class {
            name: name.to_string(),
            parent: parent.map(str::to_string),
            features,
            loc: loc(),
        }
    }

    #[test]
    fn minimal_program_succeeds() {
        let program = Program {
            classes: vec![class("Main", None, true)],
        };
        assert!(run(&program).is_ok());
    }

    #[test]
    fn missing_main_fails() {
        let program = Program {
            classes: vec![class("A", None, false)],
        };
        assert!(run(&program).is_err());
    }

    #[test]
    fn missing_main_method_fails() {
        let program = Program {
            classes: vec![class("Main", None, false)],
        };
        assert!(run(&program).is_err());
    }

    #[test]
    fn undefined_parent_fails() {
        let program = Program {
            classes: vec![class("Main", Some("Ghost"), true)],
        };
        assert!(run(&program).is_err());
    }

    #[test]
    fn inheritance_cycle_fails() {
        let program = Program {
            classes: vec![
                class("Main", None, true),
                class("A", Some("B"), false),
                class("B", Some("A"), false),
            ],
        };
        assert!(run(&program).is_err());
    }
}

//! CodegenObjectsInitPass (spec.md §4.4): emits `<Class>_init` (attribute
//! initialization, chained through the parent) and `<Class>.<method>`
//! (formal-parameter frame, body, return) for every user-defined class.
//! Built-in classes get no emitted body; their behaviour lives in the
//! hand-written SPIM runtime support linked in alongside this output.

use crate::ast::types::{BUILTIN_CLASSES, OBJECT};
use crate::ast::{Class, ExprType, Method, Program};
use crate::asm::{Instruction, Offset, Reg, WORD_SIZE};
use crate::env::IdentifierCodegenInfo;
use crate::registry::ClassRegistry;

use super::code::lower_expr;
use super::context::CodegenContext;
use super::layout::attribute_offset;

pub fn run(
    registry: &ClassRegistry,
    ctx: &mut CodegenContext,
    program: &Program<ExprType>,
) -> Vec<Instruction> {
    let mut out = Vec::new();
    for class in &program.classes {
        let class_id = registry.type_id(&class.name).unwrap();
        if class.name == OBJECT || BUILTIN_CLASSES.contains(&class.name.as_str()) {
            continue;
        }
        out.extend(class_init(registry, ctx, class));
        for method in class.methods() {
            out.extend(method_body(registry, ctx, class_id, &class.name, method));
        }
    }
    out
}

/// Standard three-word saved-register frame: old `$fp`, `self`, `$ra`.
/// `$fp` ends up pointing at the saved `self` word, so `0($fp)` is always
/// how code in the body recovers `self`.
fn frame_prologue() -> Vec<Instruction> {
    vec![
        Instruction::Addiu(Reg::Sp, Reg::Sp, -(3 * WORD_SIZE)),
        Instruction::Sw(Reg::Fp, Offset::new(3 * WORD_SIZE, Reg::Sp)),
        Instruction::Sw(Reg::A0, Offset::new(2 * WORD_SIZE, Reg::Sp)),
        Instruction::Sw(Reg::Ra, Offset::new(WORD_SIZE, Reg::Sp)),
        Instruction::Addiu(Reg::Fp, Reg::Sp, 2 * WORD_SIZE),
    ]
}

fn frame_epilogue(arg_words: i32) -> Vec<Instruction> {
    vec![
        Instruction::Lw(Reg::Ra, Offset::new(WORD_SIZE, Reg::Sp)),
        Instruction::Lw(Reg::Fp, Offset::new(3 * WORD_SIZE, Reg::Sp)),
        Instruction::Addiu(Reg::Sp, Reg::Sp, 3 * WORD_SIZE + arg_words * WORD_SIZE),
        Instruction::Jr(Reg::Ra),
    ]
}

fn class_init(
    registry: &ClassRegistry,
    ctx: &mut CodegenContext,
    class: &Class<ExprType>,
) -> Vec<Instruction> {
    let class_id = registry.type_id(&class.name).unwrap();
    let mut out = vec![Instruction::Label(format!("{}_init", class.name))];
    out.extend(frame_prologue());

    if let Some(parent_id) = registry.parent_id(class_id) {
        let parent_name = registry.class_name(parent_id).to_string();
        out.push(Instruction::Lw(Reg::A0, Offset::new(0, Reg::Fp)));
        out.push(Instruction::Jal(format!("{parent_name}_init")));
    }

    ctx.stack_position = 0;
    for attr in class.attributes() {
        let info = ctx
            .env
            .lookup_identifier_codegen(class_id, &attr.id)
            .expect("ClassImplementationPass registers every attribute");
        let instrs = match &attr.init {
            Some(init) => lower_expr(registry, ctx, class_id, init),
            None => default_attribute_value(&attr.type_name),
        };
        out.extend(instrs);
        out.push(Instruction::Lw(Reg::T0, Offset::new(0, Reg::Fp)));
        out.push(Instruction::Sw(
            Reg::A0,
            Offset::new(attribute_offset(info.position), Reg::T0),
        ));
    }

    out.push(Instruction::Lw(Reg::A0, Offset::new(0, Reg::Fp)));
    out.extend(frame_epilogue(0));
    out
}

fn default_attribute_value(type_name: &str) -> Vec<Instruction> {
    use crate::ast::types::{BOOL, INT, STRING};
    let proto = match type_name {
        INT => format!("{INT}_protObj"),
        STRING => format!("{STRING}_protObj"),
        BOOL => "Bool_const0".to_string(),
        _ => return vec![Instruction::Move(Reg::A0, Reg::Zero)],
    };
    vec![
        Instruction::La(Reg::A0, proto),
        Instruction::Jal("Object.copy".to_string()),
    ]
}

fn method_body(
    registry: &ClassRegistry,
    ctx: &mut CodegenContext,
    class_id: u32,
    class_name: &str,
    method: &Method<ExprType>,
) -> Vec<Instruction> {
    let mut out = vec![Instruction::Label(format!("{class_name}.{}", method.id))];
    out.extend(frame_prologue());

    ctx.env.push_scope(class_id);
    let arg_count = method.formals.len() as i32;
    for (i, formal) in method.formals.iter().enumerate() {
        let position = arg_count - i as i32;
        ctx.env.define_identifier(
            class_id,
            formal.id.clone(),
            ExprType::concrete(registry.type_id(&formal.type_name).unwrap_or(0)),
            IdentifierCodegenInfo {
                is_attribute: false,
                position,
            },
        );
    }

    ctx.stack_position = 0;
    out.extend(lower_expr(registry, ctx, class_id, &method.body));
    ctx.env.pop_scope(class_id);

    out.extend(frame_epilogue(arg_count));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Attribute, Feature, Loc};
    use crate::env::Context;
    use std::rc::Rc;

    fn loc() -> Loc {
        Loc::synthetic()
    }

    #[test]
    fn class_init_chains_to_parent() {
        let mut registry = ClassRegistry::with_builtins();
        registry
            .add_class(crate::ast::Class {
                name: "A".to_string(),
                parent: None,
                features: vec![Feature::Attribute(Attribute {
                    id: "x".to_string(),
                    type_name: "Int".to_string(),
                    init: None,
                    loc: loc(),
                })],
                loc: loc(),
            })
            .unwrap();
        registry.check_inheritance().unwrap();
        let registry = Rc::new(registry);
        let mut env = Context::new(registry.clone());
        crate::semant::class_implementation::run(&registry, &mut env).unwrap();
        let mut ctx = CodegenContext::new(registry.clone(), env, crate::codegen::CodegenOptions::default());
        crate::codegen::prepare::run(&registry, &mut ctx);

        let typed = Program {
            classes: vec![Class {
                name: "A".to_string(),
                parent: None,
                features: vec![Feature::Attribute(Attribute {
                    id: "x".to_string(),
                    type_name: "Int".to_string(),
                    init: None,
                    loc: loc(),
                })],
                loc: loc(),
            }],
        };
        let instrs = run(&registry, &mut ctx, &typed);
        assert!(instrs
            .iter()
            .any(|i| matches!(i, Instruction::Label(l) if l == "A_init")));
        assert!(instrs
            .iter()
            .any(|i| matches!(i, Instruction::Jal(l) if l == "Object_init")));
    }
}

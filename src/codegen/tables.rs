//! CodegenTablesPass (spec.md §4.4): dispatch tables, prototype objects,
//! and the three id-indexed program-level tables the case-dispatch walk
//! and `New(SELF_TYPE)` rely on.

use crate::ast::types::{BOOL, INT, OBJECT, STRING};
use crate::ast::ExprType;
use crate::asm::Instruction;
use crate::registry::ClassRegistry;

use super::context::CodegenContext;
use super::layout::HEADER_WORDS;

pub fn run(registry: &ClassRegistry, ctx: &mut CodegenContext) -> Vec<Instruction> {
    let mut out = Vec::new();

    for class_id in registry.topological_order() {
        out.extend(dispatch_table(registry, ctx, class_id));
        out.extend(prototype_object(registry, ctx, class_id));
    }

    out.extend(program_tables(registry));
    out
}

fn dispatch_table(registry: &ClassRegistry, ctx: &CodegenContext, class_id: u32) -> Vec<Instruction> {
    let name = registry.class_name(class_id);
    let mut out = vec![Instruction::Label(format!("{name}_dispTab"))];
    for (owning_id, method) in ctx.env.dispatch_layout(class_id) {
        let owning_name = registry.class_name(*owning_id);
        out.push(Instruction::WordLabel(format!("{owning_name}.{method}")));
    }
    out
}

fn prototype_object(
    registry: &ClassRegistry,
    ctx: &mut CodegenContext,
    class_id: u32,
) -> Vec<Instruction> {
    let name = registry.class_name(class_id).to_string();
    let mut out = vec![Instruction::Label(format!("{name}_protObj"))];
    out.push(Instruction::Word(class_id as i32));

    match name.as_str() {
        INT => {
            out.push(Instruction::Word(4));
            out.push(Instruction::WordLabel(format!("{INT}_dispTab")));
            out.push(Instruction::Word(0));
        }
        STRING => {
            out.push(Instruction::Word(5));
            out.push(Instruction::WordLabel(format!("{STRING}_dispTab")));
            let zero_len = ctx.intern_int(0);
            out.push(Instruction::WordLabel(zero_len));
            out.push(Instruction::Ascii(String::new()));
            out.push(Instruction::Byte(0));
            if ctx.options.emit_align {
                out.push(Instruction::Align(2));
            }
        }
        BOOL => {
            out.push(Instruction::Word(3));
            out.push(Instruction::WordLabel(format!("{BOOL}_dispTab")));
            out.push(Instruction::Word(0));
        }
        _ => {
            let layout = ctx.env.attribute_layout(class_id).to_vec();
            out.push(Instruction::Word(HEADER_WORDS + layout.len() as i32));
            out.push(Instruction::WordLabel(format!("{name}_dispTab")));
            for (_, ty) in layout {
                out.push(default_value(registry, ty));
            }
        }
    }
    out
}

fn default_value(registry: &ClassRegistry, ty: ExprType) -> Instruction {
    if ty.is_self {
        return Instruction::Word(0);
    }
    let type_name = registry.class_name(ty.type_id);
    match type_name {
        INT => Instruction::WordLabel(format!("{INT}_protObj")),
        STRING => Instruction::WordLabel(format!("{STRING}_protObj")),
        BOOL => Instruction::WordLabel("Bool_const0".to_string()),
        _ => Instruction::Word(0),
    }
}

fn program_tables(registry: &ClassRegistry) -> Vec<Instruction> {
    let mut out = vec![Instruction::Label("class_nameTab".to_string())];
    for id in registry.class_ids() {
        let name = registry.class_name(id);
        out.push(Instruction::WordLabel(format!("{name}_className")));
    }

    out.push(Instruction::Label("class_objTab".to_string()));
    for id in registry.class_ids() {
        let name = registry.class_name(id);
        out.push(Instruction::WordLabel(format!("{name}_protObj")));
        out.push(Instruction::WordLabel(format!("{name}_init")));
    }

    out.push(Instruction::Label("class_parentTab".to_string()));
    let object_id = registry.type_id(OBJECT).unwrap();
    for id in registry.class_ids() {
        if id == object_id {
            out.push(Instruction::Word(-1));
        } else {
            out.push(Instruction::Word(registry.parent_id(id).unwrap() as i32));
        }
    }
    out
}

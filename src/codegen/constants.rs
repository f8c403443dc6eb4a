//! CodegenConstantsPass (spec.md §4.4): walks the typed program once to
//! find every distinct integer and string literal, interns them through
//! `CodegenContext`, and emits a `.data` prototype object for each, plus
//! the shared `Bool_const0`/`Bool_const1` and one class-name string per
//! registered class.

use crate::ast::types::{BOOL, INT, STRING};
use crate::ast::{Expr, ExprKind, Program};
use crate::asm::Instruction;
use crate::registry::ClassRegistry;

use super::context::CodegenContext;
use super::layout::WORD_SIZE;

pub fn run(
    registry: &ClassRegistry,
    ctx: &mut CodegenContext,
    program: &Program<crate::ast::ExprType>,
) -> Vec<Instruction> {
    collect_literals(program, ctx);

    let mut out = vec![
        Instruction::Data,
        Instruction::Comment("garbage collector sentinel words".to_string()),
        Instruction::Word(0),
        Instruction::Word(0),
    ];

    let int_dispatch = format!("{INT}_dispTab");
    let string_dispatch = format!("{STRING}_dispTab");
    let bool_dispatch = format!("{BOOL}_dispTab");
    let int_id = registry.type_id(INT).unwrap();
    let string_id = registry.type_id(STRING).unwrap();
    let bool_id = registry.type_id(BOOL).unwrap();

    let literals: Vec<(i32, String)> = ctx
        .interned_ints()
        .map(|(v, l)| (v, l.to_string()))
        .collect();
    for (value, label) in literals {
        out.push(Instruction::Label(label));
        out.push(Instruction::Word(int_id as i32));
        out.push(Instruction::Word(4));
        out.push(Instruction::WordLabel(int_dispatch.clone()));
        out.push(Instruction::Word(value));
    }

    let string_literals: Vec<(String, String)> = ctx
        .interned_strings()
        .map(|(v, l)| (v.to_string(), l.to_string()))
        .collect();
    for (value, label) in string_literals {
        let length_label = ctx.intern_int(value.len() as i32);
        out.push(Instruction::Label(label));
        out.push(Instruction::Word(string_id as i32));
        let size_words = 5 + (value.len() as i32 + WORD_SIZE - 1) / WORD_SIZE;
        out.push(Instruction::Word(size_words));
        out.push(Instruction::WordLabel(string_dispatch.clone()));
        out.push(Instruction::WordLabel(length_label));
        out.push(Instruction::Ascii(value));
        out.push(Instruction::Byte(0));
        if ctx.options.emit_align {
            out.push(Instruction::Align(2));
        }
    }

    out.push(Instruction::Label("Bool_const0".to_string()));
    out.push(Instruction::Word(bool_id as i32));
    out.push(Instruction::Word(3));
    out.push(Instruction::WordLabel(bool_dispatch.clone()));
    out.push(Instruction::Word(0));

    out.push(Instruction::Label("Bool_const1".to_string()));
    out.push(Instruction::Word(bool_id as i32));
    out.push(Instruction::Word(3));
    out.push(Instruction::WordLabel(bool_dispatch));
    out.push(Instruction::Word(1));

    for class_id in registry.topological_order() {
        let name = registry.class_name(class_id);
        out.push(Instruction::Label(format!("{name}_className")));
        out.push(Instruction::Word(string_id as i32));
        let size_words = 5 + (name.len() as i32 + WORD_SIZE - 1) / WORD_SIZE;
        out.push(Instruction::Word(size_words));
        out.push(Instruction::WordLabel(string_dispatch.clone()));
        let length_label = ctx.intern_int(name.len() as i32);
        out.push(Instruction::WordLabel(length_label));
        out.push(Instruction::Ascii(name.to_string()));
        out.push(Instruction::Byte(0));
        if ctx.options.emit_align {
            out.push(Instruction::Align(2));
        }
    }

    out
}

fn collect_literals(program: &Program<crate::ast::ExprType>, ctx: &mut CodegenContext) {
    for class in &program.classes {
        for attr in class.attributes() {
            if let Some(init) = &attr.init {
                collect_expr(init, ctx);
            }
        }
        for method in class.methods() {
            collect_expr(&method.body, ctx);
        }
    }
}

fn collect_expr(expr: &Expr<crate::ast::ExprType>, ctx: &mut CodegenContext) {
    match &expr.kind {
        ExprKind::IntLit(n) => {
            ctx.intern_int(*n);
        }
        ExprKind::StringLit(s) => {
            ctx.intern_string(s);
        }
        ExprKind::BoolLit(_) | ExprKind::Id(_) | ExprKind::New { .. } => {}
        ExprKind::Unary { e, .. } => collect_expr(e, ctx),
        ExprKind::BinaryArith { l, r, .. } | ExprKind::BinaryCmp { l, r, .. } => {
            collect_expr(l, ctx);
            collect_expr(r, ctx);
        }
        ExprKind::If { c, t, e } => {
            collect_expr(c, ctx);
            collect_expr(t, ctx);
            collect_expr(e, ctx);
        }
        ExprKind::While { c, b } => {
            collect_expr(c, ctx);
            collect_expr(b, ctx);
        }
        ExprKind::Assign { e, .. } => collect_expr(e, ctx),
        ExprKind::Block(exprs) => exprs.iter().for_each(|e| collect_expr(e, ctx)),
        ExprKind::Let { bindings, body } => {
            for binding in bindings {
                if let Some(init) = &binding.init {
                    collect_expr(init, ctx);
                }
            }
            collect_expr(body, ctx);
        }
        ExprKind::Case { scrutinee, branches } => {
            collect_expr(scrutinee, ctx);
            for branch in branches {
                collect_expr(&branch.body, ctx);
            }
        }
        ExprKind::Dispatch { receiver, args, .. } => {
            if let Some(r) = receiver {
                collect_expr(r, ctx);
            }
            args.iter().for_each(|a| collect_expr(a, ctx));
        }
        ExprKind::StaticDispatch { receiver, args, .. } => {
            collect_expr(receiver, ctx);
            args.iter().for_each(|a| collect_expr(a, ctx));
        }
    }
}

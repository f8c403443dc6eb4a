//! CodegenCodePass (spec.md §4.4): lowers a single typed expression to a
//! flat instruction list. Every lowering leaves its result in `$a0`; the
//! caller-pushes-args convention and `$t0`-`$t5` temporaries follow the
//! contract spec.md lays out. `self` always lives at `0($fp)`.

use crate::ast::types::{BOOL, INT, SELF_TYPE, SELF_VAR, STRING};
use crate::ast::{ArithOp, CaseBranch, CmpOp, Expr, ExprKind, ExprType, LetBinding, UnaryOp};
use crate::asm::{Instruction, Offset, Reg, WORD_SIZE};
use crate::env::IdentifierCodegenInfo;
use crate::registry::ClassRegistry;

use super::context::CodegenContext;
use super::layout::{attribute_offset, CLASS_ID_OFFSET, DISPATCH_TABLE_OFFSET, OBJECT_CONTENT_OFFSET};

/// Seed value for the case-dispatch distance search: larger than any real
/// ancestor distance, so the first candidate branch always replaces it.
const CASE_DISTANCE_SENTINEL: i32 = i32::MAX;

pub fn lower_expr(
    registry: &ClassRegistry,
    ctx: &mut CodegenContext,
    class_id: u32,
    expr: &Expr<ExprType>,
) -> Vec<Instruction> {
    match &expr.kind {
        ExprKind::IntLit(n) => {
            let label = ctx.intern_int(*n);
            vec![Instruction::La(Reg::A0, label)]
        }
        ExprKind::StringLit(s) => {
            let label = ctx.intern_string(s);
            vec![Instruction::La(Reg::A0, label)]
        }
        ExprKind::BoolLit(b) => {
            let label = if *b { "Bool_const1" } else { "Bool_const0" };
            vec![Instruction::La(Reg::A0, label.to_string())]
        }
        ExprKind::Id(name) => lower_id(ctx, class_id, name),
        ExprKind::Unary { op, e } => lower_unary(registry, ctx, class_id, *op, e),
        ExprKind::BinaryArith { op, l, r } => lower_arith(registry, ctx, class_id, *op, l, r),
        ExprKind::BinaryCmp { op, l, r } => lower_cmp(registry, ctx, class_id, *op, l, r),
        ExprKind::If { c, t, e } => lower_if(registry, ctx, class_id, c, t, e),
        ExprKind::While { c, b } => lower_while(registry, ctx, class_id, c, b),
        ExprKind::Assign { id, e } => lower_assign(registry, ctx, class_id, id, e),
        ExprKind::Block(exprs) => exprs
            .iter()
            .flat_map(|e| lower_expr(registry, ctx, class_id, e))
            .collect(),
        ExprKind::New { type_name } => lower_new(ctx, type_name),
        ExprKind::Let { bindings, body } => lower_let(registry, ctx, class_id, bindings, body),
        ExprKind::Case { scrutinee, branches } => {
            lower_case(registry, ctx, class_id, scrutinee, branches)
        }
        ExprKind::Dispatch { receiver, method, args } => {
            lower_dispatch(registry, ctx, class_id, receiver.as_deref(), method, args)
        }
        ExprKind::StaticDispatch {
            receiver,
            target_class,
            method,
            args,
        } => lower_static_dispatch(registry, ctx, class_id, receiver, target_class, method, args),
    }
}

fn push_a0(ctx: &mut CodegenContext) -> Vec<Instruction> {
    push_reg(ctx, Reg::A0)
}

fn pop_into(ctx: &mut CodegenContext, reg: Reg) -> Vec<Instruction> {
    ctx.stack_position -= 1;
    vec![
        Instruction::Addiu(Reg::Sp, Reg::Sp, WORD_SIZE),
        Instruction::Lw(reg, Offset::new(0, Reg::Sp)),
    ]
}

/// Pushes an arbitrary register so its value survives a `jal` that
/// clobbers temporaries.
fn push_reg(ctx: &mut CodegenContext, reg: Reg) -> Vec<Instruction> {
    ctx.stack_position += 1;
    vec![
        Instruction::Sw(reg, Offset::new(0, Reg::Sp)),
        Instruction::Addiu(Reg::Sp, Reg::Sp, -WORD_SIZE),
    ]
}

fn slot_offset(ctx: &CodegenContext, class_id: u32, name: &str) -> IdentifierCodegenInfo {
    ctx.env
        .lookup_identifier_codegen(class_id, name)
        .unwrap_or(IdentifierCodegenInfo {
            is_attribute: false,
            position: 0,
        })
}

fn lower_id(ctx: &mut CodegenContext, class_id: u32, name: &str) -> Vec<Instruction> {
    if name == SELF_VAR {
        return vec![Instruction::Lw(Reg::A0, Offset::new(0, Reg::Fp))];
    }
    let info = slot_offset(ctx, class_id, name);
    if info.is_attribute {
        vec![
            Instruction::Lw(Reg::A0, Offset::new(0, Reg::Fp)),
            Instruction::Lw(Reg::A0, Offset::new(attribute_offset(info.position), Reg::A0)),
        ]
    } else {
        vec![Instruction::Lw(
            Reg::A0,
            Offset::new(info.position * WORD_SIZE, Reg::Fp),
        )]
    }
}

fn store_to_slot(ctx: &CodegenContext, class_id: u32, name: &str) -> Vec<Instruction> {
    let info = slot_offset(ctx, class_id, name);
    if info.is_attribute {
        vec![
            Instruction::Lw(Reg::T0, Offset::new(0, Reg::Fp)),
            Instruction::Sw(Reg::A0, Offset::new(attribute_offset(info.position), Reg::T0)),
        ]
    } else {
        vec![Instruction::Sw(
            Reg::A0,
            Offset::new(info.position * WORD_SIZE, Reg::Fp),
        )]
    }
}

fn unbox_into(reg: Reg, from: Reg) -> Instruction {
    Instruction::Lw(reg, Offset::new(OBJECT_CONTENT_OFFSET, from))
}

fn lower_unary(
    registry: &ClassRegistry,
    ctx: &mut CodegenContext,
    class_id: u32,
    op: UnaryOp,
    e: &Expr<ExprType>,
) -> Vec<Instruction> {
    let mut out = lower_expr(registry, ctx, class_id, e);
    match op {
        UnaryOp::Not => {
            let true_label = ctx.fresh_label("NotTrue");
            let end_label = ctx.fresh_label("NotEnd");
            out.push(unbox_into(Reg::T0, Reg::A0));
            out.push(Instruction::Beqz(Reg::T0, true_label.clone()));
            out.push(Instruction::La(Reg::A0, "Bool_const0".to_string()));
            out.push(Instruction::J(end_label.clone()));
            out.push(Instruction::Label(true_label));
            out.push(Instruction::La(Reg::A0, "Bool_const1".to_string()));
            out.push(Instruction::Label(end_label));
        }
        UnaryOp::Neg => {
            out.push(unbox_into(Reg::T0, Reg::A0));
            out.push(Instruction::Neg(Reg::T0, Reg::T0));
            out.extend(push_reg(ctx, Reg::T0));
            out.push(Instruction::La(Reg::A0, format!("{INT}_protObj")));
            out.push(Instruction::Jal("Object.copy".to_string()));
            out.extend(pop_into(ctx, Reg::T0));
            out.push(Instruction::Sw(Reg::T0, Offset::new(OBJECT_CONTENT_OFFSET, Reg::A0)));
        }
        UnaryOp::IsVoid => {
            let void_label = ctx.fresh_label("IsVoidTrue");
            let end_label = ctx.fresh_label("IsVoidEnd");
            out.push(Instruction::Beqz(Reg::A0, void_label.clone()));
            out.push(Instruction::La(Reg::A0, "Bool_const0".to_string()));
            out.push(Instruction::J(end_label.clone()));
            out.push(Instruction::Label(void_label));
            out.push(Instruction::La(Reg::A0, "Bool_const1".to_string()));
            out.push(Instruction::Label(end_label));
        }
    }
    out
}

fn lower_arith(
    registry: &ClassRegistry,
    ctx: &mut CodegenContext,
    class_id: u32,
    op: ArithOp,
    l: &Expr<ExprType>,
    r: &Expr<ExprType>,
) -> Vec<Instruction> {
    let mut out = lower_expr(registry, ctx, class_id, l);
    out.extend(push_a0(ctx));
    out.extend(lower_expr(registry, ctx, class_id, r));
    out.push(Instruction::Move(Reg::T1, Reg::A0));
    out.extend(pop_into(ctx, Reg::T0));
    out.push(unbox_into(Reg::T0, Reg::T0));
    out.push(unbox_into(Reg::T1, Reg::T1));
    out.push(match op {
        ArithOp::Plus => Instruction::Add(Reg::T2, Reg::T0, Reg::T1),
        ArithOp::Minus => Instruction::Sub(Reg::T2, Reg::T0, Reg::T1),
        ArithOp::Times => Instruction::Mul(Reg::T2, Reg::T0, Reg::T1),
        ArithOp::Divide => Instruction::Div(Reg::T2, Reg::T0, Reg::T1),
    });
    out.extend(push_reg(ctx, Reg::T2));
    out.push(Instruction::La(Reg::A0, format!("{INT}_protObj")));
    out.push(Instruction::Jal("Object.copy".to_string()));
    out.extend(pop_into(ctx, Reg::T2));
    out.push(Instruction::Sw(Reg::T2, Offset::new(OBJECT_CONTENT_OFFSET, Reg::A0)));
    out
}

fn lower_cmp(
    registry: &ClassRegistry,
    ctx: &mut CodegenContext,
    class_id: u32,
    op: CmpOp,
    l: &Expr<ExprType>,
    r: &Expr<ExprType>,
) -> Vec<Instruction> {
    let mut out = lower_expr(registry, ctx, class_id, l);
    out.extend(push_a0(ctx));
    out.extend(lower_expr(registry, ctx, class_id, r));
    out.push(Instruction::Move(Reg::T1, Reg::A0));
    out.extend(pop_into(ctx, Reg::T0));

    match op {
        CmpOp::LessThan | CmpOp::LessEq => {
            let true_label = ctx.fresh_label("CmpTrue");
            let end_label = ctx.fresh_label("CmpEnd");
            out.push(unbox_into(Reg::T0, Reg::T0));
            out.push(unbox_into(Reg::T1, Reg::T1));
            out.push(match op {
                CmpOp::LessThan => Instruction::Blt(Reg::T0, Reg::T1, true_label.clone()),
                CmpOp::LessEq => Instruction::Ble(Reg::T0, Reg::T1, true_label.clone()),
                CmpOp::Equal => unreachable!(),
            });
            out.push(Instruction::La(Reg::A0, "Bool_const0".to_string()));
            out.push(Instruction::J(end_label.clone()));
            out.push(Instruction::Label(true_label));
            out.push(Instruction::La(Reg::A0, "Bool_const1".to_string()));
            out.push(Instruction::Label(end_label));
        }
        CmpOp::Equal => out.extend(lower_equality(ctx, registry)),
    }
    out
}

/// Compares the objects in `$t0`/`$t1`, leaving a `Bool` in `$a0`.
/// Reference-equal first (covers void on both sides and object identity),
/// then unboxed comparison for `Int`/`Bool`, then length-then-byte
/// comparison for `String`; anything else compares unequal. Labels are
/// counter-suffixed so repeated equality tests in one method don't collide.
fn lower_equality(ctx: &mut CodegenContext, registry: &ClassRegistry) -> Vec<Instruction> {
    let int_id = registry.type_id(INT).unwrap() as i32;
    let bool_id = registry.type_id(BOOL).unwrap() as i32;
    let string_id = registry.type_id(STRING).unwrap() as i32;

    let same = ctx.fresh_label("EqSame");
    let false_ = ctx.fresh_label("EqFalse");
    let numeric = ctx.fresh_label("EqNumeric");
    let string_cmp = ctx.fresh_label("EqString");
    let len_ok = ctx.fresh_label("EqLenOk");
    let loop_ = ctx.fresh_label("EqByteLoop");
    let byte_ok = ctx.fresh_label("EqByteOk");
    let end = ctx.fresh_label("EqEnd");

    vec![
        Instruction::Beq(Reg::T0, Reg::T1, same.clone()),
        Instruction::Beqz(Reg::T0, false_.clone()),
        Instruction::Beqz(Reg::T1, false_.clone()),
        Instruction::Lw(Reg::T2, Offset::new(CLASS_ID_OFFSET, Reg::T0)),
        Instruction::Li(Reg::T5, int_id),
        Instruction::Beq(Reg::T2, Reg::T5, numeric.clone()),
        Instruction::Li(Reg::T5, bool_id),
        Instruction::Beq(Reg::T2, Reg::T5, numeric.clone()),
        Instruction::Li(Reg::T5, string_id),
        Instruction::Beq(Reg::T2, Reg::T5, string_cmp.clone()),
        Instruction::J(false_.clone()),
        Instruction::Label(numeric),
        Instruction::Lw(Reg::T2, Offset::new(OBJECT_CONTENT_OFFSET, Reg::T0)),
        Instruction::Lw(Reg::T5, Offset::new(OBJECT_CONTENT_OFFSET, Reg::T1)),
        Instruction::Beq(Reg::T2, Reg::T5, same.clone()),
        Instruction::J(false_.clone()),
        Instruction::Label(string_cmp),
        Instruction::Lw(Reg::T2, Offset::new(OBJECT_CONTENT_OFFSET, Reg::T0)),
        Instruction::Lw(Reg::T5, Offset::new(OBJECT_CONTENT_OFFSET, Reg::T1)),
        Instruction::Lw(Reg::T2, Offset::new(OBJECT_CONTENT_OFFSET, Reg::T2)),
        Instruction::Lw(Reg::T5, Offset::new(OBJECT_CONTENT_OFFSET, Reg::T5)),
        Instruction::Beq(Reg::T2, Reg::T5, len_ok.clone()),
        Instruction::J(false_.clone()),
        Instruction::Label(len_ok),
        Instruction::Li(Reg::T3, 0),
        Instruction::Label(loop_.clone()),
        Instruction::Beq(Reg::T3, Reg::T2, same.clone()),
        Instruction::Addiu(Reg::T4, Reg::T0, OBJECT_CONTENT_OFFSET + WORD_SIZE),
        Instruction::Add(Reg::T4, Reg::T4, Reg::T3),
        Instruction::Lb(Reg::T4, Offset::new(0, Reg::T4)),
        Instruction::Addiu(Reg::T5, Reg::T1, OBJECT_CONTENT_OFFSET + WORD_SIZE),
        Instruction::Add(Reg::T5, Reg::T5, Reg::T3),
        Instruction::Lb(Reg::T5, Offset::new(0, Reg::T5)),
        Instruction::Beq(Reg::T4, Reg::T5, byte_ok.clone()),
        Instruction::J(false_.clone()),
        Instruction::Label(byte_ok),
        Instruction::Addiu(Reg::T3, Reg::T3, 1),
        Instruction::J(loop_),
        Instruction::Label(same),
        Instruction::La(Reg::A0, "Bool_const1".to_string()),
        Instruction::J(end.clone()),
        Instruction::Label(false_),
        Instruction::La(Reg::A0, "Bool_const0".to_string()),
        Instruction::Label(end),
    ]
}

fn lower_if(
    registry: &ClassRegistry,
    ctx: &mut CodegenContext,
    class_id: u32,
    c: &Expr<ExprType>,
    t: &Expr<ExprType>,
    e: &Expr<ExprType>,
) -> Vec<Instruction> {
    let else_label = ctx.fresh_label("ElseBranch");
    let end_label = ctx.fresh_label("EndIf");

    let mut out = lower_expr(registry, ctx, class_id, c);
    out.push(unbox_into(Reg::T0, Reg::A0));
    out.push(Instruction::Beqz(Reg::T0, else_label.clone()));
    out.extend(lower_expr(registry, ctx, class_id, t));
    out.push(Instruction::J(end_label.clone()));
    out.push(Instruction::Label(else_label));
    out.extend(lower_expr(registry, ctx, class_id, e));
    out.push(Instruction::Label(end_label));
    out
}

fn lower_while(
    registry: &ClassRegistry,
    ctx: &mut CodegenContext,
    class_id: u32,
    c: &Expr<ExprType>,
    b: &Expr<ExprType>,
) -> Vec<Instruction> {
    let begin_label = ctx.fresh_label("LoopBegin");
    let end_label = ctx.fresh_label("LoopEnd");

    let mut out = vec![Instruction::Label(begin_label.clone())];
    out.extend(lower_expr(registry, ctx, class_id, c));
    out.push(unbox_into(Reg::T0, Reg::A0));
    out.push(Instruction::Beqz(Reg::T0, end_label.clone()));
    out.extend(lower_expr(registry, ctx, class_id, b));
    out.push(Instruction::J(begin_label));
    out.push(Instruction::Label(end_label));
    out.push(Instruction::Move(Reg::A0, Reg::Zero));
    out
}

fn lower_assign(
    registry: &ClassRegistry,
    ctx: &mut CodegenContext,
    class_id: u32,
    id: &str,
    e: &Expr<ExprType>,
) -> Vec<Instruction> {
    let mut out = lower_expr(registry, ctx, class_id, e);
    out.extend(store_to_slot(ctx, class_id, id));
    out
}

fn lower_new(ctx: &mut CodegenContext, type_name: &str) -> Vec<Instruction> {
    if type_name == SELF_TYPE {
        let mut out = vec![
            Instruction::Lw(Reg::T0, Offset::new(0, Reg::Fp)),
            Instruction::Lw(Reg::T0, Offset::new(CLASS_ID_OFFSET, Reg::T0)),
            Instruction::Sll(Reg::T0, Reg::T0, 3),
            Instruction::La(Reg::T1, "class_objTab".to_string()),
            Instruction::Add(Reg::T1, Reg::T1, Reg::T0),
            Instruction::Lw(Reg::A0, Offset::new(0, Reg::T1)),
            Instruction::Lw(Reg::T2, Offset::new(WORD_SIZE, Reg::T1)),
        ];
        out.extend(push_reg(ctx, Reg::T2));
        out.push(Instruction::Jal("Object.copy".to_string()));
        out.extend(pop_into(ctx, Reg::T2));
        out.push(Instruction::Jalr(Reg::T2));
        out
    } else {
        vec![
            Instruction::La(Reg::A0, format!("{type_name}_protObj")),
            Instruction::Jal("Object.copy".to_string()),
            Instruction::Jal(format!("{type_name}_init")),
        ]
    }
}

fn lower_let(
    registry: &ClassRegistry,
    ctx: &mut CodegenContext,
    class_id: u32,
    bindings: &[LetBinding<ExprType>],
    body: &Expr<ExprType>,
) -> Vec<Instruction> {
    ctx.env.push_scope(class_id);
    let mut out = Vec::new();
    let mut pushed = 0;
    for binding in bindings {
        out.extend(match &binding.init {
            Some(init) => lower_expr(registry, ctx, class_id, init),
            None => default_value_code(&binding.type_name),
        });
        out.extend(push_a0(ctx));
        pushed += 1;
        ctx.env.define_identifier(
            class_id,
            binding.id.clone(),
            ExprType::concrete(registry.type_id(&binding.type_name).unwrap_or(0)),
            IdentifierCodegenInfo {
                is_attribute: false,
                position: -ctx.stack_position,
            },
        );
    }
    out.extend(lower_expr(registry, ctx, class_id, body));
    for _ in 0..pushed {
        out.push(Instruction::Addiu(Reg::Sp, Reg::Sp, WORD_SIZE));
        ctx.stack_position -= 1;
    }
    ctx.env.pop_scope(class_id);
    out
}

fn default_value_code(type_name: &str) -> Vec<Instruction> {
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

fn lower_case(
    registry: &ClassRegistry,
    ctx: &mut CodegenContext,
    class_id: u32,
    scrutinee: &Expr<ExprType>,
    branches: &[CaseBranch<ExprType>],
) -> Vec<Instruction> {
    let mut out = lower_expr(registry, ctx, class_id, scrutinee);
    out.extend(push_a0(ctx));
    let scrutinee_position = -ctx.stack_position;

    let not_void_label = ctx.fresh_label("CaseNotVoid");
    out.push(Instruction::Bgtz(Reg::A0, not_void_label.clone()));
    out.push(Instruction::Jal("_case_abort".to_string()));
    out.push(Instruction::Label(not_void_label));

    out.push(Instruction::Lw(Reg::S0, Offset::new(CLASS_ID_OFFSET, Reg::A0)));
    out.push(Instruction::Li(Reg::T4, CASE_DISTANCE_SENTINEL));
    out.push(Instruction::Li(Reg::T3, -1));

    for (i, branch) in branches.iter().enumerate() {
        let pattern_id = registry.type_id(&branch.type_name).unwrap_or(0);
        let scan_label = ctx.fresh_label("CaseScan");
        let match_label = ctx.fresh_label("CaseMatch");
        let better_label = ctx.fresh_label("CaseBetter");
        let no_match_label = ctx.fresh_label("CaseNoMatch");

        out.push(Instruction::Move(Reg::T0, Reg::S0));
        out.push(Instruction::Li(Reg::T1, 0));
        out.push(Instruction::Label(scan_label.clone()));
        out.push(Instruction::Li(Reg::T2, pattern_id as i32));
        out.push(Instruction::Beq(Reg::T0, Reg::T2, match_label.clone()));
        out.push(Instruction::Sll(Reg::T5, Reg::T0, 2));
        out.push(Instruction::La(Reg::At, "class_parentTab".to_string()));
        out.push(Instruction::Add(Reg::T5, Reg::T5, Reg::At));
        out.push(Instruction::Lw(Reg::T0, Offset::new(0, Reg::T5)));
        out.push(Instruction::Bltz(Reg::T0, no_match_label.clone()));
        out.push(Instruction::Addiu(Reg::T1, Reg::T1, 1));
        out.push(Instruction::J(scan_label));
        out.push(Instruction::Label(match_label));
        out.push(Instruction::Blt(Reg::T1, Reg::T4, better_label.clone()));
        out.push(Instruction::J(no_match_label.clone()));
        out.push(Instruction::Label(better_label));
        out.push(Instruction::Move(Reg::T4, Reg::T1));
        out.push(Instruction::Li(Reg::T3, i as i32));
        out.push(Instruction::Label(no_match_label));
    }

    let abort_label = ctx.fresh_label("CaseNoBranch");
    out.push(Instruction::Bltz(Reg::T3, abort_label.clone()));

    let end_label = ctx.fresh_label("CaseEnd");
    let mut body_labels = Vec::new();
    for i in 0..branches.len() {
        let body_label = ctx.fresh_label("CaseBody");
        out.push(Instruction::Li(Reg::T5, i as i32));
        out.push(Instruction::Beq(Reg::T3, Reg::T5, body_label.clone()));
        body_labels.push(body_label);
    }
    out.push(Instruction::J(abort_label.clone()));

    for (branch, body_label) in branches.iter().zip(body_labels) {
        out.push(Instruction::Label(body_label));
        ctx.env.push_scope(class_id);
        let pattern_id = registry.type_id(&branch.type_name).unwrap_or(0);
        ctx.env.define_identifier(
            class_id,
            branch.id.clone(),
            ExprType::concrete(pattern_id),
            IdentifierCodegenInfo {
                is_attribute: false,
                position: scrutinee_position,
            },
        );
        out.extend(lower_expr(registry, ctx, class_id, &branch.body));
        ctx.env.pop_scope(class_id);
        out.push(Instruction::J(end_label.clone()));
    }

    out.push(Instruction::Label(abort_label));
    out.push(Instruction::Jal("_case_abort2".to_string()));
    out.push(Instruction::Label(end_label));

    out.push(Instruction::Addiu(Reg::Sp, Reg::Sp, WORD_SIZE));
    ctx.stack_position -= 1;
    out
}

fn lower_dispatch(
    registry: &ClassRegistry,
    ctx: &mut CodegenContext,
    class_id: u32,
    receiver: Option<&Expr<ExprType>>,
    method: &str,
    args: &[Expr<ExprType>],
) -> Vec<Instruction> {
    let mut out = Vec::new();
    for arg in args {
        out.extend(lower_expr(registry, ctx, class_id, arg));
        out.extend(push_a0(ctx));
    }

    let receiver_ty = receiver
        .map(|r| r.info)
        .unwrap_or_else(|| ExprType::self_type(class_id));
    out.extend(match receiver {
        Some(r) => lower_expr(registry, ctx, class_id, r),
        None => vec![Instruction::Lw(Reg::A0, Offset::new(0, Reg::Fp))],
    });

    let not_void_label = ctx.fresh_label("DispatchNotVoid");
    out.push(Instruction::Bgtz(Reg::A0, not_void_label.clone()));
    out.push(Instruction::Jal("_dispatch_abort".to_string()));
    out.push(Instruction::Label(not_void_label));

    let lookup_class = if receiver_ty.is_self {
        class_id
    } else {
        receiver_ty.type_id
    };
    let position = ctx
        .env
        .lookup_method(lookup_class, method)
        .and_then(|m| m.codegen)
        .map(|c| c.position)
        .unwrap_or(0);

    out.push(Instruction::Lw(Reg::T0, Offset::new(DISPATCH_TABLE_OFFSET, Reg::A0)));
    out.push(Instruction::Lw(
        Reg::T1,
        Offset::new(position as i32 * WORD_SIZE, Reg::T0),
    ));
    out.push(Instruction::Jalr(Reg::T1));
    out
}

fn lower_static_dispatch(
    registry: &ClassRegistry,
    ctx: &mut CodegenContext,
    class_id: u32,
    receiver: &Expr<ExprType>,
    target_class: &str,
    method: &str,
    args: &[Expr<ExprType>],
) -> Vec<Instruction> {
    let mut out = Vec::new();
    for arg in args {
        out.extend(lower_expr(registry, ctx, class_id, arg));
        out.extend(push_a0(ctx));
    }
    out.extend(lower_expr(registry, ctx, class_id, receiver));

    let not_void_label = ctx.fresh_label("StaticDispatchNotVoid");
    out.push(Instruction::Bgtz(Reg::A0, not_void_label.clone()));
    out.push(Instruction::Jal("_dispatch_abort".to_string()));
    out.push(Instruction::Label(not_void_label));

    let target_id = registry.type_id(target_class).unwrap_or(0);
    let position = ctx
        .env
        .lookup_method(target_id, method)
        .and_then(|m| m.codegen)
        .map(|c| c.position)
        .unwrap_or(0);

    out.push(Instruction::La(Reg::T0, format!("{target_class}_dispTab")));
    out.push(Instruction::Lw(
        Reg::T1,
        Offset::new(position as i32 * WORD_SIZE, Reg::T0),
    ));
    out.push(Instruction::Jalr(Reg::T1));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::OBJECT;
    use crate::ast::Loc;
    use crate::env::Context;
    use std::rc::Rc;

    fn loc() -> Loc {
        Loc::synthetic()
    }

    fn expr(kind: ExprKind<ExprType>, ty: ExprType) -> Expr<ExprType> {
        Expr {
            kind,
            loc: loc(),
            info: ty,
        }
    }

    fn setup() -> (Rc<ClassRegistry>, CodegenContext, u32) {
        let mut registry = ClassRegistry::with_builtins();
        registry
            .add_class(crate::ast::Class {
                name: "Main".to_string(),
                parent: None,
                features: Vec::new(),
                loc: loc(),
            })
            .unwrap();
        registry.check_inheritance().unwrap();
        let registry = Rc::new(registry);
        let mut env = Context::new(registry.clone());
        crate::semant::class_implementation::run(&registry, &mut env).unwrap();
        let mut ctx = CodegenContext::new(registry.clone(), env, crate::codegen::CodegenOptions::default());
        crate::codegen::prepare::run(&registry, &mut ctx);
        let class_id = registry.type_id("Main").unwrap();
        (registry, ctx, class_id)
    }

    #[test]
    fn int_literal_loads_interned_label() {
        let (registry, mut ctx, class_id) = setup();
        let int_id = registry.type_id(INT).unwrap();
        let e = expr(ExprKind::IntLit(5), ExprType::concrete(int_id));
        let instrs = lower_expr(&registry, &mut ctx, class_id, &e);
        assert_eq!(instrs.len(), 1);
        assert!(matches!(&instrs[0], Instruction::La(Reg::A0, label) if label == "int_const0"));
    }

    #[test]
    fn if_emits_balanced_labels() {
        let (registry, mut ctx, class_id) = setup();
        let object_id = registry.type_id(OBJECT).unwrap();
        let bool_id = registry.type_id(BOOL).unwrap();
        let int_id = registry.type_id(INT).unwrap();
        let cond = expr(ExprKind::BoolLit(true), ExprType::concrete(bool_id));
        let then_branch = expr(ExprKind::IntLit(1), ExprType::concrete(int_id));
        let else_branch = expr(ExprKind::IntLit(2), ExprType::concrete(int_id));
        let e = expr(
            ExprKind::If {
                c: Box::new(cond),
                t: Box::new(then_branch),
                e: Box::new(else_branch),
            },
            ExprType::concrete(object_id),
        );
        let instrs = lower_expr(&registry, &mut ctx, class_id, &e);
        let labels: Vec<_> = instrs
            .iter()
            .filter_map(|i| match i {
                Instruction::Label(l) => Some(l.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(labels, vec!["ElseBranch0".to_string(), "EndIf0".to_string()]);
    }

    #[test]
    fn let_binding_restores_stack_position() {
        let (registry, mut ctx, class_id) = setup();
        let int_id = registry.type_id(INT).unwrap();
        let binding = LetBinding {
            id: "x".to_string(),
            type_name: INT.to_string(),
            init: Some(Box::new(expr(ExprKind::IntLit(1), ExprType::concrete(int_id)))),
            loc: loc(),
        };
        let body = expr(ExprKind::Id("x".to_string()), ExprType::concrete(int_id));
        let before = ctx.stack_position;
        let instrs = lower_let(&registry, &mut ctx, class_id, &[binding], &body);
        assert_eq!(ctx.stack_position, before);
        assert!(!instrs.is_empty());
    }
}

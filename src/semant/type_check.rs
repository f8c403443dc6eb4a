//! TypeCheckPass (spec.md §4.3): assigns an `ExprType` to every expression,
//! building a fresh `Expr<ExprType>` tree rather than mutating the parsed
//! AST in place — the generic `Expr<T>`/`Program<T>` split is this crate's
//! answer to the "AST nodes... only their `type` annotation is set once"
//! lifecycle note, done via immutable construction instead of interior
//! mutability.

use crate::ast::types::{BOOL, INT, OBJECT, SELF_TYPE, SELF_VAR, STRING};
use crate::ast::{
    Attribute, CaseBranch, Class, CmpOp, Expr, ExprKind, ExprType, Feature, LetBinding, Method,
    Program, UnaryOp,
};
use crate::env::Context;
use crate::registry::ClassRegistry;

use super::error::{AccumulatedErrors, TypeError};

struct Checker<'a> {
    registry: &'a ClassRegistry,
    ctx: &'a mut Context,
    errors: Vec<TypeError>,
}

pub fn run(
    registry: &ClassRegistry,
    ctx: &mut Context,
    program: &Program<()>,
) -> Result<Program<ExprType>, AccumulatedErrors<TypeError>> {
    let mut checker = Checker {
        registry,
        ctx,
        errors: Vec::new(),
    };

    let mut classes = Vec::new();
    for class in &program.classes {
        classes.push(checker.check_class(class));
    }

    if checker.errors.is_empty() {
        Ok(Program { classes })
    } else {
        Err(AccumulatedErrors {
            errors: checker.errors,
        })
    }
}

impl<'a> Checker<'a> {
    fn object_id(&self) -> u32 {
        self.registry.type_id(OBJECT).unwrap()
    }

    fn bool_id(&self) -> u32 {
        self.registry.type_id(BOOL).unwrap()
    }

    fn int_id(&self) -> u32 {
        self.registry.type_id(INT).unwrap()
    }

    fn string_id(&self) -> u32 {
        self.registry.type_id(STRING).unwrap()
    }

    fn placeholder(&self) -> ExprType {
        ExprType::concrete(self.object_id())
    }

    fn is_exactly(&self, ty: ExprType, id: u32) -> bool {
        !ty.is_self && ty.type_id == id
    }

    fn check_class(&mut self, class: &Class<()>) -> Class<ExprType> {
        let class_id = self.registry.type_id(&class.name).unwrap();
        self.ctx.current_class = Some(class_id);

        let mut features = Vec::new();
        for feature in &class.features {
            match feature {
                Feature::Attribute(attr) => {
                    features.push(Feature::Attribute(self.check_attribute(attr, class_id)))
                }
                Feature::Method(method) => {
                    features.push(Feature::Method(self.check_method(method, class_id)))
                }
            }
        }

        Class {
            name: class.name.clone(),
            parent: class.parent.clone(),
            features,
            loc: class.loc.clone(),
        }
    }

    fn check_attribute(&mut self, attr: &Attribute<()>, class_id: u32) -> Attribute<ExprType> {
        let declared = self
            .ctx
            .lookup_identifier_type(class_id, &attr.id)
            .unwrap_or_else(|| self.placeholder());

        let init = attr.init.as_ref().map(|init_expr| {
            let typed = self.check_expr(init_expr, class_id);
            if !self.registry.conform_to(typed.info, declared) {
                self.errors.push(TypeError {
                    message: format!(
                        "initializer for attribute {} has type {} which does not conform to {}",
                        attr.id, typed.info, declared
                    ),
                    loc: init_expr.loc.clone(),
                });
            }
            typed
        });

        Attribute {
            id: attr.id.clone(),
            type_name: attr.type_name.clone(),
            init,
            loc: attr.loc.clone(),
        }
    }

    fn check_method(&mut self, method: &Method<()>, class_id: u32) -> Method<ExprType> {
        self.ctx.push_scope(class_id);
        for formal in &method.formals {
            let ty = self
                .registry
                .type_id(&formal.type_name)
                .map(ExprType::concrete)
                .unwrap_or_else(|| self.placeholder());
            self.ctx.define_identifier(
                class_id,
                formal.id.clone(),
                ty,
                crate::env::IdentifierCodegenInfo {
                    is_attribute: false,
                    position: 0,
                },
            );
        }

        let body = self.check_expr(&method.body, class_id);

        let record = self.ctx.lookup_method(class_id, &method.id).cloned();
        if let Some(record) = record {
            if !self.registry.conform_to(body.info, record.return_type) {
                self.errors.push(TypeError {
                    message: format!(
                        "method {} body has type {} which does not conform to declared return type {}",
                        method.id, body.info, record.return_type
                    ),
                    loc: method.body.loc.clone(),
                });
            }
        }

        self.ctx.pop_scope(class_id);

        Method {
            id: method.id.clone(),
            formals: method.formals.clone(),
            return_type: method.return_type.clone(),
            body,
            loc: method.loc.clone(),
        }
    }

    fn check_expr(&mut self, expr: &Expr<()>, class_id: u32) -> Expr<ExprType> {
        let loc = expr.loc.clone();
        match &expr.kind {
            ExprKind::IntLit(n) => Expr {
                kind: ExprKind::IntLit(*n),
                loc,
                info: ExprType::concrete(self.int_id()),
            },
            ExprKind::StringLit(s) => Expr {
                kind: ExprKind::StringLit(s.clone()),
                loc,
                info: ExprType::concrete(self.string_id()),
            },
            ExprKind::BoolLit(b) => Expr {
                kind: ExprKind::BoolLit(*b),
                loc,
                info: ExprType::concrete(self.bool_id()),
            },
            ExprKind::Id(name) => {
                let ty = match self.ctx.lookup_identifier_type(class_id, name) {
                    Some(ty) => ty,
                    None => {
                        self.errors.push(TypeError {
                            message: format!("undefined identifier {name}"),
                            loc: loc.clone(),
                        });
                        self.placeholder()
                    }
                };
                Expr {
                    kind: ExprKind::Id(name.clone()),
                    loc,
                    info: ty,
                }
            }
            ExprKind::Unary { op, e } => {
                let e_typed = self.check_expr(e, class_id);
                let info = match op {
                    UnaryOp::Not => {
                        if !self.is_exactly(e_typed.info, self.bool_id()) {
                            self.errors.push(TypeError {
                                message: "not requires a Bool operand".to_string(),
                                loc: loc.clone(),
                            });
                        }
                        ExprType::concrete(self.bool_id())
                    }
                    UnaryOp::Neg => {
                        if !self.is_exactly(e_typed.info, self.int_id()) {
                            self.errors.push(TypeError {
                                message: "~ requires an Int operand".to_string(),
                                loc: loc.clone(),
                            });
                        }
                        ExprType::concrete(self.int_id())
                    }
                    UnaryOp::IsVoid => ExprType::concrete(self.bool_id()),
                };
                Expr {
                    kind: ExprKind::Unary {
                        op: *op,
                        e: Box::new(e_typed),
                    },
                    loc,
                    info,
                }
            }
            ExprKind::BinaryArith { op, l, r } => {
                let l_typed = self.check_expr(l, class_id);
                let r_typed = self.check_expr(r, class_id);
                if !self.is_exactly(l_typed.info, self.int_id())
                    || !self.is_exactly(r_typed.info, self.int_id())
                {
                    self.errors.push(TypeError {
                        message: "arithmetic operators require Int operands".to_string(),
                        loc: loc.clone(),
                    });
                }
                Expr {
                    kind: ExprKind::BinaryArith {
                        op: *op,
                        l: Box::new(l_typed),
                        r: Box::new(r_typed),
                    },
                    loc,
                    info: ExprType::concrete(self.int_id()),
                }
            }
            ExprKind::BinaryCmp { op, l, r } => {
                let l_typed = self.check_expr(l, class_id);
                let r_typed = self.check_expr(r, class_id);
                match op {
                    CmpOp::LessThan | CmpOp::LessEq => {
                        if !self.is_exactly(l_typed.info, self.int_id())
                            || !self.is_exactly(r_typed.info, self.int_id())
                        {
                            self.errors.push(TypeError {
                                message: "< and <= require Int operands".to_string(),
                                loc: loc.clone(),
                            });
                        }
                    }
                    CmpOp::Equal => {
                        let primitive_ids = [self.int_id(), self.string_id(), self.bool_id()];
                        let l_primitive =
                            !l_typed.info.is_self && primitive_ids.contains(&l_typed.info.type_id);
                        let r_primitive =
                            !r_typed.info.is_self && primitive_ids.contains(&r_typed.info.type_id);
                        if (l_primitive || r_primitive) && l_typed.info != r_typed.info {
                            self.errors.push(TypeError {
                                message: "= requires both sides to be the same primitive type"
                                    .to_string(),
                                loc: loc.clone(),
                            });
                        }
                    }
                }
                Expr {
                    kind: ExprKind::BinaryCmp {
                        op: *op,
                        l: Box::new(l_typed),
                        r: Box::new(r_typed),
                    },
                    loc,
                    info: ExprType::concrete(self.bool_id()),
                }
            }
            ExprKind::If { c, t, e } => {
                let c_typed = self.check_expr(c, class_id);
                if !self.is_exactly(c_typed.info, self.bool_id()) {
                    self.errors.push(TypeError {
                        message: "if condition must be Bool".to_string(),
                        loc: loc.clone(),
                    });
                }
                let t_typed = self.check_expr(t, class_id);
                let e_typed = self.check_expr(e, class_id);
                let info = self
                    .registry
                    .least_common_ancestor(t_typed.info, e_typed.info);
                Expr {
                    kind: ExprKind::If {
                        c: Box::new(c_typed),
                        t: Box::new(t_typed),
                        e: Box::new(e_typed),
                    },
                    loc,
                    info,
                }
            }
            ExprKind::While { c, b } => {
                let c_typed = self.check_expr(c, class_id);
                if !self.is_exactly(c_typed.info, self.bool_id()) {
                    self.errors.push(TypeError {
                        message: "while condition must be Bool".to_string(),
                        loc: loc.clone(),
                    });
                }
                let b_typed = self.check_expr(b, class_id);
                Expr {
                    kind: ExprKind::While {
                        c: Box::new(c_typed),
                        b: Box::new(b_typed),
                    },
                    loc,
                    info: ExprType::concrete(self.object_id()),
                }
            }
            ExprKind::Assign { id, e } => {
                let e_typed = self.check_expr(e, class_id);
                if id == SELF_VAR {
                    self.errors.push(TypeError {
                        message: "self cannot be assigned to".to_string(),
                        loc: loc.clone(),
                    });
                }
                let declared = self.ctx.lookup_identifier_type(class_id, id);
                match declared {
                    Some(declared) => {
                        if !self.registry.conform_to(e_typed.info, declared) {
                            self.errors.push(TypeError {
                                message: format!(
                                    "assigned value of type {} does not conform to declared type {} of {id}",
                                    e_typed.info, declared
                                ),
                                loc: loc.clone(),
                            });
                        }
                    }
                    None => self.errors.push(TypeError {
                        message: format!("undefined identifier {id}"),
                        loc: loc.clone(),
                    }),
                }
                let info = e_typed.info;
                Expr {
                    kind: ExprKind::Assign {
                        id: id.clone(),
                        e: Box::new(e_typed),
                    },
                    loc,
                    info,
                }
            }
            ExprKind::Block(exprs) => {
                let typed: Vec<_> = exprs.iter().map(|e| self.check_expr(e, class_id)).collect();
                let info = typed
                    .last()
                    .map(|e| e.info)
                    .unwrap_or_else(|| self.placeholder());
                Expr {
                    kind: ExprKind::Block(typed),
                    loc,
                    info,
                }
            }
            ExprKind::New { type_name } => {
                let info = if type_name == SELF_TYPE {
                    ExprType::self_type(class_id)
                } else if let Some(id) = self.registry.type_id(type_name) {
                    ExprType::concrete(id)
                } else {
                    self.errors.push(TypeError {
                        message: format!("new of undefined class {type_name}"),
                        loc: loc.clone(),
                    });
                    self.placeholder()
                };
                Expr {
                    kind: ExprKind::New {
                        type_name: type_name.clone(),
                    },
                    loc,
                    info,
                }
            }
            ExprKind::Let { bindings, body } => {
                self.ctx.push_scope(class_id);
                let mut typed_bindings = Vec::new();
                for binding in bindings {
                    typed_bindings.push(self.check_let_binding(binding, class_id));
                }
                let body_typed = self.check_expr(body, class_id);
                self.ctx.pop_scope(class_id);
                let info = body_typed.info;
                Expr {
                    kind: ExprKind::Let {
                        bindings: typed_bindings,
                        body: Box::new(body_typed),
                    },
                    loc,
                    info,
                }
            }
            ExprKind::Case { scrutinee, branches } => {
                let scrutinee_typed = self.check_expr(scrutinee, class_id);
                let mut seen_types = Vec::new();
                let mut typed_branches = Vec::new();
                let mut result_ty: Option<ExprType> = None;
                for branch in branches {
                    let pattern_ty = if branch.type_name == SELF_TYPE {
                        self.errors.push(TypeError {
                            message: "case branch pattern type cannot be SELF_TYPE".to_string(),
                            loc: branch.loc.clone(),
                        });
                        self.placeholder()
                    } else if let Some(id) = self.registry.type_id(&branch.type_name) {
                        ExprType::concrete(id)
                    } else {
                        self.errors.push(TypeError {
                            message: format!("case branch uses undefined type {}", branch.type_name),
                            loc: branch.loc.clone(),
                        });
                        self.placeholder()
                    };
                    if seen_types.contains(&pattern_ty) {
                        self.errors.push(TypeError {
                            message: format!(
                                "duplicate case branch pattern type {}",
                                branch.type_name
                            ),
                            loc: branch.loc.clone(),
                        });
                    }
                    seen_types.push(pattern_ty);

                    self.ctx.push_scope(class_id);
                    self.ctx.define_identifier(
                        class_id,
                        branch.id.clone(),
                        pattern_ty,
                        crate::env::IdentifierCodegenInfo {
                            is_attribute: false,
                            position: 0,
                        },
                    );
                    let body_typed = self.check_expr(&branch.body, class_id);
                    self.ctx.pop_scope(class_id);

                    result_ty = Some(match result_ty {
                        Some(acc) => self.registry.least_common_ancestor(acc, body_typed.info),
                        None => body_typed.info,
                    });

                    typed_branches.push(CaseBranch {
                        id: branch.id.clone(),
                        type_name: branch.type_name.clone(),
                        body: Box::new(body_typed),
                        loc: branch.loc.clone(),
                    });
                }
                Expr {
                    kind: ExprKind::Case {
                        scrutinee: Box::new(scrutinee_typed),
                        branches: typed_branches,
                    },
                    loc,
                    info: result_ty.unwrap_or_else(|| self.placeholder()),
                }
            }
            ExprKind::Dispatch {
                receiver,
                method,
                args,
            } => {
                let receiver_typed = receiver.as_ref().map(|r| self.check_expr(r, class_id));
                let receiver_ty = receiver_typed
                    .as_ref()
                    .map(|r| r.info)
                    .unwrap_or_else(|| ExprType::self_type(class_id));
                let lookup_class = if receiver_ty.is_self {
                    class_id
                } else {
                    receiver_ty.type_id
                };
                let args_typed: Vec<_> =
                    args.iter().map(|a| self.check_expr(a, class_id)).collect();

                let info = self.check_call(lookup_class, method, &args_typed, receiver_ty, &loc);

                Expr {
                    kind: ExprKind::Dispatch {
                        receiver: receiver_typed.map(Box::new),
                        method: method.clone(),
                        args: args_typed,
                    },
                    loc,
                    info,
                }
            }
            ExprKind::StaticDispatch {
                receiver,
                target_class,
                method,
                args,
            } => {
                let receiver_typed = self.check_expr(receiver, class_id);
                if let Some(target_id) = self.registry.type_id(target_class) {
                    if !self
                        .registry
                        .conform_to(receiver_typed.info, ExprType::concrete(target_id))
                    {
                        self.errors.push(TypeError {
                            message: format!(
                                "receiver of type {} does not conform to {target_class}",
                                receiver_typed.info
                            ),
                            loc: loc.clone(),
                        });
                    }
                } else {
                    self.errors.push(TypeError {
                        message: format!("static dispatch to undefined class {target_class}"),
                        loc: loc.clone(),
                    });
                }
                let args_typed: Vec<_> =
                    args.iter().map(|a| self.check_expr(a, class_id)).collect();
                let lookup_class = self
                    .registry
                    .type_id(target_class)
                    .unwrap_or(self.object_id());
                let info = self.check_call(
                    lookup_class,
                    method,
                    &args_typed,
                    receiver_typed.info,
                    &loc,
                );
                Expr {
                    kind: ExprKind::StaticDispatch {
                        receiver: Box::new(receiver_typed),
                        target_class: target_class.clone(),
                        method: method.clone(),
                        args: args_typed,
                    },
                    loc,
                    info,
                }
            }
        }
    }

    fn check_let_binding(
        &mut self,
        binding: &LetBinding<()>,
        class_id: u32,
    ) -> LetBinding<ExprType> {
        let declared = if binding.type_name == SELF_TYPE {
            ExprType::self_type(class_id)
        } else if let Some(id) = self.registry.type_id(&binding.type_name) {
            ExprType::concrete(id)
        } else {
            self.errors.push(TypeError {
                message: format!("let binding {} has undefined type {}", binding.id, binding.type_name),
                loc: binding.loc.clone(),
            });
            self.placeholder()
        };

        let init = binding.init.as_ref().map(|init_expr| {
            let typed = self.check_expr(init_expr, class_id);
            if !self.registry.conform_to(typed.info, declared) {
                self.errors.push(TypeError {
                    message: format!(
                        "let binding {} initializer has type {} which does not conform to {}",
                        binding.id, typed.info, declared
                    ),
                    loc: init_expr.loc.clone(),
                });
            }
            Box::new(typed)
        });

        self.ctx.define_identifier(
            class_id,
            binding.id.clone(),
            declared,
            crate::env::IdentifierCodegenInfo {
                is_attribute: false,
                position: 0,
            },
        );

        LetBinding {
            id: binding.id.clone(),
            type_name: binding.type_name.clone(),
            init,
            loc: binding.loc.clone(),
        }
    }

    /// Shared by `Dispatch` and `StaticDispatch`: resolves `method` in
    /// `lookup_class`'s method table, checks arity/conformance of `args`,
    /// and resolves a `SELF_TYPE` return against `receiver_ty`.
    fn check_call(
        &mut self,
        lookup_class: u32,
        method: &str,
        args_typed: &[Expr<ExprType>],
        receiver_ty: ExprType,
        loc: &crate::ast::Loc,
    ) -> ExprType {
        let record = match self.ctx.lookup_method(lookup_class, method) {
            Some(r) => r.clone(),
            None => {
                self.errors.push(TypeError {
                    message: format!(
                        "no method {method} on {}",
                        self.registry.class_name(lookup_class)
                    ),
                    loc: loc.clone(),
                });
                return self.placeholder();
            }
        };

        if record.formal_types.len() != args_typed.len() {
            self.errors.push(TypeError {
                message: format!(
                    "method {method} expects {} argument(s), got {}",
                    record.formal_types.len(),
                    args_typed.len()
                ),
                loc: loc.clone(),
            });
        } else {
            for (formal_ty, arg) in record.formal_types.iter().zip(args_typed) {
                if !self.registry.conform_to(arg.info, *formal_ty) {
                    self.errors.push(TypeError {
                        message: format!(
                            "argument of type {} does not conform to formal type {}",
                            arg.info, formal_ty
                        ),
                        loc: loc.clone(),
                    });
                }
            }
        }

        if record.return_type.is_self {
            receiver_ty
        } else {
            record.return_type
        }
    }
}

//! Thin pest-based frontend: turns COOL source text into a `Program<()>`.
//! Precedence and associativity are encoded directly in `grammar.pest`
//! (assign is right-associative and lowest, dispatch/dot binds tightest);
//! this module only has to walk the resulting parse tree, it does no
//! climbing of its own.

use std::rc::Rc;

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use super::class::{Attribute, Class, Feature, Formal, Method, Program};
use super::expr::{ArithOp, CaseBranch, CmpOp, Expr, ExprKind, LetBinding, UnaryOp};
use super::loc::Loc;

#[derive(Parser)]
#[grammar = "ast/grammar.pest"]
struct CoolParser;

#[derive(Debug)]
pub struct ParseError {
    pub message: String,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

pub fn parse_program(source: &str, file: &str) -> Result<Program<()>, ParseError> {
    let file: Rc<str> = Rc::from(file);
    let mut pairs = CoolParser::parse(Rule::program, source).map_err(|e| ParseError {
        message: e.to_string(),
    })?;
    let program_pair = pairs.next().expect("program rule always produces a pair");

    let mut classes = Vec::new();
    for pair in program_pair.into_inner() {
        if pair.as_rule() == Rule::class_decl {
            classes.push(parse_class(pair, &file));
        }
    }
    Ok(Program { classes })
}

fn loc(pair: &Pair<Rule>, file: &Rc<str>) -> Loc {
    let (line, col) = pair.line_col();
    Loc::new(file.clone(), line, col)
}

fn parse_class(pair: Pair<Rule>, file: &Rc<str>) -> Class<()> {
    let class_loc = loc(&pair, file);
    let mut inner = pair.into_inner();
    let name = inner.next().unwrap().as_str().to_string();

    let mut next = inner.next();
    let parent = match &next {
        Some(p) if p.as_rule() == Rule::type_id => {
            let parent_name = p.as_str().to_string();
            next = inner.next();
            Some(parent_name)
        }
        _ => None,
    };

    let mut features = Vec::new();
    let mut cur = next;
    while let Some(p) = cur {
        if p.as_rule() == Rule::feature {
            features.push(parse_feature(p, file));
        }
        cur = inner.next();
    }

    Class {
        name,
        parent,
        features,
        loc: class_loc,
    }
}

fn parse_feature(pair: Pair<Rule>, file: &Rc<str>) -> Feature<()> {
    let f_loc = loc(&pair, file);
    let inner = pair.into_inner().next().unwrap();
    match inner.as_rule() {
        Rule::method_feature => Feature::Method(parse_method(inner, f_loc, file)),
        Rule::attr_feature => Feature::Attribute(parse_attribute(inner, f_loc, file)),
        r => unreachable!("unexpected feature alternative {r:?}"),
    }
}

fn parse_method(pair: Pair<Rule>, loc: Loc, file: &Rc<str>) -> Method<()> {
    let mut inner = pair.into_inner();
    let id = inner.next().unwrap().as_str().to_string();

    let mut next = inner.next().unwrap();
    let mut formals = Vec::new();
    if next.as_rule() == Rule::formal_list {
        for f in next.into_inner() {
            formals.push(parse_formal(f, file));
        }
        next = inner.next().unwrap();
    }
    let return_type = next.as_str().to_string();
    let body_pair = inner.next().unwrap();
    let body = parse_expr(body_pair, file);

    Method {
        id,
        formals,
        return_type,
        body,
        loc,
    }
}

fn parse_formal(pair: Pair<Rule>, file: &Rc<str>) -> Formal {
    let f_loc = loc(&pair, file);
    let mut inner = pair.into_inner();
    let id = inner.next().unwrap().as_str().to_string();
    let type_name = inner.next().unwrap().as_str().to_string();
    Formal {
        id,
        type_name,
        loc: f_loc,
    }
}

fn parse_attribute(pair: Pair<Rule>, loc: Loc, file: &Rc<str>) -> Attribute<()> {
    let mut inner = pair.into_inner();
    let id = inner.next().unwrap().as_str().to_string();
    let type_name = inner.next().unwrap().as_str().to_string();
    let init = inner.next().map(|e| parse_expr(e, file));
    Attribute {
        id,
        type_name,
        init,
        loc,
    }
}

/// Unwraps single-child pass-through rules (`expr`, `primary`, `paren_expr`)
/// down to the node that actually carries content.
fn parse_expr(pair: Pair<Rule>, file: &Rc<str>) -> Expr<()> {
    match pair.as_rule() {
        Rule::expr => parse_expr(pair.into_inner().next().unwrap(), file),
        Rule::assign_expr => parse_assign(pair, file),
        Rule::not_expr => parse_not(pair, file),
        Rule::cmp_expr => parse_cmp(pair, file),
        Rule::add_expr => parse_add(pair, file),
        Rule::mul_expr => parse_mul(pair, file),
        Rule::unary_expr => parse_unary(pair, file),
        Rule::dispatch_expr => parse_dispatch(pair, file),
        Rule::primary => parse_primary(pair, file),
        Rule::paren_expr => parse_expr(pair.into_inner().next().unwrap(), file),
        r => unreachable!("unexpected expr alternative {r:?}"),
    }
}

fn parse_assign(pair: Pair<Rule>, file: &Rc<str>) -> Expr<()> {
    let e_loc = loc(&pair, file);
    let mut ids = Vec::new();
    let mut tail = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::obj_id => ids.push((p.as_str().to_string(), e_loc.clone())),
            Rule::not_expr => tail = Some(parse_expr(p, file)),
            r => unreachable!("unexpected assign_expr child {r:?}"),
        }
    }
    let mut result = tail.expect("assign_expr always has a trailing not_expr");
    for (id, id_loc) in ids.into_iter().rev() {
        result = Expr::new(
            ExprKind::Assign {
                id,
                e: Box::new(result),
            },
            id_loc,
        );
    }
    result
}

fn parse_not(pair: Pair<Rule>, file: &Rc<str>) -> Expr<()> {
    let e_loc = loc(&pair, file);
    let src = pair.as_str();
    let negate = src.trim_start().starts_with("not");
    let inner = pair.into_inner().next().unwrap();
    let e = parse_expr(inner, file);
    if negate {
        Expr::new(
            ExprKind::Unary {
                op: UnaryOp::Not,
                e: Box::new(e),
            },
            e_loc,
        )
    } else {
        e
    }
}

fn parse_cmp(pair: Pair<Rule>, file: &Rc<str>) -> Expr<()> {
    let e_loc = loc(&pair, file);
    let mut inner = pair.into_inner();
    let l = parse_expr(inner.next().unwrap(), file);
    match (inner.next(), inner.next()) {
        (Some(op_pair), Some(r_pair)) => {
            let op = match op_pair.as_str() {
                "<=" => CmpOp::LessEq,
                "<" => CmpOp::LessThan,
                "=" => CmpOp::Equal,
                s => unreachable!("unknown comparison operator {s}"),
            };
            let r = parse_expr(r_pair, file);
            Expr::new(
                ExprKind::BinaryCmp {
                    op,
                    l: Box::new(l),
                    r: Box::new(r),
                },
                e_loc,
            )
        }
        _ => l,
    }
}

fn parse_add(pair: Pair<Rule>, file: &Rc<str>) -> Expr<()> {
    let e_loc = loc(&pair, file);
    let mut inner = pair.into_inner();
    let mut result = parse_expr(inner.next().unwrap(), file);
    while let (Some(op_pair), Some(rhs_pair)) = (inner.next(), inner.next()) {
        let op = match op_pair.as_str() {
            "+" => ArithOp::Plus,
            "-" => ArithOp::Minus,
            s => unreachable!("unknown additive operator {s}"),
        };
        let r = parse_expr(rhs_pair, file);
        result = Expr::new(
            ExprKind::BinaryArith {
                op,
                l: Box::new(result),
                r: Box::new(r),
            },
            e_loc.clone(),
        );
    }
    result
}

fn parse_mul(pair: Pair<Rule>, file: &Rc<str>) -> Expr<()> {
    let e_loc = loc(&pair, file);
    let mut inner = pair.into_inner();
    let mut result = parse_expr(inner.next().unwrap(), file);
    while let (Some(op_pair), Some(rhs_pair)) = (inner.next(), inner.next()) {
        let op = match op_pair.as_str() {
            "*" => ArithOp::Times,
            "/" => ArithOp::Divide,
            s => unreachable!("unknown multiplicative operator {s}"),
        };
        let r = parse_expr(rhs_pair, file);
        result = Expr::new(
            ExprKind::BinaryArith {
                op,
                l: Box::new(result),
                r: Box::new(r),
            },
            e_loc.clone(),
        );
    }
    result
}

fn parse_unary(pair: Pair<Rule>, file: &Rc<str>) -> Expr<()> {
    let e_loc = loc(&pair, file);
    let full = pair.as_str();
    let mut ops = Vec::new();
    let mut rest = full;
    loop {
        let trimmed = rest.trim_start();
        if let Some(r) = trimmed.strip_prefix('~') {
            ops.push(UnaryOp::Neg);
            rest = r;
        } else if let Some(r) = trimmed.strip_prefix("isvoid") {
            ops.push(UnaryOp::IsVoid);
            rest = r;
        } else {
            break;
        }
    }
    let inner = pair.into_inner().next().unwrap();
    let mut e = parse_expr(inner, file);
    for op in ops.into_iter().rev() {
        e = Expr::new(
            ExprKind::Unary {
                op,
                e: Box::new(e),
            },
            e_loc.clone(),
        );
    }
    e
}

fn parse_dispatch(pair: Pair<Rule>, file: &Rc<str>) -> Expr<()> {
    let e_loc = loc(&pair, file);
    let mut inner = pair.into_inner();
    let mut receiver = parse_expr(inner.next().unwrap(), file);
    for tail in inner {
        let t_loc = loc(&tail, file);
        let alt = tail.into_inner().next().unwrap();
        receiver = match alt.as_rule() {
            Rule::dot_dispatch_tail => {
                let mut parts = alt.into_inner();
                let method = parts.next().unwrap().as_str().to_string();
                let args = parts.next().map(parse_arg_list).unwrap_or_default();
                let args = args.into_iter().map(|p| parse_expr(p, file)).collect();
                Expr::new(
                    ExprKind::Dispatch {
                        receiver: Some(Box::new(receiver)),
                        method,
                        args,
                    },
                    t_loc,
                )
            }
            Rule::static_dispatch_tail => {
                let mut parts = alt.into_inner();
                let target_class = parts.next().unwrap().as_str().to_string();
                let method = parts.next().unwrap().as_str().to_string();
                let args = parts.next().map(parse_arg_list).unwrap_or_default();
                let args = args.into_iter().map(|p| parse_expr(p, file)).collect();
                Expr::new(
                    ExprKind::StaticDispatch {
                        receiver: Box::new(receiver),
                        target_class,
                        method,
                        args,
                    },
                    t_loc,
                )
            }
            r => unreachable!("unexpected dispatch_tail alternative {r:?}"),
        };
    }
    let _ = e_loc;
    receiver
}

fn parse_arg_list(pair: Pair<Rule>) -> Vec<Pair<Rule>> {
    pair.into_inner().collect()
}

fn parse_primary(pair: Pair<Rule>, file: &Rc<str>) -> Expr<()> {
    let p_loc = loc(&pair, file);
    let inner = pair.into_inner().next().unwrap();
    match inner.as_rule() {
        Rule::if_expr => {
            let mut it = inner.into_inner();
            let c = parse_expr(it.next().unwrap(), file);
            let t = parse_expr(it.next().unwrap(), file);
            let e = parse_expr(it.next().unwrap(), file);
            Expr::new(
                ExprKind::If {
                    c: Box::new(c),
                    t: Box::new(t),
                    e: Box::new(e),
                },
                p_loc,
            )
        }
        Rule::while_expr => {
            let mut it = inner.into_inner();
            let c = parse_expr(it.next().unwrap(), file);
            let b = parse_expr(it.next().unwrap(), file);
            Expr::new(
                ExprKind::While {
                    c: Box::new(c),
                    b: Box::new(b),
                },
                p_loc,
            )
        }
        Rule::let_expr => parse_let(inner, file, p_loc),
        Rule::case_expr => parse_case(inner, file, p_loc),
        Rule::new_expr => {
            let type_name = inner.into_inner().next().unwrap().as_str().to_string();
            Expr::new(ExprKind::New { type_name }, p_loc)
        }
        Rule::block_expr => {
            let exprs = inner.into_inner().map(|e| parse_expr(e, file)).collect();
            Expr::new(ExprKind::Block(exprs), p_loc)
        }
        Rule::bare_call => {
            let mut it = inner.into_inner();
            let method = it.next().unwrap().as_str().to_string();
            let args = it
                .next()
                .map(parse_arg_list)
                .unwrap_or_default()
                .into_iter()
                .map(|p| parse_expr(p, file))
                .collect();
            Expr::new(
                ExprKind::Dispatch {
                    receiver: None,
                    method,
                    args,
                },
                p_loc,
            )
        }
        Rule::int_lit => {
            let value: i32 = inner.as_str().parse().unwrap_or(0);
            Expr::new(ExprKind::IntLit(value), p_loc)
        }
        Rule::string_lit => {
            let raw = inner.as_str();
            let unquoted = &raw[1..raw.len() - 1];
            Expr::new(ExprKind::StringLit(unescape_cool(unquoted)), p_loc)
        }
        Rule::bool_lit => Expr::new(ExprKind::BoolLit(inner.as_str() == "true"), p_loc),
        Rule::obj_id => Expr::new(ExprKind::Id(inner.as_str().to_string()), p_loc),
        Rule::paren_expr => parse_expr(inner, file),
        r => unreachable!("unexpected primary alternative {r:?}"),
    }
}

fn unescape_cool(raw: &str) -> String {
    unescape::unescape(raw).unwrap_or_else(|| raw.to_string())
}

fn parse_let(pair: Pair<Rule>, file: &Rc<str>, let_loc: Loc) -> Expr<()> {
    let mut inner = pair.into_inner();
    let mut bindings = Vec::new();
    let mut body = None;
    for p in inner.by_ref() {
        match p.as_rule() {
            Rule::let_binding => bindings.push(parse_let_binding(p, file)),
            _ => {
                body = Some(parse_expr(p, file));
            }
        }
    }
    Expr::new(
        ExprKind::Let {
            bindings,
            body: Box::new(body.expect("let_expr always has a trailing body")),
        },
        let_loc,
    )
}

fn parse_let_binding(pair: Pair<Rule>, file: &Rc<str>) -> LetBinding<()> {
    let b_loc = loc(&pair, file);
    let mut inner = pair.into_inner();
    let id = inner.next().unwrap().as_str().to_string();
    let type_name = inner.next().unwrap().as_str().to_string();
    let init = inner.next().map(|e| Box::new(parse_expr(e, file)));
    LetBinding {
        id,
        type_name,
        init,
        loc: b_loc,
    }
}

fn parse_case(pair: Pair<Rule>, file: &Rc<str>, case_loc: Loc) -> Expr<()> {
    let mut inner = pair.into_inner();
    let scrutinee = parse_expr(inner.next().unwrap(), file);
    let branches = inner.map(|b| parse_case_branch(b, file)).collect();
    Expr::new(
        ExprKind::Case {
            scrutinee: Box::new(scrutinee),
            branches,
        },
        case_loc,
    )
}

fn parse_case_branch(pair: Pair<Rule>, file: &Rc<str>) -> CaseBranch<()> {
    let b_loc = loc(&pair, file);
    let mut inner = pair.into_inner();
    let id = inner.next().unwrap().as_str().to_string();
    let type_name = inner.next().unwrap().as_str().to_string();
    let body = Box::new(parse_expr(inner.next().unwrap(), file));
    CaseBranch {
        id,
        type_name,
        body,
        loc: b_loc,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_program() {
        let src = r#"
            class Main inherits IO {
                main(): Object {
                    out_string("hello, world\n")
                };
            };
        "#;
        let program = parse_program(src, "test.cl").expect("parse should succeed");
        assert_eq!(program.classes.len(), 1);
        assert_eq!(program.classes[0].name, "Main");
        assert_eq!(program.classes[0].parent.as_deref(), Some("IO"));
    }

    #[test]
    fn parses_let_and_arithmetic() {
        let src = r#"
            class Main {
                main(): Int {
                    let x: Int <- 1 + 2 * 3 in x
                };
            };
        "#;
        let program = parse_program(src, "test.cl").expect("parse should succeed");
        let method = program.classes[0].methods().next().unwrap();
        assert!(matches!(method.body.kind, ExprKind::Let { .. }));
    }

    #[test]
    fn rejects_garbage() {
        let src = "this is not cool source";
        assert!(parse_program(src, "test.cl").is_err());
    }
}

use super::loc::Loc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `not e` — boolean negation.
    Not,
    /// `~e` — integer negation.
    Neg,
    /// `isvoid e`.
    IsVoid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Plus,
    Minus,
    Times,
    Divide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    LessThan,
    LessEq,
    Equal,
}

/// A single `let` binding: `id : typeName [<- init]`.
#[derive(Debug, Clone)]
pub struct LetBinding<T> {
    pub id: String,
    pub type_name: String,
    pub init: Option<Box<Expr<T>>>,
    pub loc: Loc,
}

/// A single branch of a `case` expression: `id : typeName => body`.
#[derive(Debug, Clone)]
pub struct CaseBranch<T> {
    pub id: String,
    pub type_name: String,
    pub body: Box<Expr<T>>,
    pub loc: Loc,
}

#[derive(Debug, Clone)]
pub enum ExprKind<T> {
    IntLit(i32),
    StringLit(String),
    BoolLit(bool),
    Id(String),
    Unary {
        op: UnaryOp,
        e: Box<Expr<T>>,
    },
    BinaryArith {
        op: ArithOp,
        l: Box<Expr<T>>,
        r: Box<Expr<T>>,
    },
    BinaryCmp {
        op: CmpOp,
        l: Box<Expr<T>>,
        r: Box<Expr<T>>,
    },
    If {
        c: Box<Expr<T>>,
        t: Box<Expr<T>>,
        e: Box<Expr<T>>,
    },
    While {
        c: Box<Expr<T>>,
        b: Box<Expr<T>>,
    },
    Assign {
        id: String,
        e: Box<Expr<T>>,
    },
    Block(Vec<Expr<T>>),
    New {
        type_name: String,
    },
    Let {
        bindings: Vec<LetBinding<T>>,
        body: Box<Expr<T>>,
    },
    Case {
        scrutinee: Box<Expr<T>>,
        branches: Vec<CaseBranch<T>>,
    },
    Dispatch {
        receiver: Option<Box<Expr<T>>>,
        method: String,
        args: Vec<Expr<T>>,
    },
    StaticDispatch {
        receiver: Box<Expr<T>>,
        target_class: String,
        method: String,
        args: Vec<Expr<T>>,
    },
}

/// A single COOL expression. `info` is `()` straight out of the parser and
/// becomes `ExprType` once `TypeCheckPass` has run (spec.md §3, §4.3); the
/// AST itself is never mutated in place — `TypeCheckPass` builds a fresh
/// `Expr<ExprType>` tree instead, using a generic `Expr<T>` to split
/// between untyped and typed ASTs.
#[derive(Debug, Clone)]
pub struct Expr<T> {
    pub kind: ExprKind<T>,
    pub loc: Loc,
    pub info: T,
}

impl Expr<()> {
    pub fn new(kind: ExprKind<()>, loc: Loc) -> Self {
        Self {
            kind,
            loc,
            info: (),
        }
    }
}

impl<T: Clone> Expr<T> {
    pub fn ty(&self) -> T {
        self.info.clone()
    }
}

pub mod class;
pub mod expr;
pub mod loc;
pub mod parser;
pub mod types;

pub use class::{Attribute, Class, Feature, Formal, Method, Program};
pub use expr::{ArithOp, CaseBranch, CmpOp, Expr, ExprKind, LetBinding, UnaryOp};
pub use loc::Loc;
pub use types::ExprType;

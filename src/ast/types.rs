use std::fmt::Display;

/// Names reserved by the language itself; see spec.md §4.1.
pub const OBJECT: &str = "Object";
pub const IO: &str = "IO";
pub const INT: &str = "Int";
pub const STRING: &str = "String";
pub const BOOL: &str = "Bool";
pub const SELF_TYPE: &str = "SELF_TYPE";
pub const SELF_VAR: &str = "self";

/// Built-in classes are registered in this exact order, giving them stable,
/// low-numbered ids (`Object` is always 0). Order matters: every other pass
/// assumes `Object`'s id is the smallest.
pub const BUILTIN_CLASSES: [&str; 5] = [OBJECT, IO, INT, STRING, BOOL];

/// The type of a single expression. `is_self` encodes `SELF_TYPE`; `type_id`
/// is always the id of the class lexically enclosing the expression, even
/// when `is_self` is set (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprType {
    pub type_id: u32,
    pub is_self: bool,
}

impl ExprType {
    pub fn concrete(type_id: u32) -> Self {
        Self {
            type_id,
            is_self: false,
        }
    }

    pub fn self_type(enclosing_class: u32) -> Self {
        Self {
            type_id: enclosing_class,
            is_self: true,
        }
    }
}

impl Display for ExprType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_self {
            write!(f, "SELF_TYPE")
        } else {
            write!(f, "#{}", self.type_id)
        }
    }
}

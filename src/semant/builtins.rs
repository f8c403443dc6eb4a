//! Built-in method signatures for `Object`, `IO`, and `String`, carried
//! forward from the standard library the original C++ core registers
//! during `ClassRegistry` bootstrap (`include/cool/ir/class.h`). Formal and
//! return types are given by name and resolved against the registry once
//! all built-in classes exist.

use crate::ast::types::{INT, IO, OBJECT, SELF_TYPE, STRING};

pub struct BuiltinMethod {
    pub class: &'static str,
    pub name: &'static str,
    pub formals: &'static [&'static str],
    pub return_type: &'static str,
}

pub const BUILTIN_METHODS: &[BuiltinMethod] = &[
    BuiltinMethod {
        class: OBJECT,
        name: "abort",
        formals: &[],
        return_type: OBJECT,
    },
    BuiltinMethod {
        class: OBJECT,
        name: "type_name",
        formals: &[],
        return_type: STRING,
    },
    BuiltinMethod {
        class: OBJECT,
        name: "copy",
        formals: &[],
        return_type: SELF_TYPE,
    },
    BuiltinMethod {
        class: IO,
        name: "out_string",
        formals: &[STRING],
        return_type: SELF_TYPE,
    },
    BuiltinMethod {
        class: IO,
        name: "out_int",
        formals: &[INT],
        return_type: SELF_TYPE,
    },
    BuiltinMethod {
        class: IO,
        name: "in_string",
        formals: &[],
        return_type: STRING,
    },
    BuiltinMethod {
        class: IO,
        name: "in_int",
        formals: &[],
        return_type: INT,
    },
    BuiltinMethod {
        class: STRING,
        name: "length",
        formals: &[],
        return_type: INT,
    },
    BuiltinMethod {
        class: STRING,
        name: "concat",
        formals: &[STRING],
        return_type: STRING,
    },
    BuiltinMethod {
        class: STRING,
        name: "substr",
        formals: &[INT, INT],
        return_type: STRING,
    },
];

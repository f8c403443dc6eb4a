use cool::pipeline::{compile_str, CompileError};

#[test]
fn redefining_a_class_fails_class_definition_pass() {
    let source = r#"
class A { };
class A { };
class Main { main() : Int { 0 }; };
"#;
    let err = compile_str(source, "redefine.cl").unwrap_err();
    assert!(matches!(err, CompileError::Definition(_)));
}

#[test]
fn inheritance_cycle_fails_class_definition_pass() {
    let source = r#"
class A inherits B { };
class B inherits A { };
class Main { main() : Int { 0 }; };
"#;
    let err = compile_str(source, "cycle.cl").unwrap_err();
    assert!(matches!(err, CompileError::Definition(_)));
}

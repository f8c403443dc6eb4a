use cool::pipeline::{compile_str, CompileError};

#[test]
fn overriding_with_a_different_formal_type_fails_class_implementation_pass() {
    let source = r#"
class A { f(x: Int): Int { x } };
class B inherits A { f(x: Bool): Int { 0 } };
class Main { main() : Int { 0 }; };
"#;
    let err = compile_str(source, "override.cl").unwrap_err();
    assert!(matches!(err, CompileError::Implementation(_)));
}

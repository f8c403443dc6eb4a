use cool::pipeline::compile_str;

/// `let x <- 1 in (let x <- 2 in x) + x` only type-checks and compiles if
/// the inner `x` shadows and the outer `x` is restored afterward; a broken
/// scope stack would leave the outer reference pointing at the inner slot.
#[test]
fn inner_let_binding_does_not_leak_into_outer_scope() {
    let source = r#"
class Main {
  main() : Int {
    let x : Int <- 1 in
      (let x : Int <- 2 in x) + x
  };
};
"#;
    let asm = compile_str(source, "let_scope.cl").expect("should compile");
    assert!(asm.contains("Main.main:"));
}

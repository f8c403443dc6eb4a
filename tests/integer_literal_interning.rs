use cool::pipeline::compile_str;

#[test]
fn repeated_literals_share_one_interned_label() {
    let source = r#"
class Main {
  main() : Int {
    0 + 0 + 0
  };
};
"#;
    let asm = compile_str(source, "intern.cl").expect("should compile");
    let label_defs = asm
        .lines()
        .filter(|l| l.trim_start().starts_with("int_const") && l.trim_end().ends_with(':'))
        .count();
    assert_eq!(label_defs, 1, "expected exactly one int_const label, got asm:\n{asm}");
}

use cool::pipeline::compile_str;

#[test]
fn emits_init_main_and_int_prototype() {
    let source = "class Main { main() : Int { 0 }; };";
    let asm = compile_str(source, "minimum.cl").expect("should compile");

    assert!(asm.contains("Main_init:"));
    assert!(asm.contains("Main.main:"));
    assert!(asm.contains("Int_protObj:"));
}

//! The codegen pass family (spec.md §4.4), run in sequence by
//! `crate::pipeline`: prepare dispatch slots, emit constants, emit tables,
//! emit object init/method bodies, and assemble the final text.

mod code;
mod constants;
mod context;
mod layout;
mod objects_init;
mod prepare;
mod tables;

use std::rc::Rc;

use crate::ast::{ExprType, Program};
use crate::asm::{Instruction, Reg};
use crate::env::Context;
use crate::registry::ClassRegistry;

pub use context::{CodegenContext, CodegenOptions};

/// Runs every codegen pass over an already type-checked program and
/// renders the result as SPIM-ready assembly text.
pub fn run(
    registry: Rc<ClassRegistry>,
    env: Context,
    options: CodegenOptions,
    program: &Program<ExprType>,
) -> String {
    let mut ctx = CodegenContext::new(registry.clone(), env, options);
    prepare::run(&registry, &mut ctx);

    let mut instructions = constants::run(&registry, &mut ctx, program);
    instructions.extend(tables::run(&registry, &mut ctx));
    instructions.push(Instruction::Text);
    instructions.push(Instruction::Globl("main".to_string()));
    instructions.extend(objects_init::run(&registry, &mut ctx, program));
    instructions.extend(runtime_entry());

    instructions
        .iter()
        .map(Instruction::to_string)
        .collect::<Vec<_>>()
        .join("\n")
        + "\n"
}

/// `main` is SPIM's real entry point: allocate a `Main`, run `.main`, exit.
/// `ClassDefinitionPass` already guarantees a `Main` class with a `main`
/// method exists by the time codegen runs.
fn runtime_entry() -> Vec<Instruction> {
    vec![
        Instruction::Label("main".to_string()),
        Instruction::La(Reg::A0, "Main_protObj".to_string()),
        Instruction::Jal("Object.copy".to_string()),
        Instruction::Jal("Main_init".to_string()),
        Instruction::Jal("Main.main".to_string()),
        Instruction::Li(Reg::V0, 10),
        Instruction::Syscall,
    ]
}

#[macro_use]
extern crate pest_derive;

pub mod asm;
pub mod ast;
pub mod cli;
pub mod codegen;
pub mod env;
pub mod pipeline;
pub mod registry;
pub mod semant;

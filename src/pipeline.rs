//! Orchestrates the whole pipeline (spec.md §4): parse, ClassDefinitionPass,
//! ClassImplementationPass, TypeCheckPass, then the codegen pass family,
//! producing the final assembly text. `src/bin/cool/main.rs` maps the
//! `Result` variants onto the exit codes in spec.md §6.

use std::rc::Rc;

use log::{debug, info};

use crate::ast::parser::{parse_program, ParseError};
use crate::codegen::{self, CodegenOptions};
use crate::env::Context;
use crate::semant::{class_definition, class_implementation, type_check};
use crate::semant::{AccumulatedErrors, DefinitionError, ImplementationError, TypeError};

/// Everything that can go wrong along the pipeline, kept as separate
/// variants rather than one flattened error so `main` can recover the
/// right exit code for each stage (spec.md §6).
#[derive(Debug)]
pub enum CompileError {
    Parse(ParseError),
    Definition(DefinitionError),
    Implementation(AccumulatedErrors<ImplementationError>),
    Type(AccumulatedErrors<TypeError>),
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::Parse(e) => write!(f, "{e}"),
            CompileError::Definition(e) => write!(f, "{e}"),
            CompileError::Implementation(e) => write!(f, "{e}"),
            CompileError::Type(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<ParseError> for CompileError {
    fn from(e: ParseError) -> Self {
        CompileError::Parse(e)
    }
}

impl From<DefinitionError> for CompileError {
    fn from(e: DefinitionError) -> Self {
        CompileError::Definition(e)
    }
}

impl From<AccumulatedErrors<ImplementationError>> for CompileError {
    fn from(e: AccumulatedErrors<ImplementationError>) -> Self {
        CompileError::Implementation(e)
    }
}

impl From<AccumulatedErrors<TypeError>> for CompileError {
    fn from(e: AccumulatedErrors<TypeError>) -> Self {
        CompileError::Type(e)
    }
}

/// Runs every pass over `source` (attributed to `file` for error locations)
/// and returns the emitted SPIM assembly text on success.
pub fn compile_str(source: &str, file: &str) -> Result<String, CompileError> {
    debug!("parsing {file}");
    let program = parse_program(source, file)?;

    debug!("running ClassDefinitionPass");
    let registry = Rc::new(class_definition::run(&program)?);

    debug!("running ClassImplementationPass");
    let mut env = Context::new(registry.clone());
    class_implementation::run(&registry, &mut env)?;

    debug!("running TypeCheckPass");
    let typed = type_check::run(&registry, &mut env, &program)?;

    info!("generating code for {file}");
    let asm = codegen::run(registry, env, CodegenOptions::default(), &typed);
    Ok(asm)
}

/// Reads `path` and compiles its contents. Returns `Ok(None)` if `path`
/// does not exist, letting the caller map that to its own exit code rather
/// than bundling "missing file" into [`CompileError`].
pub fn compile_file(path: &std::path::Path) -> std::io::Result<Result<String, CompileError>> {
    let source = std::fs::read_to_string(path)?;
    let file = path.to_string_lossy().to_string();
    Ok(compile_str(&source, &file).map_err(Into::into))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMUM_VALID: &str = r#"
class Main {
  main(): Object {
    (new IO).out_string("hello")
  };
};
"#;

    #[test]
    fn minimum_valid_program_compiles() {
        let asm = compile_str(MINIMUM_VALID, "minimum.cl").expect("should compile");
        assert!(asm.contains(".globl\tmain"));
        assert!(asm.contains("Main.main"));
    }

    #[test]
    fn redefined_class_is_a_definition_error() {
        let source = r#"
class Main { main(): Object { 0 }; };
class Main { main(): Object { 0 }; };
"#;
        let err = compile_str(source, "dup.cl").unwrap_err();
        assert!(matches!(err, CompileError::Definition(_)));
    }

    #[test]
    fn inheritance_cycle_is_a_definition_error() {
        let source = r#"
class Main inherits B { main(): Object { 0 }; };
class B inherits Main { };
"#;
        let err = compile_str(source, "cycle.cl").unwrap_err();
        assert!(matches!(err, CompileError::Definition(_)));
    }
}

//! Error types for the three semantic-analysis passes (spec.md §7), each a
//! hand-written `Display`/`Error` struct carrying a `Loc`, rather than
//! reaching for `thiserror`.

use std::fmt;

use crate::ast::Loc;

#[derive(Debug)]
pub struct DefinitionError {
    pub message: String,
    pub loc: Loc,
}

impl fmt::Display for DefinitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: definition error: {}", self.loc, self.message)
    }
}

impl std::error::Error for DefinitionError {}

#[derive(Debug)]
pub struct ImplementationError {
    pub message: String,
    pub loc: Loc,
}

impl fmt::Display for ImplementationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: implementation error: {}", self.loc, self.message)
    }
}

impl std::error::Error for ImplementationError {}

#[derive(Debug)]
pub struct TypeError {
    pub message: String,
    pub loc: Loc,
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: type error: {}", self.loc, self.message)
    }
}

impl std::error::Error for TypeError {}

/// A pass that accumulates errors instead of failing fast reports this at
/// the end (ClassImplementation, TypeCheck — spec.md §7).
#[derive(Debug)]
pub struct AccumulatedErrors<E> {
    pub errors: Vec<E>,
}

impl<E: fmt::Display> fmt::Display for AccumulatedErrors<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for AccumulatedErrors<E> {}

use std::fmt::Display;
use std::rc::Rc;

/// A position within a COOL source file, attached to every AST node so that
/// diagnostics from any later pass can point back at the program text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Loc {
    pub file: Rc<str>,
    pub line: usize,
    pub col: usize,
}

impl Loc {
    pub fn new(file: Rc<str>, line: usize, col: usize) -> Self {
        Self { file, line, col }
    }

    /// A placeholder location for synthesized nodes (built-in classes and
    /// methods that do not come from source text).
    pub fn synthetic() -> Self {
        Self {
            file: Rc::from("<built-in>"),
            line: 0,
            col: 0,
        }
    }
}

impl Display for Loc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}

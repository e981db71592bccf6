use std::fmt;
use std::rc::Rc;

/// A source location range, used by every token and AST node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Span {
    pub file: Rc<str>,
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl Span {
    pub fn point(file: Rc<str>, line: u32, col: u32) -> Self {
        Self { file, start_line: line, start_col: col, end_line: line, end_col: col }
    }

    /// The smallest span covering both `self` and `other`. Assumes same file.
    pub fn union(&self, other: &Span) -> Span {
        let (start_line, start_col) = if (self.start_line, self.start_col) <= (other.start_line, other.start_col) {
            (self.start_line, self.start_col)
        } else {
            (other.start_line, other.start_col)
        };
        let (end_line, end_col) = if (self.end_line, self.end_col) >= (other.end_line, other.end_col) {
            (self.end_line, self.end_col)
        } else {
            (other.end_line, other.end_col)
        };
        Span { file: self.file.clone(), start_line, start_col, end_line, end_col }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.start_line, self.start_col)
    }
}

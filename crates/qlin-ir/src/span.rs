//! Source positions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 1-based source position (line, column).
///
/// Spans are supplied by the front end; the default span `0:0` means
/// "unknown" and is what hand-built trees carry until a
/// [`ProgramBuilder`](crate::ast::ProgramBuilder) locates them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Line number, starting at 1.
    pub line: u32,
    /// Column number, starting at 1.
    pub column: u32,
}

impl Span {
    /// Create a span at the given line and column.
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// Whether this span carries a real position.
    pub fn is_known(&self) -> bool {
        self.line > 0
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

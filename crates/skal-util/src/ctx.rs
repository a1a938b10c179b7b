//! Source location tracking.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// Location of a token or tree node in the source text.
///
/// Carries the full text of the originating line so diagnostics can quote
/// it without going back to the file. The line text is reference-counted:
/// every token of a line shares one allocation.
///
/// # Examples
///
/// ```
/// use skal_util::SourceCtx;
///
/// let ctx = SourceCtx::new("var x := 1".into(), 3, 5);
/// assert_eq!(ctx.line_no, 3);
/// assert_eq!(ctx.col, 5);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCtx {
    /// Text of the source line, without the trailing newline.
    pub line: Rc<str>,
    /// Line number (1-based).
    pub line_no: u32,
    /// Column number (1-based, in characters).
    pub col: u32,
}

impl SourceCtx {
    /// Create a new source context.
    pub fn new(line: Rc<str>, line_no: u32, col: u32) -> Self {
        Self { line, line_no, col }
    }

    /// A context for tests and synthesized nodes.
    pub fn dummy() -> Self {
        Self {
            line: Rc::from(""),
            line_no: 0,
            col: 0,
        }
    }
}

impl fmt::Display for SourceCtx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<5}{}", self.line_no, self.line)
    }
}

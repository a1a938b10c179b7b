//! Error types shared by every phase of the pipeline.
//!
//! All phases fail through the same [`Error`] type: a kind, a message, and
//! an optional source context. Errors are fatal to the pipeline run; there
//! is no recovery or aggregation.

use std::fmt;

use thiserror::Error;

use crate::SourceCtx;

/// What class of error occurred.
///
/// `Type` is a refinement of `Semantic`: it is raised from the operator
/// and conversion rules rather than from name resolution, and reported
/// under its own label.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Tokenizer or parser rejected the input.
    Syntax,
    /// Analyzer or evaluator rejected the program's meaning.
    Semantic,
    /// The type rules rejected an operation or conversion.
    Type,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Syntax => write!(f, "SyntaxError"),
            ErrorKind::Semantic => write!(f, "SemanticError"),
            ErrorKind::Type => write!(f, "TypeError"),
        }
    }
}

/// A pipeline error with an optional source location.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("{kind}: {message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
    pub ctx: Option<SourceCtx>,
}

impl Error {
    pub fn syntax(message: impl Into<String>, ctx: SourceCtx) -> Self {
        Self {
            kind: ErrorKind::Syntax,
            message: message.into(),
            ctx: Some(ctx),
        }
    }

    pub fn semantic(message: impl Into<String>, ctx: Option<SourceCtx>) -> Self {
        Self {
            kind: ErrorKind::Semantic,
            message: message.into(),
            ctx,
        }
    }

    pub fn type_error(message: impl Into<String>, ctx: Option<SourceCtx>) -> Self {
        Self {
            kind: ErrorKind::Type,
            message: message.into(),
            ctx,
        }
    }

    /// Render the full diagnostic block: location, quoted source line,
    /// caret, and the message.
    ///
    /// ```text
    /// Line 2, column 5:
    /// var s:string := 3
    ///     ^
    /// TypeError: cannot assign int to string
    /// ```
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(ctx) = &self.ctx {
            out.push_str(&format!("Line {}, column {}:\n", ctx.line_no, ctx.col));
            out.push_str(&ctx.line);
            out.push('\n');
            out.push_str(&" ".repeat(ctx.col.saturating_sub(1) as usize));
            out.push_str("^\n");
        }
        out.push_str(&format!("{}: {}", self.kind, self.message));
        out
    }
}

/// Result alias used throughout the pipeline.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_kind_and_message() {
        let err = Error::semantic("variable x not declared", None);
        assert_eq!(format!("{}", err), "SemanticError: variable x not declared");
    }

    #[test]
    fn test_render_places_caret_under_column() {
        let ctx = SourceCtx::new("var s:string := 3".into(), 2, 5);
        let err = Error::type_error("cannot assign int to string", Some(ctx));
        let rendered = err.render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "Line 2, column 5:");
        assert_eq!(lines[1], "var s:string := 3");
        assert_eq!(lines[2], "    ^");
        assert_eq!(lines[3], "TypeError: cannot assign int to string");
    }

    #[test]
    fn test_render_without_context() {
        let err = Error::syntax("statement expected", SourceCtx::dummy());
        assert!(err.render().contains("SyntaxError: statement expected"));

        let bare = Error::semantic("end of input", None);
        assert_eq!(bare.render(), "SemanticError: end of input");
    }
}

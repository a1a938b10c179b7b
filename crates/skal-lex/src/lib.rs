//! skal-lex - Lexical analysis.
//!
//! Transforms line-oriented source text into a stream of [`Token`]s,
//! synthesizing INDENT/DEDENT tokens from leading-whitespace structure.
//! The stream is lazy; [`tokenize`] buffers it through EOF for callers
//! that want the whole sequence up front.

mod cursor;
mod tokenizer;

pub use tokenizer::{tokenize, Tokenizer};

use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use skal_util::{FxHashMap, SourceCtx};

/// The kind tag of a token.
///
/// Fieldless so the parser can match kind sets with plain equality;
/// identifier and literal payloads live in [`TokenPayload`]. The `Display`
/// names are the ones diagnostics and token dumps use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    // Keywords
    Program,
    Var,
    Def,
    Return,
    Read,
    Print,
    If,
    Elif,
    Else,
    While,
    Break,
    Continue,
    Not,
    And,
    Or,
    Xor,
    Pass,

    // Identifiers and literals
    Id,
    Literal,

    // Operators
    Plus,
    Minus,
    Mul,
    IntDiv,
    RealDiv,
    Mod,
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Neq,
    Cast,
    Assign,
    CastAssign,

    // Delimiters
    LParen,
    RParen,
    Colon,
    Arrow,
    Comma,

    // Structural
    Indent,
    Dedent,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Program => "PROGRAM",
            TokenKind::Var => "VAR",
            TokenKind::Def => "DEF",
            TokenKind::Return => "RETURN",
            TokenKind::Read => "READ",
            TokenKind::Print => "PRINT",
            TokenKind::If => "IF",
            TokenKind::Elif => "ELIF",
            TokenKind::Else => "ELSE",
            TokenKind::While => "WHILE",
            TokenKind::Break => "BREAK",
            TokenKind::Continue => "CONTINUE",
            TokenKind::Not => "NOT",
            TokenKind::And => "AND",
            TokenKind::Or => "OR",
            TokenKind::Xor => "XOR",
            TokenKind::Pass => "PASS",
            TokenKind::Id => "ID",
            TokenKind::Literal => "LITERAL",
            TokenKind::Plus => "PLUS",
            TokenKind::Minus => "MINUS",
            TokenKind::Mul => "MUL",
            TokenKind::IntDiv => "INT-DIV",
            TokenKind::RealDiv => "REAL-DIV",
            TokenKind::Mod => "MOD",
            TokenKind::Gt => "GT",
            TokenKind::Gte => "GTE",
            TokenKind::Lt => "LT",
            TokenKind::Lte => "LTE",
            TokenKind::Eq => "EQ",
            TokenKind::Neq => "NEQ",
            TokenKind::Cast => "CAST",
            TokenKind::Assign => "ASSIGN",
            TokenKind::CastAssign => "CAST-ASSIGN",
            TokenKind::LParen => "LPAREN",
            TokenKind::RParen => "RPAREN",
            TokenKind::Colon => "COLON",
            TokenKind::Arrow => "ARROW",
            TokenKind::Comma => "COMMA",
            TokenKind::Indent => "INDENT",
            TokenKind::Dedent => "DEDENT",
            TokenKind::Eof => "EOF",
        };
        write!(f, "{}", name)
    }
}

/// A literal's value, tagged by the literal's type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum LitValue {
    Int(i64),
    Real(f64),
    Str(String),
}

impl fmt::Display for LitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LitValue::Int(v) => write!(f, "{}", v),
            LitValue::Real(v) => write!(f, "{}", format_real(*v)),
            LitValue::Str(v) => write!(f, "'{}'", v),
        }
    }
}

/// Payload of identifier and literal tokens.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TokenPayload {
    None,
    Id(String),
    Literal(LitValue),
}

/// A lexical unit with its kind, payload, and source location.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub payload: TokenPayload,
    pub ctx: SourceCtx,
}

impl Token {
    pub fn new(kind: TokenKind, ctx: SourceCtx) -> Self {
        Self {
            kind,
            payload: TokenPayload::None,
            ctx,
        }
    }

    pub fn ident(name: String, ctx: SourceCtx) -> Self {
        Self {
            kind: TokenKind::Id,
            payload: TokenPayload::Id(name),
            ctx,
        }
    }

    pub fn literal(value: LitValue, ctx: SourceCtx) -> Self {
        Self {
            kind: TokenKind::Literal,
            payload: TokenPayload::Literal(value),
            ctx,
        }
    }

    /// The identifier name carried by an ID token, or "" otherwise.
    pub fn id(&self) -> &str {
        match &self.payload {
            TokenPayload::Id(name) => name,
            _ => "",
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            TokenPayload::None => write!(f, "{}", self.kind),
            TokenPayload::Id(name) => write!(f, "{}('{}')", self.kind, name),
            TokenPayload::Literal(value) => write!(f, "{}({})", self.kind, value),
        }
    }
}

/// The keyword table.
pub fn keyword(word: &str) -> Option<TokenKind> {
    static KEYWORDS: OnceLock<FxHashMap<&'static str, TokenKind>> = OnceLock::new();
    let table = KEYWORDS.get_or_init(|| {
        [
            ("program", TokenKind::Program),
            ("var", TokenKind::Var),
            ("def", TokenKind::Def),
            ("return", TokenKind::Return),
            ("read", TokenKind::Read),
            ("print", TokenKind::Print),
            ("if", TokenKind::If),
            ("elif", TokenKind::Elif),
            ("else", TokenKind::Else),
            ("while", TokenKind::While),
            ("break", TokenKind::Break),
            ("continue", TokenKind::Continue),
            ("not", TokenKind::Not),
            ("and", TokenKind::And),
            ("or", TokenKind::Or),
            ("xor", TokenKind::Xor),
            ("pass", TokenKind::Pass),
        ]
        .into_iter()
        .collect()
    });
    table.get(word).copied()
}

/// Render a real the way the language names real values: integral reals
/// keep a trailing `.0` so the string form is distinguishable from an int.
pub fn format_real(x: f64) -> String {
    if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e16 {
        format!("{:.1}", x)
    } else {
        format!("{}", x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_table() {
        assert_eq!(keyword("program"), Some(TokenKind::Program));
        assert_eq!(keyword("xor"), Some(TokenKind::Xor));
        assert_eq!(keyword("Program"), None);
        assert_eq!(keyword("main"), None);
    }

    #[test]
    fn test_kind_display_names() {
        assert_eq!(TokenKind::IntDiv.to_string(), "INT-DIV");
        assert_eq!(TokenKind::CastAssign.to_string(), "CAST-ASSIGN");
        assert_eq!(TokenKind::Eof.to_string(), "EOF");
    }

    #[test]
    fn test_token_display() {
        let ctx = SourceCtx::dummy();
        assert_eq!(Token::ident("main".into(), ctx.clone()).to_string(), "ID('main')");
        assert_eq!(
            Token::literal(LitValue::Int(7), ctx.clone()).to_string(),
            "LITERAL(7)"
        );
        assert_eq!(
            Token::literal(LitValue::Real(2.5), ctx.clone()).to_string(),
            "LITERAL(2.5)"
        );
        assert_eq!(
            Token::literal(LitValue::Str("hi".into()), ctx).to_string(),
            "LITERAL('hi')"
        );
    }

    #[test]
    fn test_format_real() {
        assert_eq!(format_real(2.0), "2.0");
        assert_eq!(format_real(2.5), "2.5");
        assert_eq!(format_real(-0.5), "-0.5");
        assert_eq!(format_real(120.0), "120.0");
    }
}

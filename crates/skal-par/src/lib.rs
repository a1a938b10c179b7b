//! skal-par - Recursive descent parser.
//!
//! Consumes the token stream with one token of lookahead and produces the
//! tree-shaped program representation. Statement parsing lives in
//! `stmt.rs`, expression parsing in `expr.rs`, the node definitions in
//! `ast.rs`, and the diagnostic tree dump in `pretty.rs`.

pub mod ast;
mod expr;
mod pretty;
mod stmt;

pub use ast::*;
pub use pretty::pretty;

use skal_lex::{Token, TokenKind, TokenPayload};
use skal_util::{Error, Result, SourceCtx};

/// Parse a buffered token sequence into a program.
///
/// The sequence must be terminated by an EOF token, as produced by
/// [`skal_lex::tokenize`].
pub fn parse(tokens: Vec<Token>) -> Result<Program> {
    Parser::new(tokens.into_iter()).program()
}

/// Recursive-descent consumer of a token stream.
pub struct Parser<I: Iterator<Item = Token>> {
    tokens: I,
    current: Token,
    last: Option<Token>,
}

impl<I: Iterator<Item = Token>> Parser<I> {
    pub fn new(mut tokens: I) -> Self {
        let current = tokens
            .next()
            .unwrap_or_else(|| Token::new(TokenKind::Eof, SourceCtx::dummy()));
        Self {
            tokens,
            current,
            last: None,
        }
    }

    /// Syntax error at the most recently consumed token, falling back to
    /// the lookahead token.
    pub(crate) fn error(&self, message: impl Into<String>) -> Error {
        let ctx = self
            .last
            .as_ref()
            .map(|t| t.ctx.clone())
            .unwrap_or_else(|| self.current.ctx.clone());
        Error::syntax(message, ctx)
    }

    /// Consume the current token if its kind is in `kinds`.
    pub(crate) fn try_eat(&mut self, kinds: &[TokenKind]) -> bool {
        if !kinds.contains(&self.current.kind) {
            return false;
        }
        let next = self
            .tokens
            .next()
            .unwrap_or_else(|| Token::new(TokenKind::Eof, self.current.ctx.clone()));
        self.last = Some(std::mem::replace(&mut self.current, next));
        true
    }

    /// Consume the current token or fail with a syntax error naming the
    /// expected kinds.
    pub(crate) fn eat(&mut self, kinds: &[TokenKind]) -> Result<Token> {
        if self.try_eat(kinds) {
            Ok(self.last_token())
        } else {
            let expected: Vec<String> = kinds.iter().map(|k| k.to_string()).collect();
            Err(self.error(format!("expected one of: {}", expected.join(", "))))
        }
    }

    /// The most recently consumed token.
    pub(crate) fn last_token(&self) -> Token {
        self.last
            .clone()
            .unwrap_or_else(|| self.current.clone())
    }

    pub(crate) fn current_kind(&self) -> TokenKind {
        self.current.kind
    }

    /// The literal payload of a just-consumed LITERAL token.
    pub(crate) fn last_literal(&self) -> skal_lex::LitValue {
        match self.last_token().payload {
            TokenPayload::Literal(value) => value,
            _ => skal_lex::LitValue::Int(0),
        }
    }

    /// ```text
    /// program ::= PROGRAM func-signature COLON block EOF
    /// ```
    pub fn program(&mut self) -> Result<Program> {
        self.eat(&[TokenKind::Program])?;
        let func = self.func_signature_and_body()?;
        self.eat(&[TokenKind::Eof])?;
        Ok(Program { func })
    }
}

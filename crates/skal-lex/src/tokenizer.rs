//! The tokenizer state machine.
//!
//! Scans one token per call, synthesizing INDENT/DEDENT from the indent
//! stack at each line start. Blank lines and comment-only lines are
//! consumed before the indent comparison, so they never produce
//! structural tokens. At end of input the indent stack is drained to
//! DEDENTs before EOF is emitted.

use skal_util::{Error, Result};

use crate::cursor::Cursor;
use crate::{keyword, LitValue, Token, TokenKind};

pub struct Tokenizer<'a> {
    cursor: Cursor<'a>,

    /// True until the first real token of the current line is scanned.
    line_start: bool,

    /// Set when non-space whitespace appears in the leading run; reported
    /// at the line's first content.
    bad_indent: bool,

    /// Accepted indent widths, innermost last. Never empty; starts at [0].
    indent_stack: Vec<usize>,

    /// The EOF token has been produced.
    done: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            cursor: Cursor::new(source),
            line_start: true,
            bad_indent: false,
            indent_stack: vec![0],
            done: false,
        }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::syntax(message, self.cursor.ctx())
    }

    /// Compare the current line's indent against the stack.
    ///
    /// Emits at most one structural token per call; the line-start flag
    /// stays set until a real token is scanned, so successive calls drain
    /// multiple DEDENT levels one at a time.
    fn check_indent(&mut self) -> Result<Option<TokenKind>> {
        if self.bad_indent {
            return Err(self.error("invalid indentation (only space characters are allowed)"));
        }

        let indent = if self.cursor.is_eof() { 0 } else { self.cursor.pos() };
        let top = self.indent_stack.last().copied().unwrap_or(0);

        if indent > top {
            self.indent_stack.push(indent);
            return Ok(Some(TokenKind::Indent));
        }

        if indent < top {
            self.indent_stack.pop();
            let top = self.indent_stack.last().copied().unwrap_or(0);
            if indent > top {
                return Err(self.error("unexpected indent"));
            }
            return Ok(Some(TokenKind::Dedent));
        }

        Ok(None)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.cursor.current() {
            if !c.is_whitespace() {
                break;
            }
            if self.line_start && c != ' ' {
                self.bad_indent = true;
            }
            self.cursor.advance();
        }
    }

    fn skip_comment(&mut self) {
        while self.cursor.current().is_some() {
            self.cursor.advance();
        }
    }

    fn read_id(&mut self, ctx: skal_util::SourceCtx) -> Token {
        let mut name = String::new();
        while let Some(c) = self.cursor.current() {
            if !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            name.push(c);
            self.cursor.advance();
        }

        match keyword(&name) {
            Some(kind) => Token::new(kind, ctx),
            None => Token::ident(name, ctx),
        }
    }

    fn read_number(&mut self, ctx: skal_util::SourceCtx) -> Result<Token> {
        let mut digits = String::new();
        while let Some(c) = self.cursor.current() {
            if !c.is_ascii_digit() {
                break;
            }
            digits.push(c);
            self.cursor.advance();
        }

        let value = if self.cursor.current() == Some('.') {
            digits.push('.');
            self.cursor.advance();
            while let Some(c) = self.cursor.current() {
                if !c.is_ascii_digit() {
                    break;
                }
                digits.push(c);
                self.cursor.advance();
            }
            LitValue::Real(
                digits
                    .parse()
                    .map_err(|_| self.error("invalid number literal"))?,
            )
        } else {
            LitValue::Int(
                digits
                    .parse()
                    .map_err(|_| self.error("invalid number literal"))?,
            )
        };

        if matches!(self.cursor.current(), Some(c) if c.is_ascii_alphabetic()) {
            return Err(self.error("invalid number literal"));
        }

        Ok(Token::literal(value, ctx))
    }

    fn read_string(&mut self, ctx: skal_util::SourceCtx) -> Result<Token> {
        let mut raw = String::new();
        self.cursor.advance(); // opening quote
        loop {
            match self.cursor.current() {
                None => return Err(self.error("string literal not closed")),
                Some('\'') => break,
                Some('\\') if self.cursor.has_next() => {
                    raw.push('\\');
                    self.cursor.advance();
                    if let Some(c) = self.cursor.current() {
                        raw.push(c);
                    }
                    self.cursor.advance();
                }
                Some(c) => {
                    raw.push(c);
                    self.cursor.advance();
                }
            }
        }
        self.cursor.advance(); // closing quote

        Ok(Token::literal(LitValue::Str(decode_escapes(&raw)), ctx))
    }

    /// Scan the next token.
    ///
    /// Keeps returning EOF once the input is exhausted and the indent
    /// stack has drained.
    pub fn next_token(&mut self) -> Result<Token> {
        // Consume line boundaries, whitespace, and comments. Comment-only
        // lines die here, before the indent comparison.
        while !self.cursor.is_eof() {
            match self.cursor.current() {
                None => {
                    self.cursor.next_line();
                    self.line_start = true;
                    self.bad_indent = false;
                }
                Some(c) if c.is_whitespace() => self.skip_whitespace(),
                Some('#') => self.skip_comment(),
                _ => break,
            }
        }

        if self.line_start {
            if let Some(kind) = self.check_indent()? {
                return Ok(Token::new(kind, self.cursor.ctx()));
            }
        }

        if self.cursor.is_eof() {
            return Ok(Token::new(TokenKind::Eof, self.cursor.ctx()));
        }

        self.line_start = false;
        let ctx = self.cursor.ctx();
        let Some(c) = self.cursor.current() else {
            return Ok(Token::new(TokenKind::Eof, ctx));
        };

        if c.is_ascii_alphabetic() || c == '_' {
            return Ok(self.read_id(ctx));
        }
        if c.is_ascii_digit() {
            return self.read_number(ctx);
        }
        if c == '\'' {
            return self.read_string(ctx);
        }

        if let Some(next) = self.cursor.peek_next() {
            let kind = match (c, next) {
                ('/', '/') => Some(TokenKind::IntDiv),
                (':', '=') => Some(TokenKind::Assign),
                ('~', '=') => Some(TokenKind::CastAssign),
                ('-', '>') => Some(TokenKind::Arrow),
                ('>', '=') => Some(TokenKind::Gte),
                ('<', '=') => Some(TokenKind::Lte),
                ('!', '=') => Some(TokenKind::Neq),
                _ => None,
            };
            if let Some(kind) = kind {
                self.cursor.advance();
                self.cursor.advance();
                return Ok(Token::new(kind, ctx));
            }
        }

        let kind = match c {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Mul,
            '/' => TokenKind::RealDiv,
            '%' => TokenKind::Mod,
            '>' => TokenKind::Gt,
            '<' => TokenKind::Lt,
            '=' => TokenKind::Eq,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '~' => TokenKind::Cast,
            ':' => TokenKind::Colon,
            ',' => TokenKind::Comma,
            _ => return Err(self.error(format!("invalid character: {}", c))),
        };
        self.cursor.advance();
        Ok(Token::new(kind, ctx))
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_token() {
            Ok(token) => {
                if token.kind == TokenKind::Eof {
                    self.done = true;
                }
                Some(Ok(token))
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// Tokenize the whole input, buffering through the final EOF token.
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    let mut tokenizer = Tokenizer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = tokenizer.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            break;
        }
    }
    Ok(tokens)
}

/// Decode backslash escapes collected by the string scanner. Unknown
/// escapes keep their backslash.
fn decode_escapes(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

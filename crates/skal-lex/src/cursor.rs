//! Line-oriented cursor over source text.
//!
//! The tokenizer works a line at a time because block structure is a
//! property of lines. The cursor owns traversal state: the current line's
//! text (shared for source contexts), the character position within it,
//! and the line counter.

use std::rc::Rc;

use skal_util::SourceCtx;

pub(crate) struct Cursor<'a> {
    lines: std::str::Lines<'a>,
    /// Current line text, shared with every context created on this line.
    line: Rc<str>,
    /// Characters of the current line.
    chars: Vec<char>,
    /// Position within `chars`. While scanning leading whitespace this is
    /// also the indent width.
    pos: usize,
    /// Current character, `None` at end of line (and before the first line).
    current: Option<char>,
    line_no: u32,
    eof: bool,
}

impl<'a> Cursor<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            lines: source.lines(),
            line: Rc::from(""),
            chars: Vec::new(),
            pos: 0,
            current: None,
            line_no: 0,
            eof: false,
        }
    }

    pub fn current(&self) -> Option<char> {
        self.current
    }

    /// The character after the current one, on the same line.
    pub fn peek_next(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    pub fn has_next(&self) -> bool {
        self.pos + 1 < self.chars.len()
    }

    /// Step to the next character, or to end-of-line state.
    pub fn advance(&mut self) {
        if self.has_next() {
            self.pos += 1;
            self.current = Some(self.chars[self.pos]);
        } else {
            self.current = None;
        }
    }

    /// Load the next source line, or enter end-of-input state.
    pub fn next_line(&mut self) {
        match self.lines.next() {
            Some(text) => {
                self.line = Rc::from(text);
                self.chars = text.chars().collect();
                self.line_no += 1;
                self.pos = 0;
                self.current = self.chars.first().copied();
            }
            None => {
                self.eof = true;
            }
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Context at the current position.
    pub fn ctx(&self) -> SourceCtx {
        SourceCtx::new(self.line.clone(), self.line_no, self.pos as u32 + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_within_line() {
        let mut cursor = Cursor::new("ab\ncd");
        cursor.next_line();
        assert_eq!(cursor.current(), Some('a'));
        assert_eq!(cursor.peek_next(), Some('b'));
        cursor.advance();
        assert_eq!(cursor.current(), Some('b'));
        cursor.advance();
        assert_eq!(cursor.current(), None);
    }

    #[test]
    fn test_line_transition_and_eof() {
        let mut cursor = Cursor::new("a\n\nb");
        cursor.next_line();
        assert_eq!(cursor.line_no, 1);
        cursor.next_line();
        assert_eq!(cursor.current(), None); // blank line
        cursor.next_line();
        assert_eq!(cursor.current(), Some('b'));
        assert_eq!(cursor.line_no, 3);
        cursor.next_line();
        assert!(cursor.is_eof());
    }

    #[test]
    fn test_ctx_is_one_based() {
        let mut cursor = Cursor::new("xy");
        cursor.next_line();
        cursor.advance();
        let ctx = cursor.ctx();
        assert_eq!(ctx.line_no, 1);
        assert_eq!(ctx.col, 2);
        assert_eq!(&*ctx.line, "xy");
    }
}

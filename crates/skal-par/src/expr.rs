//! Expression parsing.
//!
//! A fixed four-level grammar, all binary operators left-associative:
//!
//! | Level | Operators |
//! |-------|-----------|
//! | 1 (lowest) | `and`, `or`, `xor` |
//! | 2 | `<`, `<=`, `>`, `>=`, `=`, `!=` (with optional leading `not`) |
//! | 3 | `+`, `-` |
//! | 4 | `*`, `//`, `/`, `%` |
//!
//! Unary `+`, `-`, and `~` bind tighter than any binary operator. A
//! leading `not` applies to the whole relational run that follows it.

use skal_lex::{Token, TokenKind};
use skal_util::Result;

use crate::ast::*;
use crate::Parser;

impl<I: Iterator<Item = Token>> Parser<I> {
    /// Left-associative run of binary operators from one kind set, with
    /// operands parsed by the next-tighter level.
    fn bin_op_expr(
        &mut self,
        ops: &[TokenKind],
        operand: fn(&mut Self) -> Result<Expr>,
    ) -> Result<Expr> {
        let mut node = operand(self)?;
        while self.try_eat(ops) {
            let op = self.last_token();
            let right = operand(self)?;
            node = Expr::Binary(BinaryOp {
                op: op.kind,
                left: Box::new(node),
                right: Box::new(right),
                ctx: op.ctx,
            });
        }
        Ok(node)
    }

    /// ```text
    /// expr ::= rel-expr {(AND | OR | XOR) rel-expr}
    /// ```
    pub(crate) fn expr(&mut self) -> Result<Expr> {
        self.bin_op_expr(
            &[TokenKind::And, TokenKind::Or, TokenKind::Xor],
            Self::rel_expr,
        )
    }

    /// ```text
    /// rel-expr ::= [NOT] arith-expr {(LT | LTE | GT | GTE | EQ | NEQ) arith-expr}
    /// ```
    fn rel_expr(&mut self) -> Result<Expr> {
        const REL_OPS: &[TokenKind] = &[
            TokenKind::Lt,
            TokenKind::Lte,
            TokenKind::Gt,
            TokenKind::Gte,
            TokenKind::Eq,
            TokenKind::Neq,
        ];

        if self.try_eat(&[TokenKind::Not]) {
            let token = self.last_token();
            let inner = self.bin_op_expr(REL_OPS, Self::arith_expr)?;
            return Ok(Expr::Unary(UnaryOp {
                op: TokenKind::Not,
                expr: Box::new(inner),
                ctx: token.ctx,
            }));
        }
        self.bin_op_expr(REL_OPS, Self::arith_expr)
    }

    /// ```text
    /// arith-expr ::= term {(PLUS | MINUS) term}
    /// ```
    fn arith_expr(&mut self) -> Result<Expr> {
        self.bin_op_expr(&[TokenKind::Plus, TokenKind::Minus], Self::term)
    }

    /// ```text
    /// term ::= factor {(MUL | INT-DIV | REAL-DIV | MOD) factor}
    /// ```
    fn term(&mut self) -> Result<Expr> {
        self.bin_op_expr(
            &[
                TokenKind::Mul,
                TokenKind::IntDiv,
                TokenKind::RealDiv,
                TokenKind::Mod,
            ],
            Self::factor,
        )
    }

    /// ```text
    /// factor ::= (PLUS | MINUS | CAST) factor
    ///          | LPAREN expr RPAREN
    ///          | literal | variable | func-call
    /// ```
    fn factor(&mut self) -> Result<Expr> {
        if self.try_eat(&[TokenKind::Plus, TokenKind::Minus, TokenKind::Cast]) {
            let token = self.last_token();
            let inner = self.factor()?;
            return Ok(Expr::Unary(UnaryOp {
                op: token.kind,
                expr: Box::new(inner),
                ctx: token.ctx,
            }));
        }

        if self.try_eat(&[TokenKind::LParen]) {
            let node = self.expr()?;
            self.eat(&[TokenKind::RParen])?;
            return Ok(node);
        }

        if self.try_eat(&[TokenKind::Literal]) {
            let token = self.last_token();
            return Ok(Expr::Literal(Literal {
                value: self.last_literal(),
                ctx: token.ctx,
            }));
        }

        let id = self.eat(&[TokenKind::Id])?;
        if self.current_kind() == TokenKind::LParen {
            Ok(Expr::Call(self.func_call(id)?))
        } else {
            Ok(Expr::Var(Var {
                name: id.id().to_string(),
                ctx: id.ctx,
            }))
        }
    }
}

//! AST node definitions.
//!
//! Tagged-variant tree nodes, each carrying the source context of its
//! originating token for diagnostics. Operator nodes store the operator's
//! [`TokenKind`] directly so the type rules and diagnostics name operators
//! the same way the token stream does.
//!
//! The whole tree is serde-serializable: the driver can persist an
//! analyzed tree and reload it in place of the first three phases.

use serde::{Deserialize, Serialize};
use skal_lex::{LitValue, TokenKind};
use skal_util::SourceCtx;

/// Root of a parsed source file: the `program` definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub func: FuncDef,
}

/// A function definition (`def` or the program signature).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FuncDef {
    pub name: String,
    pub ret_type: Option<TypeNode>,
    pub params: Vec<VarDecl>,
    pub body: Block,
    pub ctx: SourceCtx,
}

/// An indentation-delimited statement sequence.
///
/// Nested function definitions are kept apart from statements: they are
/// installed into the scope before any statement of the block runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub functions: Vec<FuncDef>,
    pub statements: Vec<Stmt>,
    pub ctx: SourceCtx,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    VarDecl(VarDecl),
    Assign(Assign),
    Call(FuncCall),
    If(IfStmt),
    While(WhileStmt),
    Special(SpecialStmt),
    Block(Block),
}

impl Stmt {
    pub fn ctx(&self) -> &SourceCtx {
        match self {
            Stmt::VarDecl(n) => &n.ctx,
            Stmt::Assign(n) => &n.ctx,
            Stmt::Call(n) => &n.ctx,
            Stmt::If(n) => &n.ctx,
            Stmt::While(n) => &n.ctx,
            Stmt::Special(n) => &n.ctx,
            Stmt::Block(n) => &n.ctx,
        }
    }
}

/// A variable declaration, with an optional type annotation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    pub var: Var,
    pub ty: Option<TypeNode>,
    pub ctx: SourceCtx,
}

/// A variable reference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Var {
    pub name: String,
    pub ctx: SourceCtx,
}

/// A type annotation, unresolved until analysis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypeNode {
    pub name: String,
    pub ctx: SourceCtx,
}

/// `var := expr` or `var ~= expr`. The operator kind is ASSIGN or
/// CAST-ASSIGN; the left side is always a plain variable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Assign {
    pub var: Var,
    pub op: TokenKind,
    pub expr: Expr,
    pub ctx: SourceCtx,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FuncCall {
    pub name: String,
    pub args: Vec<Expr>,
    pub ctx: SourceCtx,
}

/// One link of an `if`/`elif`/`else` chain. The condition is absent on an
/// `else` tail; `next` points at the following clause.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IfStmt {
    pub cond: Option<Expr>,
    pub body: Block,
    pub next: Option<Box<IfStmt>>,
    pub ctx: SourceCtx,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WhileStmt {
    pub cond: Expr,
    pub body: Block,
    pub ctx: SourceCtx,
}

/// A built-in statement: RETURN, BREAK, CONTINUE, PRINT, or READ, with its
/// argument expressions (READ arguments are always variables).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpecialStmt {
    pub kind: TokenKind,
    pub args: Vec<Expr>,
    pub ctx: SourceCtx,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal(Literal),
    Var(Var),
    Unary(UnaryOp),
    Binary(BinaryOp),
    Call(FuncCall),
}

impl Expr {
    pub fn ctx(&self) -> &SourceCtx {
        match self {
            Expr::Literal(n) => &n.ctx,
            Expr::Var(n) => &n.ctx,
            Expr::Unary(n) => &n.ctx,
            Expr::Binary(n) => &n.ctx,
            Expr::Call(n) => &n.ctx,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Literal {
    pub value: LitValue,
    pub ctx: SourceCtx,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnaryOp {
    pub op: TokenKind,
    pub expr: Box<Expr>,
    pub ctx: SourceCtx,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BinaryOp {
    pub op: TokenKind,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
    pub ctx: SourceCtx,
}

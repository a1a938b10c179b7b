//! Statement, block, and function parsing.

use skal_lex::{Token, TokenKind};
use skal_util::Result;

use crate::ast::*;
use crate::Parser;

/// What a single statement parse produced: zero or more statements (a
/// `var` line yields declaration/assignment pairs, `pass` yields none),
/// or a nested function definition routed to the block's function list.
pub(crate) enum Parsed {
    Stmts(Vec<Stmt>),
    Func(FuncDef),
}

impl<I: Iterator<Item = Token>> Parser<I> {
    /// ```text
    /// block ::= INDENT {statement} DEDENT
    /// ```
    pub(crate) fn block(&mut self) -> Result<Block> {
        let indent = self.eat(&[TokenKind::Indent])?;
        let mut block = Block {
            functions: Vec::new(),
            statements: Vec::new(),
            ctx: indent.ctx,
        };
        while !self.try_eat(&[TokenKind::Dedent]) {
            match self.statement()? {
                Parsed::Stmts(stmts) => block.statements.extend(stmts),
                Parsed::Func(func) => block.functions.push(func),
            }
        }
        Ok(block)
    }

    /// ```text
    /// statement ::= block | var-stmt | assignment | func-def | func-call
    ///             | print-stmt | read-stmt | if-stmt | while-stmt
    ///             | RETURN (PASS | expr) | BREAK | CONTINUE | PASS
    /// ```
    fn statement(&mut self) -> Result<Parsed> {
        match self.current_kind() {
            TokenKind::Indent => Ok(Parsed::Stmts(vec![Stmt::Block(self.block()?)])),
            TokenKind::Var => self.var_statement(),
            TokenKind::Def => Ok(Parsed::Func(self.func_definition()?)),
            TokenKind::Id => {
                let id = self.eat(&[TokenKind::Id])?;
                if self.current_kind() == TokenKind::LParen {
                    Ok(Parsed::Stmts(vec![Stmt::Call(self.func_call(id)?)]))
                } else {
                    let var = Var {
                        name: id.id().to_string(),
                        ctx: id.ctx,
                    };
                    Ok(Parsed::Stmts(vec![Stmt::Assign(self.assignment(var)?)]))
                }
            }
            TokenKind::Print => self.print_statement(),
            TokenKind::Read => self.read_statement(),
            TokenKind::If => Ok(Parsed::Stmts(vec![self.if_statement()?])),
            TokenKind::While => Ok(Parsed::Stmts(vec![self.while_statement()?])),
            TokenKind::Return => {
                let token = self.eat(&[TokenKind::Return])?;
                let mut stmt = SpecialStmt {
                    kind: TokenKind::Return,
                    args: Vec::new(),
                    ctx: token.ctx,
                };
                if !self.try_eat(&[TokenKind::Pass]) {
                    stmt.args.push(self.expr()?);
                }
                Ok(Parsed::Stmts(vec![Stmt::Special(stmt)]))
            }
            TokenKind::Break | TokenKind::Continue => {
                let token = self.eat(&[TokenKind::Break, TokenKind::Continue])?;
                Ok(Parsed::Stmts(vec![Stmt::Special(SpecialStmt {
                    kind: token.kind,
                    args: Vec::new(),
                    ctx: token.ctx,
                })]))
            }
            TokenKind::Pass => {
                self.try_eat(&[TokenKind::Pass]);
                Ok(Parsed::Stmts(Vec::new()))
            }
            _ => Err(self.error("statement expected")),
        }
    }

    /// ```text
    /// var-stmt ::= VAR decl-or-defn {COMMA decl-or-defn}
    ///              [COLON type [(ASSIGN | CAST-ASSIGN) expr]]
    /// ```
    ///
    /// The type annotation applies to every declaration of the line. An
    /// initializer after the type (`var s: string := 3`) binds to the
    /// last declared variable.
    fn var_statement(&mut self) -> Result<Parsed> {
        self.eat(&[TokenKind::Var])?;
        let mut stmts = self.var_decl_or_defn()?;
        while self.try_eat(&[TokenKind::Comma]) {
            stmts.extend(self.var_decl_or_defn()?);
        }

        if self.try_eat(&[TokenKind::Colon]) {
            let ty = self.type_node()?;
            for stmt in &mut stmts {
                if let Stmt::VarDecl(decl) = stmt {
                    decl.ty = Some(ty.clone());
                }
            }

            if self.try_eat(&[TokenKind::Assign, TokenKind::CastAssign]) {
                let op = self.last_token();
                let expr = self.expr()?;
                let target = stmts.iter().rev().find_map(|stmt| match stmt {
                    Stmt::VarDecl(decl) => Some(decl.var.clone()),
                    _ => None,
                });
                if let Some(var) = target {
                    stmts.push(Stmt::Assign(Assign {
                        var,
                        op: op.kind,
                        expr,
                        ctx: op.ctx,
                    }));
                }
            }
        }

        Ok(Parsed::Stmts(stmts))
    }

    /// ```text
    /// decl-or-defn ::= ID [(ASSIGN | CAST-ASSIGN) expr]
    /// ```
    ///
    /// Yields the declaration, plus the initializing assignment if present.
    fn var_decl_or_defn(&mut self) -> Result<Vec<Stmt>> {
        let id = self.eat(&[TokenKind::Id])?;
        let var = Var {
            name: id.id().to_string(),
            ctx: id.ctx,
        };
        let mut result = vec![Stmt::VarDecl(VarDecl {
            ctx: var.ctx.clone(),
            var: var.clone(),
            ty: None,
        })];

        if self.try_eat(&[TokenKind::Assign, TokenKind::CastAssign]) {
            let op = self.last_token();
            let expr = self.expr()?;
            result.push(Stmt::Assign(Assign {
                var,
                op: op.kind,
                expr,
                ctx: op.ctx,
            }));
        }

        Ok(result)
    }

    /// ```text
    /// assignment ::= variable (ASSIGN | CAST-ASSIGN) expr
    /// ```
    fn assignment(&mut self, var: Var) -> Result<Assign> {
        let op = self.eat(&[TokenKind::Assign, TokenKind::CastAssign])?;
        let expr = self.expr()?;
        Ok(Assign {
            var,
            op: op.kind,
            expr,
            ctx: op.ctx,
        })
    }

    /// ```text
    /// if-stmt ::= IF expr COLON block {ELIF expr COLON block} [ELSE COLON block]
    /// ```
    fn if_statement(&mut self) -> Result<Stmt> {
        let token = self.eat(&[TokenKind::If])?;
        let cond = self.expr()?;
        self.eat(&[TokenKind::Colon])?;
        let body = self.block()?;

        let mut tail = Vec::new();
        while self.try_eat(&[TokenKind::Elif]) {
            let ctx = self.last_token().ctx;
            let cond = self.expr()?;
            self.eat(&[TokenKind::Colon])?;
            tail.push((ctx, Some(cond), self.block()?));
        }
        if self.try_eat(&[TokenKind::Else]) {
            let ctx = self.last_token().ctx;
            self.eat(&[TokenKind::Colon])?;
            tail.push((ctx, None, self.block()?));
        }

        let mut next = None;
        while let Some((ctx, cond, body)) = tail.pop() {
            next = Some(Box::new(IfStmt {
                cond,
                body,
                next,
                ctx,
            }));
        }
        Ok(Stmt::If(IfStmt {
            cond: Some(cond),
            body,
            next,
            ctx: token.ctx,
        }))
    }

    /// ```text
    /// while-stmt ::= WHILE expr COLON block
    /// ```
    fn while_statement(&mut self) -> Result<Stmt> {
        let token = self.eat(&[TokenKind::While])?;
        let cond = self.expr()?;
        self.eat(&[TokenKind::Colon])?;
        let body = self.block()?;
        Ok(Stmt::While(WhileStmt {
            cond,
            body,
            ctx: token.ctx,
        }))
    }

    /// ```text
    /// print-stmt ::= PRINT expr {COMMA expr}
    /// ```
    fn print_statement(&mut self) -> Result<Parsed> {
        let token = self.eat(&[TokenKind::Print])?;
        let mut stmt = SpecialStmt {
            kind: TokenKind::Print,
            args: vec![self.expr()?],
            ctx: token.ctx,
        };
        while self.try_eat(&[TokenKind::Comma]) {
            stmt.args.push(self.expr()?);
        }
        Ok(Parsed::Stmts(vec![Stmt::Special(stmt)]))
    }

    /// ```text
    /// read-stmt ::= READ variable {COMMA variable}
    /// ```
    fn read_statement(&mut self) -> Result<Parsed> {
        let token = self.eat(&[TokenKind::Read])?;
        let mut stmt = SpecialStmt {
            kind: TokenKind::Read,
            args: vec![self.read_target()?],
            ctx: token.ctx,
        };
        while self.try_eat(&[TokenKind::Comma]) {
            stmt.args.push(self.read_target()?);
        }
        Ok(Parsed::Stmts(vec![Stmt::Special(stmt)]))
    }

    fn read_target(&mut self) -> Result<Expr> {
        let id = self.eat(&[TokenKind::Id])?;
        Ok(Expr::Var(Var {
            name: id.id().to_string(),
            ctx: id.ctx,
        }))
    }

    /// ```text
    /// func-def ::= DEF func-signature COLON block
    /// ```
    fn func_definition(&mut self) -> Result<FuncDef> {
        self.eat(&[TokenKind::Def])?;
        self.func_signature_and_body()
    }

    /// ```text
    /// func-signature ::= ID LPAREN [formal-parameters] RPAREN [ARROW type]
    /// ```
    ///
    /// Shared by `program` and `def`; parses the signature, the colon, and
    /// the body block.
    pub(crate) fn func_signature_and_body(&mut self) -> Result<FuncDef> {
        let name = self.eat(&[TokenKind::Id])?;
        self.eat(&[TokenKind::LParen])?;
        let params = self.formal_parameters()?;
        self.eat(&[TokenKind::RParen])?;

        let ret_type = if self.try_eat(&[TokenKind::Arrow]) {
            Some(self.type_node()?)
        } else {
            None
        };

        self.eat(&[TokenKind::Colon])?;
        let body = self.block()?;

        Ok(FuncDef {
            name: name.id().to_string(),
            ret_type,
            params,
            body,
            ctx: name.ctx,
        })
    }

    /// ```text
    /// formal-parameters ::= param-list {COMMA param-list}
    /// ```
    fn formal_parameters(&mut self) -> Result<Vec<VarDecl>> {
        if self.current_kind() == TokenKind::RParen {
            return Ok(Vec::new());
        }

        let mut params = self.param_list()?;
        while self.try_eat(&[TokenKind::Comma]) {
            params.extend(self.param_list()?);
        }
        Ok(params)
    }

    /// ```text
    /// param-list ::= ID {COMMA ID} [COLON type]
    /// ```
    ///
    /// The type tail applies to every preceding untyped name of the group.
    fn param_list(&mut self) -> Result<Vec<VarDecl>> {
        let mut params = vec![self.param()?];
        while self.try_eat(&[TokenKind::Comma]) {
            params.push(self.param()?);
        }

        if self.try_eat(&[TokenKind::Colon]) {
            let ty = self.type_node()?;
            for param in &mut params {
                param.ty = Some(ty.clone());
            }
        }

        Ok(params)
    }

    fn param(&mut self) -> Result<VarDecl> {
        let id = self.eat(&[TokenKind::Id])?;
        let var = Var {
            name: id.id().to_string(),
            ctx: id.ctx,
        };
        Ok(VarDecl {
            ctx: var.ctx.clone(),
            var,
            ty: None,
        })
    }

    /// ```text
    /// func-call ::= ID LPAREN [expr {COMMA expr}] RPAREN
    /// ```
    ///
    /// A trailing comma before the closing parenthesis is accepted.
    pub(crate) fn func_call(&mut self, name: Token) -> Result<FuncCall> {
        self.eat(&[TokenKind::LParen])?;
        let mut args = Vec::new();
        while !self.try_eat(&[TokenKind::RParen]) {
            args.push(self.expr()?);
            if self.try_eat(&[TokenKind::RParen]) {
                break;
            }
            self.eat(&[TokenKind::Comma])?;
        }
        Ok(FuncCall {
            name: name.id().to_string(),
            args,
            ctx: name.ctx,
        })
    }

    pub(crate) fn type_node(&mut self) -> Result<TypeNode> {
        let id = self.eat(&[TokenKind::Id])?;
        Ok(TypeNode {
            name: id.id().to_string(),
            ctx: id.ctx,
        })
    }
}

//! The static analyzer.
//!
//! Walks the tree with a fresh scope tree, installs symbols, and checks
//! every reference, arity, type, and control-flow context before anything
//! runs. The first violation aborts the walk; there is no recovery.
//!
//! Blocks are analyzed in two passes: all nested function symbols are
//! installed first (so functions in one block may call each other
//! regardless of order), then their bodies, then the statements.

use skal_lex::{LitValue, TokenKind};
use skal_par::{
    Assign, Block, Expr, FuncCall, FuncDef, IfStmt, Program, SpecialStmt, Stmt, TypeNode, Var,
    VarDecl, WhileStmt,
};
use skal_util::{Error, Result};

use crate::ops;
use crate::scope::{FuncSymbol, ScopeTree, Symbol, VarSymbol};
use crate::types::TypeId;

/// Analyze a program against a fresh global scope.
pub fn analyze(program: &Program) -> Result<()> {
    Analyzer::new().program(program)
}

pub struct Analyzer<'a> {
    scopes: ScopeTree<'a>,
}

impl<'a> Analyzer<'a> {
    pub fn new() -> Self {
        Self {
            scopes: ScopeTree::new(),
        }
    }

    pub fn program(&mut self, program: &'a Program) -> Result<()> {
        self.declare_func(&program.func, true)?;
        self.func_body(&program.func)
    }

    /// Install a function symbol in the current scope. The program's
    /// return type defaults to int and must be int; an ordinary
    /// function's defaults to any.
    fn declare_func(&mut self, node: &'a FuncDef, is_program: bool) -> Result<()> {
        if self.scopes.lookup_local(&node.name).is_some() {
            return Err(Error::semantic(
                format!("duplicate identifier {}", node.name),
                Some(node.ctx.clone()),
            ));
        }

        let ret_type = if is_program {
            let ret = self.resolve_type(node.ret_type.as_ref(), TypeId::Int)?;
            if ret != TypeId::Int {
                return Err(Error::semantic(
                    "invalid return type for program (must be int)",
                    Some(node.ctx.clone()),
                ));
            }
            ret
        } else {
            self.resolve_type(node.ret_type.as_ref(), TypeId::Any)?
        };

        self.scopes.insert(Symbol::Func(FuncSymbol {
            name: node.name.clone(),
            ret_type,
            params: &node.params,
            body: &node.body,
            ctx: node.ctx.clone(),
        }));
        Ok(())
    }

    /// Analyze a function's parameters and body in a child scope carrying
    /// the function's expected return type.
    fn func_body(&mut self, node: &'a FuncDef) -> Result<()> {
        let ret_type = match self.scopes.lookup(&node.name) {
            Some(Symbol::Func(func)) => func.ret_type,
            _ => {
                return Err(Error::semantic(
                    format!("function {} not declared", node.name),
                    Some(node.ctx.clone()),
                ))
            }
        };

        self.scopes.enter_func(ret_type);
        let result = (|| {
            for param in &node.params {
                self.var_decl(param)?;
            }
            self.block_inner(&node.body)
        })();
        self.scopes.leave();
        result
    }

    fn block(&mut self, node: &'a Block) -> Result<()> {
        self.scopes.enter();
        let result = self.block_inner(node);
        self.scopes.leave();
        result
    }

    /// Analyze a block in the current scope: function symbols, then
    /// function bodies, then statements.
    fn block_inner(&mut self, node: &'a Block) -> Result<()> {
        for func in &node.functions {
            self.declare_func(func, false)?;
        }
        for func in &node.functions {
            self.func_body(func)?;
        }
        for stmt in &node.statements {
            self.stmt(stmt)?;
        }
        Ok(())
    }

    fn stmt(&mut self, stmt: &'a Stmt) -> Result<()> {
        match stmt {
            Stmt::VarDecl(decl) => self.var_decl(decl),
            Stmt::Assign(assign) => self.assignment(assign).map(|_| ()),
            Stmt::Call(call) => self.func_call(call).map(|_| ()),
            Stmt::If(chain) => self.if_stmt(chain),
            Stmt::While(node) => self.while_stmt(node),
            Stmt::Special(node) => self.special(node),
            Stmt::Block(block) => self.block(block),
        }
    }

    /// Resolve an optional type annotation, or fall back to `default`.
    fn resolve_type(&mut self, node: Option<&'a TypeNode>, default: TypeId) -> Result<TypeId> {
        match node {
            Some(ty) => self.type_node(ty),
            None => Ok(default),
        }
    }

    fn type_node(&mut self, node: &TypeNode) -> Result<TypeId> {
        match self.scopes.lookup(&node.name) {
            Some(Symbol::Type(ty)) => Ok(*ty),
            _ => Err(Error::semantic(
                format!("unknown type {}", node.name),
                Some(node.ctx.clone()),
            )),
        }
    }

    fn var_decl(&mut self, node: &'a VarDecl) -> Result<()> {
        let ty = self.resolve_type(node.ty.as_ref(), TypeId::Any)?;

        if ty == TypeId::Void {
            let ctx = node
                .ty
                .as_ref()
                .map(|t| t.ctx.clone())
                .unwrap_or_else(|| node.ctx.clone());
            return Err(Error::semantic("can not declare variable as void", Some(ctx)));
        }

        if self.scopes.lookup_local(&node.var.name).is_some() {
            return Err(Error::semantic(
                format!("duplicate identifier {}", node.var.name),
                Some(node.ctx.clone()),
            ));
        }

        self.scopes
            .insert(Symbol::Var(VarSymbol::new(node.var.name.clone(), ty)));
        Ok(())
    }

    fn assignment(&mut self, node: &'a Assign) -> Result<TypeId> {
        let var_ty = self.var(&node.var)?;
        let expr_ty = self.expr(&node.expr)?;
        // The expression's runtime real type is unknowable statically;
        // `any` stands in for it.
        ops::assignment_type(node.op, var_ty, expr_ty, TypeId::Any, Some(&node.ctx))
    }

    fn var(&mut self, node: &Var) -> Result<TypeId> {
        match self.scopes.lookup(&node.name) {
            Some(Symbol::Var(var)) => Ok(var.decl_type),
            _ => Err(Error::semantic(
                format!("variable {} not declared", node.name),
                Some(node.ctx.clone()),
            )),
        }
    }

    /// The static type of an expression.
    pub fn expr(&mut self, node: &'a Expr) -> Result<TypeId> {
        match node {
            Expr::Literal(lit) => Ok(match lit.value {
                LitValue::Int(_) => TypeId::Int,
                LitValue::Real(_) => TypeId::Real,
                LitValue::Str(_) => TypeId::Str,
            }),
            Expr::Var(var) => self.var(var),
            Expr::Unary(unary) => {
                let ty = self.expr(&unary.expr)?;
                ops::unary_op_type(unary.op, ty, Some(&unary.ctx))
            }
            Expr::Binary(binary) => {
                let left = self.expr(&binary.left)?;
                let right = self.expr(&binary.right)?;
                ops::binary_op_type(binary.op, left, right, Some(&binary.ctx))
            }
            Expr::Call(call) => self.func_call(call),
        }
    }

    fn func_call(&mut self, node: &'a FuncCall) -> Result<TypeId> {
        let func = match self.scopes.lookup(&node.name) {
            Some(Symbol::Func(func)) => func.clone(),
            _ => {
                return Err(Error::semantic(
                    format!("function {} not declared", node.name),
                    Some(node.ctx.clone()),
                ))
            }
        };

        if func.params.len() != node.args.len() {
            return Err(Error::semantic(
                format!(
                    "function {} requires {} argument(s), but {} given",
                    func.name,
                    func.params.len(),
                    node.args.len()
                ),
                Some(node.ctx.clone()),
            ));
        }

        for (param, arg) in func.params.iter().zip(&node.args) {
            let arg_ty = self.expr(arg)?;
            let param_ty = self.resolve_type(param.ty.as_ref(), TypeId::Any)?;
            ops::assignment_type(TokenKind::Assign, param_ty, arg_ty, TypeId::Any, Some(arg.ctx()))?;
        }

        Ok(func.ret_type)
    }

    fn if_stmt(&mut self, node: &'a IfStmt) -> Result<()> {
        let mut clause = Some(node);
        while let Some(current) = clause {
            if let Some(cond) = &current.cond {
                self.expr(cond)?;
            }
            self.block(&current.body)?;
            clause = current.next.as_deref();
        }
        Ok(())
    }

    fn while_stmt(&mut self, node: &'a WhileStmt) -> Result<()> {
        self.expr(&node.cond)?;
        self.scopes.enter_loop();
        let result = self.block_inner(&node.body);
        self.scopes.leave();
        result
    }

    fn special(&mut self, node: &'a SpecialStmt) -> Result<()> {
        match node.kind {
            TokenKind::Break | TokenKind::Continue => {
                if !self.scopes.inside_loop() {
                    return Err(Error::semantic(
                        format!("{} outside a loop", node.kind),
                        Some(node.ctx.clone()),
                    ));
                }
                Ok(())
            }
            TokenKind::Return => {
                // `return pass` carries no value and yields the return
                // type's default, so only a present argument is checked.
                if let Some(arg) = node.args.first() {
                    let arg_ty = self.expr(arg)?;
                    ops::assignment_type(
                        TokenKind::Assign,
                        self.scopes.ret_type(),
                        arg_ty,
                        TypeId::Any,
                        Some(&node.ctx),
                    )?;
                }
                Ok(())
            }
            _ => {
                for arg in &node.args {
                    self.expr(arg)?;
                }
                Ok(())
            }
        }
    }
}

impl Default for Analyzer<'_> {
    fn default() -> Self {
        Self::new()
    }
}

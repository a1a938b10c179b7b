//! The tree-walking evaluator.
//!
//! Non-local control flow (RETURN, BREAK, CONTINUE) travels as the error
//! side of [`Flow`] results rather than as panics or host exceptions:
//! loops consume Break/Continue, call frames consume Return, and anything
//! else propagates. A BREAK raised in a function that was defined inside
//! a loop body unwinds across the call to that loop.
//!
//! The evaluator never assumes the tree was analyzed: a loaded snapshot
//! runs directly, so missing symbols and ill-typed operations surface as
//! runtime semantic errors instead of panics.

use std::io::{BufRead, Write};

use skal_lex::{LitValue, TokenKind};
use skal_par::{
    Assign, Block, Expr, FuncCall, FuncDef, IfStmt, Program, SpecialStmt, Stmt, TypeNode, Var,
    VarDecl, WhileStmt,
};
use skal_sem::{
    ops, FuncSymbol, Payload, ScopeTree, Symbol, TypeId, Value, VarSymbol,
};
use skal_util::{Error, Result, SourceCtx};

use crate::frontend::Frontend;

/// Call frames allowed before runaway recursion is cut off.
const MAX_CALL_DEPTH: usize = 1000;

/// A non-local exit propagating up the evaluator.
#[derive(Debug)]
pub enum Control {
    /// RETURN, carrying the value (if any) and the statement's context.
    Return(Option<Value>, SourceCtx),
    Break,
    Continue,
    /// A runtime error; fatal to the run.
    Fail(Error),
}

impl From<Error> for Control {
    fn from(err: Error) -> Self {
        Control::Fail(err)
    }
}

type Flow<T> = std::result::Result<T, Control>;

/// Evaluate a program and yield its exit value.
pub fn interpret<'a, R: BufRead, W: Write>(
    program: &'a Program,
    frontend: Frontend<'a, R, W>,
) -> Result<Value> {
    Evaluator::new(frontend).run(program)
}

pub struct Evaluator<'a, R, W> {
    scopes: ScopeTree<'a>,
    frontend: Frontend<'a, R, W>,
    depth: usize,
}

impl<'a, R: BufRead, W: Write> Evaluator<'a, R, W> {
    pub fn new(frontend: Frontend<'a, R, W>) -> Self {
        Self {
            scopes: ScopeTree::new(),
            frontend,
            depth: 0,
        }
    }

    pub fn run(&mut self, program: &'a Program) -> Result<Value> {
        match self.program(program) {
            Ok(value) => Ok(value),
            Err(Control::Fail(err)) => Err(err),
            Err(Control::Return(..)) => Err(Error::semantic("RETURN outside a function", None)),
            Err(Control::Break) => Err(Error::semantic("BREAK outside a loop", None)),
            Err(Control::Continue) => Err(Error::semantic("CONTINUE outside a loop", None)),
        }
    }

    /// Install the program symbol, fetch the frontend's arguments, and
    /// invoke the program with CAST-ASSIGN parameter binding: arguments
    /// arrive as strings and are coerced to the declared parameter types.
    fn program(&mut self, program: &'a Program) -> Flow<Value> {
        let func = self.declare_func(&program.func, true)?;
        let args = self.frontend.get_args();

        if func.params.len() != args.len() {
            return Err(Error::semantic(
                format!(
                    "program {} requires {} argument(s), but {} given",
                    func.name,
                    func.params.len(),
                    args.len()
                ),
                Some(program.func.ctx.clone()),
            )
            .into());
        }

        let arg_ctxs: Vec<SourceCtx> = func.params.iter().map(|p| p.ctx.clone()).collect();
        self.call(func, args, arg_ctxs, TokenKind::CastAssign)
    }

    fn declare_func(&mut self, node: &'a FuncDef, is_program: bool) -> Flow<FuncSymbol<'a>> {
        let ret_type = if is_program {
            TypeId::Int
        } else {
            match &node.ret_type {
                Some(ty) => self.type_node(ty)?,
                None => TypeId::Any,
            }
        };

        let symbol = FuncSymbol {
            name: node.name.clone(),
            ret_type,
            params: &node.params,
            body: &node.body,
            ctx: node.ctx.clone(),
        };
        self.scopes.insert(Symbol::Func(symbol.clone()));
        Ok(symbol)
    }

    fn type_node(&mut self, node: &TypeNode) -> Flow<TypeId> {
        TypeId::from_name(&node.name).ok_or_else(|| {
            Error::semantic(format!("unknown type {}", node.name), Some(node.ctx.clone())).into()
        })
    }

    fn enter_scope(&mut self) {
        let id = self.scopes.enter();
        self.frontend.scope_changed(id);
    }

    fn leave_scope(&mut self) {
        self.scopes.leave();
        let id = self.scopes.current();
        self.frontend.scope_changed(id);
    }

    /// The call protocol: fresh scope, declare-and-bind each parameter,
    /// run the body, then re-type the returned value (or the return
    /// type's default) against the declared return type.
    fn call(
        &mut self,
        func: FuncSymbol<'a>,
        args: Vec<Value>,
        arg_ctxs: Vec<SourceCtx>,
        op: TokenKind,
    ) -> Flow<Value> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(Error::semantic(
                "maximum recursion depth exceeded",
                Some(func.ctx.clone()),
            )
            .into());
        }

        self.depth += 1;
        self.enter_scope();
        let result = self.bind_and_run(&func, args, arg_ctxs, op);
        self.leave_scope();
        self.depth -= 1;

        let (ret_value, ret_ctx) = match result {
            Ok(()) => (None, None),
            Err(Control::Return(value, ctx)) => (value, Some(ctx)),
            Err(other) => return Err(other),
        };

        let ret_value = ret_value.unwrap_or_else(|| Value::default_of(func.ret_type));
        ops::assignment_value(TokenKind::Assign, func.ret_type, &ret_value, ret_ctx.as_ref())
            .map_err(Control::from)
    }

    fn bind_and_run(
        &mut self,
        func: &FuncSymbol<'a>,
        args: Vec<Value>,
        arg_ctxs: Vec<SourceCtx>,
        op: TokenKind,
    ) -> Flow<()> {
        for ((param, arg), ctx) in func.params.iter().zip(args).zip(arg_ctxs) {
            let decl_type = self.var_decl(param)?;
            let value = ops::assignment_value(op, decl_type, &arg, Some(&ctx))?;
            if let Some(Symbol::Var(var)) = self.scopes.lookup_mut(&param.var.name) {
                var.value = value;
            }
        }

        self.frontend.enter_func(func);
        let result = self.block(func.body, false);
        self.frontend.leave_func();
        result
    }

    fn block(&mut self, node: &'a Block, create_scope: bool) -> Flow<()> {
        if create_scope {
            self.enter_scope();
        }
        let result = self.block_inner(node);
        if create_scope {
            self.leave_scope();
        }
        result
    }

    /// Install the block's function symbols, then execute its statements
    /// in order, notifying the frontend before each one. The notification
    /// is the debugger's sole breakpoint granularity.
    fn block_inner(&mut self, node: &'a Block) -> Flow<()> {
        for func in &node.functions {
            self.declare_func(func, false)?;
        }
        for stmt in &node.statements {
            self.frontend.visit_line(stmt.ctx(), &self.scopes);
            self.stmt(stmt)?;
        }
        Ok(())
    }

    fn stmt(&mut self, stmt: &'a Stmt) -> Flow<()> {
        match stmt {
            Stmt::VarDecl(decl) => {
                self.var_decl(decl)?;
                Ok(())
            }
            Stmt::Assign(assign) => self.assignment(assign),
            Stmt::Call(call) => {
                self.func_call(call)?;
                Ok(())
            }
            Stmt::If(chain) => self.if_stmt(chain),
            Stmt::While(node) => self.while_stmt(node),
            Stmt::Special(node) => self.special(node),
            Stmt::Block(block) => self.block(block, true),
        }
    }

    fn var_decl(&mut self, node: &'a VarDecl) -> Flow<TypeId> {
        let ty = match &node.ty {
            Some(ty) => self.type_node(ty)?,
            None => TypeId::Any,
        };
        self.scopes
            .insert(Symbol::Var(VarSymbol::new(node.var.name.clone(), ty)));
        Ok(ty)
    }

    fn var_decl_type(&self, var: &Var) -> Flow<TypeId> {
        match self.scopes.lookup(&var.name) {
            Some(Symbol::Var(sym)) => Ok(sym.decl_type),
            _ => Err(Error::semantic(
                format!("variable {} not declared", var.name),
                Some(var.ctx.clone()),
            )
            .into()),
        }
    }

    fn store(&mut self, name: &str, value: Value) {
        if let Some(Symbol::Var(var)) = self.scopes.lookup_mut(name) {
            var.value = value;
        }
    }

    fn assignment(&mut self, node: &'a Assign) -> Flow<()> {
        let decl_type = self.var_decl_type(&node.var)?;
        let value = self.expr(&node.expr)?;
        let value = ops::assignment_value(node.op, decl_type, &value, Some(&node.ctx))?;
        self.store(&node.var.name, value);
        Ok(())
    }

    fn expr(&mut self, node: &'a Expr) -> Flow<Value> {
        match node {
            Expr::Literal(lit) => Ok(match &lit.value {
                LitValue::Int(v) => Value::new(TypeId::Int, Payload::Int(*v)),
                LitValue::Real(v) => Value::new(TypeId::Real, Payload::Real(*v)),
                LitValue::Str(v) => Value::new(TypeId::Str, Payload::Str(v.clone())),
            }),
            Expr::Var(var) => match self.scopes.lookup(&var.name) {
                Some(Symbol::Var(sym)) => Ok(sym.value.clone()),
                _ => Err(Error::semantic(
                    format!("variable {} not declared", var.name),
                    Some(var.ctx.clone()),
                )
                .into()),
            },
            Expr::Unary(unary) => {
                let value = self.expr(&unary.expr)?;
                Ok(ops::unary_op_value(unary.op, &value, Some(&unary.ctx))?)
            }
            Expr::Binary(binary) => {
                let left = self.expr(&binary.left)?;
                let right = self.expr(&binary.right)?;
                Ok(ops::binary_op_value(binary.op, &left, &right, Some(&binary.ctx))?)
            }
            Expr::Call(call) => self.func_call(call),
        }
    }

    fn func_call(&mut self, node: &'a FuncCall) -> Flow<Value> {
        let func = match self.scopes.lookup(&node.name) {
            Some(Symbol::Func(func)) => func.clone(),
            _ => {
                return Err(Error::semantic(
                    format!("function {} not declared", node.name),
                    Some(node.ctx.clone()),
                )
                .into())
            }
        };

        // Left-to-right argument evaluation.
        let mut args = Vec::with_capacity(node.args.len());
        for arg in &node.args {
            args.push(self.expr(arg)?);
        }
        let arg_ctxs: Vec<SourceCtx> = node.args.iter().map(|a| a.ctx().clone()).collect();

        self.call(func, args, arg_ctxs, TokenKind::Assign)
    }

    /// Take the first branch whose condition is truthy, or the
    /// condition-less `else` tail.
    fn if_stmt(&mut self, node: &'a IfStmt) -> Flow<()> {
        let mut clause = Some(node);
        while let Some(current) = clause {
            let taken = match &current.cond {
                None => true,
                Some(cond) => self.expr(cond)?.is_truthy(),
            };
            if taken {
                return self.block(&current.body, true);
            }
            clause = current.next.as_deref();
        }
        Ok(())
    }

    fn while_stmt(&mut self, node: &'a WhileStmt) -> Flow<()> {
        while self.expr(&node.cond)?.is_truthy() {
            match self.block(&node.body, true) {
                Ok(()) => {}
                Err(Control::Continue) => continue,
                Err(Control::Break) => break,
                Err(other) => return Err(other),
            }
        }
        Ok(())
    }

    fn special(&mut self, node: &'a SpecialStmt) -> Flow<()> {
        match node.kind {
            TokenKind::Break => Err(Control::Break),
            TokenKind::Continue => Err(Control::Continue),
            TokenKind::Return => {
                let value = match node.args.first() {
                    Some(arg) => Some(self.expr(arg)?),
                    None => None,
                };
                Err(Control::Return(value, node.ctx.clone()))
            }
            TokenKind::Print => {
                for arg in &node.args {
                    let value = self.expr(arg)?;
                    self.frontend.print(&value);
                }
                Ok(())
            }
            TokenKind::Read => {
                for arg in &node.args {
                    let var = match arg {
                        Expr::Var(var) => var,
                        other => {
                            return Err(Error::semantic(
                                "read target must be a variable",
                                Some(other.ctx().clone()),
                            )
                            .into())
                        }
                    };
                    let decl_type = self.var_decl_type(var)?;
                    let word = self.frontend.read().ok_or_else(|| {
                        Error::semantic("unexpected end of input", Some(var.ctx.clone()))
                    })?;
                    let value =
                        ops::assignment_value(TokenKind::CastAssign, decl_type, &word, Some(&var.ctx))?;
                    self.store(&var.name, value);
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skal_lex::tokenize;
    use skal_par::parse;
    use skal_sem::analyze;
    use skal_util::ErrorKind;

    fn run(source: &str, args: &[&str], input: &str) -> (Result<Value>, String) {
        let program = parse(tokenize(source).expect("tokenize failed")).expect("parse failed");
        analyze(&program).expect("analysis failed");
        let mut out = Vec::new();
        let frontend = Frontend::new(
            args.iter().map(|s| s.to_string()).collect(),
            false,
            std::io::Cursor::new(input.as_bytes()),
            &mut out,
        );
        let result = interpret(&program, frontend);
        (result, String::from_utf8(out).expect("output not utf-8"))
    }

    fn exit_code(result: Result<Value>) -> i64 {
        match result.expect("run failed").payload {
            Payload::Int(v) => v,
            other => panic!("program produced non-int exit value: {:?}", other),
        }
    }

    #[test]
    fn test_empty_program_exits_zero() {
        let (result, _) = run("program main() -> int:\n    pass\n", &[], "");
        assert_eq!(exit_code(result), 0);
    }

    #[test]
    fn test_return_pass_exits_zero() {
        let (result, _) = run("program main() -> int:\n    return pass\n", &[], "");
        assert_eq!(exit_code(result), 0);
    }

    #[test]
    fn test_square_of_argument() {
        let source = "program main(n: int) -> int:\n    return n * n\n";
        let (result, _) = run(source, &["7"], "");
        assert_eq!(exit_code(result), 49);
    }

    #[test]
    fn test_factorial_recursion() {
        let source = "\
program main(n: int) -> int:
    def fact(n: int) -> int:
        if n <= 1:
            return 1
        else:
            return n * fact(n - 1)
    return fact(n)
";
        let (result, _) = run(source, &["5"], "");
        assert_eq!(exit_code(result), 120);
    }

    #[test]
    fn test_precedence_in_initializer() {
        let source = "\
program main() -> int:
    var x := 2 + 3 * 4
    return x
";
        let (result, _) = run(source, &[], "");
        assert_eq!(exit_code(result), 14);
    }

    #[test]
    fn test_while_with_break_and_continue() {
        let source = "\
program main() -> int:
    var i := 0, total := 0
    while 1:
        i := i + 1
        if i > 10:
            break
        if i % 2:
            continue
        total := total + i
    return total
";
        let (result, _) = run(source, &[], "");
        // 2 + 4 + 6 + 8 + 10
        assert_eq!(exit_code(result), 30);
    }

    #[test]
    fn test_if_elif_else_selection() {
        let source = "\
program main(n: int) -> int:
    if n < 0:
        return 1
    elif n = 0:
        return 2
    else:
        return 3
";
        let (result, _) = run(source, &["0"], "");
        assert_eq!(exit_code(result), 2);
        let (result, _) = run(source, &["-5"], "");
        assert_eq!(exit_code(result), 1);
        let (result, _) = run(source, &["5"], "");
        assert_eq!(exit_code(result), 3);
    }

    #[test]
    fn test_print_has_no_separators() {
        let source = "\
program main() -> int:
    print 'x=', 1 + 1, ' '
    print 2.5
    return 0
";
        let (_, output) = run(source, &[], "");
        assert_eq!(output, "x=2 2.5");
    }

    #[test]
    fn test_read_cast_assigns_words() {
        let source = "\
program main() -> int:
    var a: int, b: int
    read a, b
    return a + b
";
        let (result, _) = run(source, &[], "19 23\n");
        assert_eq!(exit_code(result), 42);
    }

    #[test]
    fn test_read_across_lines() {
        let source = "\
program main() -> int:
    var a: int, b: int, c: int
    read a, b
    read c
    return a + b + c
";
        let (result, _) = run(source, &[], "1 2\n3\n");
        assert_eq!(exit_code(result), 6);
    }

    #[test]
    fn test_read_non_numeric_into_int_is_type_error() {
        let source = "\
program main() -> int:
    var a: int
    read a
    return a
";
        let (result, _) = run(source, &[], "hello\n");
        let err = result.expect_err("should fail");
        assert_eq!(err.kind, ErrorKind::Type);
        assert_eq!(err.message, "cannot convert 'hello' to int");
    }

    #[test]
    fn test_any_adopts_real_type_of_last_assignment() {
        let source = "\
program main() -> int:
    var a
    a := 'text'
    a := 7
    return a
";
        let (result, _) = run(source, &[], "");
        assert_eq!(exit_code(result), 7);
    }

    #[test]
    fn test_any_string_concat_after_retype() {
        let source = "\
program main() -> int:
    var a
    a := 'ab'
    print a + 'c'
    return 0
";
        let (_, output) = run(source, &[], "");
        assert_eq!(output, "abc");
    }

    #[test]
    fn test_division_by_zero_has_context() {
        let source = "\
program main() -> int:
    var x := 0
    return 10 // x
";
        let (result, _) = run(source, &[], "");
        let err = result.expect_err("should fail");
        assert_eq!(err.kind, ErrorKind::Type);
        assert_eq!(err.message, "division by zero");
        assert_eq!(err.ctx.expect("missing context").line_no, 3);
    }

    #[test]
    fn test_real_div_on_ints_true_divides() {
        let source = "\
program main() -> int:
    print 7 / 2
    return 0
";
        let (_, output) = run(source, &[], "");
        assert_eq!(output, "3.5");
    }

    #[test]
    fn test_int_div_floors() {
        let source = "program main() -> int:\n    return 0 - (0 - 7) // 2\n";
        let (result, _) = run(source, &[], "");
        // -7 // 2 is -4, negated
        assert_eq!(exit_code(result), 4);
    }

    #[test]
    fn test_cast_operator_converts_strings() {
        let source = "\
program main() -> int:
    var n: int
    n := ~'6' * 7
    return n
";
        let (result, _) = run(source, &[], "");
        assert_eq!(exit_code(result), 42);
    }

    #[test]
    fn test_cast_assign_string_to_int() {
        let source = "\
program main() -> int:
    var s := '17'
    var n: int
    n ~= s
    return n
";
        let (result, _) = run(source, &[], "");
        assert_eq!(exit_code(result), 17);
    }

    #[test]
    fn test_program_argument_coercion_failure() {
        let source = "program main(n: int) -> int:\n    return n\n";
        let (result, _) = run(source, &["seven"], "");
        let err = result.expect_err("should fail");
        assert_eq!(err.message, "cannot convert 'seven' to int");
    }

    #[test]
    fn test_program_arity_mismatch() {
        let source = "program main(n: int) -> int:\n    return n\n";
        let (result, _) = run(source, &[], "");
        let err = result.expect_err("should fail");
        assert_eq!(err.message, "program main requires 1 argument(s), but 0 given");
    }

    #[test]
    fn test_uninitialized_defaults() {
        let source = "\
program main() -> int:
    var n: int, r: real, s: string
    print n, ' ', r, ' [', s, ']'
    return 0
";
        let (_, output) = run(source, &[], "");
        assert_eq!(output, "0 0.0 []");
    }

    #[test]
    fn test_mutual_recursion() {
        let source = "\
program main(n: int) -> int:
    def odd(n: int) -> int:
        if n = 0:
            return 0
        return even(n - 1)
    def even(n: int) -> int:
        if n = 0:
            return 1
        return odd(n - 1)
    return odd(n)
";
        let (result, _) = run(source, &["9"], "");
        assert_eq!(exit_code(result), 1);
    }

    #[test]
    fn test_recursion_limit() {
        let source = "\
program main() -> int:
    def loop(n: int) -> int:
        return loop(n + 1)
    return loop(0)
";
        let (result, _) = run(source, &[], "");
        let err = result.expect_err("should fail");
        assert_eq!(err.message, "maximum recursion depth exceeded");
    }

    #[test]
    fn test_function_return_default_when_no_return() {
        let source = "\
program main() -> int:
    def f() -> int:
        pass
    return f() + 5
";
        let (result, _) = run(source, &[], "");
        assert_eq!(exit_code(result), 5);
    }

    #[test]
    fn test_return_value_retyped_to_declared_type() {
        let source = "\
program main() -> int:
    def f() -> real:
        return 3
    print f()
    return 0
";
        let (_, output) = run(source, &[], "");
        assert_eq!(output, "3.0");
    }

    #[test]
    fn test_relational_result_survives_int_to_real_swap() {
        let int_side = "program main() -> int:\n    return 3 > 2\n";
        let real_side = "program main() -> int:\n    return 3.0 > 2\n";
        let (a, _) = run(int_side, &[], "");
        let (b, _) = run(real_side, &[], "");
        assert_eq!(exit_code(a), exit_code(b));
    }

    #[test]
    fn test_logical_operators_evaluate_both_sides() {
        // no short-circuit: the second read happens even when the first
        // operand already decides the result
        let source = "\
program main() -> int:
    var a: int, b: int
    read a
    read b
    return a or b
";
        let (result, _) = run(source, &[], "1 0\n");
        assert_eq!(exit_code(result), 1);
    }

    #[test]
    fn test_string_comparison_uses_lexicographic_order() {
        let source = "program main() -> int:\n    return 'abc' < 'abd'\n";
        let (result, _) = run(source, &[], "");
        assert_eq!(exit_code(result), 1);
    }

    #[test]
    fn test_nested_bare_block_scopes() {
        let source = "\
program main() -> int:
    var x := 1
    if 1:
        var x := 2
        pass
    return x
";
        let (result, _) = run(source, &[], "");
        assert_eq!(exit_code(result), 1);
    }

    #[test]
    fn test_break_crosses_call_from_function_defined_in_loop() {
        let source = "\
program main() -> int:
    var i := 0
    while 1:
        def stop() -> int:
            break
        i := i + 1
        if i > 2:
            stop()
    return i
";
        let (result, _) = run(source, &[], "");
        assert_eq!(exit_code(result), 3);
    }

    #[test]
    fn test_deterministic_without_read() {
        let source = "\
program main() -> int:
    var i := 0, acc := 0
    while i < 10:
        i := i + 1
        acc := acc + i * i
    return acc
";
        let (a, out_a) = run(source, &[], "");
        let (b, out_b) = run(source, &[], "");
        assert_eq!(exit_code(a), exit_code(b));
        assert_eq!(out_a, out_b);
    }
}

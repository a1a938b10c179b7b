//! Diagnostic tree dump.
//!
//! One node per line, children indented under their parent. The format is
//! for human inspection only; the persisted-tree format is the serde one.

use crate::ast::*;

/// Render the program as an indented tree.
pub fn pretty(program: &Program) -> String {
    let mut out = String::new();
    func_def(&mut out, 0, &program.func, "Program");
    out
}

fn push(out: &mut String, depth: usize, text: &str) {
    out.push_str(&"    ".repeat(depth));
    out.push_str(text);
    out.push('\n');
}

fn func_def(out: &mut String, depth: usize, func: &FuncDef, label: &str) {
    let ret = match &func.ret_type {
        Some(ty) => format!(" -> {}", ty.name),
        None => String::new(),
    };
    push(out, depth, &format!("{} '{}'{}", label, func.name, ret));
    for param in &func.params {
        var_decl(out, depth + 1, param, "Param");
    }
    block(out, depth + 1, &func.body);
}

fn block(out: &mut String, depth: usize, node: &Block) {
    push(out, depth, "Block");
    for func in &node.functions {
        func_def(out, depth + 1, func, "FuncDef");
    }
    for stmt in &node.statements {
        statement(out, depth + 1, stmt);
    }
}

fn var_decl(out: &mut String, depth: usize, decl: &VarDecl, label: &str) {
    let ty = match &decl.ty {
        Some(ty) => format!(": {}", ty.name),
        None => String::new(),
    };
    push(out, depth, &format!("{} '{}'{}", label, decl.var.name, ty));
}

fn statement(out: &mut String, depth: usize, stmt: &Stmt) {
    match stmt {
        Stmt::VarDecl(decl) => var_decl(out, depth, decl, "VarDecl"),
        Stmt::Assign(assign) => {
            push(out, depth, &format!("Assign '{}' {}", assign.var.name, assign.op));
            expr(out, depth + 1, &assign.expr);
        }
        Stmt::Call(call) => func_call(out, depth, call),
        Stmt::If(chain) => {
            let mut node = Some(chain);
            while let Some(clause) = node {
                match &clause.cond {
                    Some(cond) => {
                        push(out, depth, "If");
                        expr(out, depth + 1, cond);
                    }
                    None => push(out, depth, "Else"),
                }
                block(out, depth + 1, &clause.body);
                node = clause.next.as_deref();
            }
        }
        Stmt::While(node) => {
            push(out, depth, "While");
            expr(out, depth + 1, &node.cond);
            block(out, depth + 1, &node.body);
        }
        Stmt::Special(node) => {
            push(out, depth, &format!("{}", node.kind));
            for arg in &node.args {
                expr(out, depth + 1, arg);
            }
        }
        Stmt::Block(node) => block(out, depth, node),
    }
}

fn func_call(out: &mut String, depth: usize, call: &FuncCall) {
    push(out, depth, &format!("Call '{}'", call.name));
    for arg in &call.args {
        expr(out, depth + 1, arg);
    }
}

fn expr(out: &mut String, depth: usize, node: &Expr) {
    match node {
        Expr::Literal(lit) => push(out, depth, &format!("Literal {}", lit.value)),
        Expr::Var(var) => push(out, depth, &format!("Var '{}'", var.name)),
        Expr::Unary(unary) => {
            push(out, depth, &format!("UnaryOp {}", unary.op));
            expr(out, depth + 1, &unary.expr);
        }
        Expr::Binary(binary) => {
            push(out, depth, &format!("BinaryOp {}", binary.op));
            expr(out, depth + 1, &binary.left);
            expr(out, depth + 1, &binary.right);
        }
        Expr::Call(call) => func_call(out, depth, call),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skal_lex::tokenize;

    #[test]
    fn test_pretty_shape() {
        let source = "program main(n: int) -> int:\n    return n * n\n";
        let program = crate::parse(tokenize(source).expect("tokenize failed")).expect("parse failed");
        let dump = pretty(&program);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines[0], "Program 'main' -> int");
        assert_eq!(lines[1], "    Param 'n': int");
        assert_eq!(lines[2], "    Block");
        assert_eq!(lines[3], "        RETURN");
        assert_eq!(lines[4], "            BinaryOp MUL");
        assert!(dump.contains("Var 'n'"));
    }
}

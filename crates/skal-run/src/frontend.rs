//! Program I/O and the interactive step debugger.
//!
//! The frontend is the evaluator's window to the world: program
//! arguments, `print`, and `read` go through it, and the evaluator
//! notifies it before each statement (`visit_line`), around calls
//! (`enter_func`/`leave_func`), and on scope changes. With debug mode off
//! the notification callbacks do nothing.
//!
//! In debug mode the frontend mirrors the call stack, keeps the
//! breakpoint set, and decides at each line whether to stop and prompt.
//! Breakpoints are raw line numbers: one triggers in any function whose
//! body contains that line.

use std::collections::VecDeque;
use std::io::{BufRead, Write};

use indexmap::IndexSet;
use skal_par::{Block, Stmt};
use skal_sem::{FuncSymbol, Payload, ScopeId, ScopeTree, Symbol, TypeId, Value};
use skal_util::SourceCtx;

const PROMPT: &str = "skal-dbg> ";

/// Command table: name and help line. Any unambiguous prefix is accepted.
const COMMANDS: &[(&str, &str)] = &[
    ("help", "help [cmd] -- print help"),
    ("continue", "continue -- run until a breakpoint is reached"),
    ("step", "step -- step to the next line or into a function"),
    ("next", "next -- step to the next line"),
    ("return", "return -- run until a function returns"),
    ("list", "list -- list current function's source code"),
    ("print", "print [var] -- print a variable's value"),
    ("break", "break [line] -- set a breakpoint on line"),
    ("delete", "delete [line] -- remove breakpoint from line"),
    ("info", "info -- show all breakpoints"),
    ("exit", "exit -- finish this debug session"),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StepMode {
    Step,
    Next,
    Return,
}

pub struct Frontend<'a, R, W> {
    args: Vec<String>,
    debug: bool,
    reader: R,
    out: W,

    /// Buffered whitespace-delimited input tokens for `read`.
    words: VecDeque<String>,

    breakpoints: IndexSet<u32>,
    /// Active stepping mode; cleared by `continue`. A fresh session
    /// starts in `step` so the first statement breaks.
    mode: Option<StepMode>,
    /// Stack depth and line recorded when the last step command was
    /// issued, for the stepping heuristics and re-break suppression.
    mode_depth: usize,
    mode_line: Option<u32>,
    last_printed: String,

    stack: Vec<FuncSymbol<'a>>,
    current_scope: Option<ScopeId>,
    ctx: Option<SourceCtx>,
}

impl<'a, R: BufRead, W: Write> Frontend<'a, R, W> {
    pub fn new(args: Vec<String>, debug: bool, reader: R, out: W) -> Self {
        Self {
            args,
            debug,
            reader,
            out,
            words: VecDeque::new(),
            breakpoints: IndexSet::new(),
            mode: Some(StepMode::Step),
            mode_depth: 0,
            mode_line: None,
            last_printed: String::new(),
            stack: Vec::new(),
            current_scope: None,
            ctx: None,
        }
    }

    /// The interpreted program's arguments, as string values.
    pub fn get_args(&self) -> Vec<Value> {
        self.args
            .iter()
            .map(|arg| Value::new(TypeId::Str, Payload::Str(arg.clone())))
            .collect()
    }

    /// Emit one value, no separator, no newline.
    pub fn print(&mut self, value: &Value) {
        let _ = write!(self.out, "{}", value.payload.plain());
        let _ = self.out.flush();
    }

    /// The next whitespace-delimited word of input, or `None` at end of
    /// input.
    pub fn read(&mut self) -> Option<Value> {
        loop {
            if let Some(word) = self.words.pop_front() {
                return Some(Value::new(TypeId::Str, Payload::Str(word)));
            }
            let mut line = String::new();
            match self.reader.read_line(&mut line) {
                Ok(0) | Err(_) => return None,
                Ok(_) => {
                    for word in line.split_whitespace() {
                        self.words.push_back(word.to_string());
                    }
                }
            }
        }
    }

    pub fn enter_func(&mut self, func: &FuncSymbol<'a>) {
        if !self.debug {
            return;
        }
        self.stack.push(func.clone());
    }

    pub fn leave_func(&mut self) {
        if !self.debug {
            return;
        }
        self.stack.pop();
    }

    pub fn scope_changed(&mut self, scope: ScopeId) {
        if !self.debug {
            return;
        }
        self.current_scope = Some(scope);
    }

    /// Called before every statement. Decides whether to stop, and runs
    /// the command prompt if so.
    pub fn visit_line(&mut self, ctx: &SourceCtx, scopes: &ScopeTree<'a>) {
        if !self.debug || self.stack.is_empty() {
            return;
        }
        if !self.should_break(ctx.line_no) {
            return;
        }

        self.ctx = Some(ctx.clone());
        self.print_ctx();
        self.read_cmd(scopes);
    }

    /// The stepping heuristics. Never re-breaks at the line and depth the
    /// last command was issued from.
    fn should_break(&self, line_no: u32) -> bool {
        if self.mode_line == Some(line_no) && self.stack.len() == self.mode_depth {
            return false;
        }

        match self.mode {
            Some(StepMode::Step) => true,
            Some(StepMode::Next) if self.stack.len() <= self.mode_depth => true,
            Some(StepMode::Return) if self.stack.len() < self.mode_depth => true,
            _ => self.breakpoints.contains(&line_no),
        }
    }

    fn print_ctx(&mut self) {
        if let (Some(func), Some(ctx)) = (self.stack.last(), self.ctx.as_ref()) {
            let _ = writeln!(self.out, "In function <{}>", func.name);
            let _ = writeln!(self.out, "{}", ctx);
        }
    }

    /// Prompt until a command resumes execution. End of the command
    /// stream behaves like `continue`.
    fn read_cmd(&mut self, scopes: &ScopeTree<'a>) {
        loop {
            let _ = write!(self.out, "{}", PROMPT);
            let _ = self.out.flush();

            let mut line = String::new();
            match self.reader.read_line(&mut line) {
                Ok(0) | Err(_) => {
                    self.mode = None;
                    self.mode_line = None;
                    return;
                }
                Ok(_) => {}
            }

            let mut parts = line.split_whitespace();
            let prefix = match parts.next() {
                Some(word) => word,
                None => continue,
            };
            let arg = parts.next().map(str::to_string);

            let candidates: Vec<&str> = COMMANDS
                .iter()
                .map(|(name, _)| *name)
                .filter(|name| name.starts_with(prefix))
                .collect();
            if candidates.is_empty() {
                let _ = writeln!(self.out, "Unknown command. Type 'h' for help");
                continue;
            }
            if candidates.len() > 1 {
                let _ = writeln!(self.out, "Ambiguous command. Type 'h' for help");
                continue;
            }
            let cmd = candidates[0];

            // break/delete take a line number, defaulting to the current line
            let line_arg = if cmd == "break" || cmd == "delete" {
                match &arg {
                    Some(text) => match text.parse::<u32>() {
                        Ok(n) => Some(n),
                        Err(_) => {
                            let _ = writeln!(self.out, "Invalid line number");
                            continue;
                        }
                    },
                    None => self.ctx.as_ref().map(|c| c.line_no),
                }
            } else {
                None
            };

            if self.exec_command(cmd, arg, line_arg, scopes) {
                return;
            }
        }
    }

    /// Execute one command; returns true when execution should resume.
    fn exec_command(
        &mut self,
        cmd: &str,
        arg: Option<String>,
        line_arg: Option<u32>,
        scopes: &ScopeTree<'a>,
    ) -> bool {
        match cmd {
            "help" => {
                let help = arg
                    .as_deref()
                    .and_then(|name| COMMANDS.iter().find(|(n, _)| *n == name));
                match help {
                    Some((_, text)) => {
                        let _ = writeln!(self.out, "{}", text);
                    }
                    None => {
                        let names: Vec<&str> = COMMANDS.iter().map(|(n, _)| *n).collect();
                        let _ = writeln!(self.out, "Available commands:");
                        let _ = writeln!(self.out, "    {}", names.join(", "));
                        let _ = writeln!(self.out, "You can type any unambiguous prefix of a command.");
                    }
                }
                false
            }

            "continue" => {
                self.mode = None;
                self.mode_depth = 0;
                self.mode_line = None;
                true
            }

            "step" | "next" | "return" => {
                self.mode = Some(match cmd {
                    "step" => StepMode::Step,
                    "next" => StepMode::Next,
                    _ => StepMode::Return,
                });
                self.mode_depth = self.stack.len();
                self.mode_line = self.ctx.as_ref().map(|c| c.line_no);
                true
            }

            "list" => {
                if let Some(func) = self.stack.last() {
                    let _ = writeln!(self.out, "{}", source_listing(func));
                }
                false
            }

            "print" => {
                let name = match arg {
                    Some(name) => name,
                    None => self.last_printed.clone(),
                };
                self.last_printed = name.clone();
                let symbol = self
                    .current_scope
                    .and_then(|scope| scopes.lookup_from(scope, &name));
                match symbol {
                    Some(Symbol::Var(var)) => {
                        let _ = writeln!(self.out, "{}: {}", name, var.value);
                    }
                    _ => {
                        let _ = writeln!(self.out, "No variable '{}' in current scope", name);
                    }
                }
                false
            }

            "break" => {
                if let Some(line) = line_arg {
                    self.breakpoints.insert(line);
                    let _ = writeln!(self.out, "Breakpoint set: {}", line);
                }
                false
            }

            "delete" => {
                if let Some(line) = line_arg {
                    if self.breakpoints.shift_remove(&line) {
                        let _ = writeln!(self.out, "Breakpoint deleted: {}", line);
                    } else {
                        let _ = writeln!(self.out, "No breakpoint on line {}", line);
                    }
                }
                false
            }

            "info" => {
                let lines: Vec<String> =
                    self.breakpoints.iter().map(|n| n.to_string()).collect();
                let _ = writeln!(self.out, "Breakpoints: [{}]", lines.join(", "));
                false
            }

            "exit" => std::process::exit(0),

            _ => false,
        }
    }
}

/// Reconstruct a function's source from the contexts its body carries:
/// the definition line followed by every statement line, in order,
/// deduplicated by line number.
fn source_listing(func: &FuncSymbol<'_>) -> String {
    let mut ctxs = vec![func.ctx.clone()];
    collect_lines(func.body, &mut ctxs);

    ctxs.sort_by_key(|ctx| ctx.line_no);
    ctxs.dedup_by_key(|ctx| ctx.line_no);

    let lines: Vec<String> = ctxs.iter().map(|ctx| ctx.to_string()).collect();
    lines.join("\n")
}

fn collect_lines(block: &Block, out: &mut Vec<SourceCtx>) {
    for func in &block.functions {
        out.push(func.ctx.clone());
        collect_lines(&func.body, out);
    }
    for stmt in &block.statements {
        out.push(stmt.ctx().clone());
        match stmt {
            Stmt::If(chain) => {
                let mut clause = Some(chain);
                while let Some(current) = clause {
                    out.push(current.ctx.clone());
                    collect_lines(&current.body, out);
                    clause = current.next.as_deref();
                }
            }
            Stmt::While(node) => collect_lines(&node.body, out),
            Stmt::Block(node) => collect_lines(node, out),
            _ => {}
        }
    }
}

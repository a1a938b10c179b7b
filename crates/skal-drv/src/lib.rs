//! skal-drv - The interpreter driver.
//!
//! A thin shell around the core pipeline: parses the command line,
//! selects phases, reads the source, runs tokenize → parse → analyze →
//! evaluate, persists or reloads the tree, and renders diagnostics.
//!
//! Exit codes: the interpreted program's return value on success, 1 for
//! any pipeline error, 2 for a usage error.

use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::{bail, Result as CliResult};
use clap::Parser as ClapParser;

use skal_lex::tokenize;
use skal_par::{parse, pretty, Program};
use skal_run::{interpret, Frontend};
use skal_sem::{analyze, Payload, Value};

/// Command-line surface.
///
/// With no phase flag at all, `--interpret` is implied. Positional
/// arguments after the input file are forwarded to the interpreted
/// program verbatim.
#[derive(ClapParser, Debug)]
#[command(name = "skal", about = "The skal interpreter", version)]
pub struct Cli {
    /// Print the token stream
    #[arg(short = 't', long)]
    pub tokenize: bool,

    /// Print the parsed tree
    #[arg(short = 'p', long)]
    pub parse: bool,

    /// Run semantic analysis and report
    #[arg(short = 'a', long)]
    pub analyze: bool,

    /// Evaluate the program
    #[arg(short = 'i', long)]
    pub interpret: bool,

    /// Save the analyzed tree to FILE
    #[arg(short = 's', long, value_name = "FILE")]
    pub save_ast: Option<PathBuf>,

    /// Treat the input file as a saved tree and skip the earlier phases
    #[arg(short = 'l', long)]
    pub load_ast: bool,

    /// Run under the interactive debugger (implies --interpret)
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Source file (or saved tree with --load-ast)
    pub input_file: PathBuf,

    /// Arguments forwarded to the interpreted program
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub program_args: Vec<String>,
}

impl Cli {
    /// Apply the flag implications and reject contradictory selections.
    fn normalize(mut self) -> CliResult<Self> {
        if self.debug {
            self.interpret = true;
        }

        if self.tokenize || self.parse || self.analyze || self.save_ast.is_some() {
            if self.load_ast {
                bail!("options -t/-p/-a/-s are not compatible with -l");
            }
        } else {
            self.interpret = true;
        }

        Ok(self)
    }
}

/// Run the pipeline for a parsed command line.
///
/// Usage errors come back as `Err`; pipeline errors are reported to
/// stderr and become exit code 1.
pub fn run(cli: Cli) -> CliResult<i32> {
    let cli = cli.normalize()?;
    match pipeline(&cli) {
        Ok(code) => Ok(code),
        Err((phase, rendered)) => {
            report(phase, &rendered);
            Ok(1)
        }
    }
}

/// A failure in one pipeline phase, already rendered for display.
type PhaseError = (&'static str, String);

fn pipeline(cli: &Cli) -> Result<i32, PhaseError> {
    let need_analyze = cli.analyze || cli.save_ast.is_some() || (cli.interpret && !cli.load_ast);
    let need_parse = cli.parse || (need_analyze && !cli.load_ast);
    let need_tokenize = cli.tokenize || (need_parse && !cli.load_ast);

    let mut tokens = None;
    let mut program: Option<Program> = None;

    if need_tokenize {
        let source = fs::read_to_string(&cli.input_file)
            .map_err(|err| preparation_error(&cli.input_file, &err))?;

        let buffered =
            tokenize(&source).map_err(|err| ("lexical analysis", err.render()))?;

        if cli.tokenize {
            println!("=== TOKENS ===");
            for token in &buffered {
                println!("{}", token);
            }
            println!("==============");
            println!();
        }
        tokens = Some(buffered);
    }

    if need_parse {
        if let Some(buffered) = tokens.take() {
            let parsed = parse(buffered).map_err(|err| ("syntactic analysis", err.render()))?;

            if cli.parse {
                println!("=== AST ===");
                print!("{}", pretty(&parsed));
                println!("===========");
                println!();
            }
            program = Some(parsed);
        }
    }

    if need_analyze {
        if let Some(parsed) = &program {
            analyze(parsed).map_err(|err| ("semantic analysis", err.render()))?;

            if cli.analyze {
                println!("=== SEMANTICS ===");
                println!("No errors found.");
                println!("=================");
                println!();
            }
        }
    }

    if cli.load_ast {
        let data = fs::read_to_string(&cli.input_file)
            .map_err(|err| preparation_error(&cli.input_file, &err))?;
        let loaded = serde_json::from_str(&data)
            .map_err(|err| ("preparation", format!("invalid saved tree: {}", err)))?;
        program = Some(loaded);
    }

    if let Some(path) = &cli.save_ast {
        if let Some(parsed) = &program {
            let data = serde_json::to_string(parsed)
                .map_err(|err| ("preparation", format!("cannot save tree: {}", err)))?;
            fs::write(path, data).map_err(|err| preparation_error(path, &err))?;
        }
    }

    if cli.interpret {
        if let Some(parsed) = &program {
            println!("=== BEGIN INTERPRETATION ===");
            let frontend = Frontend::new(
                cli.program_args.clone(),
                cli.debug,
                io::stdin().lock(),
                io::stdout(),
            );
            let value = interpret(parsed, frontend).map_err(|err| ("runtime", err.render()))?;
            return Ok(exit_code(&value));
        }
    }

    Ok(0)
}

fn preparation_error(path: &std::path::Path, err: &io::Error) -> PhaseError {
    ("preparation", format!("{}: {}", path.display(), err))
}

/// The process exit code the evaluated program produced. The program's
/// return type is int, so anything else collapses to 0.
fn exit_code(value: &Value) -> i32 {
    match value.payload {
        Payload::Int(code) => code as i32,
        Payload::Real(code) => code as i32,
        _ => 0,
    }
}

/// Render a diagnostic in the standard shape:
///
/// ```text
/// Error during <phase>:
/// Line <n>, column <c>:
/// <source line>
/// <caret>
/// <ErrorKind>: <message>
/// ```
fn report(phase: &str, rendered: &str) {
    eprintln!();
    eprintln!("Error during {}:", phase);
    eprintln!("{}", rendered);
}

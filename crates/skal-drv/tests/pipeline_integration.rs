//! Whole-pipeline tests at the library level: tokenize → parse →
//! analyze → evaluate, plus the tree persistence round trip.

use skal_lex::tokenize;
use skal_par::{parse, Program};
use skal_run::{interpret, Frontend};
use skal_sem::{analyze, Payload};

fn build(source: &str) -> Program {
    let program = parse(tokenize(source).expect("tokenize failed")).expect("parse failed");
    analyze(&program).expect("analysis failed");
    program
}

fn evaluate(program: &Program, args: &[&str], input: &str) -> (skal_util::Result<skal_sem::Value>, String) {
    let mut out = Vec::new();
    let frontend = Frontend::new(
        args.iter().map(|s| s.to_string()).collect(),
        false,
        std::io::Cursor::new(input.as_bytes()),
        &mut out,
    );
    let result = interpret(program, frontend);
    (result, String::from_utf8(out).expect("output not utf-8"))
}

#[test]
fn pipeline_runs_factorial() {
    let source = "\
program main(n: int) -> int:
    def fact(n: int) -> int:
        if n <= 1:
            return 1
        else:
            return n * fact(n - 1)
    return fact(n)
";
    let program = build(source);
    let (result, _) = evaluate(&program, &["5"], "");
    assert_eq!(result.expect("run failed").payload, Payload::Int(120));
}

#[test]
fn pipeline_reads_and_prints() {
    let source = "\
program main() -> int:
    var name: string, n: int
    read name, n
    while n > 0:
        print name
        n := n - 1
    return 0
";
    let program = build(source);
    let (result, output) = evaluate(&program, &[], "ha 3\n");
    assert_eq!(result.expect("run failed").payload, Payload::Int(0));
    assert_eq!(output, "hahaha");
}

#[test]
fn saved_tree_round_trips() {
    let source = "\
program main(n: int) -> int:
    var x := 2 + 3 * 4
    if n > x:
        return 1
    return x
";
    let program = build(source);

    let json = serde_json::to_string(&program).expect("serialize failed");
    let loaded: Program = serde_json::from_str(&json).expect("deserialize failed");
    assert_eq!(program, loaded);

    // a reloaded tree evaluates without re-analysis
    let (result, _) = evaluate(&loaded, &["3"], "");
    assert_eq!(result.expect("run failed").payload, Payload::Int(14));
}

#[test]
fn loaded_tree_reports_runtime_semantic_errors() {
    // an unanalyzed tree must fail cleanly, not panic
    let source = "program main() -> int:\n    return nope\n";
    let program = parse(tokenize(source).expect("tokenize failed")).expect("parse failed");

    let json = serde_json::to_string(&program).expect("serialize failed");
    let loaded: Program = serde_json::from_str(&json).expect("deserialize failed");

    let (result, _) = evaluate(&loaded, &[], "");
    let err = result.expect_err("should fail");
    assert_eq!(err.message, "variable nope not declared");
}

#[test]
fn error_contexts_survive_the_round_trip() {
    let source = "program main() -> int:\n    return 1 // 0\n";
    let program = build(source);

    let json = serde_json::to_string(&program).expect("serialize failed");
    let loaded: Program = serde_json::from_str(&json).expect("deserialize failed");

    let (result, _) = evaluate(&loaded, &[], "");
    let err = result.expect_err("should fail");
    let ctx = err.ctx.expect("missing context");
    assert_eq!(ctx.line_no, 2);
    assert_eq!(&*ctx.line, "    return 1 // 0");
}

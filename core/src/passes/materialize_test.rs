use crate::ast;
use crate::marker::{EVAL_BLOCK_MARKER, EVAL_EXPRESSION_MARKER};
use crate::passes::{NameAlloc, materialize};

fn materialize_src(src: &str) -> String {
    let mut program = ast::parse(src).unwrap();
    let mut alloc = NameAlloc::for_program(&program);
    materialize::run(&mut program, &mut alloc).unwrap();
    ast::gen_code(&program)
}

#[test]
fn expression_marker_becomes_eval_call() {
    assert_eq!(
        materialize_src("x = (\"$CP_evalExp\", foo());"),
        "x=eval(\"\\\"$CP_eval\\\";(()=>{return (foo())})()\");"
    );
}

#[test]
fn block_marker_without_jumps_becomes_bare_eval_statement() {
    assert_eq!(
        materialize_src("{ \"$CP_evalBlock\"; doThing(); logIt(); }"),
        "{eval(\"\\\"$CP_eval\\\";(()=>{doThing();logIt();})()\");}"
    );
}

#[test]
fn function_body_marker_becomes_returned_eval() {
    assert_eq!(
        materialize_src("function f() { \"$CP_evalBlock\"; coldStuff(); }"),
        "function f(){return eval(\"\\\"$CP_eval\\\";(()=>{coldStuff();})()\");}"
    );
}

#[test]
fn block_marker_with_escaping_return_gets_a_stub() {
    let out = materialize_src("function f() { fast(); { \"$CP_evalBlock\"; slow(); return 42; } }");
    assert_eq!(
        out,
        concat!(
            "function f(){fast();",
            "{let $8=eval(\"\\\"$CP_eval\\\";(()=>{slow();return {R:1,V:42};})()\");",
            "if($8){if($8.R)return $8.V;}}}"
        )
    );
}

#[test]
fn loop_body_marker_replays_break_through_the_stub() {
    let out = materialize_src("while (spin()) { \"$CP_evalBlock\"; step(); break; }");
    assert_eq!(
        out,
        concat!(
            "while(spin())",
            "{let $8=eval(\"\\\"$CP_eval\\\";(()=>{step();return {a:1};})()\");",
            "if($8){if($8.a)break;}}"
        )
    );
}

#[test]
fn await_region_is_left_inline() {
    let out = materialize_src("async function f() { { \"$CP_evalBlock\"; await p; } }");
    assert_eq!(out, "async function f(){{await p;}}");
}

#[test]
fn yield_region_is_left_inline() {
    let out = materialize_src("function* f() { \"$CP_evalBlock\"; yield 1; }");
    assert_eq!(out, "function* f(){yield 1;}");
}

#[test]
fn empty_block_marker_is_consumed() {
    assert_eq!(materialize_src("{ \"$CP_evalBlock\"; }"), "{}");
}

#[test]
fn nested_markers_materialize_innermost_first() {
    let out = materialize_src("{ \"$CP_evalBlock\"; x = (\"$CP_evalExp\", foo()); }");
    assert!(!out.contains(EVAL_EXPRESSION_MARKER), "got: {out}");
    assert!(!out.contains(EVAL_BLOCK_MARKER), "got: {out}");
    // the inner call survives, escaped, inside the outer payload
    assert!(out.contains("\\\\\\\"$CP_eval\\\\\\\";"), "got: {out}");
}

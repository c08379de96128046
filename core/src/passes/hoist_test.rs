use crate::ast;
use crate::passes::hoist;

fn repair(src: &str) -> String {
    let mut program = ast::parse(src).unwrap();
    hoist::run(&mut program).unwrap();
    ast::gen_code(&program)
}

#[test]
fn vars_and_functions_move_out_of_the_marked_block() {
    let out = repair(
        "function f() { { \"$CP_evalBlock\"; var x = 1; function g() {} use(x); } return x; }",
    );
    assert_eq!(
        out,
        "function f(){var x;function g(){}{\"$CP_evalBlock\";var x=1;use(x);}return x;}"
    );
}

#[test]
fn var_names_are_sorted_and_deduplicated() {
    let out = repair("{ \"$CP_evalBlock\"; var b = 2; var a; if (x) { var b; } }");
    assert_eq!(
        out,
        "var a,b;{\"$CP_evalBlock\";var b=2;var a;if(x){var b;}}"
    );
}

#[test]
fn loop_head_vars_are_hoisted() {
    let out = repair("{ \"$CP_evalBlock\"; for (var i in o) { use(i); } for (var j = 0;;) {} }");
    assert_eq!(
        out,
        "var i,j;{\"$CP_evalBlock\";for(var i in o){use(i);}for(var j=0;;){}}"
    );
}

#[test]
fn nested_function_vars_stay_inside() {
    let out = repair("{ \"$CP_evalBlock\"; const f = () => { var inner = 1; }; }");
    assert_eq!(out, "{\"$CP_evalBlock\";const f=()=>{var inner=1;};}");
}

#[test]
fn function_body_markers_are_untouched() {
    let out = repair("function f() { \"$CP_evalBlock\"; var x = 1; }");
    assert_eq!(out, "function f(){\"$CP_evalBlock\";var x=1;}");
}

#[test]
fn unmarked_blocks_are_untouched() {
    let out = repair("{ var x = 1; function g() {} }");
    assert_eq!(out, "{var x=1;function g(){}}");
}

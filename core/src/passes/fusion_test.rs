use crate::ast;
use crate::marker;
use crate::passes::fusion;

fn eval(code: &str) -> String {
    marker::eval_call(code).to_string()
}

fn fuse(src: &str) -> String {
    let mut program = ast::parse(src).unwrap();
    fusion::run(&mut program).unwrap();
    ast::gen_code(&program)
}

#[test]
fn adjacent_calls_merge_into_one() {
    let out = fuse(&format!("false && {} && {};", eval("hello"), eval("world")));
    assert_eq!(out, format!("false&&{};", eval("(hello)&&(world)")));
}

#[test]
fn or_chains_merge_with_or() {
    let out = fuse(&format!("first || {} || {} || {};", eval("a"), eval("b"), eval("c")));
    assert_eq!(out, format!("first||{};", eval("(a)||(b)||(c)")));
}

#[test]
fn operands_left_of_the_first_call_are_untouched() {
    let out = fuse(&format!(
        "first && {} || bar || {} || {};",
        eval("foo"),
        eval("hello"),
        eval("world")
    ));
    assert_eq!(
        out,
        format!("first&&{}||bar||{};", eval("(foo)"), eval("(hello)||(world)"))
    );
}

#[test]
fn nested_chain_with_other_operator_fuses_on_its_own() {
    let out = fuse(&format!(
        "first || hoge || (hoge && {} && {});",
        eval("foo"),
        eval("bar")
    ));
    assert_eq!(out, format!("first||hoge||hoge&&{};", eval("(foo)&&(bar)")));
}

#[test]
fn user_eval_is_never_merged() {
    let out = fuse(&format!("check() && eval(userCode) && {};", eval("cold")));
    assert_eq!(out, format!("check()&&eval(userCode)&&{};", eval("(cold)")));
}

#[test]
fn chains_without_synthesized_calls_are_unchanged() {
    assert_eq!(fuse("a() && b() && c();"), "a()&&b()&&c();");
}

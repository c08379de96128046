use super::compress;
use crate::ast;

fn mini(src: &str) -> String {
    let mut program = ast::parse(src).unwrap();
    compress(&mut program);
    ast::gen_code(&program)
}

#[test]
fn if_chain_becomes_logical_chain() {
    assert_eq!(
        mini("if (first() && second()) { if (third()) { fourth(); } }"),
        "first()&&second()&&third()&&fourth();"
    );
}

#[test]
fn if_else_becomes_ternary() {
    assert_eq!(mini("if (a) { x(); } else { y(); }"), "a?x():y();");
}

#[test]
fn empty_consequent_keeps_the_test() {
    assert_eq!(mini("if (t()) {}"), "t();");
}

#[test]
fn empty_consequent_with_alternate_negates() {
    assert_eq!(mini("if (cond) {} else { fallback(); }"), "!cond&&fallback();");
}

#[test]
fn blocks_without_lexical_declarations_unwrap() {
    assert_eq!(mini("{ a(); { b(); } }"), "a();b();");
    assert_eq!(mini("{ var x = 1; use(x); }"), "var x=1;use(x);");
}

#[test]
fn lexical_blocks_are_kept() {
    assert_eq!(mini("{ let x = 1; use(x); }"), "{let x=1;use(x);}");
}

#[test]
fn empty_statements_are_dropped() {
    assert_eq!(mini("a();;;b();"), "a();b();");
}

#[test]
fn non_expression_branches_are_untouched() {
    assert_eq!(
        mini("if (a) { return 1; } else { return 2; }"),
        "if(a){return 1;}else {return 2;}"
    );
}

#[test]
fn function_expression_bodies_are_compressed() {
    assert_eq!(
        mini("const f = () => { if (a) { b(); } };"),
        "const f=()=>{a&&b();};"
    );
}

#[test]
fn eval_arguments_are_never_altered() {
    let src = "if (go()) { eval(\"\\\"$CP_eval\\\";payload()\"); }";
    assert_eq!(mini(src), "go()&&eval(\"\\\"$CP_eval\\\";payload()\");");
}

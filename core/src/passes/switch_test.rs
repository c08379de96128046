use crate::ast;
use crate::passes::{Mode, NameAlloc, switch};
use crate::trace::testutil;

fn optimize(src: &str) -> String {
    let trace = testutil::simulate_trace(src);
    let mut program = ast::parse(src).unwrap();
    let mut alloc = NameAlloc::for_program(&program);
    switch::run(&mut program, Mode::Optimize(&trace), &mut alloc).unwrap();
    ast::gen_code(&program)
}

#[test]
fn trace_mode_tags_every_case() {
    let mut program = ast::parse("switch (x) {\n  case 1:\n    a();\n  default:\n    b();\n}").unwrap();
    let mut alloc = NameAlloc::for_program(&program);
    switch::run(&mut program, Mode::Trace, &mut alloc).unwrap();
    assert_eq!(
        ast::gen_code(&program),
        "switch(x){case 1:__COLDPATH__.trace(\"SwitchCase/2:2\");a();default:__COLDPATH__.trace(\"SwitchCase/4:2\");b();}"
    );
}

#[test]
fn cold_run_collapses_into_nested_switch() {
    let src = "switch (val) {\n  case 'cold1':\n  case 'cold2':\n    push('a');\n    push('b');\n    break;\n  case 'cold3':\n    push('c');\n  case 'hit':\n    push('d');\n}";
    assert_eq!(
        optimize(src),
        concat!(
            "{let _S=val;",
            "cpSwitchL1:switch(_S){",
            "case \"cold1\":case \"cold2\":case \"cold3\":",
            "{\"$CP_evalBlock\";switch(_S){",
            "case \"cold1\":case \"cold2\":push(\"a\");push(\"b\");break cpSwitchL1;",
            "case \"cold3\":push(\"c\");}}",
            "case \"hit\":push(\"d\");}}"
        )
    );
}

#[test]
fn trailing_cold_run_with_default_collapses() {
    let src = "switch (k) {\n  case 'hit':\n    go();\n    break;\n  case 'cold1':\n    cold();\n  default:\n    coldDefault();\n}";
    assert_eq!(
        optimize(src),
        concat!(
            "{let _S=k;",
            "cpSwitchL1:switch(_S){",
            "case \"hit\":go();break cpSwitchL1;",
            "case \"cold1\":default:",
            "{\"$CP_evalBlock\";switch(_S){",
            "case \"cold1\":cold();",
            "default:coldDefault();}}}}"
        )
    );
}

#[test]
fn breaks_in_surviving_cases_are_relabelled_too() {
    let src = "switch (k) {\n  case 'hit':\n    go();\n    break;\n  case 'alsoHit':\n    stay();\n}";
    let out = optimize(src);
    assert!(out.contains("break cpSwitchL1;"), "got: {out}");
    assert!(!out.contains("$CP_evalBlock"), "got: {out}");
}

#[test]
fn side_effectful_case_test_blocks_collapse() {
    // the cold run's test is a call, so the run must stay inline
    let src = "switch (k) {\n  case coldCall():\n    coldBody();\n  case 'hit':\n    go();\n}";
    let out = optimize(src);
    assert!(!out.contains("$CP_evalBlock"), "got: {out}");
    assert!(out.contains("coldCall()"), "got: {out}");
}

#[test]
fn run_of_empty_cold_cases_is_left_alone() {
    let src = "switch (k) {\n  case 'coldA':\n  case 'coldB':\n  case 'hit':\n    go();\n}";
    let out = optimize(src);
    assert!(!out.contains("$CP_evalBlock"), "got: {out}");
}

#[test]
fn lexical_declarations_inside_switch_fail_fast() {
    let mut program = ast::parse("switch (x) { case 1: let y = 2; }").unwrap();
    let mut alloc = NameAlloc::for_program(&program);
    let err = switch::run(&mut program, Mode::Trace, &mut alloc).unwrap_err();
    assert!(err.to_string().contains("let/const"));
}

#[test]
fn nested_switch_in_surviving_case_is_processed() {
    let src = "switch (a) {\n  case 'hit':\n    switch (b) {\n      case 'coldInner':\n        coldThing();\n      case 'innerHit':\n        fine();\n    }\n}";
    // only the inner cold case is unexecuted; the outer case ran
    let trace = testutil::simulate_trace_with(src, |snippet| !snippet.starts_with("\"coldInner\""));
    let mut program = ast::parse(src).unwrap();
    let mut alloc = NameAlloc::for_program(&program);
    switch::run(&mut program, Mode::Optimize(&trace), &mut alloc).unwrap();
    let out = ast::gen_code(&program);
    // both switches were wrapped, each with its own label and discriminant
    assert!(out.contains("cpSwitchL1:"), "got: {out}");
    assert!(out.contains("cpSwitchL2:"), "got: {out}");
    assert!(out.contains("let _S="), "got: {out}");
    assert!(out.contains("let _S2="), "got: {out}");
    assert!(out.contains("$CP_evalBlock"), "got: {out}");
}

use crate::ast::{self, Stmt};
use crate::marker;
use crate::passes::jumps;

fn transform(src: &str) -> (Vec<Stmt>, jumps::EscapingJumps) {
    let mut program = ast::parse(src).unwrap();
    let registry = jumps::transform(&mut program.body).unwrap();
    (program.body, registry)
}

fn stub_code(registry: &jumps::EscapingJumps, body: &[Stmt]) -> String {
    let call = marker::eval_call(&jumps::eval_code(body));
    registry
        .stub("$8", call)
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[test]
fn escaping_return_becomes_record_and_stub_replays_it() {
    let (body, registry) = transform("for (let i = 0; i < 3; i++) { continue; } return 42;");
    let code = jumps::eval_code(&body);
    // the continue targets the loop inside the region and is untouched
    assert!(code.contains("continue;"), "got: {code}");
    assert!(code.contains("return {R:1,V:42};"), "got: {code}");
    assert!(!registry.is_empty());
    assert_eq!(
        stub_code(&registry, &body),
        format!(
            "let $8=eval(\"\\\"$CP_eval\\\";{}\");if($8){{if($8.R)return $8.V;}}",
            code.replace('"', "\\\"")
        )
    );
}

#[test]
fn bare_return_uses_boolean_record() {
    let (body, _) = transform("if (done) return;");
    assert!(jumps::eval_code(&body).contains("return {R:true};"));
}

#[test]
fn local_label_is_not_escaping() {
    let (body, registry) = transform("outer: while (x) { break outer; }");
    assert!(registry.is_empty());
    assert!(jumps::eval_code(&body).contains("break outer;"));
}

#[test]
fn identical_jumps_share_one_identifier() {
    let (body, registry) = transform("if (a) break away; if (b) break away; if (c) continue;");
    let code = jumps::eval_code(&body);
    assert_eq!(code.matches("return {a:1};").count(), 2);
    assert_eq!(code.matches("return {b:1};").count(), 1);
    let stub = stub_code(&registry, &body);
    assert!(stub.contains("if($8.a)break away;"), "got: {stub}");
    assert!(stub.contains("if($8.b)continue;"), "got: {stub}");
    assert!(!stub.contains("$8.R"), "got: {stub}");
}

#[test]
fn returns_inside_nested_functions_stay() {
    let (body, registry) = transform("const f = () => { return 1; }; function g() { return 2; }");
    assert!(registry.is_empty());
    let code = jumps::eval_code(&body);
    assert!(code.contains("return 1;"));
    assert!(code.contains("return 2;"));
}

#[test]
fn break_inside_nested_switch_is_not_escaping() {
    let (body, registry) = transform("switch (x) { case 1: break; }");
    assert!(registry.is_empty());
    assert!(jumps::eval_code(&body).contains("break;"));
}

#[test]
fn no_jumps_degenerates_to_bare_expression_stub() {
    let (body, registry) = transform("doWork();");
    assert!(registry.is_empty());
    let call = marker::eval_call(&jumps::eval_code(&body));
    let stub = registry.stub("$8", call);
    assert_eq!(stub.len(), 1);
    assert!(stub[0].to_string().starts_with("eval("));
}

#[test]
fn yield_in_region_is_fatal() {
    let mut program = ast::parse("yield x;").unwrap();
    let err = jumps::transform(&mut program.body).unwrap_err();
    assert!(err.to_string().contains("generator"));
}

#[test]
fn alphabet_exhaustion_aborts() {
    let src: String = (0..27).map(|i| format!("if (c{i}) break L{i};\n")).collect();
    let mut program = ast::parse(&src).unwrap();
    let err = jumps::transform(&mut program.body).unwrap_err();
    assert!(err.to_string().contains("alphabet"), "got: {err}");
}

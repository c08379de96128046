use crate::marker::{EVAL_BLOCK_MARKER, EVAL_CALL_MARKER, EVAL_EXPRESSION_MARKER};
use crate::optimize::{OptimizeOptions, generate_optimized_code, generate_trace_code, render_extracted_js};
use crate::trace::{TRACE_RUNTIME_GLOBAL, testutil};

fn no_loader() -> OptimizeOptions {
    OptimizeOptions {
        include_loader: false,
        keep_code: false,
    }
}

#[test]
fn trace_code_carries_runtime_and_counters() {
    let out = generate_trace_code("function f() {\n  a();\n}\nx ? y : z;").unwrap();
    assert!(out.starts_with("globalThis.__COLDPATH_TRACE__"));
    assert!(out.contains(&format!("{}.trace(\"Statement/2:2\")", TRACE_RUNTIME_GLOBAL)));
    assert!(out.contains("ConditionalExpression/"));
}

#[test]
fn pipeline_is_deterministic() {
    let src = "function f() {\n  hot();\n  coldWork();\n  coldMore();\n}\nf();";
    let trace = testutil::simulate_trace(src);
    let a = generate_optimized_code(src, &trace, &OptimizeOptions::default()).unwrap();
    let b = generate_optimized_code(src, &trace, &OptimizeOptions::default()).unwrap();
    assert_eq!(a.code, b.code);
    assert_eq!(a.extracted, b.extracted);
}

#[test]
fn no_marker_lexeme_survives_in_the_output() {
    let src = "function f(sel) {\n  hot();\n  coldWork();\n}\nuse(always ? fast : coldSlow);\ngo() || coldFallback();\nf(1);";
    let trace = testutil::simulate_trace(src);
    let out = generate_optimized_code(src, &trace, &OptimizeOptions::default()).unwrap();
    assert!(!out.code.contains(EVAL_EXPRESSION_MARKER), "got: {}", out.code);
    assert!(!out.code.contains(EVAL_BLOCK_MARKER), "got: {}", out.code);
    assert!(!out.code.contains(EVAL_CALL_MARKER), "got: {}", out.code);
    assert!(!out.code.contains(TRACE_RUNTIME_GLOBAL), "got: {}", out.code);
}

#[test]
fn switch_fallthrough_nests_and_relabels() {
    let src = "switch (pick) {\n  case 'cold1':\n    one();\n    break;\n  case 'cold2':\n    two();\n  case 'three':\n    three();\n    break;\n  case 'four':\n    four();\n}";
    let trace = testutil::simulate_trace(src);
    let out = generate_optimized_code(src, &trace, &no_loader()).unwrap();
    // the two cold cases collapsed into one deferred payload
    assert_eq!(out.extracted.len(), 1, "code: {}", out.code);
    let payload = &out.extracted[0];
    assert!(payload.contains("switch(_S)"), "payload: {payload}");
    assert!(payload.contains("one()"), "payload: {payload}");
    assert!(payload.contains("two()"), "payload: {payload}");
    // the bare break from case cold1 now exits through the outer label,
    // carried through the jump protocol
    assert!(payload.contains("return {a:1}"), "payload: {payload}");
    assert!(out.code.contains("cpSwitchL1:switch(_S)"), "code: {}", out.code);
    assert!(out.code.contains("break cpSwitchL1"), "code: {}", out.code);
    // the surviving cases stay inline
    assert!(out.code.contains("three()"), "code: {}", out.code);
    assert!(out.code.contains("four()"), "code: {}", out.code);
}

#[test]
fn escaping_return_survives_deferral() {
    let src = "function f(go) {\n  ready();\n  if (go) {\n    var coldCache = make();\n    coldUse(coldCache);\n  }\n  return typeof coldCache;\n}\nf(false);";
    let trace = testutil::simulate_trace(src);
    let out = generate_optimized_code(src, &trace, &no_loader()).unwrap();
    // the hoisted var is declared before the deferred region runs
    let var_at = out.code.find("var coldCache;").expect("hoisted declaration");
    let stub_at = out.code.find("let $8=").expect("stub binding");
    assert!(var_at < stub_at, "code: {}", out.code);
    assert!(out.code.contains("if($8.R)return $8.V;"), "code: {}", out.code);
    let payload = out.extracted.join("\n");
    assert!(payload.contains("return {R:1,V:typeof coldCache}"), "payload: {payload}");
}

#[test]
fn fused_chain_yields_one_payload() {
    let src = "function cold1() { return true; }\nfunction cold2() { return true; }\nstart() || cold1() || cold2();";
    let trace = testutil::simulate_trace(src);
    let out = generate_optimized_code(src, &trace, &no_loader()).unwrap();
    assert!(out.code.contains("start()||eval(_X(0))"), "code: {}", out.code);
    assert_eq!(out.code.matches("_X(").count(), 1, "code: {}", out.code);
    assert_eq!(
        out.extracted,
        vec!["((()=>{return (cold1())})())||((()=>{return (cold2())})())".to_string()]
    );
}

#[test]
fn payload_indices_line_up_with_call_sites() {
    let src = "function a() {\n  coldFirst(one, two, three);\n}\nfunction b() {\n  coldSecond(four, five, six);\n}\na();b();";
    let trace = testutil::simulate_trace(src);
    let out = generate_optimized_code(src, &trace, &no_loader()).unwrap();
    assert_eq!(out.extracted.len(), 2, "code: {}", out.code);
    let first = out.code.find("eval(_X(0))").expect("first call site");
    let second = out.code.find("eval(_X(1))").expect("second call site");
    assert!(first < second);
    assert!(out.extracted[0].contains("coldFirst"));
    assert!(out.extracted[1].contains("coldSecond"));
}

#[test]
fn keep_code_stays_self_contained() {
    let src = "function f() {\n  coldPayloadThatIsDefinitelyLongEnough(aaa, bbb);\n}\nf();";
    let trace = testutil::simulate_trace(src);
    let out = generate_optimized_code(
        src,
        &trace,
        &OptimizeOptions {
            include_loader: false,
            keep_code: true,
        },
    )
    .unwrap();
    assert!(out.extracted.is_empty());
    assert!(!out.code.contains("_X("), "code: {}", out.code);
    assert!(out.code.contains("coldPayloadThatIsDefinitelyLongEnough"), "code: {}", out.code);
}

#[test]
fn loader_is_prepended_by_default() {
    let src = "function f() {\n  coldPayloadThatIsDefinitelyLongEnough(aaa, bbb);\n}\nf();";
    let trace = testutil::simulate_trace(src);
    let out = generate_optimized_code(src, &trace, &OptimizeOptions::default()).unwrap();
    assert!(out.code.starts_with("\"use strict\";"));
    assert!(out.code.contains("globalThis._X"));
    assert!(out.code.contains(".coldpath-extracted.js"));
    assert!(out.code.contains("XMLHttpRequest"));
}

#[test]
fn await_regions_stay_inline() {
    let src = "async function f() {\n  hot();\n  await coldFetch();\n}\nf();";
    let trace = testutil::simulate_trace(src);
    let out = generate_optimized_code(src, &trace, &no_loader()).unwrap();
    assert!(out.extracted.is_empty(), "code: {}", out.code);
    assert!(out.code.contains("await coldFetch()"), "code: {}", out.code);
    assert!(!out.code.contains(EVAL_BLOCK_MARKER), "code: {}", out.code);
}

#[test]
fn rendered_payload_module_lists_codes_by_index() {
    let rendered = render_extracted_js(&["a()".to_string(), "b()".to_string()]);
    assert_eq!(
        rendered,
        "\"use strict\";const data={\"extractedCodes\":[\"a()\",\"b()\"]};return{getCode(i){return data.extractedCodes[i]}}"
    );
}

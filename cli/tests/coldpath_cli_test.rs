use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

fn coldpath() -> Command {
    Command::cargo_bin("coldpath").expect("binary built")
}

fn write_file(path: &Path, contents: &str) {
    fs::write(path, contents).expect("write test file");
}

const APP_SOURCE: &str = "function start() {\n  render();\n}\nfunction panic() {\n  reportBigProblemSomewhere(alpha, beta, gamma);\n}\nstart();\n";

#[test]
fn trace_backs_up_and_instruments_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("app.js");
    write_file(&target, APP_SOURCE);

    coldpath()
        .arg("trace")
        .arg(&target)
        .assert()
        .success()
        .stdout(predicate::str::contains("backing up the original code"))
        .stdout(predicate::str::contains("__COLDPATH_TRACE__"));

    let backup = dir.path().join("app.coldpath-original.js");
    assert_eq!(fs::read_to_string(&backup).unwrap(), APP_SOURCE);

    let instrumented = fs::read_to_string(&target).unwrap();
    assert!(instrumented.contains("globalThis.__COLDPATH__"));
    assert!(instrumented.contains("__COLDPATH__.trace(\"Statement/2:2\")"));
}

#[test]
fn trace_twice_keeps_the_first_backup() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("app.js");
    write_file(&target, APP_SOURCE);

    coldpath().arg("trace").arg(&target).assert().success();
    // the target now holds instrumented code; a second run must re-read the backup
    coldpath().arg("trace").arg(&target).assert().success();

    let backup = dir.path().join("app.coldpath-original.js");
    assert_eq!(fs::read_to_string(&backup).unwrap(), APP_SOURCE);
    let instrumented = fs::read_to_string(&target).unwrap();
    assert_eq!(instrumented.matches("globalThis.__COLDPATH__").count(), 1);
}

#[test]
fn optimize_writes_main_and_extracted_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("app.js");
    write_file(&target, APP_SOURCE);
    // a trace that saw start() run and panic() never run
    coldpath().arg("trace").arg(&target).assert().success();
    write_file(
        &dir.path().join("app.coldpath-tracedata.json"),
        "{\"counts\":{\"Statement/2:2\":1}}",
    );

    coldpath()
        .arg("optimize")
        .arg(&target)
        .assert()
        .success()
        .stdout(predicate::str::contains("bytes"));

    let main = fs::read_to_string(dir.path().join("app.coldpath-main.js")).unwrap();
    assert!(main.starts_with("\"use strict\";"), "got: {main}");
    assert!(main.contains("eval(_X(0))"), "got: {main}");
    assert!(main.contains("render()"), "got: {main}");
    assert!(!main.contains("$CP_"), "got: {main}");

    let extracted = fs::read_to_string(dir.path().join("app.coldpath-extracted.js")).unwrap();
    assert!(extracted.starts_with("\"use strict\";const data="), "got: {extracted}");
    assert!(extracted.contains("reportBigProblemSomewhere"), "got: {extracted}");
    assert!(extracted.contains("getCode(i)"), "got: {extracted}");

    let json: Vec<String> =
        serde_json::from_str(&fs::read_to_string(dir.path().join("app.coldpath-extracted.json")).unwrap()).unwrap();
    assert_eq!(json.len(), 1);
    assert!(json[0].contains("reportBigProblemSomewhere"));
}

#[test]
fn optimize_without_tracedata_fails() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("app.js");
    write_file(&target, APP_SOURCE);

    coldpath()
        .arg("optimize")
        .arg(&target)
        .assert()
        .failure()
        .stderr(predicate::str::contains("trace data"));
}

#[test]
fn non_js_targets_are_refused() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("app.ts");
    write_file(&target, "let x = 1;\n");

    coldpath()
        .arg("trace")
        .arg(&target)
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not end with"));
}

#[test]
fn parent_dir_components_are_refused() {
    coldpath()
        .arg("trace")
        .arg("dist/../app.js")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Parent directory components"));
}

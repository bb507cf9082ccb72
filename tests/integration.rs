use std::path::Path;
use std::process::{Command, Output};

fn toondoc_cmd(fixture: &str) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_toondoc"));
    cmd.current_dir(Path::new("tests/fixtures").join(fixture));
    cmd
}

fn run(fixture: &str, args: &[&str]) -> Output {
    toondoc_cmd(fixture).args(args).output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn check_passes_on_valid_workspace() {
    let check = run("basic", &["check"]);
    assert!(check.status.success(), "check failed: {}{}", stdout(&check), stderr(&check));
    assert!(stdout(&check).contains("All 1 documents valid"));
}

#[test]
fn check_reports_broken_references_first() {
    let check = run("broken", &["check"]);
    assert_eq!(check.status.code(), Some(2));

    let out = stdout(&check);
    assert!(out.contains("REF_NOT_FOUND"), "{out}");
    assert!(out.contains("CIRCULAR_REFERENCE"), "{out}");
    assert!(out.contains("INVALID_ENUM"), "{out}");
    assert!(out.contains("plan.toon.md:7"), "{out}");
}

#[test]
fn validate_valid_document() {
    let validate = run("basic", &["validate", "docs/auth.toon.md"]);
    assert!(validate.status.success(), "{}", stdout(&validate));
    assert!(stdout(&validate).contains("valid: 9 fields"));
}

#[test]
fn validate_json_output() {
    let validate = run("broken", &["validate", "plan.toon.md", "--json"]);
    assert_eq!(validate.status.code(), Some(1));

    let json: serde_json::Value = serde_json::from_slice(&validate.stdout).unwrap();
    assert_eq!(json["valid"], false);
    let codes: Vec<&str> = json["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["code"].as_str().unwrap())
        .collect();
    assert_eq!(codes, vec!["INVALID_FORMAT", "INVALID_ENUM"]);
}

#[test]
fn validate_json_reports_wrong_types() {
    let validate = run("broken", &["validate", "typed.json", "--json"]);
    assert_eq!(validate.status.code(), Some(1), "{}", stderr(&validate));

    let json: serde_json::Value = serde_json::from_slice(&validate.stdout).unwrap();
    let findings: Vec<(&str, &str)> = json["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| (e["field"].as_str().unwrap(), e["code"].as_str().unwrap()))
        .collect();
    assert_eq!(findings, vec![("name", "INVALID_TYPE"), ("tags", "INVALID_TYPE")]);
}

#[test]
fn validate_unknown_type_fails() {
    let validate = run("basic", &["validate", "docs/auth.toon.md", "--type", "novel"]);
    assert_eq!(validate.status.code(), Some(1));
    assert!(stdout(&validate).contains("no schema for type `novel`"));
}

#[test]
fn refs_reports_cycle_and_missing_symbol() {
    let refs = run("broken", &["refs", "plan.toon.md"]);
    assert_eq!(refs.status.code(), Some(2));

    let out = stdout(&refs);
    assert!(out.contains("3 references: 2 resolved, 1 unresolved"), "{out}");
    assert!(out.contains("CYCLE"), "{out}");
}

#[test]
fn refs_lists_resolved_edges() {
    let refs = run("basic", &["refs", "docs/auth.toon.md"]);
    assert!(refs.status.success(), "{}", stdout(&refs));
    assert!(stdout(&refs).contains("login.creates -> session"));
}

#[test]
fn parse_json_round_trips_through_serde() {
    let parse = run("basic", &["parse", "docs/auth.toon.md", "--json"]);
    assert!(parse.status.success());

    let json: serde_json::Value = serde_json::from_slice(&parse.stdout).unwrap();
    assert_eq!(json["document"]["name"], "auth");
    assert_eq!(json["document"]["tags"], serde_json::json!(["security", "web"]));
    assert_eq!(json["symbols"]["login"]["line"], 12);
}

#[test]
fn symbols_lists_ids_with_lines() {
    let symbols = run("basic", &["symbols", "docs/auth.toon.md"]);
    assert!(symbols.status.success());
    let out = stdout(&symbols);
    assert!(out.contains("docs/auth.toon.md:12  login"), "{out}");
    assert!(out.contains("docs/auth.toon.md:20  session"), "{out}");
}

#[test]
fn missing_document_is_a_runtime_error() {
    let parse = run("basic", &["parse", "docs/nope.toon.md"]);
    assert_eq!(parse.status.code(), Some(3));
    assert!(stderr(&parse).contains("Error: Document Not Found"));
}

#[test]
fn convert_markdown_to_toon() {
    let convert = run("basic", &["convert", "docs/notes.md", "--to", "toon"]);
    assert!(convert.status.success());
    let out = stdout(&convert);
    assert!(out.starts_with("# Notes\n\n## Document Overview\n"), "{out}");
    assert!(out.contains("- owner: \"platform\""), "{out}");
}

#[test]
fn convert_rejects_unknown_format() {
    let convert = run("basic", &["convert", "docs/notes.md", "--to", "pdf"]);
    assert!(!convert.status.success());
}

#[test]
fn templates_lists_and_shows() {
    let list = run("basic", &["templates"]);
    assert!(list.status.success());
    assert!(stdout(&list).contains("requirements  (toon)"));

    let show = run("basic", &["templates", "requirements"]);
    assert!(show.status.success());
    assert!(stdout(&show).contains("Description:   Starting point for a requirements document"));

    let missing = run("basic", &["templates", "nope"]);
    assert_eq!(missing.status.code(), Some(3));
    assert!(stderr(&missing).contains("Template Not Found"));
}

#[test]
fn tokens_prints_comparison() {
    let tokens = run("basic", &["tokens", "docs/auth.toon.md"]);
    assert!(tokens.status.success());
    let out = stdout(&tokens);
    assert!(out.contains("| TOON"), "{out}");
    assert!(out.contains("TOON vs JSON:"), "{out}");
}

#[test]
fn info_json_describes_state() {
    let info = run("basic", &["info", "--json"]);
    assert!(info.status.success());

    let json: serde_json::Value = serde_json::from_slice(&info.stdout).unwrap();
    assert_eq!(json["current_state"]["config_found"], true);
    assert_eq!(json["current_state"]["documents"], 1);
    assert_eq!(json["current_state"]["templates"], 1);
    assert_eq!(json["exit_codes"].as_array().map(Vec::len), Some(4));
}

//! E2E CLI tests covering:
//! - `mx init` skeleton and re-init guard
//! - Document lifecycle: `mx new`, `mx list`, `mx show`
//! - Link insertion with `mx link`, including the skipped case
//! - `mx import` / `mx export`
//! - Structured errors and codes in `--json` mode
//!
//! Each test runs `mx` as a subprocess against an isolated temp journal.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

/// Build a Command targeting the `mx` binary, rooted in `dir`.
fn mx_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("mx"));
    cmd.current_dir(dir);
    cmd.arg("--root").arg(dir);
    cmd.env("MEMEX_LOG", "error");
    cmd.env("XDG_CONFIG_HOME", dir.join("user-config"));
    cmd.env("HOME", dir);
    cmd.env_remove("FORMAT");
    cmd.env_remove("OPENAI_API_KEY");
    cmd
}

fn init_journal() -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    mx_cmd(dir.path()).arg("init").assert().success();
    dir
}

fn json_of(cmd: &mut Command) -> Value {
    let output = cmd.arg("--json").output().expect("mx should not crash");
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid JSON on stdout")
}

/// Create a document, return its ID.
fn new_doc(dir: &Path, title: &str, body: &str) -> u64 {
    let json = json_of(mx_cmd(dir).args(["new", "--title", title, "--body", body]));
    json["id"].as_u64().expect("id field")
}

fn error_of(cmd: &mut Command) -> Value {
    let output = cmd.arg("--json").output().expect("mx should not crash");
    assert!(!output.status.success(), "command unexpectedly succeeded");
    let stderr = String::from_utf8_lossy(&output.stderr);
    let start = stderr.find('{').expect("json error on stderr");
    let mut stream = serde_json::Deserializer::from_str(&stderr[start..]).into_iter::<Value>();
    stream
        .next()
        .expect("one json value")
        .expect("valid json error")
}

// ---------------------------------------------------------------------------
// Init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_journal_files() {
    let dir = init_journal();
    let memex = dir.path().join(".memex");
    assert!(memex.join("config.toml").is_file());
    assert!(memex.join("documents.sqlite3").is_file());

    let config = std::fs::read_to_string(memex.join("config.toml")).expect("config");
    assert!(config.contains("prompt_prefix = \"Please expand on this: \""));
}

#[test]
fn init_twice_fails_without_force() {
    let dir = init_journal();
    let err = error_of(mx_cmd(dir.path()).arg("init"));
    assert_eq!(err["error"]["error_code"], "E1003");

    mx_cmd(dir.path()).args(["init", "--force"]).assert().success();
}

#[test]
fn commands_outside_a_journal_report_not_initialized() {
    let dir = TempDir::new().expect("temp dir");
    let err = error_of(mx_cmd(dir.path()).arg("list"));
    assert_eq!(err["error"]["error_code"], "E1001");
    assert!(
        err["error"]["suggestion"]
            .as_str()
            .is_some_and(|s| s.contains("mx init"))
    );
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

#[test]
fn new_list_show_flow() {
    let dir = init_journal();
    let cats = new_doc(dir.path(), "Felines", "cats are great\nand they sleep");
    let other = new_doc(dir.path(), "Other", &format!("see [felines](doc:{cats})"));
    assert_eq!((cats, other), (1, 2));

    let list = json_of(mx_cmd(dir.path()).arg("list"));
    let rows = list.as_array().expect("array");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["title"], "Felines");
    assert_eq!(rows[0]["description"], "cats are great");

    let show = json_of(mx_cmd(dir.path()).args(["show", "2"]));
    assert_eq!(show["body"], "see [felines](doc:1)");
    assert_eq!(show["links"][0]["label"], "felines");
    assert_eq!(show["links"][0]["target"], 1);
}

#[test]
fn list_text_mode_is_tab_separated() {
    let dir = init_journal();
    new_doc(dir.path(), "Felines", "cats");
    mx_cmd(dir.path())
        .args(["list", "--format", "text"])
        .assert()
        .success()
        .stdout("1\tFelines\tcats\n");
}

#[test]
fn new_reads_body_from_file() {
    let dir = init_journal();
    let file = dir.path().join("draft.txt");
    std::fs::write(&file, "drafted body").expect("write draft");

    let json = json_of(mx_cmd(dir.path()).args(["new", "--title", "Draft", "--file"]).arg(&file));
    let id = json["id"].as_u64().expect("id");
    let show = json_of(mx_cmd(dir.path()).args(["show", &id.to_string()]));
    assert_eq!(show["body"], "drafted body");
}

#[test]
fn show_unknown_document_is_structured_error() {
    let dir = init_journal();
    let err = error_of(mx_cmd(dir.path()).args(["show", "42"]));
    assert_eq!(err["error"]["message"], "document 42 not found");
    assert_eq!(err["error"]["error_code"], "E2001");
}

#[test]
fn show_human_error_has_suggestion() {
    let dir = init_journal();
    mx_cmd(dir.path())
        .args(["show", "42", "--format", "text"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error: document 42 not found"))
        .stderr(predicate::str::contains("suggestion: Run `mx list`"));
}

// ---------------------------------------------------------------------------
// Links
// ---------------------------------------------------------------------------

#[test]
fn link_inserts_markup_at_first_occurrence() {
    let dir = init_journal();
    let source = new_doc(dir.path(), "Felines", "cats are great and cats sleep");
    let target = new_doc(dir.path(), "Cats", "all about cats");

    let json = json_of(mx_cmd(dir.path()).args([
        "link",
        &source.to_string(),
        "--text",
        "cats",
        "--target",
        &target.to_string(),
    ]));
    assert_eq!(json["status"], "inserted");
    assert_eq!(json["start"], 0);

    let show = json_of(mx_cmd(dir.path()).args(["show", &source.to_string()]));
    assert_eq!(show["body"], "[cats](doc:2) are great and cats sleep");
}

#[test]
fn link_with_absent_text_is_skipped_not_failed() {
    let dir = init_journal();
    let source = new_doc(dir.path(), "Felines", "cats are great");
    new_doc(dir.path(), "Dogs", "woof");

    let json = json_of(mx_cmd(dir.path()).args(["link", "1", "--text", "dogs", "--target", "2"]));
    assert_eq!(json["status"], "skipped");
    assert_eq!(json["reason"], "text not found outside existing links");

    let show = json_of(mx_cmd(dir.path()).args(["show", &source.to_string()]));
    assert_eq!(show["body"], "cats are great");
}

#[test]
fn link_to_unknown_target_fails() {
    let dir = init_journal();
    new_doc(dir.path(), "Felines", "cats are great");
    let err = error_of(mx_cmd(dir.path()).args(["link", "1", "--text", "cats", "--target", "9"]));
    assert_eq!(err["error"]["error_code"], "E2001");
}

// ---------------------------------------------------------------------------
// Import / export
// ---------------------------------------------------------------------------

#[test]
fn import_strips_non_printable_and_uses_file_name() {
    let dir = init_journal();
    let file = dir.path().join("notes.txt");
    std::fs::write(&file, "caf\u{e9} menu\r\n\tsoup\u{7}").expect("write notes");

    let json = json_of(mx_cmd(dir.path()).arg("import").arg(&file));
    let id = json["id"].as_u64().expect("id");

    let show = json_of(mx_cmd(dir.path()).args(["show", &id.to_string()]));
    assert_eq!(show["title"], "notes.txt");
    assert_eq!(show["body"], "caf menu\r\n\tsoup");
}

#[test]
fn import_missing_file_reports_import_failed() {
    let dir = init_journal();
    let err = error_of(mx_cmd(dir.path()).args(["import", "does-not-exist.txt"]));
    assert_eq!(err["error"]["error_code"], "E5002");
}

#[test]
fn export_to_stdout_and_file() {
    let dir = init_journal();
    let id = new_doc(dir.path(), "Felines", "cats are [great](doc:1)");

    mx_cmd(dir.path())
        .args(["export", &id.to_string(), "--format", "text"])
        .assert()
        .success()
        .stdout("cats are [great](doc:1)");

    let out = dir.path().join("out.txt");
    mx_cmd(dir.path())
        .args(["export", &id.to_string(), "--output"])
        .arg(&out)
        .assert()
        .success();
    assert_eq!(
        std::fs::read_to_string(&out).expect("exported file"),
        "cats are [great](doc:1)"
    );
}

#[test]
fn completions_generate_for_bash() {
    let dir = TempDir::new().expect("temp dir");
    mx_cmd(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mx"));
}

//! CLI regression tests: mode selection, diagnostic views, and the
//! compressed output file.

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;

fn fixture(name: &str, contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("astpack-cli-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn small_program() -> &'static str {
    r#"{
        "type": "Program",
        "sourceType": "script",
        "body": [
            {
                "type": "ExpressionStatement",
                "expression": {
                    "type": "CallExpression",
                    "callee": {"type": "Identifier", "name": "greet"},
                    "arguments": [{"type": "Literal", "value": "hi", "raw": "\"hi\""}]
                }
            }
        ]
    }"#
}

fn astpack() -> Command {
    Command::cargo_bin("astpack").unwrap()
}

#[test]
fn no_mode_selected_exits_nonzero() {
    let path = fixture("no-mode.json", small_program());
    astpack()
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no output mode selected"));
}

#[test]
fn negated_mode_counts_as_no_mode() {
    let path = fixture("negated.json", small_program());
    astpack()
        .arg(&path)
        .args(["--compress", "--no-compress"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no output mode selected"));
}

#[test]
fn unreadable_file_exits_nonzero() {
    astpack()
        .arg("definitely-not-here.json")
        .arg("--ast")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}

#[test]
fn malformed_json_exits_nonzero() {
    let path = fixture("broken.json", "{ not json");
    astpack()
        .arg(&path)
        .arg("--ast")
        .assert()
        .failure()
        .stderr(predicate::str::contains("JSON syntax-tree document"));
}

#[test]
fn ast_mode_prints_the_raw_document() {
    let path = fixture("ast.json", small_program());
    astpack()
        .arg(&path)
        .arg("--ast")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"Program\""));
}

#[test]
fn tokens_mode_prints_leaves_in_source_order() {
    let path = fixture("tokens.json", small_program());
    astpack()
        .arg(&path)
        .arg("--tokens")
        .assert()
        .success()
        .stdout(predicate::str::contains("greet").and(predicate::str::contains("\"hi\"")));
}

#[test]
fn lifted_mode_prints_the_typed_tree() {
    let path = fixture("lifted.json", small_program());
    astpack()
        .arg(&path)
        .arg("--lifted")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("<root>: prog")
                .and(predicate::str::contains("callee: id")),
        );
}

#[test]
fn type_sorted_mode_groups_counts() {
    let path = fixture("type-sorted.json", small_program());
    astpack()
        .arg(&path)
        .arg("--type-sorted")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Identifier").and(predicate::str::contains("CallExpression")),
        );
}

#[test]
fn compress_mode_writes_the_stream_next_to_the_input() {
    let path = fixture("compress.json", small_program());
    astpack()
        .arg(&path)
        .arg("--compress")
        .assert()
        .success()
        .stdout(predicate::str::contains("bytes:"));

    let out = path.with_extension("astp");
    let bytes = fs::read(&out).unwrap();
    assert!(!bytes.is_empty());
    // Three table entries: "script", "greet", "hi".
    assert_eq!(bytes[0], 0x03);
}

#[test]
fn strict_modes_reject_unknown_node_types() {
    let path = fixture(
        "unknown-type.json",
        r#"{"type": "Program", "sourceType": "script", "body": [{"type": "Mystery"}]}"#,
    );
    astpack()
        .arg(&path)
        .arg("--compress")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown node type 'Mystery'"));
}

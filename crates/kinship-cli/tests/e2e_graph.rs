//! E2E hierarchy workflow through the `kin` binary.
//!
//! Covers init, add/rm, reachability queries, error codes, verify, and
//! export/import round trips between two projects.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

fn kin_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("kin"));
    cmd.current_dir(dir);
    cmd.env("KINSHIP_LOG", "error");
    cmd.env_remove("FORMAT");
    cmd
}

fn init_project() -> TempDir {
    let dir = tempfile::tempdir().expect("temp dir");
    kin_cmd(dir.path()).args(["init"]).assert().success();
    dir
}

fn json(dir: &Path, args: &[&str]) -> Value {
    let output = kin_cmd(dir)
        .args(args)
        .arg("--json")
        .output()
        .expect("kin should not crash");
    assert!(
        output.status.success(),
        "kin {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid JSON")
}

fn ids(value: &Value) -> Vec<i64> {
    value["groups"]
        .as_array()
        .expect("groups array")
        .iter()
        .map(|id| id.as_i64().expect("integer id"))
        .collect()
}

fn add(dir: &Path, parent: i64, child: i64) -> Value {
    json(dir, &["add", &parent.to_string(), &child.to_string()])
}

#[test]
fn add_query_remove_round_trip() {
    let dir = init_project();
    let root = dir.path();

    let first = add(root, 1, 2);
    assert_eq!(first["created"], true);
    assert_eq!(first["parent"], 1);
    assert_eq!(first["child"], 2);
    add(root, 2, 3);
    add(root, 1, 4);

    assert_eq!(ids(&json(root, &["descendants", "1"])), vec![2, 3, 4]);
    assert_eq!(ids(&json(root, &["ancestors", "3"])), vec![1, 2]);
    assert_eq!(ids(&json(root, &["descendants", "1", "--direct"])), vec![2, 4]);
    assert_eq!(json(root, &["check", "1", "3"])["reachable"], true);

    json(root, &["rm", "1", "2"]);
    assert_eq!(ids(&json(root, &["descendants", "1"])), vec![4]);
    assert_eq!(json(root, &["check", "1", "3"])["reachable"], false);
}

#[test]
fn repeated_add_reports_the_existing_edge() {
    let dir = init_project();
    let first = add(dir.path(), 5, 6);
    let again = add(dir.path(), 5, 6);

    assert_eq!(again["created"], false);
    assert_eq!(again["edge_id"], first["edge_id"]);
    assert_eq!(again["rows"], 1);
}

#[test]
fn cycle_is_rejected_with_stable_code() {
    let dir = init_project();
    add(dir.path(), 1, 2);
    add(dir.path(), 2, 3);

    let output = kin_cmd(dir.path())
        .args(["add", "3", "1", "--json"])
        .output()
        .expect("kin should not crash");
    assert!(!output.status.success());

    let err: Value = serde_json::from_slice(&output.stderr).expect("JSON error on stderr");
    assert_eq!(err["error"]["code"], "E2001");
    let message = err["error"]["message"].as_str().expect("message");
    assert!(message.contains("group 1 as a subgroup of group 3"), "{message}");

    assert_eq!(ids(&json(dir.path(), &["descendants", "3"])), Vec::<i64>::new());
}

#[test]
fn self_loop_is_a_cycle_in_text_mode() {
    let dir = init_project();
    kin_cmd(dir.path())
        .args(["add", "7", "7", "--format", "text"])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("error[E2001]"));
}

#[test]
fn strict_queries_reject_unknown_groups() {
    let dir = init_project();
    add(dir.path(), 1, 2);

    assert_eq!(ids(&json(dir.path(), &["descendants", "99"])), Vec::<i64>::new());
    kin_cmd(dir.path())
        .args(["descendants", "99", "--strict", "--format", "text"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[E2002]"));
}

#[test]
fn commands_outside_a_project_fail_with_not_initialized() {
    let dir = tempfile::tempdir().expect("temp dir");
    kin_cmd(dir.path())
        .args(["descendants", "1", "--format", "text"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[E1001]"))
        .stderr(predicate::str::contains("kin init"));
}

#[test]
fn commands_work_from_a_subdirectory() {
    let dir = init_project();
    add(dir.path(), 1, 2);
    let nested = dir.path().join("src").join("deep");
    std::fs::create_dir_all(&nested).expect("create nested");

    assert_eq!(ids(&json(&nested, &["descendants", "1"])), vec![2]);
}

#[test]
fn verify_and_rebuild_on_a_healthy_project() {
    let dir = init_project();
    for (p, c) in [(1, 2), (1, 3), (2, 4), (3, 4)] {
        add(dir.path(), p, c);
    }

    let report = json(dir.path(), &["verify"]);
    assert_eq!(report["violations"].as_array().map(Vec::len), Some(0));
    assert_eq!(report["direct_edges"], 4);

    let rebuilt = json(dir.path(), &["rebuild"]);
    assert_eq!(rebuilt["direct_edges"], 4);
    assert_eq!(rebuilt["rows_before"], rebuilt["rows_after"]);

    kin_cmd(dir.path())
        .args(["verify", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("verify: success"));
}

#[test]
fn export_then_import_into_a_fresh_project() {
    let source = init_project();
    for (p, c) in [(1, 2), (2, 3), (1, 4)] {
        add(source.path(), p, c);
    }
    let file = source.path().join("edges.json");
    kin_cmd(source.path())
        .args(["export", "--output"])
        .arg(&file)
        .assert()
        .success();

    let target = init_project();
    add(target.path(), 1, 2);
    let imported = json(
        target.path(),
        &["import", "--file", file.to_str().expect("utf8 path")],
    );
    assert_eq!(imported["added"], 2);
    assert_eq!(imported["existing"], 1);

    assert_eq!(ids(&json(target.path(), &["descendants", "1"])), vec![2, 3, 4]);
}

#[test]
fn edges_lists_provenance_rows() {
    let dir = init_project();
    add(dir.path(), 1, 2);
    add(dir.path(), 2, 3);

    let all = json(dir.path(), &["edges"]);
    let rows = all["rows"].as_array().expect("rows");
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().any(|row| row["start"] == 1 && row["end"] == 3 && row["hops"] == 1));

    let direct = json(dir.path(), &["edges", "--direct"]);
    assert_eq!(direct["rows"].as_array().map(Vec::len), Some(2));
}

#[test]
fn init_twice_without_force_fails() {
    let dir = init_project();
    kin_cmd(dir.path())
        .args(["init", "--format", "text"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
    kin_cmd(dir.path()).args(["init", "--force"]).assert().success();
}

#[test]
fn completions_are_generated_without_a_project() {
    let dir = tempfile::tempdir().expect("temp dir");
    kin_cmd(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("kin"));
}

#[test]
fn strict_rm_rejects_unknown_groups_but_plain_rm_is_a_noop() {
    let dir = init_project();
    add(dir.path(), 1, 2);

    let removed = json(dir.path(), &["rm", "1", "9"]);
    assert_eq!(removed["removed"], false);

    kin_cmd(dir.path())
        .args(["rm", "1", "9", "--strict", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"E2002\""));
    assert_eq!(ids(&json(dir.path(), &["descendants", "1"])), vec![2]);
}

#[test]
fn negative_group_ids_round_trip() {
    let dir = init_project();
    add(dir.path(), -5, 2);
    add(dir.path(), 2, -7);

    assert_eq!(ids(&json(dir.path(), &["descendants", "-5"])), vec![-7, 2]);
    assert_eq!(ids(&json(dir.path(), &["ancestors", "-7", "--direct"])), vec![2]);
    assert_eq!(json(dir.path(), &["check", "-5", "-7"])["reachable"], true);

    json(dir.path(), &["rm", "-5", "2"]);
    assert_eq!(json(dir.path(), &["check", "-5", "-7"])["reachable"], false);
}

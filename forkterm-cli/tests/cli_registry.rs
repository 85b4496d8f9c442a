use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use assert_cmd::prelude::*;
use predicates::str::contains;
use serde_json::Value;
use tempfile::TempDir;

fn forkterm_cmd(root: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("forkterm"));
    cmd.env("FORKTERM_HOME", root)
        .env_remove("FORKTERM_LOG")
        .env_remove("RUST_LOG");
    cmd
}

fn json(out: &Output) -> Value {
    serde_json::from_slice(&out.stdout).expect("stdout is exactly one JSON document")
}

fn run(root: &Path, args: &[&str]) -> (Value, Option<i32>) {
    let out = forkterm_cmd(root).args(args).output().expect("run forkterm");
    (json(&out), out.status.code())
}

fn add_raw(root: &Path, task: &str) -> String {
    let cwd = root.to_string_lossy().into_owned();
    let (doc, code) = run(
        root,
        &["registry", "add", "--type", "raw", "--task", task, "--cwd", &cwd],
    );
    assert_eq!(code, Some(0), "{doc}");
    doc["task"]["id"].as_str().expect("id").to_string()
}

fn store(root: &Path) -> std::path::PathBuf {
    root.join("data").join("forked-tasks.json")
}

#[test]
fn add_update_clear_lifecycle() {
    let root = TempDir::new().expect("root");
    let id = add_raw(root.path(), "echo hi");

    let (doc, _) = run(root.path(), &["registry", "list"]);
    assert_eq!(doc["success"], true);
    assert_eq!(doc["count"], 1);
    assert_eq!(doc["tasks"][0]["id"], id.as_str());
    assert_eq!(doc["tasks"][0]["status"], "running");

    let (doc, code) = run(
        root.path(),
        &["registry", "update", "--id", &id, "--status", "completed", "--notes", "done"],
    );
    assert_eq!(code, Some(0));
    assert_eq!(doc["task"]["status"], "completed");
    assert_eq!(doc["task"]["notes"], "done");
    assert!(doc["task"]["completed_at"].is_string());

    let (doc, _) = run(root.path(), &["registry", "status"]);
    assert_eq!(doc["summary"]["completed"], 1);
    assert_eq!(doc["summary"]["total"], 1);
    assert_eq!(doc["recent_completed"][0]["id"], id.as_str());

    let (doc, _) = run(root.path(), &["registry", "clear"]);
    assert_eq!(doc["cleared"], 1);
    assert_eq!(doc["scope"], "completed");

    let (doc, _) = run(root.path(), &["registry", "list"]);
    assert_eq!(doc["count"], 0);
}

#[test]
fn add_accepts_caller_id_and_extras() {
    let root = TempDir::new().expect("root");
    let (doc, code) = run(
        root.path(),
        &[
            "registry", "add", "--id", "feedbeef", "--type", "claude", "--task", "review",
            "--model", "opus", "--preset", "review", "--output-file", "/tmp/x.log",
        ],
    );
    assert_eq!(code, Some(0), "{doc}");
    assert_eq!(doc["task"]["id"], "feedbeef");
    assert_eq!(doc["task"]["tier"], "opus");
    assert_eq!(doc["task"]["preset"], "review");

    let (doc, _) = run(root.path(), &["registry", "get", "--id", "feedbeef"]);
    assert_eq!(doc["task"]["output_file"], "/tmp/x.log");

    let (doc, code) = run(
        root.path(),
        &["registry", "add", "--id", "feedbeef", "--type", "raw", "--task", "x"],
    );
    assert_eq!(code, Some(1));
    assert_eq!(doc["error"], "InvalidArguments");
}

#[test]
fn add_rejects_an_id_that_is_not_a_file_name() {
    let root = TempDir::new().expect("root");
    let (doc, code) = run(
        root.path(),
        &["registry", "add", "--id", "a/b", "--type", "raw", "--task", "x"],
    );
    assert_eq!(code, Some(1));
    assert_eq!(doc["error"], "InvalidArguments");
    assert!(!store(root.path()).exists());
}

#[test]
fn unknown_id_is_registry_not_found_and_store_unchanged() {
    let root = TempDir::new().expect("root");
    add_raw(root.path(), "keep");
    let before = fs::read(store(root.path())).expect("read store");

    for args in [
        &["registry", "update", "--id", "nope", "--status", "failed"][..],
        &["registry", "remove", "--id", "nope"][..],
        &["registry", "get", "--id", "nope"][..],
    ] {
        let (doc, code) = run(root.path(), args);
        assert_eq!(code, Some(1));
        assert_eq!(doc["success"], false);
        assert_eq!(doc["error"], "RegistryNotFound");
        assert!(doc["details"].as_str().expect("details").contains("nope"));
    }
    assert_eq!(fs::read(store(root.path())).expect("read store"), before);
}

#[test]
fn reopening_a_finished_task_is_rejected() {
    let root = TempDir::new().expect("root");
    let id = add_raw(root.path(), "x");
    run(root.path(), &["registry", "update", "--id", &id, "--status", "failed"]);
    let (doc, code) = run(
        root.path(),
        &["registry", "update", "--id", &id, "--status", "running"],
    );
    assert_eq!(code, Some(1));
    assert_eq!(doc["error"], "InvalidTransition");

    // Notes can still be added.
    let (doc, code) = run(
        root.path(),
        &["registry", "update", "--id", &id, "--notes", "flaky test"],
    );
    assert_eq!(code, Some(0));
    assert_eq!(doc["task"]["status"], "failed");
}

#[test]
fn list_filter_and_limit_keep_insertion_order() {
    let root = TempDir::new().expect("root");
    let ids: Vec<String> = (0..4).map(|n| add_raw(root.path(), &format!("t{n}"))).collect();
    run(root.path(), &["registry", "update", "--id", &ids[1], "--status", "completed"]);

    let (doc, _) = run(root.path(), &["registry", "list", "--limit", "2"]);
    assert_eq!(doc["total"], 4);
    assert_eq!(doc["tasks"][0]["id"], ids[2].as_str());
    assert_eq!(doc["tasks"][1]["id"], ids[3].as_str());

    let (doc, _) = run(root.path(), &["registry", "list", "--filter", "running"]);
    let listed: Vec<&str> = doc["tasks"]
        .as_array()
        .expect("tasks")
        .iter()
        .filter_map(|t| t["id"].as_str())
        .collect();
    assert_eq!(listed, vec![ids[0].as_str(), ids[2].as_str(), ids[3].as_str()]);
}

#[test]
fn clear_all_and_clear_nothing() {
    let root = TempDir::new().expect("root");
    add_raw(root.path(), "a");
    add_raw(root.path(), "b");
    let (doc, _) = run(root.path(), &["registry", "clear", "--status", "failed"]);
    assert_eq!(doc["cleared"], 0);
    let (doc, _) = run(root.path(), &["registry", "clear", "--status", "all"]);
    assert_eq!(doc["cleared"], 2);
}

#[test]
fn corrupt_store_is_reported() {
    let root = TempDir::new().expect("root");
    fs::create_dir_all(root.path().join("data")).expect("mkdir");
    fs::write(store(root.path()), "not json at all").expect("write");

    let (doc, code) = run(root.path(), &["registry", "status"]);
    assert_eq!(code, Some(1));
    assert_eq!(doc["error"], "RegistryCorrupt");
    assert_eq!(
        fs::read_to_string(store(root.path())).expect("read"),
        "not json at all"
    );
}

#[test]
fn bad_arguments_are_json_with_exit_code_two() {
    let root = TempDir::new().expect("root");
    let (doc, code) = run(
        root.path(),
        &["registry", "update", "--id", "x", "--status", "paused"],
    );
    assert_eq!(code, Some(2));
    assert_eq!(doc["success"], false);
    assert_eq!(doc["error"], "InvalidArguments");

    let (doc, code) = run(root.path(), &[]);
    assert_eq!(code, Some(2));
    assert_eq!(doc["error"], "InvalidArguments");
}

#[test]
fn update_without_changes_is_invalid() {
    let root = TempDir::new().expect("root");
    let id = add_raw(root.path(), "x");
    let (doc, code) = run(root.path(), &["registry", "update", "--id", &id]);
    assert_eq!(code, Some(1));
    assert_eq!(doc["error"], "InvalidArguments");
}

#[test]
fn broken_config_is_config_error() {
    let root = TempDir::new().expect("root");
    fs::write(root.path().join("config.yaml"), "keep_open: [not, a, bool").expect("write");
    let (doc, code) = run(root.path(), &["registry", "list"]);
    assert_eq!(code, Some(1));
    assert_eq!(doc["error"], "ConfigError");
    assert!(doc["details"].as_str().expect("details").contains("config.yaml"));
}

#[test]
fn verbose_logs_stay_off_stdout() {
    let root = TempDir::new().expect("root");
    let out = forkterm_cmd(root.path())
        .args(["--verbose", "registry", "list"])
        .output()
        .expect("run");
    assert!(out.status.success());
    assert_eq!(json(&out)["count"], 0);
    assert!(!out.stderr.is_empty(), "debug logs expected on stderr");
}

#[test]
fn help_prints_usage() {
    let root = TempDir::new().expect("root");
    forkterm_cmd(root.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("launch"))
        .stdout(contains("registry"));
}

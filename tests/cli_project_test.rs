//! Integration tests for `td system`, `td project`, `td env` and `td data`.

mod common;

use common::TestEnv;
use predicates::prelude::*;

#[test]
fn test_commands_require_init() {
    let env = TestEnv::new();
    env.td()
        .args(["project", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("td system init"));
}

#[test]
fn test_system_init_is_repeatable() {
    let env = TestEnv::new();
    let first = env.json(&["system", "init"]);
    assert_eq!(first["initialized"], true);
    assert!(env.data_path().join("testdoc.db").exists());

    let second = env.json(&["system", "init"]);
    assert_eq!(second["schema_version"], first["schema_version"]);

    let info = env.json(&["system", "info"]);
    assert_eq!(info["projects"], 0);
}

#[test]
fn test_project_create_list_show_delete() {
    let env = TestEnv::init();
    let created = env.json(&["project", "create", "Online Banking"]);
    let id = created["id"].as_str().unwrap();
    assert_eq!(created["name"], "Online Banking");
    assert_eq!(created["tests"].as_array().unwrap().len(), 0);

    let list = env.json(&["project", "list"]);
    assert_eq!(list["count"], 1);
    assert_eq!(list["projects"][0]["id"], id);

    // Show by name as well as by ID
    let shown = env.json(&["project", "show", "Online Banking"]);
    assert_eq!(shown["id"], id);

    env.td().args(["project", "delete", id]).assert().success();
    env.td()
        .args(["project", "show", id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Project not found"));
}

#[test]
fn test_project_name_required() {
    let env = TestEnv::init();
    env.td()
        .args(["project", "create", "  "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("name is required"));
}

#[test]
fn test_environment_and_data() {
    let env = TestEnv::init();
    let id = env.seed_project("Shop", "QA", &[("user", "admin"), ("url", "https://qa")]);

    let again = env.json(&["env", "add", &id, "QA"]);
    assert_eq!(again["added"], false);

    let data = env.json(&["data", "list", &id, "QA"]);
    let keys: Vec<&String> = data["data"].as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["user", "url"]);

    let data = env.json(&["data", "unset", &id, "QA", "user"]);
    assert!(data["data"].get("user").is_none());

    env.td()
        .args(["data", "set", &id, "PROD", "k", "v"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Environment not found"));
}

#[test]
fn test_human_output() {
    let env = TestEnv::init();
    env.seed_project("Shop", "QA", &[("user", "admin")]);

    env.td()
        .args(["-H", "data", "list", "Shop", "QA"])
        .assert()
        .success()
        .stdout(predicate::str::contains("user = admin"));

    env.td()
        .args(["project", "list", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 project(s)"));
}

#[test]
fn test_session_output_format_preference() {
    let env = TestEnv::init();
    env.td()
        .args(["config", "pref", "output-format", "human"])
        .assert()
        .success();

    env.td()
        .args(["project", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No projects found."));

    let shown = env.td().args(["config", "show"]).assert().success();
    let stdout = String::from_utf8_lossy(&shown.get_output().stdout).to_string();
    assert!(stdout.contains("output-format = human (session)"));
}

#[test]
fn test_errors_are_json_by_default() {
    let env = TestEnv::init();
    let output = env
        .td()
        .args(["project", "show", "missing"])
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    let err: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert!(err["error"].as_str().unwrap().contains("missing"));
}

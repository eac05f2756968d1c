//! Integration tests for action logging through the CLI.

mod common;

use common::TestEnv;
use serde_json::Value;
use std::fs;

fn read_entries(env: &TestEnv) -> Vec<Value> {
    let path = env.data_path().join("action.log");
    fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn test_commands_are_logged() {
    let env = TestEnv::init();
    env.td().args(["project", "create", "Shop"]).assert().success();
    env.td().args(["project", "show", "nope"]).assert().failure();

    let entries = read_entries(&env);
    let commands: Vec<&str> = entries.iter().map(|e| e["command"].as_str().unwrap()).collect();
    assert_eq!(commands, vec!["system init", "project create", "project show"]);
    assert_eq!(entries[1]["args"]["name"], "Shop");
    assert_eq!(entries[2]["success"], false);
    assert!(entries[2]["error"].as_str().unwrap().contains("nope"));
}

#[test]
fn test_secret_data_values_are_redacted() {
    let env = TestEnv::init();
    env.seed_project("Shop", "QA", &[("db_password", "hunter2")]);

    let entries = read_entries(&env);
    let data_set = entries.iter().find(|e| e["command"] == "data set").unwrap();
    assert_eq!(data_set["args"]["key"], "db_password");
    assert_eq!(data_set["args"]["value"], "[REDACTED]");
}

#[test]
fn test_logging_can_be_disabled() {
    let env = TestEnv::init();
    env.td()
        .args(["config", "set", "action_log_enabled", "false"])
        .assert()
        .success();
    let before = read_entries(&env).len();

    env.td().args(["project", "list"]).assert().success();
    assert_eq!(read_entries(&env).len(), before);
}

#[test]
fn test_uninitialized_commands_are_not_logged() {
    let env = TestEnv::new();
    env.td().args(["project", "list"]).assert().failure();
    assert!(!env.data_path().join("action.log").exists());
}

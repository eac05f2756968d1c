//! Integration tests for `td test` commands.

mod common;

use common::TestEnv;
use predicates::prelude::*;
use serde_json::Value;

fn create_test(env: &TestEnv, project: &str, name: &str, extra: &[&str]) -> Value {
    let mut args = vec!["test", "create", project, name, "--env", "QA"];
    args.extend_from_slice(extra);
    env.json(&args)
}

#[test]
fn test_create_uses_environment_data_and_custom_fields() {
    let env = TestEnv::init();
    let project = env.seed_project("Shop", "QA", &[("user", "admin"), ("url", "https://qa")]);

    let record = create_test(
        &env,
        &project,
        "Login",
        &["--exclude-key", "url", "--field", "ticket=PRJ-9", "--related", "https://jira/browse/PRJ-9"],
    );
    assert_eq!(record["name"], "Login");
    assert_eq!(record["environment"], "QA");
    assert_eq!(record["state"], "unknown");
    assert_eq!(record["failureReason"], "");
    assert_eq!(record["taskType"], "Defecto");
    assert_eq!(record["relatedTasks"][0], "https://jira/browse/PRJ-9");

    let keys: Vec<&String> = record["data"].as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["user", "ticket"]);

    let list = env.json(&["test", "list", &project]);
    assert_eq!(list["count"], 1);
}

#[test]
fn test_create_requires_known_environment() {
    let env = TestEnv::init();
    let project = env.seed_project("Shop", "QA", &[]);
    env.td()
        .args(["test", "create", &project, "Login"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Environment is required"));
    env.td()
        .args(["test", "create", &project, "Login", "--env", "PROD"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown environment"));
}

#[test]
fn test_newest_test_listed_first() {
    let env = TestEnv::init();
    let project = env.seed_project("Shop", "QA", &[]);
    create_test(&env, &project, "First", &[]);
    let second = create_test(&env, &project, "Second", &[]);

    let list = env.json(&["test", "list", &project]);
    assert_eq!(list["tests"][0]["id"], second["id"]);
}

#[test]
fn test_status_and_failure_reason() {
    let env = TestEnv::init();
    let project = env.seed_project("Shop", "QA", &[]);
    let record = create_test(&env, &project, "Login", &[]);
    let id = record["id"].as_str().unwrap();

    let failed = env.json(&["test", "status", &project, id, "failed", "--reason", "HTTP 500"]);
    assert_eq!(failed["state"], "failed");
    assert_eq!(failed["failureReason"], "HTTP 500");

    env.td()
        .args(["test", "status", &project, id, "passed", "--reason", "ignored"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("only be set on a failed test"));

    let passed = env.json(&["test", "status", &project, id, "passed"]);
    assert_eq!(passed["state"], "passed");
    assert_eq!(passed["failureReason"], "");

    env.td()
        .args(["test", "edit", &project, id, "--failure-reason", "late"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("only be set on a failed test"));
}

#[test]
fn test_edit_keeps_id_and_created_at() {
    let env = TestEnv::init();
    let project = env.seed_project("Shop", "QA", &[("user", "admin")]);
    let record = create_test(&env, &project, "Login", &[]);
    let id = record["id"].as_str().unwrap();

    let edited = env.json(&[
        "test", "edit", &project, id, "--name", "Login v2", "--task-type", "Spike", "--layer", "front",
    ]);
    assert_eq!(edited["id"], record["id"]);
    assert_eq!(edited["createdAt"], record["createdAt"]);
    assert_eq!(edited["name"], "Login v2");
    assert_eq!(edited["taskType"], "Spike");
    assert_eq!(edited["data"]["user"], "admin");

    let list = env.json(&["test", "list", &project]);
    assert_eq!(list["count"], 1);
}

#[test]
fn test_params_query() {
    let env = TestEnv::init();
    let project = env.seed_project("Shop", "QA", &[("user", "admin"), ("url", "https://qa")]);

    let params = env.json(&["test", "params", &project, "--env", "QA", "--query", "HTTP"]);
    assert_eq!(params["parameters"].as_array().unwrap().len(), 1);
    assert_eq!(params["parameters"][0]["key"], "url");

    env.td()
        .args(["-H", "test", "params", &project, "--env", "QA", "--query", "nothing"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No parameters available"));
}

#[test]
fn test_insert_param_and_sync_tags() {
    let env = TestEnv::init();
    let project = env.seed_project("Shop", "QA", &[("user", "admin")]);
    let record = create_test(&env, &project, "Login", &["--description", "<p>Sign in as</p>"]);
    let id = record["id"].as_str().unwrap();

    let tagged = env.json(&["test", "insert-param", &project, id, "user"]);
    let description = tagged["description"].as_str().unwrap();
    assert!(description.contains(r#"data-parameter-tag="user""#));
    assert!(description.contains(r#"value="admin""#));

    // Stored data keeps the old value, so the tag is left alone
    env.td()
        .args(["data", "set", &project, "QA", "user", "root"])
        .assert()
        .success();
    let sync = env.json(&["test", "sync-tags", &project]);
    assert_eq!(sync["tags_updated"], 0);

    // Re-selecting the environment key brings the tag up to date on save
    let edited = env.json(&[
        "test", "edit", &project, id, "--remove-field", "user", "--include-key", "user",
    ]);
    assert!(edited["description"].as_str().unwrap().contains(r#"value="root""#));
}

#[test]
fn test_show_human_and_delete() {
    let env = TestEnv::init();
    let project = env.seed_project("Shop", "QA", &[("user", "admin")]);
    let record = create_test(&env, &project, "Login", &["--description", "<p>Step <b>one</b></p>"]);
    let id = record["id"].as_str().unwrap();

    env.td()
        .args(["-H", "test", "show", &project, id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Environment: QA"))
        .stdout(predicate::str::contains("Step one"));

    env.td().args(["test", "delete", &project, id]).assert().success();
    env.td()
        .args(["test", "show", &project, id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Test not found"));
}

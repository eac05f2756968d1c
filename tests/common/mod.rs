//! Common test utilities for testdoc integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't touch the
//! user's real data or config directories.

#![allow(dead_code)]

use assert_cmd::Command;
use serde_json::Value;
pub use tempfile::TempDir;

/// A test environment with isolated data storage.
///
/// - `data_dir`: testdoc's data (via `TD_DATA_DIR`)
/// - `work_dir`: current directory of the command, where exports land by default
/// - `config_home`: stands in for `~/.config` so system preferences are empty
pub struct TestEnv {
    pub data_dir: TempDir,
    pub work_dir: TempDir,
    pub config_home: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            data_dir: TempDir::new().unwrap(),
            work_dir: TempDir::new().unwrap(),
            config_home: TempDir::new().unwrap(),
        }
    }

    /// Create a new test environment and initialize testdoc.
    pub fn init() -> Self {
        let env = Self::new();
        env.td().args(["system", "init"]).assert().success();
        env
    }

    /// Get a Command for the td binary with isolated directories.
    ///
    /// Variables are set per command, so tests can run in parallel.
    pub fn td(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_td"));
        cmd.current_dir(self.work_dir.path());
        cmd.env("TD_DATA_DIR", self.data_dir.path());
        cmd.env("XDG_CONFIG_HOME", self.config_home.path());
        cmd.env_remove("TD_LOG");
        cmd
    }

    /// Run a command that must succeed and parse its JSON output.
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self.td().args(args).assert().success().get_output().stdout.clone();
        serde_json::from_slice(&output).expect("Failed to parse JSON output")
    }

    pub fn data_path(&self) -> &std::path::Path {
        self.data_dir.path()
    }

    pub fn work_path(&self) -> &std::path::Path {
        self.work_dir.path()
    }

    /// Create a project with one environment and some data. Returns the
    /// project ID.
    pub fn seed_project(&self, name: &str, env: &str, data: &[(&str, &str)]) -> String {
        let project = self.json(&["project", "create", name]);
        let id = project["id"].as_str().unwrap().to_string();
        self.td().args(["env", "add", &id, env]).assert().success();
        for (key, value) in data {
            self.td()
                .args(["data", "set", &id, env, key, value])
                .assert()
                .success();
        }
        id
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

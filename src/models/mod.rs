//! Data models for testdoc entities.
//!
//! This module defines the core data structures:
//! - `Project` - A named application with environments, per-environment data and tests
//! - `TestRecord` - A documented test run with metadata, data fields and rich-text evidence
//! - `Settings` - Global settings shared by every project (logo)
//! - `TestState` / `TaskType` - Closed and open enumerations used by test records

pub mod task_type;
pub mod test_state;

pub use task_type::{KnownTaskType, TaskType};
pub use test_state::StatusTracker;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Environment data: ordered `key -> value` pairs.
pub type DataMap = IndexMap<String, String>;

/// Identifier of the single global settings record.
pub const GLOBAL_SETTINGS_ID: &str = "global";

/// Outcome of a documented test.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestState {
    Passed,
    Failed,
    #[default]
    Unknown,
}

impl TestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestState::Passed => "passed",
            TestState::Failed => "failed",
            TestState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TestState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "passed" | "pass" => Ok(TestState::Passed),
            "failed" | "fail" => Ok(TestState::Failed),
            "unknown" | "ignore" | "ignored" => Ok(TestState::Unknown),
            _ => Err(format!("Invalid test state: {}", s)),
        }
    }
}

/// A documented test run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRecord {
    /// Unique identifier (uuid v4)
    pub id: String,

    /// Test name
    pub name: String,

    /// Environment the test ran in
    pub environment: String,

    /// Data used by the test (environment-derived and custom fields)
    #[serde(default)]
    pub data: DataMap,

    /// Rich-text description and evidence, stored as HTML
    #[serde(default)]
    pub description: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Tester in charge of the functional validation
    #[serde(default)]
    pub functional: String,

    /// Single related task. Superseded by `related_tasks`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_task: Option<String>,

    /// Related task references (ticket URLs or IDs)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_tasks: Option<Vec<String>>,

    /// Architectural layer under test (front, mw, host...)
    #[serde(default)]
    pub layer: String,

    /// Execution date (YYYY-MM-DD)
    #[serde(default)]
    pub date: String,

    /// Kind of work item the test documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_type: Option<TaskType>,

    /// Test outcome
    #[serde(default)]
    pub state: TestState,

    /// Why the test failed. Empty unless `state` is failed.
    #[serde(default)]
    pub failure_reason: String,
}

impl TestRecord {
    /// Create a new test record with the given ID, name and environment.
    pub fn new(id: String, name: String, environment: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            environment,
            data: DataMap::new(),
            description: String::new(),
            created_at: now,
            functional: String::new(),
            related_task: None,
            related_tasks: Some(Vec::new()),
            layer: String::new(),
            date: now.format("%Y-%m-%d").to_string(),
            task_type: Some(TaskType::default()),
            state: TestState::Unknown,
            failure_reason: String::new(),
        }
    }

    /// Related tasks, promoting the legacy single field when the list is absent.
    pub fn related_tasks(&self) -> Vec<String> {
        match (&self.related_tasks, &self.related_task) {
            (Some(tasks), _) => tasks.clone(),
            (None, Some(task)) if !task.is_empty() => vec![task.clone()],
            _ => Vec::new(),
        }
    }

    /// Title used for a single exported document.
    ///
    /// `"<name> - <last path segment of the first related task>"` when a related
    /// task exists, else the name, else `"Test Record"`.
    pub fn document_title(&self) -> String {
        let related = self.related_tasks();
        match related.first() {
            Some(first) => {
                let segment = first.rsplit('/').next().unwrap_or(first);
                format!("{} - {}", self.name, segment)
            }
            None if !self.name.is_empty() => self.name.clone(),
            None => "Test Record".to_string(),
        }
    }
}

/// A project with its environments, per-environment data and test records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Unique identifier (uuid v4)
    pub id: String,

    /// Project name
    pub name: String,

    /// Environment names in creation order
    #[serde(default)]
    pub environments: Vec<String>,

    /// Environment name -> data
    #[serde(default)]
    pub data: IndexMap<String, DataMap>,

    /// Test records, newest first
    #[serde(default)]
    pub tests: Vec<TestRecord>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// Create a new empty project.
    pub fn new(id: String, name: String) -> Self {
        Self {
            id,
            name,
            environments: Vec::new(),
            data: IndexMap::new(),
            tests: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Add an environment. Returns false if it already exists.
    pub fn add_environment(&mut self, name: &str) -> bool {
        if self.environments.iter().any(|e| e == name) {
            return false;
        }
        self.environments.push(name.to_string());
        self.data.entry(name.to_string()).or_default();
        true
    }

    pub fn has_environment(&self, name: &str) -> bool {
        self.environments.iter().any(|e| e == name)
    }

    /// Data configured for an environment (empty if none).
    pub fn environment_data(&self, env: &str) -> DataMap {
        self.data.get(env).cloned().unwrap_or_default()
    }

    /// Add or update a data key for an environment.
    pub fn set_data(&mut self, env: &str, key: &str, value: &str) {
        self.data
            .entry(env.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    /// Remove a data key from an environment. Returns the removed value.
    pub fn remove_data(&mut self, env: &str, key: &str) -> Option<String> {
        self.data.get_mut(env)?.shift_remove(key)
    }

    pub fn get_test(&self, test_id: &str) -> Option<&TestRecord> {
        self.tests.iter().find(|t| t.id == test_id)
    }

    /// Insert a new record at the front, or overwrite an existing one.
    ///
    /// Overwriting keeps the stored `id` and `created_at`.
    pub fn upsert_test(&mut self, record: TestRecord) {
        match self.tests.iter_mut().find(|t| t.id == record.id) {
            Some(existing) => {
                let created_at = existing.created_at;
                *existing = TestRecord {
                    created_at,
                    ..record
                };
            }
            None => self.tests.insert(0, record),
        }
    }

    /// Remove a test record. Returns true if it existed.
    pub fn remove_test(&mut self, test_id: &str) -> bool {
        let before = self.tests.len();
        self.tests.retain(|t| t.id != test_id);
        self.tests.len() != before
    }
}

/// Global settings shared by every project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Always `"global"`
    pub id: String,

    /// Logo image, base64 encoded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

impl Settings {
    pub fn global() -> Self {
        Self {
            id: GLOBAL_SETTINGS_ID.to_string(),
            logo: None,
        }
    }
}

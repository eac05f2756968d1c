//! Authoring state for one test record.
//!
//! A [`TestForm`] is opened either blank for a project (create mode) or from
//! a stored record (edit mode). It tracks which environment keys are
//! selected, hand-added data rows, related tasks and the status, and writes
//! the finished record back into the project on [`TestForm::submit`].

use crate::editor::{self, Editor, ScrollListeners};
use crate::models::{DataMap, Project, StatusTracker, TaskType, TestRecord, TestState};
use crate::params::{CustomField, Parameter, collect_parameters};
use crate::storage::{Storage, generate_id};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Id given to records that were never saved.
pub const PREVIEW_ID: &str = "preview";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit { test_id: String },
}

#[derive(Debug, Clone)]
pub struct TestForm {
    project_id: String,
    mode: FormMode,
    created_at: Option<DateTime<Utc>>,
    environment: String,
    available_data: DataMap,
    selected_keys: HashSet<String>,
    custom_fields: Vec<CustomField>,
    related_tasks: Vec<String>,
    status: StatusTracker,
    task_type: TaskType,

    pub name: String,
    pub functional: String,
    pub layer: String,
    /// YYYY-MM-DD
    pub date: String,
    /// Description HTML
    pub description: String,
}

fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

impl TestForm {
    /// Blank form for a new test in `project`.
    pub fn new(project: &Project) -> Self {
        Self {
            project_id: project.id.clone(),
            mode: FormMode::Create,
            created_at: None,
            environment: String::new(),
            available_data: DataMap::new(),
            selected_keys: HashSet::new(),
            custom_fields: Vec::new(),
            related_tasks: Vec::new(),
            status: StatusTracker::default(),
            task_type: TaskType::default(),
            name: String::new(),
            functional: String::new(),
            layer: String::new(),
            date: today(),
            description: String::new(),
        }
    }

    /// Form for editing a stored test.
    ///
    /// Data entries whose value still equals the environment's current value
    /// come back as selected keys; everything else becomes a custom row.
    pub fn load(project: &Project, test_id: &str) -> Result<Self> {
        let record = project
            .get_test(test_id)
            .ok_or_else(|| Error::NotFound(format!("Test not found: {}", test_id)))?;

        let available_data = project.environment_data(&record.environment);
        let mut selected_keys = HashSet::new();
        let mut custom_fields = Vec::new();
        for (key, value) in &record.data {
            if available_data.get(key) == Some(value) {
                selected_keys.insert(key.clone());
            } else {
                custom_fields.push(CustomField::new(key.as_str(), value.as_str()));
            }
        }

        Ok(Self {
            project_id: project.id.clone(),
            mode: FormMode::Edit {
                test_id: record.id.clone(),
            },
            created_at: Some(record.created_at),
            environment: record.environment.clone(),
            available_data,
            selected_keys,
            custom_fields,
            related_tasks: record.related_tasks(),
            status: StatusTracker::new(Some(record.state), Some(&record.failure_reason)),
            task_type: record.task_type.clone().unwrap_or_default(),
            name: record.name.clone(),
            functional: record.functional.clone(),
            layer: record.layer.clone(),
            date: if record.date.is_empty() {
                today()
            } else {
                record.date.clone()
            },
            description: record.description.clone(),
        })
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Pick the environment the test runs in.
    ///
    /// In create mode every key of the environment becomes selected and the
    /// custom rows are cleared. In edit mode the current selection is kept.
    pub fn set_environment(&mut self, project: &Project, environment: &str) -> Result<()> {
        if !project.has_environment(environment) {
            return Err(Error::InvalidInput(format!(
                "Unknown environment '{}' for project '{}'",
                environment, project.name
            )));
        }
        self.environment = environment.to_string();
        self.available_data = project.environment_data(environment);
        if self.mode == FormMode::Create {
            self.selected_keys = self.available_data.keys().cloned().collect();
            self.custom_fields.clear();
        }
        Ok(())
    }

    pub fn available_data(&self) -> &DataMap {
        &self.available_data
    }

    pub fn is_selected(&self, key: &str) -> bool {
        self.selected_keys.contains(key)
    }

    /// Flip the selection of an environment key. Returns the new state.
    pub fn toggle_key(&mut self, key: &str) -> bool {
        if self.selected_keys.remove(key) {
            false
        } else {
            self.selected_keys.insert(key.to_string());
            true
        }
    }

    pub fn custom_fields(&self) -> &[CustomField] {
        &self.custom_fields
    }

    /// Append an empty custom row. Returns its index.
    pub fn add_custom_row(&mut self) -> usize {
        self.custom_fields.push(CustomField::default());
        self.custom_fields.len() - 1
    }

    pub fn set_custom_key(&mut self, index: usize, key: &str) -> bool {
        match self.custom_fields.get_mut(index) {
            Some(field) => {
                field.key = key.to_string();
                true
            }
            None => false,
        }
    }

    pub fn set_custom_value(&mut self, index: usize, value: &str) -> bool {
        match self.custom_fields.get_mut(index) {
            Some(field) => {
                field.value = value.to_string();
                true
            }
            None => false,
        }
    }

    pub fn remove_custom_row(&mut self, index: usize) -> bool {
        if index >= self.custom_fields.len() {
            return false;
        }
        self.custom_fields.remove(index);
        true
    }

    pub fn related_tasks(&self) -> &[String] {
        &self.related_tasks
    }

    pub fn add_related_task(&mut self, task: &str) -> usize {
        self.related_tasks.push(task.to_string());
        self.related_tasks.len() - 1
    }

    pub fn set_related_task(&mut self, index: usize, task: &str) -> bool {
        match self.related_tasks.get_mut(index) {
            Some(slot) => {
                *slot = task.to_string();
                true
            }
            None => false,
        }
    }

    pub fn remove_related_task(&mut self, index: usize) -> bool {
        if index >= self.related_tasks.len() {
            return false;
        }
        self.related_tasks.remove(index);
        true
    }

    pub fn status(&self) -> TestState {
        self.status.status()
    }

    pub fn failure_reason(&self) -> &str {
        self.status.failure_reason()
    }

    pub fn set_status(&mut self, status: TestState) {
        self.status.set_status(status);
    }

    /// Ignored unless the status is failed.
    pub fn set_failure_reason(&mut self, reason: &str) -> bool {
        self.status.set_failure_reason(reason)
    }

    pub fn task_type(&self) -> &TaskType {
        &self.task_type
    }

    pub fn set_task_type(&mut self, task_type: TaskType) {
        self.task_type = task_type;
    }

    /// Parameters offered to the description editor.
    pub fn parameters(&self) -> Vec<Parameter> {
        collect_parameters(&self.available_data, &self.selected_keys, &self.custom_fields)
    }

    /// Data stored on the record: selected keys in environment order, then
    /// custom rows with a key. A repeated key keeps the last value.
    pub fn final_data(&self) -> DataMap {
        let mut data = DataMap::new();
        for (key, value) in &self.available_data {
            if self.selected_keys.contains(key) {
                data.insert(key.clone(), value.clone());
            }
        }
        for field in &self.custom_fields {
            if !field.key.is_empty() {
                data.insert(field.key.clone(), field.value.clone());
            }
        }
        data
    }

    /// Editor over the description, offering this form's parameters.
    pub fn open_editor(&self, listeners: ScrollListeners) -> Editor {
        let mut editor = Editor::with_html(listeners, &self.description);
        editor.set_parameters(self.parameters());
        editor
    }

    /// Take the description back from an editor.
    pub fn apply_editor(&mut self, editor: &Editor) {
        self.description = editor.html();
    }

    /// The record as it would be saved now.
    pub fn to_record(&self) -> TestRecord {
        let id = match &self.mode {
            FormMode::Edit { test_id } => test_id.clone(),
            FormMode::Create => PREVIEW_ID.to_string(),
        };
        TestRecord {
            id,
            name: self.name.clone(),
            environment: self.environment.clone(),
            data: self.final_data(),
            description: self.description.clone(),
            created_at: self.created_at.unwrap_or_else(Utc::now),
            functional: self.functional.clone(),
            related_task: self.related_tasks.first().cloned(),
            related_tasks: Some(self.related_tasks.clone()),
            layer: self.layer.clone(),
            date: self.date.clone(),
            task_type: Some(self.task_type.clone()),
            state: self.status.status(),
            failure_reason: self.status.failure_reason().to_string(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidInput("Test name is required".to_string()));
        }
        if self.environment.is_empty() {
            return Err(Error::InvalidInput("Environment is required".to_string()));
        }
        Ok(())
    }

    /// Save the record into its project.
    ///
    /// Parameter tags in the description are brought up to date first. A new
    /// record gets a fresh id and goes to the front of the test list; an
    /// edited one keeps its id and creation time. On failure the error is
    /// logged and the form is left as it was.
    pub fn submit(&mut self, storage: &mut Storage) -> Result<TestRecord> {
        self.validate()?;

        let mut record = self.to_record();
        let (description, synced) =
            editor::sync_parameter_tags_html(&record.description, &self.parameters());
        record.description = description;
        if self.mode == FormMode::Create {
            record.id = generate_id();
        }

        let mode = self.mode.clone();
        let saved = record.clone();
        let result = storage.modify_project(&self.project_id, move |project| {
            if let FormMode::Edit { test_id } = &mode {
                if project.get_test(test_id).is_none() {
                    return Err(Error::NotFound(format!("Test not found: {}", test_id)));
                }
            }
            project.upsert_test(saved);
            Ok(())
        });

        let project = match result {
            Ok(project) => project,
            Err(e) => {
                tracing::error!(project = %self.project_id, error = %e, "failed to save test");
                return Err(e);
            }
        };

        let stored = project
            .get_test(&record.id)
            .cloned()
            .unwrap_or(record);
        tracing::info!(
            project = %self.project_id,
            test = %stored.id,
            tags_synced = synced,
            "test saved"
        );

        self.description = stored.description.clone();
        self.created_at = Some(stored.created_at);
        self.mode = FormMode::Edit {
            test_id: stored.id.clone(),
        };
        Ok(stored)
    }
}

//! Task type of a test record: a fixed set of known kinds plus free text.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The task types offered out of the box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum KnownTaskType {
    #[default]
    Defect,
    Evolutive,
    UseCase,
}

impl KnownTaskType {
    /// Display label, also the stored representation.
    pub fn label(&self) -> &'static str {
        match self {
            KnownTaskType::Defect => "Defecto",
            KnownTaskType::Evolutive => "Evolutivo",
            KnownTaskType::UseCase => "Caso de uso",
        }
    }

    pub fn all() -> &'static [KnownTaskType] {
        &[
            KnownTaskType::Defect,
            KnownTaskType::Evolutive,
            KnownTaskType::UseCase,
        ]
    }

    fn from_label(label: &str) -> Option<Self> {
        Self::all().iter().copied().find(|t| t.label() == label)
    }
}

/// Kind of work item a test documents.
///
/// Stored as a plain string: the label of a known type, or the custom text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskType {
    Known(KnownTaskType),
    Custom(String),
}

impl Default for TaskType {
    fn default() -> Self {
        TaskType::Known(KnownTaskType::default())
    }
}

impl TaskType {
    pub fn as_str(&self) -> &str {
        match self {
            TaskType::Known(known) => known.label(),
            TaskType::Custom(text) => text,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, TaskType::Custom(_))
    }
}

impl From<String> for TaskType {
    fn from(value: String) -> Self {
        match KnownTaskType::from_label(&value) {
            Some(known) => TaskType::Known(known),
            None => TaskType::Custom(value),
        }
    }
}

impl From<&str> for TaskType {
    fn from(value: &str) -> Self {
        TaskType::from(value.to_string())
    }
}

impl From<TaskType> for String {
    fn from(value: TaskType) -> Self {
        match value {
            TaskType::Known(known) => known.label().to_string(),
            TaskType::Custom(text) => text,
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//! Parameters available for insertion into a test description.
//!
//! A parameter is a `key`/`value` pair derived from the environment data a
//! test selected plus the custom fields it added. The editor offers them as
//! suggestions and embeds them as inline tags.

use crate::models::DataMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A key/value pair that can be embedded in rich text as a tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parameter {
    pub key: String,
    pub value: String,
}

impl Parameter {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Whether the key or the value contains `query`, ignoring case.
    /// An empty query matches everything.
    pub fn matches(&self, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }
        let query = query.to_lowercase();
        self.key.to_lowercase().contains(&query) || self.value.to_lowercase().contains(&query)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\":\"{}\"", self.key, self.value)
    }
}

/// A custom data row added by hand to a test. Rows may be incomplete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomField {
    pub key: String,
    pub value: String,
}

impl CustomField {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Build the parameter list for a test-authoring context.
///
/// Selected environment entries come first, in environment-data order, then
/// custom rows with a non-blank key in row order. Keys are not de-duplicated.
pub fn collect_parameters(
    environment_data: &DataMap,
    selected_keys: &HashSet<String>,
    custom_fields: &[CustomField],
) -> Vec<Parameter> {
    let environment = environment_data
        .iter()
        .filter(|(key, _)| selected_keys.contains(*key))
        .map(|(key, value)| Parameter::new(key.as_str(), value.as_str()));

    let custom = custom_fields
        .iter()
        .filter(|field| !field.key.trim().is_empty())
        .map(|field| Parameter::new(field.key.as_str(), field.value.as_str()));

    environment.chain(custom).collect()
}

/// Filter parameters for a suggestion query, keeping order.
pub fn filter_parameters(params: &[Parameter], query: &str) -> Vec<Parameter> {
    params.iter().filter(|p| p.matches(query)).cloned().collect()
}

/// An editable list of parameters keyed by name.
///
/// Unlike [`collect_parameters`], adding an existing key replaces its value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet {
    params: Vec<Parameter>,
}

impl ParameterSet {
    pub fn new(params: Vec<Parameter>) -> Self {
        Self { params }
    }

    /// Add a parameter, or replace the value of an existing key in place.
    pub fn add(&mut self, key: &str, value: &str) {
        match self.params.iter_mut().find(|p| p.key == key) {
            Some(existing) => existing.value = value.to_string(),
            None => self.params.push(Parameter::new(key, value)),
        }
    }

    /// Update the value of an existing key. Returns false if absent.
    pub fn update(&mut self, key: &str, value: &str) -> bool {
        match self.params.iter_mut().find(|p| p.key == key) {
            Some(existing) => {
                existing.value = value.to_string();
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, key: &str) {
        self.params.retain(|p| p.key != key);
    }

    pub fn set(&mut self, params: Vec<Parameter>) {
        self.params = params;
    }

    pub fn clear(&mut self) {
        self.params.clear();
    }

    pub fn contains(&self, key: &str) -> bool {
        self.params.iter().any(|p| p.key == key)
    }

    pub fn value_of(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.value.as_str())
    }

    pub fn as_slice(&self) -> &[Parameter] {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

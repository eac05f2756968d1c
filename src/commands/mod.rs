//! Command implementations for the testdoc CLI.
//!
//! Each command returns a result type implementing [`Output`], which the
//! binary prints as JSON or as human-readable text. Commands are grouped by
//! entity:
//! - `project` - projects, environments and environment data
//! - `test` - test records, parameters and tags
//! - `export` - document and archive export
//! - this module - system, settings and configuration

pub mod export;
pub mod project;

use crate::config::{
    ConfigOverrides, ResolvedConfig, TestdocConfig, read_config_file, resolve_config,
    session_config_path, system_config_path, write_config_file,
};
use crate::export::encode_logo_file;
use crate::models::Settings;
use crate::storage::Storage;
use crate::{Error, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    fn to_json(&self) -> String;

    fn to_human(&self) -> String;
}

pub(crate) fn json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!(r#"{{"error":"{}"}}"#, e))
}

fn open(data_dir: &Path) -> Result<Storage> {
    Storage::open_with_data_dir(data_dir)
}

// === System ===

#[derive(Serialize)]
pub struct InitResult {
    pub initialized: bool,
    pub data_dir: PathBuf,
    pub schema_version: u32,
}

impl Output for InitResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Initialized testdoc in {} (schema v{})",
            self.data_dir.display(),
            self.schema_version
        )
    }
}

pub fn system_init(data_dir: &Path) -> Result<InitResult> {
    let storage = Storage::init_with_data_dir(data_dir)?;
    Ok(InitResult {
        initialized: true,
        data_dir: storage.root().to_path_buf(),
        schema_version: storage.schema_version()?,
    })
}

#[derive(Serialize)]
pub struct SystemInfo {
    pub data_dir: PathBuf,
    pub schema_version: u32,
    pub projects: usize,
    pub tests: usize,
    pub logo: bool,
}

impl Output for SystemInfo {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Data directory: {}\nSchema version: {}\nProjects: {}\nTests: {}\nLogo: {}",
            self.data_dir.display(),
            self.schema_version,
            self.projects,
            self.tests,
            if self.logo { "set" } else { "none" }
        )
    }
}

pub fn system_info(data_dir: &Path) -> Result<SystemInfo> {
    let storage = open(data_dir)?;
    let projects = storage.list_projects()?;
    Ok(SystemInfo {
        data_dir: storage.root().to_path_buf(),
        schema_version: storage.schema_version()?,
        projects: projects.len(),
        tests: projects.iter().map(|p| p.tests.len()).sum(),
        logo: storage.get_settings()?.logo.is_some(),
    })
}

// === Settings ===

#[derive(Serialize)]
pub struct SettingsView {
    pub id: String,
    pub logo: bool,
    /// Decoded size of the logo
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_mime: Option<&'static str>,
}

impl SettingsView {
    fn from_settings(settings: &Settings) -> Self {
        let logo = crate::export::Logo::from_settings(settings);
        Self {
            id: settings.id.clone(),
            logo: settings.logo.is_some(),
            logo_bytes: logo.as_ref().map(|l| l.bytes.len()),
            logo_mime: logo.as_ref().map(|l| l.mime),
        }
    }
}

impl Output for SettingsView {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        match (self.logo_mime, self.logo_bytes) {
            (Some(mime), Some(bytes)) => format!("Logo: {} ({} bytes)", mime, bytes),
            _ if self.logo => "Logo: set (unreadable)".to_string(),
            _ => "Logo: none".to_string(),
        }
    }
}

pub fn settings_show(data_dir: &Path) -> Result<SettingsView> {
    let storage = open(data_dir)?;
    Ok(SettingsView::from_settings(&storage.get_settings()?))
}

pub fn settings_logo_set(data_dir: &Path, path: &Path) -> Result<SettingsView> {
    let mut storage = open(data_dir)?;
    let encoded = encode_logo_file(path)?;
    let mut settings = storage.get_settings()?;
    settings.logo = Some(encoded);
    storage.put_settings(&settings)?;
    tracing::info!(path = %path.display(), "logo updated");
    Ok(SettingsView::from_settings(&settings))
}

pub fn settings_logo_clear(data_dir: &Path) -> Result<SettingsView> {
    let mut storage = open(data_dir)?;
    let mut settings = storage.get_settings()?;
    settings.logo = None;
    storage.put_settings(&settings)?;
    Ok(SettingsView::from_settings(&settings))
}

// === Config ===

#[derive(Serialize)]
pub struct ConfigValue {
    pub key: String,
    pub value: Option<String>,
}

impl Output for ConfigValue {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        match &self.value {
            Some(value) => format!("{} = {}", self.key, value),
            None => format!("{} is not set", self.key),
        }
    }
}

pub fn config_get(data_dir: &Path, key: &str) -> Result<ConfigValue> {
    let storage = open(data_dir)?;
    Ok(ConfigValue {
        key: key.to_string(),
        value: storage.get_config(key)?,
    })
}

pub fn config_set(data_dir: &Path, key: &str, value: &str) -> Result<ConfigValue> {
    let mut storage = open(data_dir)?;
    storage.set_config(key, value)?;
    Ok(ConfigValue {
        key: key.to_string(),
        value: Some(value.to_string()),
    })
}

#[derive(Serialize)]
pub struct ConfigList {
    pub configs: Vec<ConfigValue>,
}

impl Output for ConfigList {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.configs.is_empty() {
            return "No configuration values set.".to_string();
        }
        self.configs
            .iter()
            .map(|c| c.to_human())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn config_list(data_dir: &Path) -> Result<ConfigList> {
    let storage = open(data_dir)?;
    let configs = storage
        .list_configs()?
        .into_iter()
        .map(|(key, value)| ConfigValue {
            key,
            value: Some(value),
        })
        .collect();
    Ok(ConfigList { configs })
}

impl Output for ResolvedConfig {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![
            format!(
                "output-format = {} ({})",
                self.output_format.value.as_str(),
                self.output_format.source
            ),
            format!(
                "export-dir = {} ({})",
                self.export_dir.value.display(),
                self.export_dir.source
            ),
            format!(
                "archive-format = {} ({})",
                self.archive_format.value, self.archive_format.source
            ),
        ];
        match &self.log_dir {
            Some(dir) => lines.push(format!("log-dir = {} ({})", dir.value.display(), dir.source)),
            None => lines.push("log-dir is not set".to_string()),
        }
        lines.join("\n")
    }
}

pub fn config_show(data_dir: &Path, overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    resolve_config(data_dir, overrides)
}

#[derive(Serialize)]
pub struct PrefResult {
    pub path: PathBuf,
    pub key: String,
    pub value: String,
}

impl Output for PrefResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("Set {} = {} in {}", self.key, self.value, self.path.display())
    }
}

/// Set a preference in the session or system `config.kdl`.
pub fn config_pref(data_dir: &Path, key: &str, value: &str, system: bool) -> Result<PrefResult> {
    let path = if system {
        system_config_path()
            .ok_or_else(|| Error::Other("Could not determine config directory".to_string()))?
    } else {
        session_config_path(data_dir)
    };

    let mut config: TestdocConfig = read_config_file(&path)?;
    config.set(key, value).map_err(Error::InvalidInput)?;
    write_config_file(&path, &config)?;

    Ok(PrefResult {
        path,
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestEnv;

    #[test]
    fn test_system_init_and_info() {
        let env = TestEnv::new();
        assert!(matches!(system_info(env.data_path()), Err(Error::NotInitialized)));

        let init = system_init(env.data_path()).unwrap();
        assert!(init.initialized);

        let info = system_info(env.data_path()).unwrap();
        assert_eq!(info.projects, 0);
        assert!(!info.logo);
    }

    #[test]
    fn test_logo_set_and_clear() {
        let env = TestEnv::new();
        env.init_storage();
        let logo_path = env.data_path().join("logo.png");
        std::fs::write(&logo_path, [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]).unwrap();

        let view = settings_logo_set(env.data_path(), &logo_path).unwrap();
        assert!(view.logo);
        assert_eq!(view.logo_mime, Some("image/png"));
        assert_eq!(view.logo_bytes, Some(8));

        let view = settings_logo_clear(env.data_path()).unwrap();
        assert!(!view.logo);
        assert_eq!(view.to_human(), "Logo: none");
    }

    #[test]
    fn test_config_set_get_list() {
        let env = TestEnv::new();
        env.init_storage();
        config_set(env.data_path(), "action_log_enabled", "false").unwrap();
        let value = config_get(env.data_path(), "action_log_enabled").unwrap();
        assert_eq!(value.value.as_deref(), Some("false"));
        assert_eq!(config_get(env.data_path(), "nope").unwrap().value, None);
        assert_eq!(config_list(env.data_path()).unwrap().configs.len(), 1);
    }

    #[test]
    fn test_config_pref_writes_session_file() {
        let env = TestEnv::new();
        let result = config_pref(env.data_path(), "archive-format", "tar-zst", false).unwrap();
        assert_eq!(result.path, session_config_path(env.data_path()));

        let resolved = config_show(env.data_path(), &ConfigOverrides::new()).unwrap();
        assert_eq!(resolved.archive_format(), crate::export::ArchiveFormat::TarZst);

        assert!(matches!(
            config_pref(env.data_path(), "archive-format", "rar", false),
            Err(Error::InvalidInput(_))
        ));
    }
}

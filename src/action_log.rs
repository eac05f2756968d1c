//! Action logging for `td` commands.
//!
//! Every command run against a data directory is appended to a JSONL file
//! (`<data dir>/action.log` unless configured otherwise). The switches live
//! in the store's `config` table:
//!
//! - `action_log_enabled` (default true)
//! - `action_log_sanitize` (default true)
//! - `action_log_path`

use crate::storage::Storage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Default log file name inside the data directory.
pub const ACTION_LOG_FILE: &str = "action.log";

pub const ENABLED_KEY: &str = "action_log_enabled";
pub const SANITIZE_KEY: &str = "action_log_sanitize";
pub const PATH_KEY: &str = "action_log_path";

const REDACTED: &str = "[REDACTED]";
const MAX_STRING_CHARS: usize = 100;
const MAX_ARRAY_ITEMS: usize = 10;
const SENSITIVE_WORDS: &[&str] = &["password", "passwd", "token", "secret", "credential"];

/// A single action log entry.
#[derive(Debug, Serialize, Deserialize)]
pub struct ActionLog {
    pub timestamp: DateTime<Utc>,

    /// Data directory the command ran against
    pub data_dir: String,

    /// Command name (e.g., "project create", "export project")
    pub command: String,

    pub args: Value,

    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub duration_ms: u64,

    pub user: String,
}

/// Action log switches for one data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionLogSettings {
    pub enabled: bool,
    pub sanitize: bool,
    pub path: PathBuf,
}

impl ActionLogSettings {
    /// Read the switches from the store, falling back to defaults for
    /// anything missing or unreadable.
    pub fn load(storage: &Storage) -> Self {
        let flag = |key: &str| match storage.get_config(key) {
            Ok(Some(value)) => parse_bool(&value),
            _ => true,
        };
        let path = match storage.get_config(PATH_KEY) {
            Ok(Some(path)) if !path.is_empty() => expand_home(Path::new(&path)),
            _ => storage.root().join(ACTION_LOG_FILE),
        };
        Self {
            enabled: flag(ENABLED_KEY),
            sanitize: flag(SANITIZE_KEY),
            path,
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

/// Log a command run.
///
/// Never fails: an uninitialized data directory is skipped, and write
/// errors only produce a warning.
pub fn log_action(
    data_dir: &Path,
    command: &str,
    args: Value,
    success: bool,
    error: Option<String>,
    duration_ms: u64,
) {
    if !Storage::exists(data_dir) {
        return;
    }
    let settings = match Storage::open_with_data_dir(data_dir) {
        Ok(storage) => ActionLogSettings::load(&storage),
        Err(e) => {
            tracing::warn!(error = %e, "cannot read action log settings");
            return;
        }
    };
    if !settings.enabled {
        return;
    }

    let entry = ActionLog {
        timestamp: Utc::now(),
        data_dir: data_dir.to_string_lossy().into_owned(),
        command: command.to_string(),
        args: if settings.sanitize {
            sanitize_args(&args)
        } else {
            args
        },
        success,
        error,
        duration_ms,
        user: current_user(),
    };

    if let Err(e) = write_log_entry(&settings.path, &entry) {
        tracing::warn!(path = %settings.path.display(), error = %e, "failed to write action log");
    }
}

fn expand_home(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

fn write_log_entry(path: &Path, entry: &ActionLog) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string(entry)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", json)
}

fn is_sensitive(name: &str) -> bool {
    let name = name.to_lowercase();
    SENSITIVE_WORDS.iter().any(|word| name.contains(word))
}

/// Strip sensitive data from command arguments.
///
/// Redacts fields named like secrets, and the `value` of a data entry whose
/// `key` is named like one. Paths are cut to their file name, long strings
/// truncated and large arrays summarised.
pub fn sanitize_args(args: &Value) -> Value {
    match args {
        Value::Object(map) => {
            let secret_entry = map
                .get("key")
                .and_then(Value::as_str)
                .is_some_and(is_sensitive);
            let sanitized = map
                .iter()
                .map(|(name, value)| {
                    let redact = is_sensitive(name) || (secret_entry && name == "value");
                    let value = if redact && !value.is_null() {
                        Value::String(REDACTED.to_string())
                    } else {
                        sanitize_args(value)
                    };
                    (name.clone(), value)
                })
                .collect();
            Value::Object(sanitized)
        }
        Value::Array(items) if items.len() > MAX_ARRAY_ITEMS => {
            Value::String(format!("[Array with {} items]", items.len()))
        }
        Value::Array(items) => Value::Array(items.iter().map(sanitize_args).collect()),
        Value::String(s) => {
            let base = if s.contains('/') || s.contains('\\') {
                s.rsplit(['/', '\\']).next().unwrap_or(s)
            } else {
                s.as_str()
            };
            let chars = base.chars().count();
            if chars > MAX_STRING_CHARS {
                let head: String = base.chars().take(MAX_STRING_CHARS - 3).collect();
                Value::String(format!("{}... ({} chars)", head, chars))
            } else {
                Value::String(base.to_string())
            }
        }
        _ => args.clone(),
    }
}

fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestEnv;
    use serde_json::json;

    #[test]
    fn test_sanitize_paths_and_long_strings() {
        assert_eq!(sanitize_args(&json!("/home/qa/logo.png")), json!("logo.png"));
        assert_eq!(sanitize_args(&json!("C:\\logos\\logo.png")), json!("logo.png"));

        let long = "ñ".repeat(150);
        match sanitize_args(&json!(long)) {
            Value::String(s) => assert!(s.ends_with("... (150 chars)")),
            other => panic!("expected string, got {}", other),
        }
    }

    #[test]
    fn test_sanitize_sensitive_names() {
        let sanitized = sanitize_args(&json!({
            "name": "Login",
            "password": "hunter2",
            "api_token": "abc",
            "missing_secret": null
        }));
        assert_eq!(sanitized["name"], "Login");
        assert_eq!(sanitized["password"], REDACTED);
        assert_eq!(sanitized["api_token"], REDACTED);
        assert_eq!(sanitized["missing_secret"], Value::Null);
    }

    #[test]
    fn test_sanitize_secret_data_entry() {
        let secret = sanitize_args(&json!({"env": "QA", "key": "db_password", "value": "pw"}));
        assert_eq!(secret["key"], "db_password");
        assert_eq!(secret["value"], REDACTED);

        let plain = sanitize_args(&json!({"env": "QA", "key": "user", "value": "admin"}));
        assert_eq!(plain["value"], "admin");
    }

    #[test]
    fn test_sanitize_arrays() {
        let big: Vec<u32> = (0..15).collect();
        assert_eq!(sanitize_args(&json!(big)), json!("[Array with 15 items]"));
        assert_eq!(sanitize_args(&json!([1, 2, 3])), json!([1, 2, 3]));
    }

    #[test]
    fn test_settings_defaults_and_overrides() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        let defaults = ActionLogSettings::load(&storage);
        assert!(defaults.enabled);
        assert!(defaults.sanitize);
        assert_eq!(defaults.path, env.data_path().join(ACTION_LOG_FILE));

        storage.set_config(ENABLED_KEY, "false").unwrap();
        storage.set_config(PATH_KEY, "/tmp/td-actions.log").unwrap();
        let custom = ActionLogSettings::load(&storage);
        assert!(!custom.enabled);
        assert_eq!(custom.path, PathBuf::from("/tmp/td-actions.log"));
    }

    #[test]
    fn test_log_action_appends_jsonl() {
        let env = TestEnv::new();
        env.init_storage();
        log_action(env.data_path(), "project list", json!({}), true, None, 3);
        log_action(
            env.data_path(),
            "project show",
            json!({"project": "x"}),
            false,
            Some("Project not found: x".into()),
            1,
        );

        let log = fs::read_to_string(env.data_path().join(ACTION_LOG_FILE)).unwrap();
        let entries: Vec<ActionLog> = log
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].command, "project list");
        assert!(!entries[1].success);
        assert_eq!(entries[1].error.as_deref(), Some("Project not found: x"));
    }

    #[test]
    fn test_log_action_skips_uninitialized_dir() {
        let env = TestEnv::new();
        log_action(env.data_path(), "project list", json!({}), true, None, 0);
        assert!(!env.data_path().join(ACTION_LOG_FILE).exists());
    }
}

//! KDL schema for config.kdl.
//!
//! ```kdl
//! // User preferences
//! output-format "human"        // or "json"
//! export-dir "/home/me/exports"
//! archive-format "tar-zst"     // or "zip", "tar-gz"
//! log-dir "/home/me/.local/state/testdoc"
//! ```

use crate::export::ArchiveFormat;
use crate::Result;
use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file name, both for the session and the system file.
pub const CONFIG_FILE: &str = "config.kdl";

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User preferences stored in config.kdl.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestdocConfig {
    /// Default output format for CLI commands
    pub output_format: Option<OutputFormat>,

    /// Directory exported documents and archives are written to
    pub export_dir: Option<PathBuf>,

    /// Compression for bulk export archives
    pub archive_format: Option<ArchiveFormat>,

    /// Directory for JSON log files; file logging is off when unset
    pub log_dir: Option<PathBuf>,
}

/// Keys accepted in config.kdl.
pub const CONFIG_KEYS: &[&str] = &["output-format", "export-dir", "archive-format", "log-dir"];

fn first_string<'a>(doc: &'a KdlDocument, name: &str) -> Option<&'a str> {
    doc.get(name)?.entries().first()?.value().as_string()
}

fn string_node(name: &str, value: &str) -> KdlNode {
    let mut node = KdlNode::new(name);
    node.push(KdlEntry::new(KdlValue::String(value.to_string())));
    node
}

impl TestdocConfig {
    /// Create an empty config with no values set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the config values.
    pub fn validate(&self) -> std::result::Result<(), String> {
        for (key, dir) in [("export-dir", &self.export_dir), ("log-dir", &self.log_dir)] {
            if let Some(dir) = dir {
                if dir.as_os_str().is_empty() {
                    return Err(format!("{} must not be empty", key));
                }
            }
        }
        Ok(())
    }

    /// Parse config from a KDL document. Unknown nodes and invalid values
    /// are ignored.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        Self {
            output_format: first_string(doc, "output-format").and_then(OutputFormat::parse),
            export_dir: first_string(doc, "export-dir")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            archive_format: first_string(doc, "archive-format").and_then(ArchiveFormat::parse),
            log_dir: first_string(doc, "log-dir")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
        }
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();
        let nodes = doc.nodes_mut();

        if let Some(format) = self.output_format {
            nodes.push(string_node("output-format", format.as_str()));
        }
        if let Some(ref dir) = self.export_dir {
            nodes.push(string_node("export-dir", &dir.to_string_lossy()));
        }
        if let Some(format) = self.archive_format {
            nodes.push(string_node("archive-format", format.as_str()));
        }
        if let Some(ref dir) = self.log_dir {
            nodes.push(string_node("log-dir", &dir.to_string_lossy()));
        }

        doc
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &TestdocConfig) {
        if other.output_format.is_some() {
            self.output_format = other.output_format;
        }
        if other.export_dir.is_some() {
            self.export_dir = other.export_dir.clone();
        }
        if other.archive_format.is_some() {
            self.archive_format = other.archive_format;
        }
        if other.log_dir.is_some() {
            self.log_dir = other.log_dir.clone();
        }
    }

    /// Set one value from its config.kdl key and string form.
    pub fn set(&mut self, key: &str, value: &str) -> std::result::Result<(), String> {
        match key {
            "output-format" => {
                self.output_format = Some(
                    OutputFormat::parse(value)
                        .ok_or_else(|| format!("output-format must be json or human, got {}", value))?,
                );
            }
            "export-dir" => self.export_dir = Some(PathBuf::from(value)),
            "archive-format" => {
                self.archive_format = Some(ArchiveFormat::parse(value).ok_or_else(|| {
                    format!("archive-format must be zip, tar-gz or tar-zst, got {}", value)
                })?);
            }
            "log-dir" => self.log_dir = Some(PathBuf::from(value)),
            _ => {
                return Err(format!(
                    "Unknown config key: {} (expected one of {})",
                    key,
                    CONFIG_KEYS.join(", ")
                ));
            }
        }
        self.validate()
    }
}

/// Session config.kdl inside a data directory.
pub fn session_config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE)
}

/// System config.kdl (`~/.config/testdoc/config.kdl`).
pub fn system_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("testdoc").join(CONFIG_FILE))
}

/// Read a config file. A missing file is an empty config.
pub fn read_config_file(path: &Path) -> Result<TestdocConfig> {
    if !path.exists() {
        return Ok(TestdocConfig::new());
    }
    let content = std::fs::read_to_string(path)?;
    let doc: KdlDocument = content.parse()?;
    Ok(TestdocConfig::from_kdl(&doc))
}

/// Write a config file, creating its directory.
pub fn write_config_file(path: &Path, config: &TestdocConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut content = String::from("// testdoc preferences\n");
    content.push_str(&config.to_kdl().to_string());
    std::fs::write(path, content)?;
    Ok(())
}

//! Precedence resolution for configuration preferences.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. Session config.kdl (`<data dir>/config.kdl`)
//! 3. System config.kdl (`~/.config/testdoc/config.kdl`)
//! 4. Built-in defaults

use crate::Result;
use crate::config::schema::{read_config_file, session_config_path, system_config_path};
use crate::config::{OutputFormat, TestdocConfig};
use crate::export::ArchiveFormat;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from session-level config
    Session,
    /// Value from system-level config
    System,
    /// Value from CLI flag
    CliFlag,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::Session => write!(f, "session"),
            ValueSource::System => write!(f, "system"),
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

impl Serialize for ValueSource {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, Serialize)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub output_format: Resolved<OutputFormat>,
    /// Defaults to the current directory
    pub export_dir: Resolved<PathBuf>,
    pub archive_format: Resolved<ArchiveFormat>,
    /// File logging is off when unset
    pub log_dir: Option<Resolved<PathBuf>>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            output_format: Resolved::new(OutputFormat::Json, ValueSource::Default),
            export_dir: Resolved::new(PathBuf::from("."), ValueSource::Default),
            archive_format: Resolved::new(ArchiveFormat::default(), ValueSource::Default),
            log_dir: None,
        }
    }
}

impl ResolvedConfig {
    pub fn output_format(&self) -> OutputFormat {
        self.output_format.value
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir.value
    }

    pub fn archive_format(&self) -> ArchiveFormat {
        self.archive_format.value
    }

    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_ref().map(|r| r.value.as_path())
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub output_format: Option<OutputFormat>,
    pub export_dir: Option<PathBuf>,
    pub archive_format: Option<ArchiveFormat>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = Some(dir.into());
        self
    }

    pub fn with_archive_format(mut self, format: ArchiveFormat) -> Self {
        self.archive_format = Some(format);
        self
    }
}

fn pick<T: Clone>(
    cli: Option<&T>,
    session: Option<&T>,
    system: Option<&T>,
) -> Option<Resolved<T>> {
    if let Some(value) = cli {
        Some(Resolved::new(value.clone(), ValueSource::CliFlag))
    } else if let Some(value) = session {
        Some(Resolved::new(value.clone(), ValueSource::Session))
    } else {
        system.map(|value| Resolved::new(value.clone(), ValueSource::System))
    }
}

/// Resolve configuration for a data directory with the full precedence
/// chain.
pub fn resolve_config(data_dir: &Path, overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let system = match system_config_path() {
        Some(path) => read_config_file(&path)?,
        None => TestdocConfig::new(),
    };
    let session = read_config_file(&session_config_path(data_dir))?;
    Ok(resolve_layers(&session, &system, overrides))
}

/// Resolve from already loaded session and system configs.
pub fn resolve_layers(
    session: &TestdocConfig,
    system: &TestdocConfig,
    overrides: &ConfigOverrides,
) -> ResolvedConfig {
    let mut result = ResolvedConfig::default();

    if let Some(format) = pick(
        overrides.output_format.as_ref(),
        session.output_format.as_ref(),
        system.output_format.as_ref(),
    ) {
        result.output_format = format;
    }

    if let Some(dir) = pick(
        overrides.export_dir.as_ref(),
        session.export_dir.as_ref(),
        system.export_dir.as_ref(),
    ) {
        result.export_dir = dir;
    }

    if let Some(format) = pick(
        overrides.archive_format.as_ref(),
        session.archive_format.as_ref(),
        system.archive_format.as_ref(),
    ) {
        result.archive_format = format;
    }

    result.log_dir = pick(None, session.log_dir.as_ref(), system.log_dir.as_ref());

    result
}

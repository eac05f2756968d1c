//! Configuration for testdoc.
//!
//! ## config.kdl - User preferences
//!
//! Located at:
//! - System: `~/.config/testdoc/config.kdl`
//! - Session: `<data dir>/config.kdl`
//!
//! Contains:
//! - `output-format` - "json" or "human"
//! - `export-dir` - Where exports are written
//! - `archive-format` - "zip", "tar-gz" or "tar-zst"
//! - `log-dir` - Directory for JSON log files
//!
//! ## Precedence
//!
//! CLI flag > session config > system config > defaults.
//! Use the [`resolver`] module for unified precedence resolution.
//!
//! Switches that belong to one data directory (such as the action log) are
//! kept in the store's `config` table instead; see `td config get/set`.

pub mod resolver;
pub mod schema;

pub use resolver::{
    resolve_config, resolve_layers, ConfigOverrides, Resolved, ResolvedConfig, ValueSource,
};
pub use schema::{
    read_config_file, session_config_path, system_config_path, write_config_file, OutputFormat,
    TestdocConfig, CONFIG_FILE, CONFIG_KEYS,
};

//! testdoc - Test evidence documentation for projects and their environments.
//!
//! This library provides the core functionality for the `td` CLI tool:
//! projects with per-environment data, structured test records with a
//! rich-text description that embeds parameter tags, and export of those
//! records as paginated documents bundled into an archive.

pub mod action_log;
pub mod cli;
pub mod commands;
pub mod config;
pub mod editor;
pub mod export;
pub mod form;
pub mod logging;
pub mod models;
pub mod params;
pub mod storage;

/// Test utilities for isolated test environments.
#[cfg(test)]
pub(crate) mod test_utils {
    use std::path::Path;
    use tempfile::TempDir;

    use crate::storage::Storage;

    /// Test environment with an isolated data directory.
    pub struct TestEnv {
        pub data_dir: TempDir,
    }

    impl TestEnv {
        pub fn new() -> Self {
            Self {
                data_dir: TempDir::new().unwrap(),
            }
        }

        /// Get the path to the isolated data directory.
        pub fn data_path(&self) -> &Path {
            self.data_dir.path()
        }

        /// Initialize storage for this test environment.
        pub fn init_storage(&self) -> Storage {
            Storage::init_with_data_dir(self.data_path()).unwrap()
        }

        /// Open storage for this test environment.
        pub fn open_storage(&self) -> Storage {
            Storage::open_with_data_dir(self.data_path()).unwrap()
        }
    }

    impl Default for TestEnv {
        fn default() -> Self {
            Self::new()
        }
    }
}

/// Library-level error type for testdoc operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Config error: {0}")]
    Config(#[from] kdl::KdlError),

    #[error("Not initialized: run `td system init` first")]
    NotInitialized,

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for testdoc operations.
pub type Result<T> = std::result::Result<T, Error>;

//! CLI argument definitions for testdoc.

use crate::models::TestState;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// testdoc - Document test evidence per project and environment.
///
/// Start with `td system init`, then `td project create`.
#[derive(Parser, Debug)]
#[command(name = "td")]
#[command(author, version, about = "A CLI tool for documenting test evidence", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Use <path> as the data directory instead of the platform default.
    /// Can also be set via the TD_DATA_DIR environment variable.
    #[arg(long = "data-dir", global = true, env = "TD_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Data directory administration
    System {
        #[command(subcommand)]
        command: SystemCommands,
    },

    /// Project management commands
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Environment management commands
    Env {
        #[command(subcommand)]
        command: EnvCommands,
    },

    /// Per-environment data commands
    Data {
        #[command(subcommand)]
        command: DataCommands,
    },

    /// Test record commands
    Test {
        #[command(subcommand)]
        command: TestCommands,
    },

    /// Global settings (logo)
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },

    /// Export test records as documents
    Export {
        #[command(subcommand)]
        command: ExportCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum SystemCommands {
    /// Create the data directory and database (safe to re-run)
    Init,

    /// Show data directory, schema version and counts
    Info,
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Create a new project
    Create {
        /// Project name
        name: String,
    },

    /// List projects, newest first
    List,

    /// Show a project with its environments and tests
    Show {
        /// Project ID or name
        project: String,
    },

    /// Delete a project and all its tests
    Delete {
        /// Project ID or name
        project: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum EnvCommands {
    /// Add an environment (no-op if it exists)
    Add {
        /// Project ID or name
        project: String,
        /// Environment name
        name: String,
    },

    /// List environments of a project
    List {
        /// Project ID or name
        project: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum DataCommands {
    /// Set a data key for an environment
    Set {
        /// Project ID or name
        project: String,
        /// Environment name
        env: String,
        key: String,
        value: String,
    },

    /// Remove a data key from an environment
    Unset {
        /// Project ID or name
        project: String,
        /// Environment name
        env: String,
        key: String,
    },

    /// List the data of an environment
    List {
        /// Project ID or name
        project: String,
        /// Environment name
        env: String,
    },
}

/// Fields of a test record. Everything is optional so the same set serves
/// both creating and editing.
#[derive(Args, Debug, Default, Clone)]
pub struct TestFieldArgs {
    /// Environment the test ran in (selects all of its data keys on create)
    #[arg(short, long)]
    pub env: Option<String>,

    /// Tester in charge of the functional validation
    #[arg(long)]
    pub functional: Option<String>,

    /// Architectural layer (front, mw, host...)
    #[arg(long)]
    pub layer: Option<String>,

    /// Execution date (YYYY-MM-DD)
    #[arg(long)]
    pub date: Option<String>,

    /// Task type: Defecto, Evolutivo, "Caso de uso" or any custom text
    #[arg(long = "task-type")]
    pub task_type: Option<String>,

    /// Related task URL or ID (repeatable)
    #[arg(long = "related")]
    pub related: Vec<String>,

    /// Drop the existing related tasks before adding --related ones
    #[arg(long = "clear-related")]
    pub clear_related: bool,

    /// Test state: passed, failed or unknown
    #[arg(long)]
    pub state: Option<TestState>,

    /// Why the test failed (requires the failed state)
    #[arg(long = "failure-reason")]
    pub failure_reason: Option<String>,

    /// Description as HTML
    #[arg(short, long, conflicts_with = "description_file")]
    pub description: Option<String>,

    /// Read the description HTML from a file
    #[arg(long = "description-file")]
    pub description_file: Option<PathBuf>,

    /// Custom data field as KEY=VALUE (repeatable)
    #[arg(long = "field", value_name = "KEY=VALUE")]
    pub fields: Vec<String>,

    /// Remove a custom data field by key (repeatable)
    #[arg(long = "remove-field", value_name = "KEY")]
    pub remove_fields: Vec<String>,

    /// Do not use this environment data key (repeatable)
    #[arg(long = "exclude-key", value_name = "KEY")]
    pub exclude_keys: Vec<String>,

    /// Use this environment data key (repeatable)
    #[arg(long = "include-key", value_name = "KEY")]
    pub include_keys: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum TestCommands {
    /// Document a new test
    Create {
        /// Project ID or name
        project: String,
        /// Test name
        name: String,
        #[command(flatten)]
        fields: TestFieldArgs,
    },

    /// Edit a documented test
    Edit {
        /// Project ID or name
        project: String,
        /// Test ID
        test: String,
        /// New test name
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        fields: TestFieldArgs,
    },

    /// Show a test record
    Show {
        /// Project ID or name
        project: String,
        /// Test ID
        test: String,
    },

    /// List the tests of a project, newest first
    List {
        /// Project ID or name
        project: String,
        /// Only tests in this state
        #[arg(long)]
        state: Option<TestState>,
    },

    /// Delete a test record
    Delete {
        /// Project ID or name
        project: String,
        /// Test ID
        test: String,
    },

    /// Set the state of a test
    Status {
        /// Project ID or name
        project: String,
        /// Test ID
        test: String,
        /// passed, failed or unknown
        state: TestState,
        /// Failure reason (requires the failed state)
        #[arg(long)]
        reason: Option<String>,
    },

    /// List the parameters a description can reference
    Params {
        /// Project ID or name
        project: String,
        /// Test ID (defaults to a new test in --env)
        test: Option<String>,
        /// Environment for a new test
        #[arg(short, long)]
        env: Option<String>,
        /// Only parameters whose key or value contains this text
        #[arg(short, long, default_value = "")]
        query: String,
    },

    /// Append a parameter tag to a test description
    InsertParam {
        /// Project ID or name
        project: String,
        /// Test ID
        test: String,
        /// Parameter key
        key: String,
    },

    /// Refresh parameter tag values from the current data
    SyncTags {
        /// Project ID or name
        project: String,
        /// Test ID (all tests of the project when omitted)
        test: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommands {
    /// Show global settings
    Show,

    /// Manage the logo printed on exported documents
    Logo {
        #[command(subcommand)]
        command: LogoCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum LogoCommands {
    /// Store an image file as the logo
    Set {
        /// Image file (PNG or JPEG embed in PDFs)
        path: PathBuf,
    },

    /// Remove the logo
    Clear,
}

#[derive(Subcommand, Debug)]
pub enum ExportCommands {
    /// Export one test as a document
    Test {
        /// Project ID or name
        project: String,
        /// Test ID
        test: String,
        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Document format: pdf or html
        #[arg(short, long, default_value = "pdf")]
        format: String,
    },

    /// Export every test of a project into one archive
    Project {
        /// Project ID or name
        project: String,
        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Document format: pdf or html
        #[arg(short, long, default_value = "pdf")]
        format: String,
        /// Archive format: zip, tar-gz or tar-zst
        #[arg(long)]
        archive: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Get a stored configuration value
    Get {
        /// Configuration key
        key: String,
    },

    /// Set a stored configuration value
    Set {
        /// Configuration key
        key: String,
        /// Configuration value
        value: String,
    },

    /// List stored configuration values
    List,

    /// Show resolved preferences and where each came from
    Show,

    /// Set a preference in config.kdl
    Pref {
        /// output-format, export-dir, archive-format or log-dir
        key: String,
        value: String,
        /// Write the system config instead of the data directory's
        #[arg(long)]
        system: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_test_create_fields() {
        let cli = Cli::try_parse_from([
            "td", "test", "create", "Shop", "Login", "--env", "QA", "--field", "user=guest",
            "--related", "https://jira/browse/A-1", "--state", "failed", "--failure-reason", "500",
        ])
        .unwrap();
        match cli.command {
            Commands::Test {
                command: TestCommands::Create { project, name, fields },
            } => {
                assert_eq!(project, "Shop");
                assert_eq!(name, "Login");
                assert_eq!(fields.env.as_deref(), Some("QA"));
                assert_eq!(fields.fields, vec!["user=guest"]);
                assert_eq!(fields.state, Some(TestState::Failed));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_description_sources_conflict() {
        let result = Cli::try_parse_from([
            "td", "test", "create", "Shop", "Login", "-d", "<p>x</p>", "--description-file", "d.html",
        ]);
        assert!(result.is_err());
    }
}

//! Storage layer for testdoc data.
//!
//! Everything lives in a single SQLite database under the data directory
//! (`~/.local/share/testdoc/testdoc.db` by default):
//!
//! - `projects`: one JSON document per project, with its environments, data
//!   and test records
//! - `settings`: the global settings document
//! - `config`: key/value switches for the CLI
//! - `schema_meta`: the schema version, see [`migrations`]

pub mod migrations;

use crate::models::{Project, Settings, GLOBAL_SETTINGS_ID};
use crate::{Error, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};

/// Database file name inside the data directory.
pub const DB_FILE: &str = "testdoc.db";

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "TD_DATA_DIR";

/// Storage manager for one data directory.
pub struct Storage {
    /// Data directory
    pub root: PathBuf,
    conn: Connection,
}

impl Storage {
    /// Open existing storage in `root`.
    pub fn open_with_data_dir(root: &Path) -> Result<Self> {
        if !Self::exists(root) {
            return Err(Error::NotInitialized);
        }

        let mut conn = Connection::open(root.join(DB_FILE))?;
        Self::init_schema(&mut conn)?;

        Ok(Self {
            root: root.to_path_buf(),
            conn,
        })
    }

    /// Initialize storage in `root`. Safe to call on existing storage.
    pub fn init_with_data_dir(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)?;

        let mut conn = Connection::open(root.join(DB_FILE))?;
        Self::init_schema(&mut conn)?;
        tracing::debug!(root = %root.display(), "storage initialized");

        Ok(Self {
            root: root.to_path_buf(),
            conn,
        })
    }

    /// Check if storage exists in `root`.
    pub fn exists(root: &Path) -> bool {
        root.join(DB_FILE).exists()
    }

    /// Create tables and bring stored documents up to date.
    fn init_schema(conn: &mut Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS projects (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL,
                doc TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_projects_created ON projects(created_at);
            CREATE INDEX IF NOT EXISTS idx_projects_name ON projects(name);

            CREATE TABLE IF NOT EXISTS settings (
                id TEXT PRIMARY KEY,
                doc TEXT NOT NULL
            );

            -- Configuration table
            CREATE TABLE IF NOT EXISTS config (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS schema_meta (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                version INTEGER NOT NULL
            );
            "#,
        )?;

        let is_new: bool = conn.query_row(
            "SELECT NOT EXISTS (SELECT 1 FROM schema_meta) AND NOT EXISTS (SELECT 1 FROM projects)",
            [],
            |row| row.get(0),
        )?;
        if is_new {
            conn.execute(
                "INSERT INTO schema_meta (id, version) VALUES (1, ?1)",
                [migrations::SCHEMA_VERSION],
            )?;
        }

        migrations::run(conn)?;
        Ok(())
    }

    /// Root data directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Current schema version of the database.
    pub fn schema_version(&self) -> Result<u32> {
        migrations::current_version(&self.conn)
    }

    // === Project Operations ===

    /// Store a new project.
    pub fn create_project(&mut self, project: &Project) -> Result<()> {
        if self.project_exists(&project.id)? {
            return Err(Error::InvalidInput(format!(
                "Project already exists: {}",
                project.id
            )));
        }
        self.conn.execute(
            "INSERT INTO projects (id, name, created_at, doc) VALUES (?1, ?2, ?3, ?4)",
            params![
                project.id,
                project.name,
                project.created_at.to_rfc3339(),
                serde_json::to_string(project)?
            ],
        )?;
        tracing::info!(project = %project.id, name = %project.name, "project created");
        Ok(())
    }

    fn project_exists(&self, id: &str) -> Result<bool> {
        let exists = self.conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM projects WHERE id = ?1)",
            [id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Get a project by ID.
    pub fn get_project(&self, id: &str) -> Result<Project> {
        let doc: Option<String> = self
            .conn
            .query_row("SELECT doc FROM projects WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .optional()?;

        match doc {
            Some(doc) => Ok(serde_json::from_str(&doc)?),
            None => Err(Error::NotFound(format!("Project not found: {}", id))),
        }
    }

    /// Find a project by ID, or else by its exact name.
    pub fn resolve_project(&self, id_or_name: &str) -> Result<Project> {
        match self.get_project(id_or_name) {
            Err(Error::NotFound(_)) => {}
            other => return other,
        }

        let mut matches = self.find_projects(|p| p.name == id_or_name)?;
        match matches.len() {
            0 => Err(Error::NotFound(format!("Project not found: {}", id_or_name))),
            1 => Ok(matches.remove(0)),
            n => Err(Error::InvalidInput(format!(
                "{} projects are named '{}'; use the project ID",
                n, id_or_name
            ))),
        }
    }

    /// List all projects, newest first.
    pub fn list_projects(&self) -> Result<Vec<Project>> {
        self.find_projects(|_| true)
    }

    /// Projects matching a predicate, newest first.
    pub fn find_projects(&self, predicate: impl Fn(&Project) -> bool) -> Result<Vec<Project>> {
        let mut stmt = self
            .conn
            .prepare("SELECT doc FROM projects ORDER BY created_at DESC, id")?;
        let docs: Vec<String> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<_, _>>()?;

        let mut projects = Vec::new();
        for doc in docs {
            let project: Project = serde_json::from_str(&doc)?;
            if predicate(&project) {
                projects.push(project);
            }
        }
        Ok(projects)
    }

    /// Overwrite a stored project.
    pub fn update_project(&mut self, project: &Project) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE projects SET name = ?1, doc = ?2 WHERE id = ?3",
            params![project.name, serde_json::to_string(project)?, project.id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Project not found: {}", project.id)));
        }
        tracing::debug!(project = %project.id, "project updated");
        Ok(())
    }

    /// Load a project, change it and write it back.
    ///
    /// Nothing is written if `change` fails.
    pub fn modify_project<F>(&mut self, id: &str, change: F) -> Result<Project>
    where
        F: FnOnce(&mut Project) -> Result<()>,
    {
        let mut project = self.get_project(id)?;
        change(&mut project)?;
        self.update_project(&project)?;
        Ok(project)
    }

    /// Change every project matching a predicate, in one transaction.
    /// Returns how many projects were changed.
    pub fn modify_projects<P, F>(&mut self, predicate: P, mut change: F) -> Result<usize>
    where
        P: Fn(&Project) -> bool,
        F: FnMut(&mut Project),
    {
        let matching = self.find_projects(predicate)?;
        let tx = self.conn.transaction()?;
        for mut project in matching.iter().cloned() {
            change(&mut project);
            tx.execute(
                "UPDATE projects SET name = ?1, doc = ?2 WHERE id = ?3",
                params![project.name, serde_json::to_string(&project)?, project.id],
            )?;
        }
        tx.commit()?;
        Ok(matching.len())
    }

    /// Delete a project by ID.
    pub fn delete_project(&mut self, id: &str) -> Result<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM projects WHERE id = ?1", [id])?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("Project not found: {}", id)));
        }
        tracing::info!(project = %id, "project deleted");
        Ok(())
    }

    // === Settings Operations ===

    /// Global settings; defaults when none were stored yet.
    pub fn get_settings(&self) -> Result<Settings> {
        let doc: Option<String> = self
            .conn
            .query_row(
                "SELECT doc FROM settings WHERE id = ?1",
                [GLOBAL_SETTINGS_ID],
                |row| row.get(0),
            )
            .optional()?;

        match doc {
            Some(doc) => Ok(serde_json::from_str(&doc)?),
            None => Ok(Settings::global()),
        }
    }

    pub fn put_settings(&mut self, settings: &Settings) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (id, doc) VALUES (?1, ?2)",
            params![GLOBAL_SETTINGS_ID, serde_json::to_string(settings)?],
        )?;
        Ok(())
    }

    // === Config Operations ===

    /// Get a configuration value.
    pub fn get_config(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM config WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Set a configuration value.
    pub fn set_config(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO config (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// List all configuration values.
    pub fn list_configs(&self) -> Result<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM config ORDER BY key")?;
        let configs = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<_, _>>()?;
        Ok(configs)
    }
}

/// Default data directory: `$TD_DATA_DIR`, else the platform data
/// directory joined with `testdoc`.
pub fn get_data_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let data_dir = dirs::data_dir()
        .ok_or_else(|| Error::Other("Could not determine data directory".to_string()))?;
    Ok(data_dir.join("testdoc"))
}

/// Data directory from an explicit override, falling back to
/// [`get_data_dir`].
pub fn resolve_data_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(dir) => Ok(dir.to_path_buf()),
        None => get_data_dir(),
    }
}

/// Generate a unique ID for a project or test record.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TestRecord;
    use crate::test_utils::TestEnv;
    use serial_test::serial;

    fn project(name: &str) -> Project {
        Project::new(generate_id(), name.to_string())
    }

    #[test]
    fn test_open_requires_init() {
        let env = TestEnv::new();
        assert!(matches!(
            Storage::open_with_data_dir(env.data_path()),
            Err(Error::NotInitialized)
        ));
        env.init_storage();
        assert!(Storage::exists(env.data_path()));
        env.open_storage();
    }

    #[test]
    fn test_new_database_is_current_version() {
        let env = TestEnv::new();
        let storage = env.init_storage();
        assert_eq!(storage.schema_version().unwrap(), migrations::SCHEMA_VERSION);
    }

    #[test]
    fn test_project_crud() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();

        let mut p = project("Portal");
        storage.create_project(&p).unwrap();
        assert!(storage.create_project(&p).is_err());

        p.add_environment("QA");
        p.set_data("QA", "user", "admin");
        storage.update_project(&p).unwrap();

        let loaded = storage.get_project(&p.id).unwrap();
        assert_eq!(loaded, p);

        storage.delete_project(&p.id).unwrap();
        assert!(matches!(storage.get_project(&p.id), Err(Error::NotFound(_))));
        assert!(matches!(storage.delete_project(&p.id), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_update_missing_project_fails() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        assert!(matches!(
            storage.update_project(&project("ghost")),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_list_newest_first() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();

        let mut old = project("old");
        old.created_at -= chrono::Duration::days(1);
        storage.create_project(&old).unwrap();
        storage.create_project(&project("new")).unwrap();

        let names: Vec<_> = storage
            .list_projects()
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["new", "old"]);
    }

    #[test]
    fn test_resolve_by_id_or_name() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        let p = project("Banca");
        storage.create_project(&p).unwrap();

        assert_eq!(storage.resolve_project(&p.id).unwrap().id, p.id);
        assert_eq!(storage.resolve_project("Banca").unwrap().id, p.id);
        assert!(matches!(storage.resolve_project("nope"), Err(Error::NotFound(_))));

        storage.create_project(&project("Banca")).unwrap();
        assert!(matches!(
            storage.resolve_project("Banca"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_modify_project_failure_writes_nothing() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        let p = project("P");
        storage.create_project(&p).unwrap();

        let result = storage.modify_project(&p.id, |project| {
            project.name = "changed".to_string();
            Err(Error::InvalidInput("nope".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(storage.get_project(&p.id).unwrap().name, "P");
    }

    #[test]
    fn test_modify_projects_by_predicate() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        storage.create_project(&project("a")).unwrap();
        storage.create_project(&project("b")).unwrap();
        storage.create_project(&project("a")).unwrap();

        let changed = storage
            .modify_projects(|p| p.name == "a", |p| {
                p.add_environment("DEV");
            })
            .unwrap();
        assert_eq!(changed, 2);

        let with_dev = storage.find_projects(|p| p.has_environment("DEV")).unwrap();
        assert_eq!(with_dev.len(), 2);
    }

    #[test]
    fn test_settings_default_and_roundtrip() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        assert_eq!(storage.get_settings().unwrap(), Settings::global());

        let settings = Settings {
            logo: Some("aGVsbG8=".to_string()),
            ..Settings::global()
        };
        storage.put_settings(&settings).unwrap();
        assert_eq!(storage.get_settings().unwrap(), settings);
    }

    #[test]
    fn test_config_operations() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        assert_eq!(storage.get_config("action_log_enabled").unwrap(), None);
        storage.set_config("action_log_enabled", "false").unwrap();
        storage.set_config("a", "1").unwrap();
        assert_eq!(
            storage.get_config("action_log_enabled").unwrap().as_deref(),
            Some("false")
        );
        let keys: Vec<_> = storage.list_configs().unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "action_log_enabled"]);
    }

    #[test]
    fn test_historical_documents_are_migrated_on_open() {
        let env = TestEnv::new();
        {
            let storage = env.init_storage();
            let legacy = serde_json::json!({
                "id": "p1",
                "name": "Legacy",
                "environments": ["QA"],
                "data": {"QA": {"user": "admin"}},
                "createdAt": "2023-05-01T10:00:00Z",
                "tests": [{
                    "id": "t1",
                    "name": "Login",
                    "environment": "QA",
                    "data": {"user": "admin"},
                    "description": "<p>x</p>",
                    "createdAt": "2023-05-01T10:00:00Z",
                    "relatedTask": "https://tracker/browse/PRJ-7"
                }]
            });
            storage
                .conn
                .execute(
                    "INSERT INTO projects (id, name, created_at, doc) VALUES ('p1', 'Legacy', '2023-05-01T10:00:00+00:00', ?1)",
                    [legacy.to_string()],
                )
                .unwrap();
            storage
                .conn
                .execute("UPDATE schema_meta SET version = 1", [])
                .unwrap();
        }

        let storage = env.open_storage();
        assert_eq!(storage.schema_version().unwrap(), 3);

        let raw: String = storage
            .conn
            .query_row("SELECT doc FROM projects WHERE id = 'p1'", [], |row| row.get(0))
            .unwrap();
        let raw: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(raw["tests"][0]["state"], "unknown");
        assert_eq!(raw["tests"][0]["failureReason"], "");
        assert_eq!(raw["tests"][0]["relatedTask"], "https://tracker/browse/PRJ-7");

        let project = storage.get_project("p1").unwrap();
        let record: &TestRecord = &project.tests[0];
        assert_eq!(record.related_tasks(), vec!["https://tracker/browse/PRJ-7"]);
        assert_eq!(record.document_title(), "Login - PRJ-7");
    }

    #[test]
    #[serial]
    fn test_data_dir_env_override() {
        let env = TestEnv::new();
        // SAFETY: serialized with other env-mutating tests
        unsafe { std::env::set_var(DATA_DIR_ENV, env.data_path()) };
        assert_eq!(get_data_dir().unwrap(), env.data_path());
        assert_eq!(
            resolve_data_dir(Some(Path::new("/tmp/explicit"))).unwrap(),
            PathBuf::from("/tmp/explicit")
        );
        unsafe { std::env::remove_var(DATA_DIR_ENV) };
    }
}

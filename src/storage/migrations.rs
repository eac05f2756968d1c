//! Versioned migrations over stored project documents.
//!
//! Projects are stored as JSON documents, so a schema change is a rewrite of
//! those documents that fills in new fields with their default. Pending
//! migrations run in one transaction together with the version bump.

use crate::Result;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

/// Schema version written by this build.
pub const SCHEMA_VERSION: u32 = 3;

struct Migration {
    version: u32,
    description: &'static str,
    /// Upgrade one test record in place. Returns true if it changed.
    apply: fn(&mut serde_json::Map<String, Value>) -> bool,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 2,
        description: "add test state",
        apply: add_test_state,
    },
    Migration {
        version: 3,
        description: "add failure reason",
        apply: add_failure_reason,
    },
];

fn add_test_state(test: &mut serde_json::Map<String, Value>) -> bool {
    if test.contains_key("state") {
        return false;
    }
    test.insert("state".to_string(), Value::String("unknown".to_string()));
    true
}

fn add_failure_reason(test: &mut serde_json::Map<String, Value>) -> bool {
    if test.contains_key("failureReason") {
        return false;
    }
    test.insert("failureReason".to_string(), Value::String(String::new()));
    true
}

/// Stored schema version. Databases without a version row are version 1.
pub fn current_version(conn: &Connection) -> Result<u32> {
    let version: Option<u32> = conn
        .query_row("SELECT version FROM schema_meta WHERE id = 1", [], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(version.unwrap_or(1))
}

/// Upgrade a single project document from `from_version` to the current
/// schema. Returns true if anything changed.
pub fn migrate_document(doc: &mut Value, from_version: u32) -> bool {
    let mut changed = false;
    for migration in pending(from_version) {
        changed |= apply_to_tests(doc, migration.apply);
    }
    changed
}

fn pending(from_version: u32) -> impl Iterator<Item = &'static Migration> {
    MIGRATIONS.iter().filter(move |m| m.version > from_version)
}

fn apply_to_tests(doc: &mut Value, apply: fn(&mut serde_json::Map<String, Value>) -> bool) -> bool {
    let Some(tests) = doc.get_mut("tests").and_then(Value::as_array_mut) else {
        return false;
    };
    let mut changed = false;
    for test in tests.iter_mut().filter_map(Value::as_object_mut) {
        changed |= apply(test);
    }
    changed
}

/// Apply every pending migration in one transaction. Returns the resulting
/// version.
pub fn run(conn: &mut Connection) -> Result<u32> {
    let from = current_version(conn)?;
    if from >= SCHEMA_VERSION {
        return Ok(from);
    }

    let tx = conn.transaction()?;
    let docs: Vec<(String, String)> = {
        let mut stmt = tx.prepare("SELECT id, doc FROM projects")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<std::result::Result<_, _>>()?
    };

    let mut updated = 0usize;
    for (id, raw) in docs {
        let mut doc: Value = serde_json::from_str(&raw)?;
        if migrate_document(&mut doc, from) {
            tx.execute(
                "UPDATE projects SET doc = ?1 WHERE id = ?2",
                params![serde_json::to_string(&doc)?, id],
            )?;
            updated += 1;
        }
    }

    tx.execute(
        "INSERT OR REPLACE INTO schema_meta (id, version) VALUES (1, ?1)",
        [SCHEMA_VERSION],
    )?;
    tx.commit()?;

    for migration in pending(from) {
        tracing::info!(version = migration.version, "applied migration: {}", migration.description);
    }
    tracing::info!(from, to = SCHEMA_VERSION, projects = updated, "schema migrated");

    Ok(SCHEMA_VERSION)
}

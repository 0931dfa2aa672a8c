//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define store contracts for bubbles and curves.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repositories only accept connections migrated to the latest schema.
//! - Read paths reject invalid persisted state instead of masking it.

pub mod bubble_repo;
pub mod curve_repo;

use rusqlite::Connection;
use uuid::Uuid;

/// Schema readiness failures shared by repository constructors.
#[derive(Debug)]
pub(crate) enum SchemaCheckError {
    Db(rusqlite::Error),
    Version { expected: u32, actual: u32 },
    MissingTable(&'static str),
    MissingColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl From<rusqlite::Error> for SchemaCheckError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(value)
    }
}

/// Checks schema version, table presence and required columns.
pub(crate) fn ensure_table_columns(
    conn: &Connection,
    expected_version: u32,
    table: &'static str,
    columns: &[&'static str],
) -> Result<(), SchemaCheckError> {
    let actual: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual != expected_version {
        return Err(SchemaCheckError::Version {
            expected: expected_version,
            actual,
        });
    }

    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(SchemaCheckError::MissingTable(table));
    }

    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut present = Vec::new();
    while let Some(row) = rows.next()? {
        present.push(row.get::<_, String>(1)?);
    }
    for column in columns {
        if !present.iter().any(|name| name == column) {
            return Err(SchemaCheckError::MissingColumn { table, column });
        }
    }
    Ok(())
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> Result<Uuid, String> {
    Uuid::parse_str(value).map_err(|_| format!("invalid uuid `{value}` in {column}"))
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn int_to_bool(value: i64, column: &str) -> Result<bool, String> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(format!("invalid boolean value `{other}` in {column}")),
    }
}

//! SQLite layout: a single key/value `metadata` table.

use rusqlite::{Connection, OptionalExtension};

use crate::error::{Result, StoreError};

pub const SCHEMA_VERSION: i64 = 1;

const VERSION_KEY: &str = "schema_version";

/// Apply connection pragmas, create tables and stamp the schema version.
/// Databases written by a newer schema are refused.
pub fn initialize(conn: &Connection) -> Result<()> {
    apply_pragmas(conn)?;
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS metadata (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )?;

    match get_schema_version(conn)? {
        Some(found) if found > SCHEMA_VERSION => {
            return Err(StoreError::InvalidData(format!(
                "database schema v{found} is newer than supported v{SCHEMA_VERSION}"
            )));
        }
        Some(found) if found == SCHEMA_VERSION => {}
        _ => {
            conn.execute(
                "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
                (VERSION_KEY, SCHEMA_VERSION.to_string()),
            )?;
        }
    }
    Ok(())
}

fn apply_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;
    conn.pragma_update(None, "wal_autocheckpoint", 100)?;
    // fails harmlessly on in-memory databases
    if conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);").is_ok() {
        tracing::debug!("startup WAL checkpoint complete");
    }
    Ok(())
}

/// Stored schema version. Unparseable values read as 0.
pub fn get_schema_version(conn: &Connection) -> Result<Option<i64>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = ?1",
            [VERSION_KEY],
            |row| row.get(0),
        )
        .optional()?;
    Ok(raw.map(|v| v.parse().unwrap_or(0)))
}

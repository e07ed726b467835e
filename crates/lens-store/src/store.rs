use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};

use lens_core::MemoryRecord;

use crate::error::Result;
use crate::schema;

/// Metadata key of the persisted memory record.
pub const MEMORY_KEY: &str = "memory_seed_v0";

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // --- Metadata ---

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn delete_metadata(&self, key: &str) -> Result<bool> {
        let n = self
            .conn
            .execute("DELETE FROM metadata WHERE key = ?1", [key])?;
        Ok(n > 0)
    }

    // --- Memory record ---

    /// Load the memory record. A missing row yields a fresh record stamped
    /// `now`; a corrupt one is logged and replaced field by field with
    /// defaults. Only database failures are errors.
    pub fn load_memory_record(&self, now: u64) -> Result<MemoryRecord> {
        let raw = self.get_metadata(MEMORY_KEY)?;
        if let Some(text) = raw.as_deref()
            && !serde_json::from_str::<serde_json::Value>(text).is_ok_and(|v| v.is_object())
        {
            tracing::warn!(key = MEMORY_KEY, "corrupt memory record, using defaults");
        }
        Ok(MemoryRecord::from_json_lenient(raw.as_deref(), now))
    }

    pub fn save_memory_record(&self, record: &MemoryRecord) -> Result<()> {
        self.set_metadata(MEMORY_KEY, &record.to_json())?;
        tracing::debug!(
            bias = record.bias,
            vol = record.vol,
            last = record.last,
            "memory record saved"
        );
        Ok(())
    }

    /// Remove the persisted record. Returns whether one existed.
    pub fn reset_memory_record(&self) -> Result<bool> {
        self.delete_metadata(MEMORY_KEY)
    }

    /// Fold the WAL back into the main database file.
    pub fn checkpoint_truncate(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}

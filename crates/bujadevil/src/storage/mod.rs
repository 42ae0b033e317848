//! Storage layer for bujadevil.
//!
//! This module provides a `SQLite`-backed key/value store with the same
//! surface as browser local storage (`get_item`, `set_item`, `remove_item`),
//! plus an atomic read-modify-write primitive used by the blog layer.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use tracing::{debug, info, trace};

use crate::error::{Error, Result};

/// How long a writer waits for another process holding the write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Key/value storage engine.
///
/// Values are opaque strings. Every write is durable once the call returns;
/// [`Storage::update_item`] additionally guarantees that no other writer can
/// interleave between its read and its write.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        // WAL lets the CLI read while a server holds the write lock.
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_item(&self, key: &str) -> Result<Option<String>> {
        read_item(&self.conn, key)
    }

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn set_item(&self, key: &str, value: &str) -> Result<()> {
        write_item(&self.conn, key, value)
    }

    /// Remove `key`.
    ///
    /// Returns `true` if a value was removed, `false` if the key was absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn remove_item(&self, key: &str) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM items WHERE key = ?1", [key])?;
        if affected > 0 {
            debug!("Removed item {}", key);
        }
        Ok(affected > 0)
    }

    /// List every stored key in lexical order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT key FROM items ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    /// Remove every item. Returns the number of items removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn clear(&self) -> Result<usize> {
        let affected = self.conn.execute("DELETE FROM items", [])?;
        info!("Cleared {} items", affected);
        Ok(affected)
    }

    /// Atomically read, transform and write back the value under `key`.
    ///
    /// `f` receives the current value (if any) and returns the value to store
    /// along with a result for the caller. The read and the write happen in
    /// one `IMMEDIATE` transaction, so concurrent writers (in this process or
    /// another one) are serialized instead of overwriting each other. When
    /// `f` fails, nothing is written and its error is returned.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `f`, or an error if the database
    /// operation fails.
    pub fn update_item<T, F>(&self, key: &str, f: F) -> Result<T>
    where
        F: FnOnce(Option<String>) -> Result<(String, T)>,
    {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let current = read_item(&tx, key)?;
        // Dropping `tx` on the error path rolls back.
        let (next, output) = f(current)?;
        write_item(&tx, key, &next)?;
        tx.commit()?;
        trace!("Committed update of {}", key);
        Ok(output)
    }

    /// Get storage statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let (total_items, total_bytes): (i64, Option<i64>) = self.conn.query_row(
            "SELECT COUNT(*), SUM(LENGTH(CAST(value AS BLOB))) FROM items",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            total_items,
            total_bytes: total_bytes.unwrap_or(0),
            db_size_bytes,
        })
    }
}

fn read_item(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row("SELECT value FROM items WHERE key = ?1", [key], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(value)
}

fn write_item(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        r"
        INSERT INTO items (key, value, updated_at) VALUES (?1, ?2, ?3)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        ",
        params![key, value, Utc::now().to_rfc3339()],
    )?;
    trace!("Wrote {} bytes to {}", value.len(), key);
    Ok(())
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of stored keys.
    pub total_items: i64,
    /// Total size of all stored values in bytes.
    pub total_bytes: i64,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_storage() -> Storage {
        Storage::open_in_memory().expect("failed to create test storage")
    }

    #[test]
    fn test_open_in_memory() {
        let storage = Storage::open_in_memory();
        assert!(storage.is_ok());
        assert_eq!(storage.unwrap().path(), Path::new(":memory:"));
    }

    #[test]
    fn test_set_and_get() {
        let storage = create_test_storage();

        storage.set_item("theme", "dark").unwrap();
        assert_eq!(storage.get_item("theme").unwrap().as_deref(), Some("dark"));
    }

    #[test]
    fn test_get_missing() {
        let storage = create_test_storage();
        assert!(storage.get_item("missing").unwrap().is_none());
    }

    #[test]
    fn test_set_overwrites() {
        let storage = create_test_storage();

        storage.set_item("k", "one").unwrap();
        storage.set_item("k", "two").unwrap();

        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("two"));
        assert_eq!(storage.keys().unwrap().len(), 1);
    }

    #[test]
    fn test_remove_item() {
        let storage = create_test_storage();
        storage.set_item("k", "v").unwrap();

        assert!(storage.remove_item("k").unwrap());
        assert!(!storage.remove_item("k").unwrap());
        assert!(storage.get_item("k").unwrap().is_none());
    }

    #[test]
    fn test_keys_sorted() {
        let storage = create_test_storage();
        storage.set_item("b", "2").unwrap();
        storage.set_item("a", "1").unwrap();

        assert_eq!(storage.keys().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_clear() {
        let storage = create_test_storage();
        storage.set_item("a", "1").unwrap();
        storage.set_item("b", "2").unwrap();

        assert_eq!(storage.clear().unwrap(), 2);
        assert!(storage.keys().unwrap().is_empty());
    }

    #[test]
    fn test_update_item_creates_and_modifies() {
        let storage = create_test_storage();

        let previous = storage
            .update_item("counter", |current| {
                let n: i32 = current.as_deref().unwrap_or("0").parse().unwrap();
                Ok(((n + 1).to_string(), n))
            })
            .unwrap();
        assert_eq!(previous, 0);

        storage
            .update_item("counter", |current| {
                let n: i32 = current.unwrap().parse().unwrap();
                Ok(((n + 1).to_string(), ()))
            })
            .unwrap();

        assert_eq!(storage.get_item("counter").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn test_update_item_rolls_back_on_error() {
        let storage = create_test_storage();
        storage.set_item("k", "original").unwrap();

        let result: Result<()> = storage.update_item("k", |_| Err(Error::invalid("nope")));
        assert!(matches!(result, Err(Error::InvalidInput(_))));

        assert_eq!(
            storage.get_item("k").unwrap().as_deref(),
            Some("original")
        );

        // The connection is usable again after the rollback.
        storage.set_item("k", "next").unwrap();
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("next"));
    }

    #[test]
    fn test_stats() {
        let storage = create_test_storage();
        let empty = storage.stats().unwrap();
        assert_eq!(empty.total_items, 0);
        assert_eq!(empty.total_bytes, 0);

        storage.set_item("a", "12345").unwrap();
        let stats = storage.stats().unwrap();
        assert_eq!(stats.total_items, 1);
        assert_eq!(stats.total_bytes, 5);
        assert_eq!(stats.db_size_bytes, 0);
    }

    #[test]
    fn test_stats_counts_utf8_bytes() {
        let storage = create_test_storage();
        storage.set_item("a", "café 🚀").unwrap();

        let stats = storage.stats().unwrap();
        assert_eq!(stats.total_bytes, 10);
    }

    #[test]
    fn test_open_on_disk_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("blog.db");

        {
            let storage = Storage::open(&path).unwrap();
            storage.set_item("k", "v").unwrap();
        }

        let storage = Storage::open(&path).unwrap();
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("v"));
        assert!(storage.stats().unwrap().db_size_bytes > 0);
    }

    #[test]
    fn test_two_connections_do_not_lose_updates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blog.db");
        let first = Storage::open(&path).unwrap();
        let second = Storage::open(&path).unwrap();

        for storage in [&first, &second, &first, &second] {
            storage
                .update_item("n", |current| {
                    let n: i32 = current.as_deref().unwrap_or("0").parse().unwrap();
                    Ok(((n + 1).to_string(), ()))
                })
                .unwrap();
        }

        assert_eq!(first.get_item("n").unwrap().as_deref(), Some("4"));
    }
}

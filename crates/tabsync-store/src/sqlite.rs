//! SQLite executor backed by rusqlite

use rusqlite::types::ValueRef;
use rusqlite::Connection;
use std::path::Path;
use tabsync_core::Record;

use crate::executor::{StatementExecutor, StoreError};

/// Executor over a single SQLite connection
pub struct SqliteExecutor {
    connection: Connection,
}

impl SqliteExecutor {
    /// Open (or create) a database file
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let connection = Connection::open(path)
            .map_err(|e| StoreError::ConnectionError(format!("{}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), "opened sqlite database");
        Ok(Self { connection })
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let connection =
            Connection::open_in_memory().map_err(|e| StoreError::ConnectionError(e.to_string()))?;
        Ok(Self { connection })
    }
}

impl StatementExecutor for SqliteExecutor {
    fn name(&self) -> &'static str {
        "SQLite"
    }

    fn execute(&self, sql: &str) -> Result<usize, StoreError> {
        tracing::trace!(statement = sql, "execute");
        self.connection
            .execute(sql, [])
            .map_err(|e| StoreError::statement(sql, e.to_string()))
    }

    fn query(&self, sql: &str) -> Result<Vec<Record>, StoreError> {
        tracing::trace!(statement = sql, "query");
        let mut statement = self
            .connection
            .prepare(sql)
            .map_err(|e| StoreError::query(sql, e.to_string()))?;
        let names: Vec<String> = statement.column_names().iter().map(|n| n.to_string()).collect();

        let mut rows = statement
            .query([])
            .map_err(|e| StoreError::query(sql, e.to_string()))?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().map_err(|e| StoreError::query(sql, e.to_string()))? {
            let mut record = Record::new();
            for (i, name) in names.iter().enumerate() {
                let value = row.get_ref(i).map_err(|e| StoreError::ValueError {
                    column: name.clone(),
                    message: e.to_string(),
                })?;
                record.set(name.as_str(), text_of(value));
            }
            records.push(record);
        }
        Ok(records)
    }
}

fn text_of(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_text_and_null() {
        let store = SqliteExecutor::open_in_memory().unwrap();
        store
            .execute("CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT, dept TEXT)")
            .unwrap();
        let changed = store
            .execute("INSERT INTO t (name, dept) VALUES ('O''Brien', NULL), ('田中', '')")
            .unwrap();
        assert_eq!(changed, 2);

        let rows = store.query("SELECT id, name, dept FROM t ORDER BY id").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("id"), Some("1"));
        assert_eq!(rows[0].get("name"), Some("O'Brien"));
        assert_eq!(rows[0].get("dept"), None);
        assert_eq!(rows[1].get("dept"), Some(""));
    }

    #[test]
    fn rollback_discards_changes() {
        let store = SqliteExecutor::open_in_memory().unwrap();
        store.execute("CREATE TABLE t (name TEXT)").unwrap();

        store.execute("BEGIN").unwrap();
        store.execute("INSERT INTO t (name) VALUES ('a')").unwrap();
        store.execute("ROLLBACK").unwrap();

        assert!(store.query("SELECT name FROM t").unwrap().is_empty());
    }

    #[test]
    fn errors_carry_the_statement() {
        let store = SqliteExecutor::open_in_memory().unwrap();
        let err = store.execute("INSERT INTO missing (a) VALUES (1)").unwrap_err();
        match err {
            StoreError::StatementError { statement, message } => {
                assert!(statement.starts_with("INSERT INTO missing"));
                assert!(message.contains("no such table"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sync.db");
        {
            let store = SqliteExecutor::open(&path).unwrap();
            store.execute("CREATE TABLE sync_result (a TEXT)").unwrap();
        }
        let store = SqliteExecutor::open(&path).unwrap();
        let tables = store
            .query("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].get("name"), Some("sync_result"));
    }
}

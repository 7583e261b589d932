//! Statement executor trait for the relational store

use tabsync_core::Record;

/// Errors reported by the relational store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Connection failed: {0}")]
    ConnectionError(String),

    #[error("Statement failed: {message} (in: {statement})")]
    StatementError { statement: String, message: String },

    #[error("Query failed: {message} (in: {statement})")]
    QueryError { statement: String, message: String },

    #[error("Unreadable value in column {column}: {message}")]
    ValueError { column: String, message: String },
}

impl StoreError {
    pub fn statement(sql: &str, message: impl Into<String>) -> Self {
        Self::StatementError {
            statement: statement_head(sql),
            message: message.into(),
        }
    }

    pub fn query(sql: &str, message: impl Into<String>) -> Self {
        Self::QueryError {
            statement: statement_head(sql),
            message: message.into(),
        }
    }
}

/// First line of a statement, shortened for error messages
pub fn statement_head(sql: &str) -> String {
    const MAX: usize = 120;
    let line = sql.trim().lines().next().unwrap_or_default();
    match line.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &line[..cut]),
        None => line.to_string(),
    }
}

/// Executes statement text against a relational store
///
/// Implementations hold the connection. Transaction control is issued as
/// plain statements (`BEGIN`, `COMMIT`, `ROLLBACK`), so every call must run on
/// the same session.
pub trait StatementExecutor {
    /// Backend name for logs (e.g. "SQLite")
    fn name(&self) -> &'static str;

    /// Run a single statement and return the number of rows it changed
    fn execute(&self, sql: &str) -> Result<usize, StoreError>;

    /// Run a query and return its rows; SQL `NULL` becomes `None`
    fn query(&self, sql: &str) -> Result<Vec<Record>, StoreError>;
}

impl<T: StatementExecutor + ?Sized> StatementExecutor for &T {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn execute(&self, sql: &str) -> Result<usize, StoreError> {
        (**self).execute(sql)
    }

    fn query(&self, sql: &str) -> Result<Vec<Record>, StoreError> {
        (**self).query(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heads_are_single_line() {
        assert_eq!(statement_head("  INSERT INTO t (a)\nVALUES ('x');"), "INSERT INTO t (a)");

        let long = "a".repeat(200);
        let head = statement_head(&long);
        assert_eq!(head.len(), 123);
        assert!(head.ends_with("..."));
    }

    #[test]
    fn error_messages() {
        let err = StoreError::statement("INSERT INTO t VALUES (1);", "no such table: t");
        assert_eq!(
            err.to_string(),
            "Statement failed: no such table: t (in: INSERT INTO t VALUES (1);)"
        );
    }
}

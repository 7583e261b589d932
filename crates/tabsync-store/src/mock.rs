//! Recording executor for testing
//!
//! [`MockExecutor`] records every statement it receives. It can forward to a
//! real executor, return canned rows, and fail on chosen statements, which is
//! how abort-and-rollback paths are exercised.
//!
//! ```rust,ignore
//! let store = MockExecutor::wrapping(SqliteExecutor::open_in_memory()?)
//!     .with_failure_on("'DELETE'");
//! ```

use std::sync::Mutex;
use tabsync_core::Record;

use crate::executor::{StatementExecutor, StoreError};

pub struct MockExecutor {
    /// Statements received, in order
    statements: Mutex<Vec<String>>,

    /// Executor to forward to, if any
    inner: Option<Box<dyn StatementExecutor>>,

    /// Statements containing one of these substrings fail
    failures: Vec<String>,

    /// Rows returned for queries containing the substring (without `inner`)
    canned: Vec<(String, Vec<Record>)>,
}

impl MockExecutor {
    /// Executor that accepts everything and changes nothing
    pub fn new() -> Self {
        Self {
            statements: Mutex::new(Vec::new()),
            inner: None,
            failures: Vec::new(),
            canned: Vec::new(),
        }
    }

    /// Record statements and forward them to `inner`
    pub fn wrapping(inner: impl StatementExecutor + 'static) -> Self {
        Self {
            inner: Some(Box::new(inner)),
            ..Self::new()
        }
    }

    /// Fail any statement whose text contains `fragment`
    pub fn with_failure_on(mut self, fragment: impl Into<String>) -> Self {
        self.failures.push(fragment.into());
        self
    }

    /// Answer queries containing `fragment` with `rows`
    pub fn with_query_result(mut self, fragment: impl Into<String>, rows: Vec<Record>) -> Self {
        self.canned.push((fragment.into(), rows));
        self
    }

    /// Statements received so far
    pub fn statements(&self) -> Vec<String> {
        self.log().clone()
    }

    /// Number of received statements containing `fragment`
    pub fn count_containing(&self, fragment: &str) -> usize {
        self.log().iter().filter(|s| s.contains(fragment)).count()
    }

    fn log(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.statements.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, sql: &str) -> Result<(), String> {
        self.log().push(sql.to_string());
        match self.failures.iter().find(|f| sql.contains(f.as_str())) {
            Some(fragment) => Err(format!("simulated failure on '{}'", fragment)),
            None => Ok(()),
        }
    }
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl StatementExecutor for MockExecutor {
    fn name(&self) -> &'static str {
        "Mock"
    }

    fn execute(&self, sql: &str) -> Result<usize, StoreError> {
        self.record(sql).map_err(|e| StoreError::statement(sql, e))?;
        match &self.inner {
            Some(inner) => inner.execute(sql),
            None => Ok(0),
        }
    }

    fn query(&self, sql: &str) -> Result<Vec<Record>, StoreError> {
        self.record(sql).map_err(|e| StoreError::query(sql, e))?;
        if let Some(inner) = &self.inner {
            return inner.query(sql);
        }
        Ok(self
            .canned
            .iter()
            .find(|(fragment, _)| sql.contains(fragment.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }
}

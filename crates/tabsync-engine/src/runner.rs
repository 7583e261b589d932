use tabsync_core::{Record, SchemaModel};
use tabsync_sql::StatementValidator;
use tabsync_store::StatementExecutor;

use crate::error::SyncError;

/// Executor handle that validates statements first when asked to
pub(crate) struct StatementRunner<'a, E: StatementExecutor> {
    executor: &'a E,
    validator: Option<StatementValidator>,
}

impl<'a, E: StatementExecutor> StatementRunner<'a, E> {
    pub fn new(model: &SchemaModel, executor: &'a E) -> Self {
        let validator = model
            .options
            .validate_statements
            .then(|| StatementValidator::from_dialect(model.dialect));
        Self { executor, validator }
    }

    fn check(&self, sql: &str) -> Result<(), SyncError> {
        if let Some(validator) = &self.validator {
            validator.validate(sql)?;
        }
        tracing::debug!(statement = sql, "sending to {}", self.executor.name());
        Ok(())
    }

    pub fn execute(&self, sql: &str) -> Result<usize, SyncError> {
        self.check(sql)?;
        Ok(self.executor.execute(sql)?)
    }

    pub fn query(&self, sql: &str) -> Result<Vec<Record>, SyncError> {
        self.check(sql)?;
        Ok(self.executor.query(sql)?)
    }

    /// Transaction control, sent without validation
    pub fn control(&self, sql: &str) -> Result<(), SyncError> {
        tracing::debug!(statement = sql, "transaction control");
        self.executor.execute(sql)?;
        Ok(())
    }
}

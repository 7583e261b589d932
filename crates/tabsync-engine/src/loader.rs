//! Table creation and bulk loading
//!
//! Every run replaces the store's tables: drop, create, index. Rows missing a
//! key or required value are skipped and counted; the rest are inserted in
//! batches of `options.insert_batch_size`.

use tabsync_core::{Record, RowErrorSummary, SchemaModel, TableSchema};
use tabsync_sql::builder::{create_indexes, create_table, drop_table, insert_rows};
use tabsync_store::StatementExecutor;

use crate::error::SyncError;
use crate::runner::StatementRunner;

/// Drop, create and index statements for every declared table
pub fn schema_statements(model: &SchemaModel) -> Vec<String> {
    let mut statements = Vec::new();
    for table in model.tables() {
        statements.push(drop_table(&table.name));
        statements.push(create_table(table));
        statements.extend(create_indexes(table));
    }
    statements
}

pub struct TableLoader<'a, E: StatementExecutor> {
    model: &'a SchemaModel,
    runner: StatementRunner<'a, E>,
}

impl<'a, E: StatementExecutor> TableLoader<'a, E> {
    pub fn new(model: &'a SchemaModel, executor: &'a E) -> Self {
        Self {
            model,
            runner: StatementRunner::new(model, executor),
        }
    }

    /// Recreate every declared table
    pub fn prepare_tables(&self) -> Result<(), SyncError> {
        for statement in schema_statements(self.model) {
            self.runner.execute(&statement)?;
        }
        tracing::debug!(tables = self.model.tables().count(), "tables recreated");
        Ok(())
    }

    /// Validate and insert `rows` into `table`
    pub fn load(&self, table: &TableSchema, rows: &[Record]) -> Result<RowErrorSummary, SyncError> {
        let sample_size = self.model.options.row_error_sample_size;
        let mut samples = Vec::new();
        let mut valid = Vec::with_capacity(rows.len());

        for (index, row) in rows.iter().enumerate() {
            match self.row_error(table, row) {
                Some(reason) => {
                    if samples.len() < sample_size {
                        samples.push(format!("row {}: {}", index + 1, reason));
                    }
                }
                None => valid.push(row.clone()),
            }
        }

        let columns: Vec<&str> = table.data_columns().map(|c| c.name.as_str()).collect();
        let mut inserted = 0;
        for batch in valid.chunks(self.model.options.insert_batch_size.max(1)) {
            if let Some(statement) = insert_rows(&table.name, &columns, batch) {
                inserted += self.runner.execute(&statement)?;
            }
        }

        let summary = RowErrorSummary::new(&table.name, rows.len(), rows.len() - valid.len(), samples);
        if summary.skipped > 0 {
            tracing::warn!(
                table = %table.name,
                skipped = summary.skipped,
                "rows skipped for missing key or required values"
            );
        }
        tracing::info!(table = %table.name, rows = inserted, "loaded");
        Ok(summary)
    }

    /// Why a row cannot be loaded, if it cannot
    fn row_error(&self, table: &TableSchema, row: &Record) -> Option<String> {
        if let Some(key) = self
            .model
            .key_columns(&table.name)
            .iter()
            .find(|key| row.non_empty(key).is_none())
        {
            return Some(format!("key column '{}' is missing or empty", key));
        }
        table
            .data_columns()
            .filter(|c| c.is_required)
            .find(|c| row.non_empty(&c.name).is_none())
            .map(|c| format!("required field '{}' is missing or empty", c.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{model, model_with};
    use serde_json::json;
    use tabsync_core::PROVIDED_TABLE;
    use tabsync_store::{MockExecutor, SqliteExecutor};

    #[test]
    fn schema_statements_cover_every_table() {
        let model = model();
        let statements = schema_statements(&model);
        assert_eq!(statements.len(), 6);
        assert_eq!(statements[0], "DROP TABLE IF EXISTS provided_data;");
        assert!(statements[1].starts_with("CREATE TABLE provided_data ("));
        assert!(statements[5].starts_with("CREATE TABLE sync_result ("));
    }

    #[test]
    fn skips_rows_without_keys() {
        let model = model();
        let store = SqliteExecutor::open_in_memory().unwrap();
        let loader = TableLoader::new(&model, &store);
        loader.prepare_tables().unwrap();

        let rows = vec![
            Record::new().with("employee_id", "E001").with("name", "Alice"),
            Record::new().with("employee_id", "").with("name", "Nobody"),
            Record::new().with("name", "Missing"),
        ];
        let summary = loader.load(model.provided(), &rows).unwrap();

        assert_eq!(summary.loaded, 1);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.samples[0], "row 2: key column 'employee_id' is missing or empty");

        let stored = store.query("SELECT id, employee_id, name, dept FROM provided_data").unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].get("id"), Some("1"));
        assert_eq!(stored[0].get("dept"), None);
    }

    #[test]
    fn required_fields_and_sample_bound() {
        let model = model_with(|doc| {
            doc["tables"]["provided_data"]["columns"][2]["required"] = json!(true);
            doc["options"] = json!({ "row_error_sample_size": 1 });
        });
        let store = MockExecutor::new();
        let loader = TableLoader::new(&model, &store);

        let rows = vec![
            Record::new().with("employee_id", "E1"),
            Record::new().with("employee_id", "E2"),
        ];
        let summary = loader.load(model.provided(), &rows).unwrap();

        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.samples, vec!["row 1: required field 'name' is missing or empty"]);
        assert_eq!(store.count_containing("INSERT"), 0);
    }

    #[test]
    fn inserts_in_batches() {
        let model = model_with(|doc| doc["options"] = json!({ "insert_batch_size": 2 }));
        let store = MockExecutor::new();
        let loader = TableLoader::new(&model, &store);

        let rows: Vec<Record> = (0..5)
            .map(|i| Record::new().with("employee_id", format!("E{}", i)))
            .collect();
        loader.load(model.table(PROVIDED_TABLE).unwrap(), &rows).unwrap();

        let inserts = store.statements();
        assert_eq!(inserts.len(), 3);
        assert!(inserts.iter().all(|s| s.starts_with("INSERT INTO provided_data (employee_id, name, dept)")));
    }
}

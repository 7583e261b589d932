//! Run pipeline: filter, load, reconcile, read back, report

use tabsync_core::{
    Diagnostic, DiagnosticCode, Record, ResultRecord, RowErrorSummary, SchemaModel, Severity,
    SyncReport, CURRENT_TABLE, PROVIDED_TABLE,
};
use tabsync_store::StatementExecutor;

use crate::error::SyncError;
use crate::filter::FilterEngine;
use crate::loader::TableLoader;
use crate::reconcile::ReconciliationEngine;

/// Classified rows of a run together with its report
#[derive(Debug, Clone, PartialEq)]
pub struct SyncRun {
    pub results: Vec<ResultRecord>,
    pub report: SyncReport,
}

pub struct Synchronizer<'a, E: StatementExecutor> {
    model: &'a SchemaModel,
    executor: &'a E,
}

impl<'a, E: StatementExecutor> Synchronizer<'a, E> {
    pub fn new(model: &'a SchemaModel, executor: &'a E) -> Self {
        Self { model, executor }
    }

    /// Reconcile two complete snapshots
    ///
    /// The store's tables are replaced. Row-level problems are reported and
    /// skipped; store failures abort the run.
    pub fn run(&self, provided: Vec<Record>, current: Vec<Record>) -> Result<SyncRun, SyncError> {
        let mut report = SyncReport::new(&self.model.digest);

        let filter = FilterEngine::new(self.model);
        let provided = filter.apply(PROVIDED_TABLE, provided);
        let current = filter.apply(CURRENT_TABLE, current);
        report.filters.push(provided.statistics.clone());
        report.filters.push(current.statistics.clone());

        let loader = TableLoader::new(self.model, self.executor);
        loader.prepare_tables()?;
        for (table, rows) in [
            (self.model.provided(), &provided.kept),
            (self.model.current(), &current.kept),
        ] {
            let summary = loader.load(table, rows)?;
            if let Some(diagnostic) = row_error_diagnostic(&summary) {
                report.add_diagnostic(diagnostic);
            }
            report.row_errors.push(summary);
        }

        let engine = ReconciliationEngine::new(self.model, self.executor);
        let reconciled = engine.run(&current.excluded)?;
        report.summary = reconciled.summary;
        for diagnostic in reconciled.diagnostics {
            report.add_diagnostic(diagnostic);
        }

        let results = engine.results()?;
        tracing::info!(
            added = report.summary.added,
            updated = report.summary.updated,
            deleted = report.summary.deleted,
            kept = report.summary.kept,
            "sync complete"
        );

        Ok(SyncRun { results, report })
    }
}

fn row_error_diagnostic(summary: &RowErrorSummary) -> Option<Diagnostic> {
    if summary.skipped == 0 {
        return None;
    }
    Some(
        Diagnostic::new(
            DiagnosticCode::RowMissingRequiredField,
            Severity::Warn,
            format!(
                "{} of {} rows skipped ({}%)",
                summary.skipped, summary.total, summary.error_rate_percent
            ),
        )
        .with_section(summary.table.clone())
        .with_samples(summary.samples.clone()),
    )
}

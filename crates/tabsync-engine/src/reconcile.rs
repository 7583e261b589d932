//! Four-phase reconciliation
//!
//! Each phase is one `INSERT INTO sync_result ... SELECT` against the loaded
//! input tables, run in this order inside a single transaction:
//!
//! 1. ADD: provided rows without a current match
//! 2. UPDATE: matched rows where a comparison column differs
//! 3. DELETE: current rows without a provided match
//! 4. KEEP: matched rows with equal comparison columns whose resolved key
//!    is not yet in the result
//!
//! Excluded current rows are then surfaced as KEEP when the current-data
//! filter asks for it. Any failure rolls the transaction back.

use tabsync_core::{
    Diagnostic, DiagnosticCode, Outcome, OutcomeSummary, Record, ResultRecord, SchemaModel,
    Severity, CURRENT_TABLE, PROVIDED_TABLE, RESULT_TABLE,
};
use tabsync_sql::builder::{
    anti_join_condition, comparison_predicate, duplicate_key_query, group_by_clause,
    insert_select, join_predicate, resolution_expression, ComparisonMode,
};
use tabsync_sql::escape::{literal_or_null, qualified, quote_identifier, quote_literal};
use tabsync_store::StatementExecutor;

use crate::error::SyncError;
use crate::resolution::FieldResolver;
use crate::runner::StatementRunner;

const PROVIDED_ALIAS: &str = "p";
const CURRENT_ALIAS: &str = "c";

/// Statement of one phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseStatement {
    pub outcome: Outcome,
    pub sql: String,
}

/// Every statement a run issues against loaded tables, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationPlan {
    pub phases: Vec<PhaseStatement>,

    /// Duplicate result key check, run after the phases
    pub duplicate_check: String,
}

impl ReconciliationPlan {
    /// Build the plan for a model without touching any store
    pub fn build(model: &SchemaModel) -> Self {
        let phases = Outcome::ALL
            .iter()
            .map(|&outcome| PhaseStatement {
                outcome,
                sql: phase_statement(model, outcome),
            })
            .collect();

        Self {
            phases,
            duplicate_check: duplicate_key_query(RESULT_TABLE, model.key_columns(RESULT_TABLE)),
        }
    }

    pub fn statement(&self, outcome: Outcome) -> Option<&str> {
        self.phases
            .iter()
            .find(|p| p.outcome == outcome)
            .map(|p| p.sql.as_str())
    }
}

/// Counts and integrity findings of a completed run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileSummary {
    pub summary: OutcomeSummary,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ReconciliationEngine<'a, E: StatementExecutor> {
    model: &'a SchemaModel,
    runner: StatementRunner<'a, E>,
}

impl<'a, E: StatementExecutor> ReconciliationEngine<'a, E> {
    pub fn new(model: &'a SchemaModel, executor: &'a E) -> Self {
        Self {
            model,
            runner: StatementRunner::new(model, executor),
        }
    }

    /// Render the plan without executing it
    pub fn plan(&self) -> ReconciliationPlan {
        ReconciliationPlan::build(self.model)
    }

    /// Run the four phases against loaded input tables
    ///
    /// `excluded_current` holds the current rows the filter dropped; they
    /// are only used when the current-data filter keeps them as KEEP.
    pub fn run(&self, excluded_current: &[Record]) -> Result<ReconcileSummary, SyncError> {
        let mut diagnostics = Vec::new();
        let input_checks = [
            (PROVIDED_TABLE, self.model.key_columns(PROVIDED_TABLE)),
            (CURRENT_TABLE, self.model.key_columns(CURRENT_TABLE)),
        ];
        for (table, keys) in input_checks {
            diagnostics.extend(self.duplicate_keys(
                &duplicate_key_query(table, keys),
                table,
                keys,
                DiagnosticCode::IntegrityDuplicateInputKey,
            )?);
        }

        let plan = self.plan();
        self.runner.control("BEGIN;")?;
        let committed = self
            .run_phases(&plan, excluded_current)
            .and_then(|summary| self.runner.control("COMMIT;").map(|()| summary));
        let summary = match committed {
            Ok(summary) => summary,
            Err(e) => {
                tracing::error!(error = %e, "reconciliation failed, rolling back");
                if let Err(rollback) = self.runner.control("ROLLBACK;") {
                    tracing::warn!(error = %rollback, "rollback failed");
                }
                return Err(e);
            }
        };

        diagnostics.extend(self.duplicate_keys(
            &plan.duplicate_check,
            RESULT_TABLE,
            self.model.key_columns(RESULT_TABLE),
            DiagnosticCode::IntegrityDuplicateResultKey,
        )?);

        Ok(ReconcileSummary {
            summary,
            diagnostics,
        })
    }

    fn run_phases(
        &self,
        plan: &ReconciliationPlan,
        excluded_current: &[Record],
    ) -> Result<OutcomeSummary, SyncError> {
        let mut summary = OutcomeSummary::default();
        for phase in &plan.phases {
            let rows = self
                .runner
                .execute(&phase.sql)
                .map_err(|e| into_phase_error(e, phase.outcome))?;
            tracing::info!(outcome = %phase.outcome, rows, "phase complete");
            summary.record(phase.outcome, rows);
        }

        if self.model.keeps_excluded_current_rows() && !excluded_current.is_empty() {
            let forced = self.forced_keep(excluded_current)?;
            tracing::info!(rows = forced, "excluded current rows kept");
            summary.record(Outcome::Keep, forced);
            summary.forced_kept = forced;
        }

        Ok(summary)
    }

    /// Insert excluded current rows as KEEP unless their key is already present
    fn forced_keep(&self, rows: &[Record]) -> Result<usize, SyncError> {
        let resolver = FieldResolver::new(self.model);
        let columns = insert_columns(self.model);
        let existing = existing_keys_subquery(self.model);

        let mut inserted = 0;
        for row in rows {
            let resolved = resolver.resolve(None, Some(row));
            let key = resolver.result_key(&resolved);
            if key.iter().any(Option::is_none) {
                tracing::debug!("excluded row has no resolvable result key, not kept");
                continue;
            }

            let mut values: Vec<String> = self
                .model
                .output_fields
                .iter()
                .map(|f| literal_or_null(resolved.get(&f.column)))
                .collect();
            values.push(quote_literal(Outcome::Keep.as_str()));
            let key_literals: Vec<String> = key.into_iter().map(literal_or_null).collect();

            let select = format!(
                "SELECT {}\nWHERE {}",
                values.join(", "),
                anti_join_condition(&key_literals, &existing)
            );
            inserted += self
                .runner
                .execute(&insert_select(RESULT_TABLE, &columns, &select))
                .map_err(|e| into_phase_error(e, Outcome::Keep))?;
        }
        Ok(inserted)
    }

    /// Run a duplicate-key query and turn its rows into a warning
    fn duplicate_keys(
        &self,
        query: &str,
        table: &str,
        keys: &[String],
        code: DiagnosticCode,
    ) -> Result<Option<Diagnostic>, SyncError> {
        let rows = self.runner.query(query)?;
        if rows.is_empty() {
            return Ok(None);
        }

        let samples: Vec<String> = rows
            .iter()
            .take(self.model.options.row_error_sample_size.max(1))
            .map(|row| {
                let tuple: Vec<String> = keys
                    .iter()
                    .map(|k| format!("{}={}", k, row.get(k).unwrap_or("NULL")))
                    .collect();
                format!(
                    "{} ({} rows)",
                    tuple.join(", "),
                    row.get("duplicate_count").unwrap_or("?")
                )
            })
            .collect();

        tracing::warn!(table, duplicates = rows.len(), "duplicate key tuples");
        Ok(Some(
            Diagnostic::new(
                code,
                Severity::Warn,
                format!("{} key tuple(s) occur more than once in {}", rows.len(), table),
            )
            .with_section(table)
            .with_samples(samples),
        ))
    }

    /// Read the result table back, in insertion order
    pub fn results(&self) -> Result<Vec<ResultRecord>, SyncError> {
        let result = self.model.result();
        let columns: Vec<String> = result.data_columns().map(|c| quote_identifier(&c.name)).collect();
        let order = if result.has_id_column() {
            quote_identifier(tabsync_core::ID_COLUMN)
        } else {
            group_by_clause(self.model.key_columns(RESULT_TABLE), None)
        };
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {};",
            columns.join(", "),
            quote_identifier(RESULT_TABLE),
            order
        );

        self.runner
            .query(&sql)?
            .into_iter()
            .map(|values| {
                let label = values.get(&self.model.action_column).unwrap_or_default();
                let outcome = label
                    .parse::<Outcome>()
                    .map_err(|_| SyncError::UnknownAction(label.to_string()))?;
                Ok(ResultRecord::new(outcome, values))
            })
            .collect()
    }
}

fn into_phase_error(error: SyncError, outcome: Outcome) -> SyncError {
    match error {
        SyncError::Store(source) => SyncError::Phase { outcome, source },
        other => other,
    }
}

/// Output columns followed by the action column
fn insert_columns(model: &SchemaModel) -> Vec<&str> {
    let mut columns: Vec<&str> = model.output_fields.iter().map(|f| f.column.as_str()).collect();
    columns.push(&model.action_column);
    columns
}

fn phase_statement(model: &SchemaModel, outcome: Outcome) -> String {
    let provided = quote_identifier(PROVIDED_TABLE);
    let current = quote_identifier(CURRENT_TABLE);
    let provided_keys = model.key_columns(PROVIDED_TABLE);
    let join = join_predicate(PROVIDED_ALIAS, CURRENT_ALIAS, provided_keys, &model.column_mapping);

    let mut select_list: Vec<String> = model
        .output_fields
        .iter()
        .map(|f| resolution_expression(&f.sources, PROVIDED_ALIAS, CURRENT_ALIAS))
        .collect();
    select_list.push(quote_literal(outcome.as_str()));
    let select_list = select_list.join(",\n    ");

    let pairs: Vec<(&str, &str)> = model
        .comparison_columns
        .iter()
        .map(|c| (c.as_str(), model.column_mapping.current_or_same(c)))
        .collect();

    let (from, condition) = match outcome {
        Outcome::Add => (
            format!("{provided} {PROVIDED_ALIAS}\nLEFT JOIN {current} {CURRENT_ALIAS} ON {join}"),
            all_null(
                CURRENT_ALIAS,
                provided_keys.iter().map(|k| model.column_mapping.current_or_same(k)),
            ),
        ),
        Outcome::Update => (
            format!("{provided} {PROVIDED_ALIAS}\nINNER JOIN {current} {CURRENT_ALIAS} ON {join}"),
            comparison_predicate(PROVIDED_ALIAS, CURRENT_ALIAS, &pairs, ComparisonMode::Different),
        ),
        Outcome::Delete => (
            format!("{current} {CURRENT_ALIAS}\nLEFT JOIN {provided} {PROVIDED_ALIAS} ON {join}"),
            all_null(PROVIDED_ALIAS, provided_keys.iter().map(String::as_str)),
        ),
        Outcome::Keep => {
            let key_expressions: Vec<String> = model
                .key_columns(RESULT_TABLE)
                .iter()
                .filter_map(|k| model.output_field(k))
                .map(|f| resolution_expression(&f.sources, PROVIDED_ALIAS, CURRENT_ALIAS))
                .collect();
            (
                format!("{provided} {PROVIDED_ALIAS}\nINNER JOIN {current} {CURRENT_ALIAS} ON {join}"),
                format!(
                    "{}\n  AND {}",
                    comparison_predicate(PROVIDED_ALIAS, CURRENT_ALIAS, &pairs, ComparisonMode::Same),
                    anti_join_condition(&key_expressions, &existing_keys_subquery(model))
                ),
            )
        }
    };

    let select = format!("SELECT\n    {select_list}\nFROM {from}\nWHERE {condition}");
    insert_select(RESULT_TABLE, &insert_columns(model), &select)
}

/// Result key tuples already written; NULL keys are left out so `NOT IN`
/// stays decidable
fn existing_keys_subquery(model: &SchemaModel) -> String {
    let keys = model.key_columns(RESULT_TABLE);
    let not_null: Vec<String> = keys
        .iter()
        .map(|k| format!("{} IS NOT NULL", quote_identifier(k)))
        .collect();
    let list = group_by_clause(keys, None);
    format!(
        "SELECT {list} FROM {} WHERE {} GROUP BY {list}",
        quote_identifier(RESULT_TABLE),
        not_null.join(" AND ")
    )
}

fn all_null<'c>(alias: &str, columns: impl Iterator<Item = &'c str>) -> String {
    columns
        .map(|c| format!("{} IS NULL", qualified(alias, c)))
        .collect::<Vec<_>>()
        .join(" AND ")
}

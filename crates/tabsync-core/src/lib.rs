//! tabsync core
//!
//! Configuration document, validated schema model, records and the run report.
//! Never rename diagnostic codes - they are part of the report format.

pub mod config;
pub mod diagnostic;
pub mod record;
pub mod report;
pub mod schema;

pub use config::{ConfigError, DialectConfig, SyncConfig, SyncOptions};
pub use diagnostic::{Diagnostic, DiagnosticCode, ErrorCategory, Severity};
pub use record::{Outcome, Record, ResultRecord};
pub use report::{FilterStatistics, OutcomeSummary, RowErrorSummary, RuleStatistics, SyncReport};
pub use schema::{
    ColumnMapping, ColumnSpec, ConstraintKind, CsvFormat, FilterKind, FilterRule, Matcher,
    OutputFieldSpec, SchemaModel, SourceKind, SourceSpec, TableConstraint, TableFilter,
    TableSchema, ValidationError, CURRENT_TABLE, ID_COLUMN, PROVIDED_TABLE, RESULT_TABLE,
};

//! Run report schema (stable v1)
//!
//! Breaking changes require a new version.

use serde::{Deserialize, Serialize};

use crate::diagnostic::{Diagnostic, Severity};
use crate::record::Outcome;
use crate::schema::FilterKind;

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Round to two decimals
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(part as f64 / total as f64 * 100.0)
}

/// Rows dropped by one filter rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleStatistics {
    pub field: String,
    pub kind: FilterKind,
    pub description: String,
    pub excluded: usize,
}

/// Outcome of filtering one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterStatistics {
    pub table: String,
    pub total: usize,
    pub kept: usize,
    pub excluded: usize,

    /// `excluded / total * 100`, two decimals
    pub exclusion_rate_percent: f64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RuleStatistics>,
}

impl FilterStatistics {
    pub fn new(table: impl Into<String>, total: usize, excluded: usize) -> Self {
        Self {
            table: table.into(),
            total,
            kept: total - excluded,
            excluded,
            exclusion_rate_percent: percent(excluded, total),
            rules: Vec::new(),
        }
    }

    pub fn with_rules(mut self, rules: Vec<RuleStatistics>) -> Self {
        self.rules = rules;
        self
    }
}

/// Row-level errors met while loading one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowErrorSummary {
    pub table: String,
    pub total: usize,
    pub loaded: usize,
    pub skipped: usize,
    pub error_rate_percent: f64,

    /// Bounded sample of error messages
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<String>,
}

impl RowErrorSummary {
    pub fn new(table: impl Into<String>, total: usize, skipped: usize, samples: Vec<String>) -> Self {
        Self {
            table: table.into(),
            total,
            loaded: total - skipped,
            skipped,
            error_rate_percent: percent(skipped, total),
            samples,
        }
    }
}

/// Rows written per outcome
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeSummary {
    pub added: usize,
    pub updated: usize,
    pub deleted: usize,
    pub kept: usize,

    /// KEEP rows re-surfaced from filtered current data (included in `kept`)
    pub forced_kept: usize,
}

impl OutcomeSummary {
    pub fn total(&self) -> usize {
        self.added + self.updated + self.deleted + self.kept
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        match outcome {
            Outcome::Add => self.added,
            Outcome::Update => self.updated,
            Outcome::Delete => self.deleted,
            Outcome::Keep => self.kept,
        }
    }

    pub fn record(&mut self, outcome: Outcome, rows: usize) {
        match outcome {
            Outcome::Add => self.added += rows,
            Outcome::Update => self.updated += rows,
            Outcome::Delete => self.deleted += rows,
            Outcome::Keep => self.kept += rows,
        }
    }
}

/// Sync run report (report.json v1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Schema version
    pub version: ReportVersion,

    /// Timestamp (RFC 3339)
    pub timestamp: String,

    /// SHA-256 of the configuration that produced this run
    pub config_digest: String,

    pub summary: OutcomeSummary,

    pub filters: Vec<FilterStatistics>,

    pub row_errors: Vec<RowErrorSummary>,

    pub diagnostics: Vec<Diagnostic>,
}

impl SyncReport {
    /// Create a new empty report
    pub fn new(config_digest: impl Into<String>) -> Self {
        Self {
            version: ReportVersion::CURRENT,
            timestamp: chrono::Utc::now().to_rfc3339(),
            config_digest: config_digest.into(),
            summary: OutcomeSummary::default(),
            filters: Vec::new(),
            row_errors: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Add a diagnostic to the report
    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn error_count(&self) -> usize {
        self.count_severity(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count_severity(Severity::Warn)
    }

    fn count_severity(&self, severity: Severity) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == severity).count()
    }

    /// Check if the report has any errors
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Check if the report has any warnings
    pub fn has_warnings(&self) -> bool {
        self.warning_count() > 0
    }

    /// Total rows skipped for row-level errors
    pub fn skipped_rows(&self) -> usize {
        self.row_errors.iter().map(|r| r.skipped).sum()
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Save to file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self.to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::DiagnosticCode;

    #[test]
    fn empty_report() {
        let report = SyncReport::new("abc");
        assert_eq!(report.version, ReportVersion::CURRENT);
        assert_eq!(report.summary.total(), 0);
        assert!(!report.has_errors());
    }

    #[test]
    fn exclusion_rate_is_rounded() {
        let stats = FilterStatistics::new("current_data", 3, 1);
        assert_eq!(stats.kept, 2);
        assert_eq!(stats.exclusion_rate_percent, 33.33);

        let empty = FilterStatistics::new("current_data", 0, 0);
        assert_eq!(empty.exclusion_rate_percent, 0.0);
    }

    #[test]
    fn outcome_summary() {
        let mut summary = OutcomeSummary::default();
        summary.record(Outcome::Add, 2);
        summary.record(Outcome::Keep, 3);
        summary.forced_kept = 1;

        assert_eq!(summary.total(), 5);
        assert_eq!(summary.count(Outcome::Keep), 3);
    }

    #[test]
    fn warnings_do_not_count_as_errors() {
        let mut report = SyncReport::new("abc");
        report.add_diagnostic(Diagnostic::new(
            DiagnosticCode::IntegrityDuplicateResultKey,
            Severity::Warn,
            "duplicate",
        ));

        assert!(report.has_warnings());
        assert!(!report.has_errors());

        let json = report.to_json().unwrap();
        assert!(json.contains("\"config_digest\": \"abc\""));
    }
}

//! Diagnostic codes and error reporting
//!
//! Codes are stable strings that end up in the run report.
//! Do not rename codes; add new ones.

use serde::{Deserialize, Serialize};

/// Externally observed error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// Configuration and integrity problems
    System,

    /// Row-level data problems; the row is skipped
    Data,

    /// Failures reported by the relational store
    Store,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::Data => write!(f, "data"),
            Self::Store => write!(f, "store"),
        }
    }
}

/// Diagnostic code registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    // Configuration (1xxx)
    /// The configuration document failed validation
    ConfigInvalid,

    // Integrity (2xxx)
    /// A key tuple received more than one outcome
    IntegrityDuplicateResultKey,

    /// An input table holds the same key more than once
    IntegrityDuplicateInputKey,

    // Row-level data (3xxx)
    /// A required field was missing or empty
    RowMissingRequiredField,

    // Store (4xxx)
    /// A statement failed in the relational store
    StoreStatementFailed,

    /// A generated statement was rejected by the dialect parser
    SqlInvalidStatement,
}

impl DiagnosticCode {
    /// Get the diagnostic code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigInvalid => "CONFIG_INVALID",
            Self::IntegrityDuplicateResultKey => "INTEGRITY_DUPLICATE_RESULT_KEY",
            Self::IntegrityDuplicateInputKey => "INTEGRITY_DUPLICATE_INPUT_KEY",
            Self::RowMissingRequiredField => "ROW_MISSING_REQUIRED_FIELD",
            Self::StoreStatementFailed => "STORE_STATEMENT_FAILED",
            Self::SqlInvalidStatement => "SQL_INVALID_STATEMENT",
        }
    }

    /// Category the code reports under
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigInvalid
            | Self::IntegrityDuplicateResultKey
            | Self::IntegrityDuplicateInputKey => ErrorCategory::System,
            Self::RowMissingRequiredField => ErrorCategory::Data,
            Self::StoreStatementFailed | Self::SqlInvalidStatement => ErrorCategory::Store,
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,

    /// Should be inspected before trusting the output
    Warn,

    /// The run cannot be trusted
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A diagnostic message with structured metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable diagnostic code
    pub code: DiagnosticCode,

    pub category: ErrorCategory,

    pub severity: Severity,

    /// Human-readable message
    pub message: String,

    /// Configuration path or table the diagnostic refers to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,

    /// Offending values (duplicated key tuples, sampled row errors)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<String>,
}

impl Diagnostic {
    /// Create a new diagnostic with minimal fields
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            category: code.category(),
            severity,
            message: message.into(),
            section: None,
            samples: Vec::new(),
        }
    }

    /// Set the section
    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    /// Set the offending values
    pub fn with_samples(mut self, samples: Vec<String>) -> Self {
        self.samples = samples;
        self
    }
}

impl From<&crate::schema::ValidationError> for Diagnostic {
    fn from(err: &crate::schema::ValidationError) -> Self {
        Diagnostic::new(DiagnosticCode::ConfigInvalid, Severity::Error, err.reason.clone())
            .with_section(err.section.clone())
    }
}

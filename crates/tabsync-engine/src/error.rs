//! Errors raised while running a sync

use tabsync_core::{Diagnostic, DiagnosticCode, Outcome, Severity};
use tabsync_sql::StatementError;
use tabsync_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{outcome} phase failed: {source}")]
    Phase {
        outcome: Outcome,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    InvalidStatement(#[from] StatementError),

    #[error("result row carries unknown action '{0}'")]
    UnknownAction(String),
}

impl SyncError {
    /// Convert to a report diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::InvalidStatement(e) => e.to_diagnostic(),
            Self::Phase { outcome, .. } => {
                Diagnostic::new(DiagnosticCode::StoreStatementFailed, Severity::Error, self.to_string())
                    .with_section(outcome.as_str())
            }
            _ => Diagnostic::new(DiagnosticCode::StoreStatementFailed, Severity::Error, self.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabsync_core::ErrorCategory;

    #[test]
    fn phase_failures_name_the_outcome() {
        let err = SyncError::Phase {
            outcome: Outcome::Delete,
            source: StoreError::statement("INSERT INTO sync_result", "disk I/O error"),
        };
        assert!(err.to_string().starts_with("DELETE phase failed"));

        let diag = err.to_diagnostic();
        assert_eq!(diag.category, ErrorCategory::Store);
        assert_eq!(diag.section.as_deref(), Some("DELETE"));
    }
}

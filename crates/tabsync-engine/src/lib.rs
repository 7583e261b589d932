//! tabsync engine
//!
//! This crate implements a sync run:
//! - Row filtering per table
//! - Table creation and bulk loading
//! - Four-phase reconciliation with prioritized field resolution
//! - The pipeline tying them together

pub mod error;
pub mod filter;
pub mod loader;
pub mod reconcile;
pub mod resolution;
mod runner;
pub mod sync;

#[cfg(test)]
mod test_support;

pub use error::SyncError;
pub use filter::{FilterEngine, FilterOutcome};
pub use loader::{schema_statements, TableLoader};
pub use reconcile::{PhaseStatement, ReconcileSummary, ReconciliationEngine, ReconciliationPlan};
pub use resolution::FieldResolver;
pub use sync::{SyncRun, Synchronizer};

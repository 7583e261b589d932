//! Relational store access
//!
//! The engine talks to the store only through [`StatementExecutor`]:
//! - [`SqliteExecutor`] runs statements on SQLite via rusqlite
//! - [`MockExecutor`] records statements and simulates failures in tests

pub mod executor;
pub mod mock;
pub mod sqlite;

pub use executor::{StatementExecutor, StoreError};
pub use mock::MockExecutor;
pub use sqlite::SqliteExecutor;

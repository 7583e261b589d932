//! Statement generation for the relational store
//!
//! This crate handles:
//! - Escaping identifiers and literals
//! - Rendering DDL, inserts and null-safe comparison predicates
//! - Validating generated text against a sqlparser dialect

pub mod builder;
pub mod escape;
pub mod parser;

pub use builder::ComparisonMode;
pub use escape::{quote_identifier, quote_literal};
pub use parser::{StatementError, StatementValidator};

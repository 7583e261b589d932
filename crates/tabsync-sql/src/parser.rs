//! Statement validation using sqlparser
//!
//! Generated statements can be parsed against the configured dialect before
//! they reach the store. The store still has the final word.

use sqlparser::ast::Statement;
use sqlparser::dialect::{Dialect, GenericDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::{Parser, ParserError};
use tabsync_core::{Diagnostic, DiagnosticCode, DialectConfig, Severity};

/// Parses statement text with a configurable dialect
pub struct StatementValidator {
    dialect: Box<dyn Dialect>,
}

impl StatementValidator {
    /// Validator for the SQLite dialect
    pub fn sqlite() -> Self {
        Self {
            dialect: Box::new(SQLiteDialect {}),
        }
    }

    /// Validator for the PostgreSQL dialect
    pub fn postgres() -> Self {
        Self {
            dialect: Box::new(PostgreSqlDialect {}),
        }
    }

    /// Validator for generic ANSI SQL
    pub fn ansi() -> Self {
        Self {
            dialect: Box::new(GenericDialect {}),
        }
    }

    pub fn from_dialect(dialect: DialectConfig) -> Self {
        match dialect {
            DialectConfig::Sqlite => Self::sqlite(),
            DialectConfig::Postgres => Self::postgres(),
            DialectConfig::Ansi => Self::ansi(),
        }
    }

    /// Parse statement text, returning the parsed statements
    pub fn parse(&self, sql: &str) -> Result<Vec<Statement>, StatementError> {
        Parser::parse_sql(&*self.dialect, sql).map_err(|error| StatementError {
            sql: sql.to_string(),
            error,
        })
    }

    /// Parse statement text and return how many statements it holds
    pub fn validate(&self, sql: &str) -> Result<usize, StatementError> {
        self.parse(sql).map(|statements| statements.len())
    }
}

impl Default for StatementValidator {
    fn default() -> Self {
        Self::sqlite()
    }
}

/// A statement the dialect parser rejected
#[derive(Debug)]
pub struct StatementError {
    /// Rejected statement text
    pub sql: String,

    /// Parser error from sqlparser
    pub error: ParserError,
}

impl StatementError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::new(
            DiagnosticCode::SqlInvalidStatement,
            Severity::Error,
            format!("Generated statement does not parse: {}", self.error),
        )
        .with_samples(vec![first_line(&self.sql)])
    }
}

fn first_line(sql: &str) -> String {
    sql.lines().next().unwrap_or_default().trim().to_string()
}

impl std::fmt::Display for StatementError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "statement parse error: {}", self.error)
    }
}

impl std::error::Error for StatementError {}

//! Literal and identifier escaping
//!
//! Statements are built as text and no parameter binding is available, so
//! every value and every identifier that reaches a statement goes through
//! this module.

use regex::Regex;
use std::sync::OnceLock;

/// Words that must be quoted even though they look like plain identifiers
const RESERVED: &[&str] = &[
    "ALL", "AND", "AS", "BETWEEN", "BY", "CASE", "CHECK", "COLUMN", "CONSTRAINT", "CREATE",
    "DEFAULT", "DELETE", "DISTINCT", "DROP", "ELSE", "END", "EXISTS", "FOREIGN", "FROM", "GROUP",
    "HAVING", "IN", "INDEX", "INNER", "INSERT", "INTO", "IS", "JOIN", "KEY", "LEFT", "LIKE",
    "LIMIT", "NOT", "NULL", "OFFSET", "ON", "OR", "ORDER", "PRIMARY", "REFERENCES", "SELECT",
    "SET", "TABLE", "THEN", "TO", "TRANSACTION", "UNION", "UNIQUE", "UPDATE", "USER", "VALUES",
    "WHEN", "WHERE",
];

fn plain_identifier() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern"))
}

/// Whether an identifier can be emitted without quotes
pub fn is_plain_identifier(name: &str) -> bool {
    plain_identifier().is_match(name) && !RESERVED.contains(&name.to_ascii_uppercase().as_str())
}

/// Quote an identifier when it is not a plain, non-reserved name
///
/// Quoted identifiers use double quotes with embedded `"` doubled.
pub fn quote_identifier(name: &str) -> String {
    if is_plain_identifier(name) {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

/// `alias.column` with the column quoted as needed
pub fn qualified(alias: &str, column: &str) -> String {
    format!("{}.{}", quote_identifier(alias), quote_identifier(column))
}

/// Render a string literal
///
/// Embedded `'` are doubled. NUL characters cannot travel inside SQL text and
/// are dropped.
pub fn quote_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        match ch {
            '\'' => out.push_str("''"),
            '\0' => {}
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}

/// Render an optional value, `None` becoming `NULL`
pub fn literal_or_null(value: Option<&str>) -> String {
    match value {
        Some(v) => quote_literal(v),
        None => "NULL".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_identifiers_stay_bare() {
        assert_eq!(quote_identifier("employee_id"), "employee_id");
        assert_eq!(quote_identifier("_col2"), "_col2");
    }

    #[test]
    fn unusual_identifiers_are_quoted() {
        assert_eq!(quote_identifier("first name"), "\"first name\"");
        assert_eq!(quote_identifier("2nd"), "\"2nd\"");
        assert_eq!(quote_identifier("氏名"), "\"氏名\"");
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn reserved_words_are_quoted() {
        assert_eq!(quote_identifier("group"), "\"group\"");
        assert_eq!(quote_identifier("Order"), "\"Order\"");
        assert_eq!(quote_identifier("user"), "\"user\"");
    }

    #[test]
    fn literals_double_quotes() {
        assert_eq!(quote_literal("O'Brien"), "'O''Brien'");
        assert_eq!(quote_literal("''"), "''''''");
        assert_eq!(quote_literal(""), "''");
    }

    #[test]
    fn injection_attempts_stay_inside_the_literal() {
        let hostile = "x'); DROP TABLE sync_result; --";
        assert_eq!(quote_literal(hostile), "'x''); DROP TABLE sync_result; --'");
    }

    #[test]
    fn unicode_and_nul() {
        assert_eq!(quote_literal("田中'太郎"), "'田中''太郎'");
        assert_eq!(quote_literal("a\0b"), "'ab'");
        assert_eq!(literal_or_null(None), "NULL");
        assert_eq!(literal_or_null(Some("NULL")), "'NULL'");
    }

    #[test]
    fn qualified_names() {
        assert_eq!(qualified("p", "dept"), "p.dept");
        assert_eq!(qualified("c", "e-mail"), "c.\"e-mail\"");
    }
}

//! Statement text generation
//!
//! Every function here is pure: it turns schema fragments into DDL, DML or
//! predicate text. Executing the text, and deciding when to drop and recreate
//! tables, belongs to the caller.

use tabsync_core::schema::{ColumnMapping, ConstraintKind, SourceKind, SourceSpec, TableSchema};
use tabsync_core::Record;

use crate::escape::{literal_or_null, qualified, quote_identifier, quote_literal};

/// Which side of a null-safe comparison a predicate selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonMode {
    /// At least one column pair differs
    Different,

    /// Every column pair is equal
    Same,
}

/// `CREATE TABLE` with one definition per declared column, in order,
/// followed by the table constraints
pub fn create_table(table: &TableSchema) -> String {
    let mut definitions: Vec<String> = table
        .columns
        .iter()
        .map(|column| {
            let mut definition = format!("{} {}", quote_identifier(&column.name), column.data_type);
            if !column.constraints.is_empty() {
                definition.push(' ');
                definition.push_str(&column.constraints);
            }
            definition
        })
        .collect();

    for constraint in &table.constraints {
        let columns = column_list(&constraint.columns);
        let body = match constraint.kind {
            ConstraintKind::Unique => format!("UNIQUE ({})", columns),
            ConstraintKind::PrimaryKey => format!("PRIMARY KEY ({})", columns),
            ConstraintKind::ForeignKey => match &constraint.references {
                Some(reference) => format!(
                    "FOREIGN KEY ({}) REFERENCES {} ({})",
                    columns,
                    quote_identifier(&reference.table),
                    column_list(&reference.columns)
                ),
                None => format!("FOREIGN KEY ({})", columns),
            },
        };
        definitions.push(format!("CONSTRAINT {} {}", quote_identifier(&constraint.name), body));
    }

    format!(
        "CREATE TABLE {} (\n    {}\n);",
        quote_identifier(&table.name),
        definitions.join(",\n    ")
    )
}

/// `DROP TABLE IF EXISTS`
pub fn drop_table(name: &str) -> String {
    format!("DROP TABLE IF EXISTS {};", quote_identifier(name))
}

/// One `CREATE INDEX IF NOT EXISTS` per declared index
pub fn create_indexes(table: &TableSchema) -> Vec<String> {
    table
        .indexes
        .iter()
        .map(|index| {
            format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} ({});",
                quote_identifier(&index.name),
                quote_identifier(&table.name),
                column_list(&index.columns)
            )
        })
        .collect()
}

/// Multi-row `INSERT ... VALUES`; `None` when there is nothing to insert
///
/// Values are looked up on each record by column name; missing fields are
/// written as `NULL`.
pub fn insert_rows(table: &str, columns: &[&str], rows: &[Record]) -> Option<String> {
    if rows.is_empty() || columns.is_empty() {
        return None;
    }

    let values: Vec<String> = rows
        .iter()
        .map(|row| {
            let cells: Vec<String> = columns
                .iter()
                .map(|column| literal_or_null(row.get(column)))
                .collect();
            format!("({})", cells.join(", "))
        })
        .collect();

    Some(format!(
        "INSERT INTO {} ({}) VALUES\n    {};",
        quote_identifier(table),
        column_list(columns),
        values.join(",\n    ")
    ))
}

/// `INSERT INTO table (columns) <select>;`
pub fn insert_select(table: &str, columns: &[&str], select: &str) -> String {
    format!(
        "INSERT INTO {} ({})\n{};",
        quote_identifier(table),
        column_list(columns),
        select.trim_end_matches(';')
    )
}

/// Null-safe comparison over `(left column, right column)` pairs
///
/// `Different` is true when any pair differs, counting a null on exactly one
/// side as a difference. `Same` is true when every pair is equal, counting two
/// nulls as equal. Plain `=`/`<>` would yield unknown for nulls and misclassify
/// rows with missing optional fields.
pub fn comparison_predicate(
    left_alias: &str,
    right_alias: &str,
    pairs: &[(&str, &str)],
    mode: ComparisonMode,
) -> String {
    if pairs.is_empty() {
        return match mode {
            ComparisonMode::Different => "1 = 0".to_string(),
            ComparisonMode::Same => "1 = 1".to_string(),
        };
    }

    let terms: Vec<String> = pairs
        .iter()
        .map(|(left, right)| {
            let l = qualified(left_alias, left);
            let r = qualified(right_alias, right);
            match mode {
                ComparisonMode::Different => format!(
                    "({l} <> {r} OR ({l} IS NULL AND {r} IS NOT NULL) OR ({l} IS NOT NULL AND {r} IS NULL))"
                ),
                ComparisonMode::Same => format!("({l} = {r} OR ({l} IS NULL AND {r} IS NULL))"),
            }
        })
        .collect();

    if terms.len() == 1 {
        return terms.into_iter().next().unwrap_or_default();
    }

    let joiner = match mode {
        ComparisonMode::Different => "\n    OR ",
        ComparisonMode::Same => "\n    AND ",
    };
    format!("({})", terms.join(joiner))
}

/// `left.k = right.mapped_k AND ...` for every key column
///
/// The right-hand column is the mapped current column when a mapping exists,
/// otherwise the same name.
pub fn join_predicate(
    left_alias: &str,
    right_alias: &str,
    key_columns: &[String],
    mapping: &ColumnMapping,
) -> String {
    key_columns
        .iter()
        .map(|key| {
            format!(
                "{} = {}",
                qualified(left_alias, key),
                qualified(right_alias, mapping.current_or_same(key))
            )
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// Comma list of key columns, optionally alias-prefixed
pub fn group_by_clause(key_columns: &[String], alias: Option<&str>) -> String {
    key_columns
        .iter()
        .map(|key| match alias {
            Some(alias) => qualified(alias, key),
            None => quote_identifier(key),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// `(expr, ...) NOT IN (subquery)`
pub fn anti_join_condition(expressions: &[String], subquery: &str) -> String {
    format!(
        "({}) NOT IN ({})",
        expressions.join(", "),
        subquery.trim_end_matches(';')
    )
}

/// Expression picking the first non-empty source by priority
///
/// Provided and current fields are wrapped in `NULLIF(.., '')` so empty
/// strings fall through to the next source. A fixed value always resolves,
/// so later sources are never emitted.
pub fn resolution_expression(sources: &[SourceSpec], provided_alias: &str, current_alias: &str) -> String {
    let mut ordered: Vec<&SourceSpec> = sources.iter().collect();
    ordered.sort_by_key(|s| s.priority);

    let mut terms = Vec::with_capacity(ordered.len());
    for source in ordered {
        match &source.kind {
            SourceKind::ProvidedData { field } => {
                terms.push(format!("NULLIF({}, '')", qualified(provided_alias, field)))
            }
            SourceKind::CurrentData { field } => {
                terms.push(format!("NULLIF({}, '')", qualified(current_alias, field)))
            }
            SourceKind::FixedValue { value } => {
                terms.push(quote_literal(value));
                break;
            }
        }
    }

    match terms.len() {
        0 => "NULL".to_string(),
        1 => terms.remove(0),
        _ => format!("COALESCE({})", terms.join(", ")),
    }
}

/// Key tuples that occur more than once in a table
pub fn duplicate_key_query(table: &str, key_columns: &[String]) -> String {
    let keys = group_by_clause(key_columns, None);
    format!(
        "SELECT {keys}, COUNT(*) AS duplicate_count FROM {} GROUP BY {keys} HAVING COUNT(*) > 1;",
        quote_identifier(table)
    )
}

fn column_list<S: AsRef<str>>(columns: &[S]) -> String {
    columns
        .iter()
        .map(|c| quote_identifier(c.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

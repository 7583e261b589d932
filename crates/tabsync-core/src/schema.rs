//! Validated schema model
//!
//! [`SchemaModel`] is built once per run from a [`SyncConfig`] and is
//! immutable afterwards. Every component receives it by reference.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use crate::config::{
    ConfigError, CsvFormatEntry, DialectConfig, FilterRuleConfig, SourceConfig, SyncConfig,
    SyncOptions, TableConfig,
};

/// Table holding the externally supplied snapshot
pub const PROVIDED_TABLE: &str = "provided_data";

/// Table holding the baseline snapshot
pub const CURRENT_TABLE: &str = "current_data";

/// Table receiving reconciled rows
pub const RESULT_TABLE: &str = "sync_result";

/// Store-managed surrogate column; never inserted, compared or exported
pub const ID_COLUMN: &str = "id";

/// A column in a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub data_type: String,
    pub constraints: String,
    pub include_in_export: bool,
    pub is_required: bool,
    pub description: Option<String>,
}

impl ColumnSpec {
    /// Create a TEXT column with no constraints
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            constraints: String::new(),
            include_in_export: true,
            is_required: false,
            description: None,
        }
    }

    /// Whether this is the surrogate `id` column
    pub fn is_id(&self) -> bool {
        self.name == ID_COLUMN
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub columns: Vec<String>,
}

/// Recognized table constraint kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConstraintKind {
    Unique,
    PrimaryKey,
    ForeignKey,
}

impl ConstraintKind {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().replace(' ', "_").as_str() {
            "UNIQUE" => Some(Self::Unique),
            "PRIMARY_KEY" => Some(Self::PrimaryKey),
            "FOREIGN_KEY" => Some(Self::ForeignKey),
            _ => None,
        }
    }
}

/// Target of a foreign key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignReference {
    pub table: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConstraint {
    pub name: String,
    pub kind: ConstraintKind,
    pub columns: Vec<String>,
    pub references: Option<ForeignReference>,
}

/// An ordered table definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
    pub indexes: Vec<IndexSpec>,
    pub constraints: Vec<TableConstraint>,
}

impl TableSchema {
    /// Create a table from columns, without indexes or constraints
    pub fn from_columns(name: impl Into<String>, columns: Vec<ColumnSpec>) -> Self {
        Self {
            name: name.into(),
            columns,
            indexes: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// Find a column by name
    pub fn find_column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.find_column(name).is_some()
    }

    /// Get column names in declaration order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Columns that carry data (everything but `id`)
    pub fn data_columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter().filter(|c| !c.is_id())
    }

    /// Columns written to the exported file
    pub fn export_columns(&self) -> Vec<&str> {
        self.data_columns()
            .filter(|c| c.include_in_export)
            .map(|c| c.name.as_str())
            .collect()
    }

    pub fn has_id_column(&self) -> bool {
        self.columns.iter().any(|c| c.is_id())
    }
}

/// provided column -> current column, in provided declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pairs: Vec<(String, String)>,
}

impl ColumnMapping {
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pairs: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Current-table name mapped to a provided column, if any
    pub fn current_for(&self, provided: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(p, _)| p == provided)
            .map(|(_, c)| c.as_str())
    }

    /// Current-table name for a provided column, falling back to the same name
    pub fn current_or_same<'a>(&'a self, provided: &'a str) -> &'a str {
        self.current_for(provided).unwrap_or(provided)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    /// Rows must match to survive
    Include,

    /// Rows that match are dropped
    Exclude,
}

/// How a filter rule tests a value
#[derive(Debug, Clone, PartialEq)]
pub enum Matcher {
    /// Anchored glob (`*`, `?`, `[abc]`, `[!abc]`)
    Glob(glob::Pattern),

    /// Exact string equality
    Exact(String),
}

impl Matcher {
    /// Compile a glob; runs of `*` behave as a single `*`
    pub fn glob(pattern: &str) -> Result<Self, glob::PatternError> {
        let mut collapsed = String::with_capacity(pattern.len());
        for ch in pattern.chars() {
            if ch == '*' && collapsed.ends_with('*') {
                continue;
            }
            collapsed.push(ch);
        }
        glob::Pattern::new(&collapsed).map(Self::Glob)
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Glob(pattern) => pattern.matches(value),
            Self::Exact(expected) => expected == value,
        }
    }
}

impl std::fmt::Display for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Glob(pattern) => write!(f, "glob '{}'", pattern.as_str()),
            Self::Exact(value) => write!(f, "value '{}'", value),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterRule {
    pub field: String,
    pub kind: FilterKind,
    pub matcher: Matcher,
    pub description: String,
}

/// Filter settings for one table
#[derive(Debug, Clone, PartialEq)]
pub struct TableFilter {
    pub enabled: bool,
    pub output_excluded_as_keep: bool,
    pub rules: Vec<FilterRule>,
}

impl TableFilter {
    /// Whether applying this filter can drop anything
    pub fn is_active(&self) -> bool {
        self.enabled && !self.rules.is_empty()
    }
}

/// Where an output field value comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceKind {
    ProvidedData { field: String },
    CurrentData { field: String },
    FixedValue { value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub kind: SourceKind,
    pub priority: u32,
}

/// Prioritized sources for one result column; `sources` is sorted by priority
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFieldSpec {
    pub column: String,
    pub sources: Vec<SourceSpec>,
}

/// Typed `csv_format` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvFormat {
    pub encoding: String,
    pub delimiter: u8,
    pub has_header: bool,
    pub null_values: Vec<String>,
}

impl CsvFormat {
    /// Whether a raw cell should be read as NULL
    pub fn is_null(&self, cell: &str) -> bool {
        self.null_values.iter().any(|n| n == cell)
    }
}

impl Default for CsvFormat {
    fn default() -> Self {
        Self {
            encoding: "utf-8".to_string(),
            delimiter: b',',
            has_header: true,
            null_values: vec![String::new()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvFormats {
    pub provided: CsvFormat,
    pub current: CsvFormat,
    pub output: CsvFormat,
}

/// Configuration validation failure naming the offending document path
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid configuration at {section}: {reason}")]
pub struct ValidationError {
    pub section: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(section: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            reason: reason.into(),
        }
    }
}

/// The validated, immutable configuration of a run
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaModel {
    pub dialect: DialectConfig,
    provided: TableSchema,
    current: TableSchema,
    result: TableSchema,
    other_tables: Vec<TableSchema>,
    key_columns: BTreeMap<String, Vec<String>>,
    pub column_mapping: ColumnMapping,
    pub comparison_columns: Vec<String>,
    pub output_fields: Vec<OutputFieldSpec>,
    pub action_column: String,
    filters: BTreeMap<String, TableFilter>,
    pub csv: CsvFormats,
    pub options: SyncOptions,
    pub digest: String,
}

impl SchemaModel {
    /// Load, parse and validate a configuration file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let config = SyncConfig::from_file(path)?;
        Ok(Self::from_config(&config)?)
    }

    /// Validate a parsed document
    pub fn from_config(config: &SyncConfig) -> Result<Self, ValidationError> {
        // 1. tables and columns
        let mut tables = BTreeMap::new();
        for (name, table) in &config.tables {
            tables.insert(name.clone(), build_table(name, table)?);
        }

        // 2. mandatory tables
        let mut take = |name: &str| {
            tables.remove(name).ok_or_else(|| {
                ValidationError::new(format!("tables.{}", name), "mandatory table is not declared")
            })
        };
        let mut provided = take(PROVIDED_TABLE)?;
        let mut current = take(CURRENT_TABLE)?;
        let mut result = take(RESULT_TABLE)?;
        let mut other_tables: Vec<TableSchema> = tables.into_values().collect();

        let all_tables: Vec<&TableSchema> = [&provided, &current, &result]
            .into_iter()
            .chain(other_tables.iter())
            .collect();
        let lookup = |name: &str| all_tables.iter().copied().find(|t| t.name == name);

        // 3. column mappings
        let rules = &config.sync_rules;
        for (provided_col, current_col) in &rules.column_mappings.mappings {
            let section = format!("sync_rules.column_mappings.mappings.{}", provided_col);
            if !provided.has_column(provided_col) {
                return Err(ValidationError::new(
                    section,
                    format!("'{}' is not a column of {}", provided_col, PROVIDED_TABLE),
                ));
            }
            if !current.has_column(current_col) {
                return Err(ValidationError::new(
                    section,
                    format!("'{}' is not a column of {}", current_col, CURRENT_TABLE),
                ));
            }
        }
        let column_mapping = ColumnMapping::from_pairs(
            provided
                .columns
                .iter()
                .filter_map(|c| {
                    rules
                        .column_mappings
                        .mappings
                        .get(&c.name)
                        .map(|mapped| (c.name.clone(), mapped.clone()))
                }),
        );

        // 4. key columns
        for (table_name, keys) in &rules.key_columns {
            let section = format!("sync_rules.key_columns.{}", table_name);
            let table = lookup(table_name).ok_or_else(|| {
                ValidationError::new(&section, format!("table '{}' is not declared", table_name))
            })?;
            for key in keys {
                if !table.has_column(key) {
                    return Err(ValidationError::new(
                        &section,
                        format!("key column '{}' is not a column of {}", key, table_name),
                    ));
                }
            }
        }
        for table_name in [PROVIDED_TABLE, CURRENT_TABLE, RESULT_TABLE] {
            let present = rules
                .key_columns
                .get(table_name)
                .map(|keys| !keys.is_empty())
                .unwrap_or(false);
            if !present {
                return Err(ValidationError::new(
                    format!("sync_rules.key_columns.{}", table_name),
                    "at least one key column is required",
                ));
            }
        }
        for key in &rules.key_columns[PROVIDED_TABLE] {
            let joined = column_mapping.current_or_same(key);
            if !current.has_column(joined) {
                return Err(ValidationError::new(
                    format!("sync_rules.key_columns.{}", PROVIDED_TABLE),
                    format!(
                        "key column '{}' is neither mapped nor present in {}",
                        key, CURRENT_TABLE
                    ),
                ));
            }
        }

        // 5. filters, output sources, comparison columns
        let mut filters = BTreeMap::new();
        for (table_name, filter) in &config.data_filters {
            let table = match table_name.as_str() {
                PROVIDED_TABLE => &provided,
                CURRENT_TABLE => &current,
                _ => {
                    return Err(ValidationError::new(
                        format!("data_filters.{}", table_name),
                        format!(
                            "filters apply only to {} and {}, not '{}'",
                            PROVIDED_TABLE, CURRENT_TABLE, table_name
                        ),
                    ))
                }
            };
            let mut compiled = Vec::with_capacity(filter.rules.len());
            for (i, rule) in filter.rules.iter().enumerate() {
                let section = format!("data_filters.{}.rules[{}]", table_name, i);
                compiled.push(build_filter_rule(&section, table, rule)?);
            }
            filters.insert(
                table_name.clone(),
                TableFilter {
                    enabled: filter.enabled,
                    output_excluded_as_keep: filter.output_excluded_as_keep,
                    rules: compiled,
                },
            );
        }

        let mapping_config = &rules.sync_result_mapping;
        let action_column = mapping_config.action_column.clone();
        if !result.has_column(&action_column) {
            return Err(ValidationError::new(
                "sync_rules.sync_result_mapping.action_column",
                format!("'{}' is not a column of {}", action_column, RESULT_TABLE),
            ));
        }

        for field in mapping_config.mappings.keys() {
            let section = format!("sync_rules.sync_result_mapping.mappings.{}", field);
            if !result.has_column(field) {
                return Err(ValidationError::new(
                    section,
                    format!("'{}' is not a column of {}", field, RESULT_TABLE),
                ));
            }
            if field == ID_COLUMN || *field == action_column {
                return Err(ValidationError::new(
                    section,
                    "the id and action columns are managed by the engine and cannot be mapped",
                ));
            }
        }

        let mut output_fields = Vec::new();
        for column in result.data_columns() {
            if column.name == action_column {
                continue;
            }
            let section = format!("sync_rules.sync_result_mapping.mappings.{}", column.name);
            match mapping_config.mappings.get(&column.name) {
                Some(field) => {
                    let mut sources = Vec::with_capacity(field.sources.len());
                    for (i, source) in field.sources.iter().enumerate() {
                        let source_section = format!("{}.sources[{}]", section, i);
                        sources.push(build_source(&source_section, source, &provided, &current)?);
                    }
                    if sources.is_empty() {
                        return Err(ValidationError::new(section, "at least one source is required"));
                    }
                    sources.sort_by_key(|s| s.priority);
                    if let Some(pair) = sources.windows(2).find(|w| w[0].priority == w[1].priority) {
                        return Err(ValidationError::new(
                            section,
                            format!("priority {} is used more than once", pair[0].priority),
                        ));
                    }
                    output_fields.push(OutputFieldSpec {
                        column: column.name.clone(),
                        sources,
                    });
                }
                None if column.is_required => {
                    return Err(ValidationError::new(
                        section,
                        "required result column has no mapping",
                    ));
                }
                None => {}
            }
        }

        for key in &rules.key_columns[RESULT_TABLE] {
            if !output_fields.iter().any(|f| f.column == *key) {
                return Err(ValidationError::new(
                    format!("sync_rules.key_columns.{}", RESULT_TABLE),
                    format!("key column '{}' has no sync_result_mapping entry", key),
                ));
            }
        }

        let provided_keys: HashSet<&str> = rules.key_columns[PROVIDED_TABLE]
            .iter()
            .map(String::as_str)
            .collect();
        let comparison_columns = match &rules.comparison_columns {
            Some(explicit) => {
                for (i, column) in explicit.iter().enumerate() {
                    let section = format!("sync_rules.comparison_columns[{}]", i);
                    if !provided.has_column(column) {
                        return Err(ValidationError::new(
                            section,
                            format!("'{}' is not a column of {}", column, PROVIDED_TABLE),
                        ));
                    }
                    if !current.has_column(column_mapping.current_or_same(column)) {
                        return Err(ValidationError::new(
                            section,
                            format!("'{}' has no counterpart in {}", column, CURRENT_TABLE),
                        ));
                    }
                }
                explicit.clone()
            }
            None => column_mapping
                .iter()
                .filter(|(p, _)| *p != ID_COLUMN && !provided_keys.contains(p))
                .map(|(p, _)| p.to_string())
                .collect(),
        };

        // 6. indexes and table constraints
        for table in [&mut provided, &mut current, &mut result]
            .into_iter()
            .chain(other_tables.iter_mut())
        {
            if let Some(raw) = config.tables.get(&table.name) {
                table.constraints = build_constraints(&table.name, raw)?;
            }
        }
        let all_tables: Vec<&TableSchema> = [&provided, &current, &result]
            .into_iter()
            .chain(other_tables.iter())
            .collect();
        for table in &all_tables {
            check_indexes_and_constraints(table, &all_tables)?;
        }

        let csv = CsvFormats {
            provided: build_csv_format("csv_format.provided_data", &config.csv_format.provided_data)?,
            current: build_csv_format("csv_format.current_data", &config.csv_format.current_data)?,
            output: build_csv_format("csv_format.output", &config.csv_format.output)?,
        };

        if config.options.insert_batch_size == 0 {
            return Err(ValidationError::new(
                "options.insert_batch_size",
                "must be at least 1",
            ));
        }

        Ok(Self {
            dialect: config.dialect,
            provided,
            current,
            result,
            other_tables,
            key_columns: rules.key_columns.clone(),
            column_mapping,
            comparison_columns,
            output_fields,
            action_column,
            filters,
            csv,
            options: config.options.clone(),
            digest: config.digest(),
        })
    }

    pub fn provided(&self) -> &TableSchema {
        &self.provided
    }

    pub fn current(&self) -> &TableSchema {
        &self.current
    }

    pub fn result(&self) -> &TableSchema {
        &self.result
    }

    /// Look up any declared table
    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables().find(|t| t.name == name)
    }

    /// All declared tables, mandatory ones first
    pub fn tables(&self) -> impl Iterator<Item = &TableSchema> {
        [&self.provided, &self.current, &self.result]
            .into_iter()
            .chain(self.other_tables.iter())
    }

    /// Key columns of a table (empty when none are declared)
    pub fn key_columns(&self, table: &str) -> &[String] {
        self.key_columns
            .get(table)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Filter settings of a table, if any were declared
    pub fn filter(&self, table: &str) -> Option<&TableFilter> {
        self.filters.get(table)
    }

    /// Sources for a result column
    pub fn output_field(&self, column: &str) -> Option<&OutputFieldSpec> {
        self.output_fields.iter().find(|f| f.column == column)
    }

    /// Whether excluded current rows are re-surfaced as KEEP
    pub fn keeps_excluded_current_rows(&self) -> bool {
        self.filter(CURRENT_TABLE)
            .map(|f| f.enabled && f.output_excluded_as_keep)
            .unwrap_or(false)
    }
}

fn build_table(name: &str, table: &TableConfig) -> Result<TableSchema, ValidationError> {
    if table.columns.is_empty() {
        return Err(ValidationError::new(
            format!("tables.{}.columns", name),
            "a table needs at least one column",
        ));
    }

    let mut seen = HashSet::new();
    let mut columns = Vec::with_capacity(table.columns.len());
    for (i, column) in table.columns.iter().enumerate() {
        let section = format!("tables.{}.columns[{}]", name, i);
        if column.name.trim().is_empty() {
            return Err(ValidationError::new(section, "column name is empty"));
        }
        if !seen.insert(column.name.as_str()) {
            return Err(ValidationError::new(
                section,
                format!("duplicate column '{}'", column.name),
            ));
        }
        if column.data_type.trim().is_empty() {
            return Err(ValidationError::new(
                section,
                format!("column '{}' has no type", column.name),
            ));
        }
        if column.name == ID_COLUMN && !column.data_type.trim().eq_ignore_ascii_case("INTEGER") {
            return Err(ValidationError::new(
                section,
                format!("the id column must be INTEGER, found {}", column.data_type),
            ));
        }
        columns.push(ColumnSpec {
            name: column.name.clone(),
            data_type: column.data_type.trim().to_string(),
            constraints: column.constraints.trim().to_string(),
            include_in_export: column.csv_include,
            is_required: column.required,
            description: column.description.clone(),
        });
    }

    let indexes = table
        .indexes
        .iter()
        .map(|i| IndexSpec {
            name: i.name.clone(),
            columns: i.columns.clone(),
        })
        .collect();

    Ok(TableSchema {
        name: name.to_string(),
        columns,
        indexes,
        constraints: Vec::new(),
    })
}

fn build_constraints(
    name: &str,
    table: &TableConfig,
) -> Result<Vec<TableConstraint>, ValidationError> {
    let mut constraints = Vec::with_capacity(table.table_constraints.len());
    for (i, constraint) in table.table_constraints.iter().enumerate() {
        let kind = ConstraintKind::parse(&constraint.kind).ok_or_else(|| {
            ValidationError::new(
                format!("tables.{}.table_constraints[{}].type", name, i),
                format!(
                    "unknown constraint type '{}' (expected UNIQUE, PRIMARY_KEY or FOREIGN_KEY)",
                    constraint.kind
                ),
            )
        })?;
        constraints.push(TableConstraint {
            name: constraint.name.clone(),
            kind,
            columns: constraint.columns.clone(),
            references: constraint.references.as_ref().map(|r| ForeignReference {
                table: r.table.clone(),
                columns: r.columns.clone(),
            }),
        });
    }
    Ok(constraints)
}

fn build_filter_rule(
    section: &str,
    table: &TableSchema,
    rule: &FilterRuleConfig,
) -> Result<FilterRule, ValidationError> {
    if !table.has_column(&rule.field) {
        return Err(ValidationError::new(
            format!("{}.field", section),
            format!("'{}' is not a column of {}", rule.field, table.name),
        ));
    }

    let kind = match rule.rule_type.trim().to_ascii_lowercase().as_str() {
        "include" => FilterKind::Include,
        "exclude" => FilterKind::Exclude,
        other => {
            return Err(ValidationError::new(
                format!("{}.type", section),
                format!("unknown rule type '{}' (expected include or exclude)", other),
            ))
        }
    };

    let matcher = match (&rule.glob, &rule.value) {
        (Some(pattern), None) => Matcher::glob(pattern).map_err(|e| {
            ValidationError::new(
                format!("{}.glob", section),
                format!("invalid pattern '{}': {}", pattern, e),
            )
        })?,
        (None, Some(value)) => Matcher::Exact(value.clone()),
        _ => {
            return Err(ValidationError::new(
                section,
                "exactly one of 'glob' or 'value' must be given",
            ))
        }
    };

    Ok(FilterRule {
        field: rule.field.clone(),
        kind,
        matcher,
        description: rule.description.clone(),
    })
}

fn build_source(
    section: &str,
    source: &SourceConfig,
    provided: &TableSchema,
    current: &TableSchema,
) -> Result<SourceSpec, ValidationError> {
    let field = |table: &TableSchema| -> Result<String, ValidationError> {
        let field = source.field.as_ref().ok_or_else(|| {
            ValidationError::new(section, format!("a {} source needs a 'field'", table.name))
        })?;
        if !table.has_column(field) {
            return Err(ValidationError::new(
                format!("{}.field", section),
                format!("'{}' is not a column of {}", field, table.name),
            ));
        }
        Ok(field.clone())
    };

    let kind = match source.source_type.trim() {
        PROVIDED_TABLE => SourceKind::ProvidedData { field: field(provided)? },
        CURRENT_TABLE => SourceKind::CurrentData { field: field(current)? },
        "fixed_value" => {
            let value = match &source.value {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(serde_json::Value::Number(n)) => n.to_string(),
                Some(serde_json::Value::Bool(b)) => b.to_string(),
                _ => {
                    return Err(ValidationError::new(
                        format!("{}.value", section),
                        "a fixed_value source needs a string, number or boolean 'value'",
                    ))
                }
            };
            SourceKind::FixedValue { value }
        }
        other => {
            return Err(ValidationError::new(
                format!("{}.type", section),
                format!(
                    "unknown source type '{}' (expected provided_data, current_data or fixed_value)",
                    other
                ),
            ))
        }
    };

    Ok(SourceSpec {
        kind,
        priority: source.priority,
    })
}

fn check_indexes_and_constraints(
    table: &TableSchema,
    all_tables: &[&TableSchema],
) -> Result<(), ValidationError> {
    for (i, index) in table.indexes.iter().enumerate() {
        let section = format!("tables.{}.indexes[{}]", table.name, i);
        if index.columns.is_empty() {
            return Err(ValidationError::new(section, "an index needs at least one column"));
        }
        if let Some(missing) = index.columns.iter().find(|c| !table.has_column(c)) {
            return Err(ValidationError::new(
                section,
                format!("'{}' is not a column of {}", missing, table.name),
            ));
        }
    }

    for (i, constraint) in table.constraints.iter().enumerate() {
        let section = format!("tables.{}.table_constraints[{}]", table.name, i);
        if constraint.columns.is_empty() {
            return Err(ValidationError::new(section, "a constraint needs at least one column"));
        }
        if let Some(missing) = constraint.columns.iter().find(|c| !table.has_column(c)) {
            return Err(ValidationError::new(
                section,
                format!("'{}' is not a column of {}", missing, table.name),
            ));
        }

        match (constraint.kind, &constraint.references) {
            (ConstraintKind::ForeignKey, None) => {
                return Err(ValidationError::new(
                    section,
                    "FOREIGN_KEY constraints need 'references'",
                ))
            }
            (ConstraintKind::ForeignKey, Some(reference)) => {
                let target = all_tables
                    .iter()
                    .find(|t| t.name == reference.table)
                    .ok_or_else(|| {
                        ValidationError::new(
                            format!("{}.references.table", section),
                            format!("table '{}' is not declared", reference.table),
                        )
                    })?;
                if reference.columns.len() != constraint.columns.len() {
                    return Err(ValidationError::new(
                        format!("{}.references.columns", section),
                        "referenced column count does not match the constraint columns",
                    ));
                }
                if let Some(missing) = reference.columns.iter().find(|c| !target.has_column(c)) {
                    return Err(ValidationError::new(
                        format!("{}.references.columns", section),
                        format!("'{}' is not a column of {}", missing, target.name),
                    ));
                }
            }
            (_, Some(_)) => {
                return Err(ValidationError::new(
                    format!("{}.references", section),
                    "only FOREIGN_KEY constraints take 'references'",
                ))
            }
            (_, None) => {}
        }
    }

    Ok(())
}

fn build_csv_format(section: &str, entry: &CsvFormatEntry) -> Result<CsvFormat, ValidationError> {
    let encoding = entry.encoding.trim().to_ascii_lowercase();
    if !matches!(encoding.as_str(), "utf-8" | "utf8" | "utf-8-sig") {
        return Err(ValidationError::new(
            format!("{}.encoding", section),
            format!("unsupported encoding '{}' (only UTF-8 is supported)", entry.encoding),
        ));
    }

    let delimiter = match entry.delimiter.as_bytes() {
        [byte] if byte.is_ascii() => *byte,
        _ if entry.delimiter == "\\t" => b'\t',
        _ => {
            return Err(ValidationError::new(
                format!("{}.delimiter", section),
                format!("delimiter must be a single ASCII character, found '{}'", entry.delimiter),
            ))
        }
    };

    Ok(CsvFormat {
        encoding,
        delimiter,
        has_header: entry.has_header,
        null_values: entry.null_values.clone(),
    })
}

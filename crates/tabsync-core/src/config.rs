//! Configuration document (sync_config.json / sync_config.toml)
//!
//! These are the raw, serde-facing shapes of the document. Nothing here is
//! validated; [`crate::schema::SchemaModel::from_config`] turns a
//! [`SyncConfig`] into the checked model the rest of the workspace uses.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

use crate::schema::ValidationError;

/// SQL dialect the generated statements are checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectConfig {
    /// SQLite (the bundled store)
    Sqlite,

    /// PostgreSQL
    Postgres,

    /// Generic ANSI SQL
    Ansi,
}

impl Default for DialectConfig {
    fn default() -> Self {
        Self::Sqlite
    }
}

/// Root of the configuration document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub dialect: DialectConfig,

    /// Table definitions keyed by table name
    pub tables: BTreeMap<String, TableConfig>,

    pub sync_rules: SyncRulesConfig,

    /// Row filters keyed by table name
    #[serde(default)]
    pub data_filters: BTreeMap<String, TableFilterConfig>,

    #[serde(default)]
    pub csv_format: CsvFormatConfig,

    #[serde(default)]
    pub options: SyncOptions,
}

/// `tables.<name>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub columns: Vec<ColumnConfig>,

    #[serde(default)]
    pub indexes: Vec<IndexConfig>,

    #[serde(default)]
    pub table_constraints: Vec<TableConstraintConfig>,
}

/// `tables.<name>.columns[]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub name: String,

    /// SQL type, emitted verbatim into CREATE TABLE
    #[serde(rename = "type")]
    pub data_type: String,

    /// Column constraint expression, emitted verbatim (e.g. `NOT NULL`)
    #[serde(default)]
    pub constraints: String,

    /// Whether the column is written to the output CSV
    #[serde(default = "default_true")]
    pub csv_include: bool,

    /// Rows without a value for this column are rejected at load time
    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// `tables.<name>.indexes[]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    pub name: String,
    pub columns: Vec<String>,
}

/// `tables.<name>.table_constraints[]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableConstraintConfig {
    pub name: String,

    /// UNIQUE, PRIMARY_KEY or FOREIGN_KEY
    #[serde(rename = "type")]
    pub kind: String,

    pub columns: Vec<String>,

    /// Target of a FOREIGN_KEY constraint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<ReferenceConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceConfig {
    pub table: String,
    pub columns: Vec<String>,
}

/// `sync_rules`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRulesConfig {
    /// Key columns keyed by table name
    pub key_columns: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    pub column_mappings: ColumnMappingsConfig,

    /// Explicit list of provided columns compared for UPDATE/KEEP
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison_columns: Option<Vec<String>>,

    pub sync_result_mapping: SyncResultMappingConfig,
}

/// `sync_rules.column_mappings`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnMappingsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// provided column -> current column
    #[serde(default)]
    pub mappings: BTreeMap<String, String>,
}

/// `sync_rules.sync_result_mapping`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncResultMappingConfig {
    /// Result column that receives the outcome label
    #[serde(default = "default_action_column")]
    pub action_column: String,

    /// Result column -> prioritized sources
    pub mappings: BTreeMap<String, FieldMappingConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMappingConfig {
    pub sources: Vec<SourceConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// `sync_rules.sync_result_mapping.mappings.<field>.sources[]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// provided_data, current_data or fixed_value
    #[serde(rename = "type")]
    pub source_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    /// Literal for fixed_value sources; numbers and booleans are accepted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,

    pub priority: u32,
}

/// `data_filters.<table>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableFilterConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Re-surface excluded current rows as KEEP
    #[serde(default)]
    pub output_excluded_as_keep: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub rules: Vec<FilterRuleConfig>,
}

/// `data_filters.<table>.rules[]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRuleConfig {
    pub field: String,

    /// include or exclude
    #[serde(rename = "type")]
    pub rule_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glob: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default)]
    pub description: String,
}

/// `csv_format`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CsvFormatConfig {
    #[serde(default)]
    pub provided_data: CsvFormatEntry,

    #[serde(default)]
    pub current_data: CsvFormatEntry,

    #[serde(default)]
    pub output: CsvFormatEntry,
}

/// `csv_format.<provided_data|current_data|output>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvFormatEntry {
    #[serde(default = "default_encoding")]
    pub encoding: String,

    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    /// `has_header` for inputs, `include_header` for the output
    #[serde(default = "default_true", alias = "include_header")]
    pub has_header: bool,

    /// Cell values read as NULL
    #[serde(default = "default_null_values")]
    pub null_values: Vec<String>,
}

impl Default for CsvFormatEntry {
    fn default() -> Self {
        Self {
            encoding: default_encoding(),
            delimiter: default_delimiter(),
            has_header: true,
            null_values: default_null_values(),
        }
    }
}

/// `options` - run tuning knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncOptions {
    /// Rows per multi-row INSERT when loading input tables
    #[serde(default = "default_batch_size")]
    pub insert_batch_size: usize,

    /// Parse every generated statement before it is executed
    #[serde(default)]
    pub validate_statements: bool,

    /// Row-level error messages kept per table in the report
    #[serde(default = "default_sample_size")]
    pub row_error_sample_size: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            insert_batch_size: default_batch_size(),
            validate_statements: false,
            row_error_sample_size: default_sample_size(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_action_column() -> String {
    "sync_action".to_string()
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

fn default_delimiter() -> String {
    ",".to_string()
}

fn default_null_values() -> Vec<String> {
    vec![String::new()]
}

fn default_batch_size() -> usize {
    500
}

fn default_sample_size() -> usize {
    10
}

impl SyncConfig {
    /// Load config from a file; `.toml` files are read as TOML, anything else as JSON
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

        let is_toml = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);

        if is_toml {
            Self::from_toml(&contents)
        } else {
            Self::from_json(&contents)
        }
    }

    /// Load config from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Load config from a TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// SHA-256 of the canonical JSON form, hex encoded
    ///
    /// Maps are ordered, so two documents with the same content hash the same
    /// regardless of key order or source format.
    pub fn digest(&self) -> String {
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&canonical))
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "tables": {
            "provided_data": { "columns": [ { "name": "employee_id", "type": "TEXT" } ] }
        },
        "sync_rules": {
            "key_columns": { "provided_data": ["employee_id"] },
            "sync_result_mapping": { "mappings": {} }
        }
    }"#;

    #[test]
    fn defaults_are_applied() {
        let config = SyncConfig::from_json(MINIMAL).unwrap();

        assert_eq!(config.dialect, DialectConfig::Sqlite);
        assert_eq!(config.sync_rules.sync_result_mapping.action_column, "sync_action");
        assert_eq!(config.options.insert_batch_size, 500);
        assert_eq!(config.csv_format.output.delimiter, ",");
        assert_eq!(config.csv_format.provided_data.null_values, vec![String::new()]);

        let column = &config.tables["provided_data"].columns[0];
        assert!(column.csv_include);
        assert!(!column.required);
    }

    #[test]
    fn include_header_alias() {
        let entry: CsvFormatEntry =
            serde_json::from_str(r#"{ "include_header": false, "delimiter": ";" }"#).unwrap();
        assert!(!entry.has_header);
        assert_eq!(entry.delimiter, ";");
    }

    #[test]
    fn toml_and_json_share_a_digest() {
        let from_json = SyncConfig::from_json(MINIMAL).unwrap();
        let toml = toml::to_string(&from_json).unwrap();
        let from_toml = SyncConfig::from_toml(&toml).unwrap();

        assert_eq!(from_json, from_toml);
        assert_eq!(from_json.digest(), from_toml.digest());
        assert_eq!(from_json.digest().len(), 64);
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        let err = SyncConfig::from_json("{ \"tables\": ").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }
}

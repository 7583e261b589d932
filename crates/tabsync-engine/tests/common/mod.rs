#![allow(dead_code)]

use serde_json::{json, Value};
use tabsync_core::{Record, ResultRecord, SchemaModel, SyncConfig};

/// Employee roster reconciled against an account directory
pub fn roster_document() -> Value {
    json!({
        "tables": {
            "provided_data": {
                "columns": [
                    { "name": "id", "type": "INTEGER", "constraints": "PRIMARY KEY AUTOINCREMENT" },
                    { "name": "employee_id", "type": "TEXT", "required": true },
                    { "name": "name", "type": "TEXT" },
                    { "name": "dept", "type": "TEXT" }
                ],
                "indexes": [ { "name": "idx_provided_employee_id", "columns": ["employee_id"] } ]
            },
            "current_data": {
                "columns": [
                    { "name": "id", "type": "INTEGER", "constraints": "PRIMARY KEY AUTOINCREMENT" },
                    { "name": "user_id", "type": "TEXT", "required": true },
                    { "name": "name", "type": "TEXT" },
                    { "name": "dept", "type": "TEXT" }
                ],
                "indexes": [ { "name": "idx_current_user_id", "columns": ["user_id"] } ]
            },
            "sync_result": { "columns": [
                { "name": "id", "type": "INTEGER", "constraints": "PRIMARY KEY AUTOINCREMENT" },
                { "name": "syokuin_no", "type": "TEXT" },
                { "name": "name", "type": "TEXT" },
                { "name": "dept", "type": "TEXT" },
                { "name": "status", "type": "TEXT", "csv_include": false },
                { "name": "sync_action", "type": "TEXT" }
            ]}
        },
        "sync_rules": {
            "key_columns": {
                "provided_data": ["employee_id"],
                "current_data": ["user_id"],
                "sync_result": ["syokuin_no"]
            },
            "column_mappings": { "mappings": {
                "employee_id": "user_id", "name": "name", "dept": "dept"
            }},
            "sync_result_mapping": { "mappings": {
                "syokuin_no": { "sources": [
                    { "type": "provided_data", "field": "employee_id", "priority": 1 },
                    { "type": "current_data", "field": "user_id", "priority": 2 }
                ]},
                "name": { "sources": [
                    { "type": "provided_data", "field": "name", "priority": 1 },
                    { "type": "current_data", "field": "name", "priority": 2 }
                ]},
                "dept": { "sources": [
                    { "type": "provided_data", "field": "dept", "priority": 1 },
                    { "type": "current_data", "field": "dept", "priority": 2 }
                ]},
                "status": { "sources": [
                    { "type": "fixed_value", "value": "active", "priority": 1 }
                ]}
            }}
        },
        "data_filters": {
            "current_data": {
                "enabled": true,
                "output_excluded_as_keep": true,
                "rules": [
                    { "field": "user_id", "type": "exclude", "glob": "Z*", "description": "system accounts" }
                ]
            }
        },
        "options": { "validate_statements": true }
    })
}

pub fn model_from(document: Value) -> SchemaModel {
    let config: SyncConfig = serde_json::from_value(document).unwrap();
    SchemaModel::from_config(&config).unwrap()
}

pub fn roster_model() -> SchemaModel {
    model_from(roster_document())
}

pub fn employee(id: &str, name: &str, dept: &str) -> Record {
    Record::new()
        .with("employee_id", id)
        .with("name", name)
        .with("dept", dept)
}

pub fn account(id: &str, name: &str, dept: &str) -> Record {
    Record::new().with("user_id", id).with("name", name).with("dept", dept)
}

/// The single result row for a key; panics when missing or repeated
pub fn row<'r>(results: &'r [ResultRecord], key: &str) -> &'r ResultRecord {
    let matches: Vec<&ResultRecord> = results
        .iter()
        .filter(|r| r.get("syokuin_no") == Some(key))
        .collect();
    assert_eq!(matches.len(), 1, "expected exactly one row for {}", key);
    matches[0]
}

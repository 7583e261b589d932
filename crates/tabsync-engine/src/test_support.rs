//! Shared model fixtures for unit tests

use serde_json::{json, Value};
use tabsync_core::{SchemaModel, SyncConfig};

pub fn base_document() -> Value {
    json!({
        "tables": {
            "provided_data": { "columns": [
                { "name": "id", "type": "INTEGER", "constraints": "PRIMARY KEY AUTOINCREMENT" },
                { "name": "employee_id", "type": "TEXT", "required": true },
                { "name": "name", "type": "TEXT" },
                { "name": "dept", "type": "TEXT" }
            ]},
            "current_data": { "columns": [
                { "name": "id", "type": "INTEGER", "constraints": "PRIMARY KEY AUTOINCREMENT" },
                { "name": "user_id", "type": "TEXT", "required": true },
                { "name": "name", "type": "TEXT" },
                { "name": "dept", "type": "TEXT" }
            ]},
            "sync_result": { "columns": [
                { "name": "id", "type": "INTEGER", "constraints": "PRIMARY KEY AUTOINCREMENT" },
                { "name": "syokuin_no", "type": "TEXT" },
                { "name": "name", "type": "TEXT" },
                { "name": "dept", "type": "TEXT" },
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
                ]}
            }}
        }
    })
}

/// Base model after applying `edit` to the document
pub fn model_with(edit: impl FnOnce(&mut Value)) -> SchemaModel {
    let mut document = base_document();
    edit(&mut document);
    let config: SyncConfig = serde_json::from_value(document).unwrap();
    SchemaModel::from_config(&config).unwrap()
}

/// Base model with `filter` installed on `current_data`
pub fn model_with_filter(filter: Value) -> SchemaModel {
    model_with(|doc| doc["data_filters"] = json!({ "current_data": filter }))
}

pub fn model() -> SchemaModel {
    model_with(|_| {})
}

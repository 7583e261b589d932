//! In-memory priority resolution
//!
//! Mirrors the resolution expression the statement builder emits, for rows
//! that never pass through a join (excluded current rows surfaced as KEEP).

use tabsync_core::{OutputFieldSpec, Record, SchemaModel, SourceKind};

pub struct FieldResolver<'a> {
    model: &'a SchemaModel,
}

impl<'a> FieldResolver<'a> {
    pub fn new(model: &'a SchemaModel) -> Self {
        Self { model }
    }

    /// Resolve every output field, in result column order
    pub fn resolve(&self, provided: Option<&Record>, current: Option<&Record>) -> Record {
        let mut resolved = Record::new();
        for field in &self.model.output_fields {
            resolved.set(field.column.as_str(), resolve_field(field, provided, current));
        }
        resolved
    }

    /// Values of the result key columns, `None` for unresolved ones
    pub fn result_key<'r>(&self, resolved: &'r Record) -> Vec<Option<&'r str>> {
        self.model
            .key_columns(tabsync_core::RESULT_TABLE)
            .iter()
            .map(|key| resolved.get(key))
            .collect()
    }
}

/// First non-empty source by ascending priority
///
/// Provided and current values that are missing or empty fall through. A
/// fixed value always resolves.
pub fn resolve_field(
    field: &OutputFieldSpec,
    provided: Option<&Record>,
    current: Option<&Record>,
) -> Option<String> {
    field.sources.iter().find_map(|source| match &source.kind {
        SourceKind::ProvidedData { field: name } => {
            provided.and_then(|r| r.non_empty(name)).map(str::to_string)
        }
        SourceKind::CurrentData { field: name } => {
            current.and_then(|r| r.non_empty(name)).map(str::to_string)
        }
        SourceKind::FixedValue { value } => Some(value.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{model, model_with};
    use serde_json::json;

    #[test]
    fn provided_wins_by_priority() {
        let model = model();
        let resolver = FieldResolver::new(&model);
        let provided = Record::new().with("employee_id", "E001").with("name", "Alice");
        let current = Record::new().with("user_id", "E001").with("name", "Alicia").with("dept", "Ops");

        let resolved = resolver.resolve(Some(&provided), Some(&current));
        assert_eq!(resolved.get("syokuin_no"), Some("E001"));
        assert_eq!(resolved.get("name"), Some("Alice"));
        assert_eq!(resolved.get("dept"), Some("Ops"));
        assert_eq!(resolved.names().collect::<Vec<_>>(), vec!["syokuin_no", "name", "dept"]);
    }

    #[test]
    fn current_only_rows() {
        let model = model();
        let resolver = FieldResolver::new(&model);
        let current = Record::new().with("user_id", "Z001").with("name", "").with("dept", "HR");

        let resolved = resolver.resolve(None, Some(&current));
        assert_eq!(resolver.result_key(&resolved), vec![Some("Z001")]);
        assert_eq!(resolved.get("name"), None);
        assert!(resolved.contains("name"));
    }

    #[test]
    fn fixed_value_fallback() {
        let model = model_with(|doc| {
            doc["sync_rules"]["sync_result_mapping"]["mappings"]["dept"]["sources"] = json!([
                { "type": "provided_data", "field": "dept", "priority": 1 },
                { "type": "fixed_value", "value": "unassigned", "priority": 2 },
                { "type": "current_data", "field": "dept", "priority": 3 }
            ]);
        });
        let field = model.output_field("dept").unwrap();

        let provided = Record::new().with("dept", "");
        let current = Record::new().with("dept", "HR");
        assert_eq!(
            resolve_field(field, Some(&provided), Some(&current)),
            Some("unassigned".to_string())
        );
        assert_eq!(
            resolve_field(field, Some(&Record::new().with("dept", "Dev")), None),
            Some("Dev".to_string())
        );
    }

    #[test]
    fn nothing_resolves_to_none() {
        let model = model();
        let field = model.output_field("name").unwrap();
        assert_eq!(resolve_field(field, None, None), None);
    }
}

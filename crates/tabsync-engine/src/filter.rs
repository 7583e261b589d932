//! Row filtering before load
//!
//! Rules of a table are evaluated in declaration order and the first rule that
//! rejects a row decides. A row whose field is missing or empty is not judged
//! by that rule.

use tabsync_core::{FilterKind, FilterRule, FilterStatistics, Record, RuleStatistics, SchemaModel};

/// Rows split by the filter of one table
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    pub kept: Vec<Record>,
    pub excluded: Vec<Record>,
    pub statistics: FilterStatistics,
}

/// Applies `data_filters` of a [`SchemaModel`]
pub struct FilterEngine<'a> {
    model: &'a SchemaModel,
}

impl<'a> FilterEngine<'a> {
    pub fn new(model: &'a SchemaModel) -> Self {
        Self { model }
    }

    /// Split `rows` into kept and excluded, preserving input order
    ///
    /// Tables without a filter, with `enabled = false` or without rules keep
    /// every row.
    pub fn apply(&self, table: &str, rows: Vec<Record>) -> FilterOutcome {
        let total = rows.len();
        let filter = match self.model.filter(table) {
            Some(filter) if filter.is_active() => filter,
            _ => {
                return FilterOutcome {
                    kept: rows,
                    excluded: Vec::new(),
                    statistics: FilterStatistics::new(table, total, 0),
                }
            }
        };

        let mut per_rule = vec![0usize; filter.rules.len()];
        let mut kept = Vec::with_capacity(total);
        let mut excluded = Vec::new();

        for row in rows {
            match rejecting_rule(&filter.rules, &row) {
                Some(index) => {
                    per_rule[index] += 1;
                    excluded.push(row);
                }
                None => kept.push(row),
            }
        }

        let rules = filter
            .rules
            .iter()
            .zip(per_rule)
            .map(|(rule, count)| RuleStatistics {
                field: rule.field.clone(),
                kind: rule.kind,
                description: if rule.description.is_empty() {
                    format!("{} {}", rule.field, rule.matcher)
                } else {
                    rule.description.clone()
                },
                excluded: count,
            })
            .collect();

        let statistics = FilterStatistics::new(table, total, excluded.len()).with_rules(rules);
        tracing::info!(
            table,
            total,
            kept = statistics.kept,
            excluded = statistics.excluded,
            "filtered rows"
        );

        FilterOutcome {
            kept,
            excluded,
            statistics,
        }
    }
}

/// Index of the first rule that rejects the row
fn rejecting_rule(rules: &[FilterRule], row: &Record) -> Option<usize> {
    rules.iter().position(|rule| {
        let Some(value) = row.non_empty(&rule.field) else {
            return false;
        };
        let matched = rule.matcher.matches(value);
        match rule.kind {
            FilterKind::Exclude => matched,
            FilterKind::Include => !matched,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{model_with, model_with_filter};
    use serde_json::json;
    use tabsync_core::CURRENT_TABLE;

    fn users(ids: &[&str]) -> Vec<Record> {
        ids.iter().map(|id| Record::new().with("user_id", *id)).collect()
    }

    fn ids(rows: &[Record]) -> Vec<&str> {
        rows.iter().filter_map(|r| r.get("user_id")).collect()
    }

    fn exclude(glob: &str) -> serde_json::Value {
        json!({ "enabled": true, "rules": [ { "field": "user_id", "type": "exclude", "glob": glob } ] })
    }

    fn include(glob: &str) -> serde_json::Value {
        json!({ "enabled": true, "rules": [ { "field": "user_id", "type": "include", "glob": glob } ] })
    }

    #[test]
    fn exclude_prefix() {
        let model = model_with_filter(exclude("Z*"));
        let outcome = FilterEngine::new(&model).apply(CURRENT_TABLE, users(&["Z001", "A001"]));

        assert_eq!(ids(&outcome.kept), vec!["A001"]);
        assert_eq!(ids(&outcome.excluded), vec!["Z001"]);
        assert_eq!(outcome.statistics.exclusion_rate_percent, 50.0);
        assert_eq!(outcome.statistics.rules[0].excluded, 1);
    }

    #[test]
    fn repeated_stars_exclude_like_one() {
        let model = model_with_filter(exclude("Z**"));
        let outcome = FilterEngine::new(&model).apply(CURRENT_TABLE, users(&["Z001", "A001"]));

        assert_eq!(ids(&outcome.kept), vec!["A001"]);
        assert_eq!(ids(&outcome.excluded), vec!["Z001"]);
    }

    #[test]
    fn include_exact_length() {
        let model = model_with_filter(include("???"));
        let outcome = FilterEngine::new(&model).apply(CURRENT_TABLE, users(&["ABC", "ABCD"]));

        assert_eq!(ids(&outcome.kept), vec!["ABC"]);
        assert_eq!(ids(&outcome.excluded), vec!["ABCD"]);
    }

    #[test]
    fn negated_class() {
        let model = model_with_filter(include("[!Z]*"));
        let outcome = FilterEngine::new(&model).apply(CURRENT_TABLE, users(&["A1", "Z1"]));

        assert_eq!(ids(&outcome.kept), vec!["A1"]);
        assert_eq!(ids(&outcome.excluded), vec!["Z1"]);
    }

    #[test]
    fn exact_value_rules() {
        let model = model_with_filter(json!({
            "rules": [ { "field": "dept", "type": "exclude", "value": "Retired" } ]
        }));
        let rows = vec![
            Record::new().with("user_id", "A").with("dept", "Retired"),
            Record::new().with("user_id", "B").with("dept", "Retired staff"),
        ];
        let outcome = FilterEngine::new(&model).apply(CURRENT_TABLE, rows);
        assert_eq!(ids(&outcome.kept), vec!["B"]);
    }

    #[test]
    fn empty_values_skip_the_rule() {
        let model = model_with_filter(include("E*"));
        let rows = vec![
            Record::new().with("user_id", ""),
            Record::new().with("name", "no key"),
            Record::new().with("user_id", "X1"),
        ];
        let outcome = FilterEngine::new(&model).apply(CURRENT_TABLE, rows);
        assert_eq!(outcome.kept.len(), 2);
        assert_eq!(ids(&outcome.excluded), vec!["X1"]);
    }

    #[test]
    fn first_rejecting_rule_is_counted() {
        let model = model_with_filter(json!({
            "rules": [
                { "field": "user_id", "type": "exclude", "glob": "Z*" },
                { "field": "user_id", "type": "exclude", "glob": "Z9*", "description": "test ids" }
            ]
        }));
        let outcome = FilterEngine::new(&model).apply(CURRENT_TABLE, users(&["Z900", "A1"]));

        let counts: Vec<usize> = outcome.statistics.rules.iter().map(|r| r.excluded).collect();
        assert_eq!(counts, vec![1, 0]);
        assert_eq!(outcome.statistics.rules[0].description, "user_id glob 'Z*'");
        assert_eq!(outcome.statistics.rules[1].description, "test ids");
    }

    #[test]
    fn disabled_or_missing_filters_are_identity() {
        let mut disabled = exclude("*");
        disabled["enabled"] = json!(false);
        let rows = users(&["Z001", "A001", "A001"]);

        for model in [
            model_with_filter(disabled),
            model_with_filter(json!({ "rules": [] })),
            model_with(|_| {}),
        ] {
            let outcome = FilterEngine::new(&model).apply(CURRENT_TABLE, rows.clone());
            assert_eq!(outcome.kept, rows);
            assert!(outcome.excluded.is_empty());
            assert_eq!(outcome.statistics.exclusion_rate_percent, 0.0);
        }
    }
}

//! Row and outcome types shared by every stage of a run

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// An ordered field-name to value mapping
///
/// Absent and null values are both represented as `None`, which is what the
/// relational store hands back for SQL `NULL`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    fields: Vec<(String, Option<String>)>,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Build a record from `(name, value)` pairs where every value is present
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut record = Self::new();
        for (name, value) in pairs {
            record.set(name, Some(value.into()));
        }
        record
    }

    /// Set a field, replacing the previous value if the field already exists
    pub fn set(&mut self, name: impl Into<String>, value: Option<String>) {
        let name = name.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Builder-style variant of [`Record::set`]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, Some(value.into()));
        self
    }

    /// Raw value of a field (`None` when absent or null)
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .and_then(|(_, value)| value.as_deref())
    }

    /// Value of a field, treating the empty string as missing
    pub fn non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|value| !value.is_empty())
    }

    /// Whether the field is declared on this record (even if null)
    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|(existing, _)| existing == name)
    }

    /// Field names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Iterate `(name, value)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Classification a reconciled record receives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    /// Present in provided data only
    Add,

    /// Present in both, at least one compared field differs
    Update,

    /// Present in current data only
    Delete,

    /// Present in both with identical compared fields
    Keep,
}

impl Outcome {
    /// All outcomes in phase order
    pub const ALL: [Outcome; 4] = [Outcome::Add, Outcome::Update, Outcome::Delete, Outcome::Keep];

    /// Label stored in the result table
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Keep => "KEEP",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADD" => Ok(Self::Add),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            "KEEP" => Ok(Self::Keep),
            other => Err(format!("unknown outcome '{}'", other)),
        }
    }
}

/// A row of the result table together with its outcome label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub outcome: Outcome,
    pub values: Record,
}

impl ResultRecord {
    pub fn new(outcome: Outcome, values: Record) -> Self {
        Self { outcome, values }
    }

    /// Shorthand for `self.values.get(name)`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_in_place() {
        let mut record = Record::from_pairs([("a", "1"), ("b", "2")]);
        record.set("a", None);
        record.set("c", Some("3".to_string()));

        assert_eq!(record.names().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(record.get("a"), None);
        assert!(record.contains("a"));
        assert_eq!(record.get("c"), Some("3"));
    }

    #[test]
    fn empty_values_are_not_non_empty() {
        let record = Record::new().with("name", "");
        assert_eq!(record.get("name"), Some(""));
        assert_eq!(record.non_empty("name"), None);
    }

    #[test]
    fn outcome_labels() {
        assert_eq!(Outcome::Update.to_string(), "UPDATE");
        assert_eq!("keep".parse::<Outcome>().unwrap(), Outcome::Keep);
        assert!("MERGE".parse::<Outcome>().is_err());

        let json = serde_json::to_string(&Outcome::Delete).unwrap();
        assert_eq!(json, "\"DELETE\"");
    }
}

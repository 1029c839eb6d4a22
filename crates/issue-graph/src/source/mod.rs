//! Issue sources: where the walker gets issue records from.
//!
//! The `IssueSource` trait decouples the graph walker from the tracker's HTTP
//! API so the same traversal runs against the live tracker, an exported JSON
//! file, or an in-memory fixture.

use crate::domain::IssueRecord;
use serde_json::Value;
use thiserror::Error;

pub mod file;
pub mod jira;
pub mod memory;

pub use file::JsonFileSource;
pub use jira::{Auth, JiraClient};
pub use memory::{InMemorySource, IssueBuilder};

/// Fields requested for every issue.
pub const ISSUE_FIELDS: [&str; 9] = [
    "key",
    "summary",
    "assignee",
    "labels",
    "status",
    "description",
    "issuetype",
    "issuelinks",
    "subtasks",
];

/// Failures reported by an issue source
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("Issue not found: {0}")]
    NotFound(String),
    #[error("Not authorized (HTTP {status})")]
    Unauthorized { status: u16 },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Unsupported query: {0}")]
    UnsupportedQuery(String),
}

/// A blocking provider of issue records.
///
/// Each call is one round trip; the walker never has more than one call
/// outstanding.
pub trait IssueSource {
    /// Fetch one issue by key.
    ///
    /// # Errors
    ///
    /// `SourceError::NotFound` if the key is unknown, other variants for
    /// authorization or transport failures.
    fn fetch_issue(&self, key: &str) -> Result<IssueRecord, SourceError>;

    /// Run a query expression and return the matching issues in order.
    fn query(&self, expression: &str) -> Result<Vec<IssueRecord>, SourceError>;
}

impl<S: IssueSource + ?Sized> IssueSource for &S {
    fn fetch_issue(&self, key: &str) -> Result<IssueRecord, SourceError> {
        (**self).fetch_issue(key)
    }

    fn query(&self, expression: &str) -> Result<Vec<IssueRecord>, SourceError> {
        (**self).query(expression)
    }
}

impl<S: IssueSource + ?Sized> IssueSource for Box<S> {
    fn fetch_issue(&self, key: &str) -> Result<IssueRecord, SourceError> {
        (**self).fetch_issue(key)
    }

    fn query(&self, expression: &str) -> Result<Vec<IssueRecord>, SourceError> {
        (**self).query(expression)
    }
}

/// Query expression listing the members of an epic
pub fn epic_members_query(epic_key: &str) -> String {
    format!("\"Epic Link\" = \"{}\"", epic_key)
}

/// A `"<field>" = "<value>"` query, the only form offline sources answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEquals {
    pub field: String,
    pub value: String,
}

impl FieldEquals {
    /// Parse `"Field Name" = "value"`; quotes are optional for single words
    pub fn parse(expression: &str) -> Result<Self, SourceError> {
        let unsupported = || SourceError::UnsupportedQuery(expression.to_string());

        let (field, value) = expression.split_once('=').ok_or_else(unsupported)?;
        let field = unquote(field.trim());
        let value = unquote(value.trim());

        if field.is_empty() || value.is_empty() || value.contains('=') {
            return Err(unsupported());
        }

        Ok(Self {
            field: field.to_string(),
            value: value.to_string(),
        })
    }

    /// Whether an issue's raw field matches.
    ///
    /// Strings compare directly; objects compare by their `key` or `name`.
    pub fn matches(&self, issue: &IssueRecord) -> bool {
        match issue.raw_fields.get(self.field.as_str()) {
            Some(Value::String(s)) => s == &self.value,
            Some(Value::Object(obj)) => ["key", "name"]
                .iter()
                .filter_map(|k| obj.get(*k).and_then(Value::as_str))
                .any(|s| s == self.value),
            _ => false,
        }
    }
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_epic_members_query_round_trips_through_field_equals() {
        let query = epic_members_query("CORE-1");
        assert_eq!(query, r#""Epic Link" = "CORE-1""#);

        let parsed = FieldEquals::parse(&query).unwrap();
        assert_eq!(parsed.field, "Epic Link");
        assert_eq!(parsed.value, "CORE-1");
    }

    #[test]
    fn test_field_equals_rejects_other_queries() {
        assert!(FieldEquals::parse("project = CORE AND status = Open").is_err());
        assert_eq!(
            FieldEquals::parse("order by rank"),
            Err(SourceError::UnsupportedQuery("order by rank".to_string()))
        );
        assert!(FieldEquals::parse("\"Epic Link\" = \"\"").is_err());
    }

    #[test]
    fn test_field_equals_matches_strings_and_objects() {
        let issue = IssueRecord::from_json(json!({
            "key": "CORE-2",
            "fields": {
                "Epic Link": "CORE-1",
                "parent": {"key": "CORE-9"},
                "status": {"name": "Open"}
            }
        }))
        .unwrap();

        assert!(FieldEquals::parse(r#""Epic Link" = "CORE-1""#).unwrap().matches(&issue));
        assert!(FieldEquals::parse("parent = CORE-9").unwrap().matches(&issue));
        assert!(FieldEquals::parse("status = Open").unwrap().matches(&issue));
        assert!(!FieldEquals::parse("status = Closed").unwrap().matches(&issue));
        assert!(!FieldEquals::parse("missing = x").unwrap().matches(&issue));
    }
}

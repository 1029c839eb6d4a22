//! In-memory issue source for testing.
//!
//! Holds records in a map and counts how often each key is fetched, so tests
//! can check that the walker never asks for the same issue twice.

use super::{FieldEquals, IssueSource, SourceError};
use crate::domain::IssueRecord;
use serde_json::{json, Map, Value};
use std::cell::RefCell;
use std::collections::HashMap;

/// In-memory issue source.
///
/// # Examples
///
/// ```
/// use issue_graph::source::{InMemorySource, IssueBuilder, IssueSource};
///
/// let source = InMemorySource::new();
/// source.add(IssueBuilder::new("PROJ-1", "Root").build());
///
/// assert_eq!(source.fetch_issue("PROJ-1").unwrap().summary(), "Root");
/// assert_eq!(source.fetch_count("PROJ-1"), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemorySource {
    issues: RefCell<Vec<IssueRecord>>,
    fetches: RefCell<HashMap<String, usize>>,
    queries: RefCell<Vec<String>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a source from a list of records
    pub fn with_issues(issues: impl IntoIterator<Item = IssueRecord>) -> Self {
        let source = Self::new();
        for issue in issues {
            source.add(issue);
        }
        source
    }

    /// Insert or replace a record
    pub fn add(&self, issue: IssueRecord) {
        let mut issues = self.issues.borrow_mut();
        match issues.iter_mut().find(|existing| existing.key == issue.key) {
            Some(existing) => *existing = issue,
            None => issues.push(issue),
        }
    }

    /// How many times `key` was fetched
    pub fn fetch_count(&self, key: &str) -> usize {
        self.fetches.borrow().get(key).copied().unwrap_or(0)
    }

    /// Total number of fetches across all keys
    pub fn total_fetches(&self) -> usize {
        self.fetches.borrow().values().sum()
    }

    /// Query expressions received, in order
    pub fn queries(&self) -> Vec<String> {
        self.queries.borrow().clone()
    }
}

impl IssueSource for InMemorySource {
    fn fetch_issue(&self, key: &str) -> Result<IssueRecord, SourceError> {
        *self.fetches.borrow_mut().entry(key.to_string()).or_insert(0) += 1;
        self.issues
            .borrow()
            .iter()
            .find(|issue| issue.key == key)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(key.to_string()))
    }

    fn query(&self, expression: &str) -> Result<Vec<IssueRecord>, SourceError> {
        self.queries.borrow_mut().push(expression.to_string());
        let filter = FieldEquals::parse(expression)?;
        Ok(self
            .issues
            .borrow()
            .iter()
            .filter(|issue| filter.matches(issue))
            .cloned()
            .collect())
    }
}

/// Fluent builder for issue records in the tracker's JSON shape
#[derive(Debug, Clone)]
pub struct IssueBuilder {
    key: String,
    fields: Map<String, Value>,
    subtasks: Vec<Value>,
    links: Vec<Value>,
}

impl IssueBuilder {
    pub fn new(key: &str, summary: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("summary".to_string(), json!(summary));
        fields.insert("status".to_string(), json!({"name": "Open"}));
        fields.insert("issuetype".to_string(), json!({"name": "Task"}));
        Self {
            key: key.to_string(),
            fields,
            subtasks: Vec::new(),
            links: Vec::new(),
        }
    }

    pub fn status(self, name: &str) -> Self {
        self.field("status", json!({ "name": name }))
    }

    pub fn issue_type(self, name: &str) -> Self {
        self.field("issuetype", json!({ "name": name }))
    }

    /// Make this issue a member of `epic_key`
    pub fn epic(self, epic_key: &str) -> Self {
        self.field("Epic Link", json!(epic_key))
    }

    pub fn subtask(mut self, key: &str) -> Self {
        self.subtasks.push(json!({ "key": key }));
        self
    }

    /// Outward link, read as "this issue <outward_name> target"
    pub fn link_out(mut self, outward_name: &str, target: &str, target_status: &str) -> Self {
        self.links.push(json!({
            "type": {"name": outward_name, "inward": format!("inverse of {}", outward_name), "outward": outward_name},
            "outwardIssue": {"key": target, "fields": {"status": {"name": target_status}}}
        }));
        self
    }

    /// Inward link, read as "this issue <inward_name> target"
    pub fn link_in(mut self, inward_name: &str, target: &str, target_status: &str) -> Self {
        self.links.push(json!({
            "type": {"name": inward_name, "inward": inward_name, "outward": format!("inverse of {}", inward_name)},
            "inwardIssue": {"key": target, "fields": {"status": {"name": target_status}}}
        }));
        self
    }

    /// Link relation with neither side present
    pub fn malformed_link(mut self) -> Self {
        self.links.push(json!({
            "type": {"name": "Broken", "inward": "broken", "outward": "broken"}
        }));
        self
    }

    pub fn field(mut self, name: &str, value: Value) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    pub fn to_json(&self) -> Value {
        let mut fields = self.fields.clone();
        fields.insert("subtasks".to_string(), Value::Array(self.subtasks.clone()));
        fields.insert("issuelinks".to_string(), Value::Array(self.links.clone()));
        json!({ "key": self.key, "fields": fields })
    }

    /// # Panics
    ///
    /// If a value set through [`IssueBuilder::field`] breaks the typed fields,
    /// e.g. a string `status`.
    pub fn build(self) -> IssueRecord {
        IssueRecord::from_json(self.to_json()).expect("builder produces valid issue json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Direction;

    #[test]
    fn test_fetch_counts_and_not_found() {
        let source = InMemorySource::with_issues([IssueBuilder::new("A-1", "One").build()]);

        source.fetch_issue("A-1").unwrap();
        source.fetch_issue("A-1").unwrap();
        assert_eq!(source.fetch_count("A-1"), 2);

        assert_eq!(
            source.fetch_issue("A-2"),
            Err(SourceError::NotFound("A-2".to_string()))
        );
        assert_eq!(source.total_fetches(), 3);
    }

    #[test]
    fn test_add_replaces_existing_key() {
        let source = InMemorySource::new();
        source.add(IssueBuilder::new("A-1", "Old").build());
        source.add(IssueBuilder::new("A-1", "New").build());
        assert_eq!(source.fetch_issue("A-1").unwrap().summary(), "New");
    }

    #[test]
    fn test_query_records_expression() {
        let source = InMemorySource::with_issues([
            IssueBuilder::new("E-1", "Epic").issue_type("Epic").build(),
            IssueBuilder::new("E-2", "Member").epic("E-1").build(),
        ]);

        let result = source.query("\"Epic Link\" = \"E-1\"").unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].key, "E-2");
        assert_eq!(source.queries(), vec!["\"Epic Link\" = \"E-1\"".to_string()]);
    }

    #[test]
    fn test_builder_links() {
        let issue = IssueBuilder::new("A-1", "x")
            .link_out("blocks", "A-2", "Open")
            .link_in("is cloned by", "A-3", "Closed")
            .malformed_link()
            .subtask("A-4")
            .build();

        let links = issue.links();
        assert_eq!(links[0].direction(), Some(Direction::Outward));
        assert_eq!(links[0].link_type.name_for(Direction::Outward), "blocks");
        assert_eq!(links[1].direction(), Some(Direction::Inward));
        assert_eq!(links[1].link_type.name_for(Direction::Inward), "is cloned by");
        assert_eq!(links[2].direction(), None);
        assert_eq!(issue.subtasks()[0].key, "A-4");
    }
}

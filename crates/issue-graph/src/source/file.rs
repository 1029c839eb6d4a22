//! Offline issue source backed by a JSON export.
//!
//! The file holds issues in the tracker's REST shape, either wrapped as
//! `{"issues": [...]}` (a saved search reply) or as a bare array.

use super::{FieldEquals, IssueSource, SourceError};
use crate::domain::IssueRecord;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

#[derive(Deserialize)]
#[serde(untagged)]
enum Export {
    Wrapped { issues: Vec<IssueRecord> },
    Bare(Vec<IssueRecord>),
}

/// Issue source reading from an exported JSON file
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    issues: Vec<IssueRecord>,
    index: HashMap<String, usize>,
}

impl JsonFileSource {
    /// Load and index an export file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        let source = Self::from_json_str(&contents)
            .with_context(|| format!("Failed to parse issue export {}", path.display()))?;
        if source.is_empty() {
            warn!(path = %path.display(), "Issue export contains no issues");
        } else {
            info!(path = %path.display(), issues = source.len(), "Loaded issue export");
        }
        Ok(source)
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        let export: Export = serde_json::from_str(contents).context("Failed to deserialize data")?;
        let issues = match export {
            Export::Wrapped { issues } => issues,
            Export::Bare(issues) => issues,
        };
        Ok(Self::from_issues(issues))
    }

    pub fn from_issues(issues: Vec<IssueRecord>) -> Self {
        let index = issues
            .iter()
            .enumerate()
            .map(|(i, issue)| (issue.key.clone(), i))
            .collect();
        Self { issues, index }
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

impl IssueSource for JsonFileSource {
    fn fetch_issue(&self, key: &str) -> Result<IssueRecord, SourceError> {
        info!("Fetching {}", key);
        self.index
            .get(key)
            .map(|&i| self.issues[i].clone())
            .ok_or_else(|| SourceError::NotFound(key.to_string()))
    }

    fn query(&self, expression: &str) -> Result<Vec<IssueRecord>, SourceError> {
        info!("Querying {}", expression);
        let filter = FieldEquals::parse(expression)?;
        Ok(self
            .issues
            .iter()
            .filter(|issue| filter.matches(issue))
            .cloned()
            .collect())
    }
}

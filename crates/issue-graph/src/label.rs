//! Node label formatting.
//!
//! The default label is `KEY (summary)` with long summaries shortened. A
//! configured template replaces it entirely, and a second template can attach
//! extra node attributes.

use crate::domain::IssueRecord;
use crate::graph::GraphError;
use crate::template::Template;

/// Summaries longer than this (plus the ellipsis slack) are shortened.
pub const MAX_SUMMARY_LENGTH: usize = 30;

const ELLIPSIS: &str = "...";

/// Shorten a summary to `MAX_SUMMARY_LENGTH` characters plus `...`.
///
/// The ellipsis must replace more than two characters, otherwise the result
/// would be no shorter than the input.
pub fn truncate_summary(summary: &str) -> String {
    if summary.chars().count() > MAX_SUMMARY_LENGTH + 2 {
        let mut short: String = summary.chars().take(MAX_SUMMARY_LENGTH).collect();
        short.push_str(ELLIPSIS);
        short
    } else {
        summary.to_string()
    }
}

/// Default `KEY (summary)` label with quotes escaped
pub fn default_label(key: &str, summary: &str) -> String {
    format!("{} ({})", key, truncate_summary(summary).replace('"', "\\\""))
}

/// How a node's label text is produced
#[derive(Debug, Clone, Default)]
pub enum NodeLabeler {
    #[default]
    Default,
    Template(Template),
}

/// Formats labels and optional extra attributes for issue nodes
#[derive(Debug, Clone, Default)]
pub struct LabelFormatter {
    labeler: NodeLabeler,
    attributes: Option<Template>,
}

impl LabelFormatter {
    pub fn new(labeler: NodeLabeler, attributes: Option<Template>) -> Self {
        Self { labeler, attributes }
    }

    /// Label text for the node of `key`.
    ///
    /// `key` is the key the walker asked for; the tracker may answer with a
    /// different one for a moved issue, and the label must match the node.
    pub fn label(&self, key: &str, issue: &IssueRecord) -> Result<String, GraphError> {
        match &self.labeler {
            NodeLabeler::Default => Ok(default_label(key, issue.summary())),
            NodeLabeler::Template(template) => render(template, key, issue),
        }
    }

    /// Extra attribute text, when an attribute template is configured
    pub fn attributes(&self, key: &str, issue: &IssueRecord) -> Result<Option<String>, GraphError> {
        self.attributes
            .as_ref()
            .map(|template| render(template, key, issue))
            .transpose()
    }
}

fn render(template: &Template, key: &str, issue: &IssueRecord) -> Result<String, GraphError> {
    template
        .render(&issue.raw_fields, key)
        .map_err(|source| {
            tracing::error!(key, fields = %issue.raw_fields, "Template evaluation failed");
            GraphError::Template {
                key: key.to_string(),
                fields: issue.raw_fields.clone(),
                source,
            }
        })
}

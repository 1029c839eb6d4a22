//! Graph statements produced by the walker and consumed by the renderers.
//!
//! Statements stay structured until they reach a renderer, so deduplication
//! compares values rather than formatted text. `Display` produces the DOT
//! fragment for a single statement.

use crate::source::SourceError;
use crate::template::TemplateError;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Link type name that gets highlighted.
pub const BLOCKS_LINK: &str = "blocks";

/// Errors that abort a graph walk
#[derive(Debug, Error)]
pub enum GraphError {
    /// The issue source could not deliver an issue
    #[error("Failed to fetch issue {key}")]
    Fetch {
        key: String,
        #[source]
        source: SourceError,
    },
    /// The issue source rejected a query
    #[error("Query '{query}' failed")]
    Query {
        query: String,
        #[source]
        source: SourceError,
    },
    /// A label or node template failed for one issue
    #[error("Template evaluation failed for issue {key}")]
    Template {
        key: String,
        fields: Value,
        #[source]
        source: TemplateError,
    },
}

/// What an edge represents
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum EdgeKind {
    /// Typed issue link, carrying the direction-specific type name
    Link(String),
    /// Parent to subtask
    Subtask,
    /// Epic to member issue
    Epic,
}

/// A directed edge between two issue keys
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub kind: EdgeKind,
}

impl Edge {
    pub fn link(from: impl Into<String>, to: impl Into<String>, link_type: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            kind: EdgeKind::Link(link_type.into()),
        }
    }

    pub fn subtask(parent: impl Into<String>, child: impl Into<String>) -> Self {
        Self {
            from: parent.into(),
            to: child.into(),
            kind: EdgeKind::Subtask,
        }
    }

    pub fn epic(epic: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            from: epic.into(),
            to: member.into(),
            kind: EdgeKind::Epic,
        }
    }

    /// Text shown on the edge
    pub fn label(&self) -> Option<&str> {
        match &self.kind {
            EdgeKind::Link(name) => Some(name),
            EdgeKind::Subtask => Some("subtask"),
            EdgeKind::Epic => None,
        }
    }

    /// Highlight color, if the edge kind has one
    pub fn color(&self) -> Option<&'static str> {
        match &self.kind {
            EdgeKind::Link(name) if name == BLOCKS_LINK => Some("red"),
            EdgeKind::Link(_) => None,
            EdgeKind::Subtask => Some("blue"),
            EdgeKind::Epic => Some("orange"),
        }
    }
}

/// One node or edge declaration of the output graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Statement {
    /// Node with its display label
    Node { key: String, label: String },
    /// Free-form attribute list attached to a node
    NodeAttributes { key: String, attributes: String },
    /// Edge between two nodes
    Edge(Edge),
}

impl Statement {
    pub fn node(key: impl Into<String>, label: impl Into<String>) -> Self {
        Statement::Node {
            key: key.into(),
            label: label.into(),
        }
    }

    pub fn node_attributes(key: impl Into<String>, attributes: impl Into<String>) -> Self {
        Statement::NodeAttributes {
            key: key.into(),
            attributes: attributes.into(),
        }
    }

    pub fn as_edge(&self) -> Option<&Edge> {
        match self {
            Statement::Edge(edge) => Some(edge),
            _ => None,
        }
    }
}

impl From<Edge> for Statement {
    fn from(edge: Edge) -> Self {
        Statement::Edge(edge)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Node { key, label } => {
                write!(f, "\"{}\" [label=\"{}\"]", quote(key), label)
            }
            Statement::NodeAttributes { key, attributes } => {
                write!(f, "\"{}\" [{}]", quote(key), attributes)
            }
            Statement::Edge(edge) => {
                write!(f, "\"{}\"->\"{}\"", quote(&edge.from), quote(&edge.to))?;
                let mut attrs = Vec::new();
                if let Some(label) = edge.label() {
                    attrs.push(format!("label=\"{}\"", quote(label)));
                }
                if let Some(color) = edge.color() {
                    attrs.push(format!("color=\"{}\"", color));
                }
                if !attrs.is_empty() {
                    write!(f, "[{}]", attrs.join(","))?;
                }
                Ok(())
            }
        }
    }
}

fn quote(s: &str) -> String {
    s.replace('"', "\\\"")
}

/// Collapse repeated statements, keeping each at its first position
pub fn dedup_statements(statements: Vec<Statement>) -> Vec<Statement> {
    let mut seen = HashSet::new();
    statements
        .into_iter()
        .filter(|statement| seen.insert(statement.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let x = Statement::node("X", "X (x)");
        let y = Statement::from(Edge::link("X", "Y", "relates to"));
        let z = Statement::from(Edge::subtask("X", "Z"));

        let result = dedup_statements(vec![x.clone(), y.clone(), x.clone(), z.clone()]);
        assert_eq!(result, vec![x, y, z]);
    }

    #[test]
    fn test_dedup_distinguishes_edge_kinds() {
        let subtask = Statement::from(Edge::subtask("A", "B"));
        let epic = Statement::from(Edge::epic("A", "B"));

        let result = dedup_statements(vec![subtask.clone(), epic.clone(), subtask.clone()]);
        assert_eq!(result, vec![subtask, epic]);
    }

    #[test]
    fn test_blocks_edge_is_highlighted() {
        let edge = Edge::link("A-1", "A-2", "blocks");
        assert_eq!(edge.color(), Some("red"));
        assert_eq!(
            Statement::from(edge).to_string(),
            r#""A-1"->"A-2"[label="blocks",color="red"]"#
        );

        let edge = Edge::link("A-1", "A-2", "is blocked by");
        assert_eq!(edge.color(), None);
        assert_eq!(
            Statement::from(edge).to_string(),
            r#""A-1"->"A-2"[label="is blocked by"]"#
        );
    }

    #[test]
    fn test_subtask_and_epic_edge_text() {
        assert_eq!(
            Statement::from(Edge::subtask("P-1", "P-2")).to_string(),
            r#""P-1"->"P-2"[label="subtask",color="blue"]"#
        );
        assert_eq!(
            Statement::from(Edge::epic("P-1", "P-3")).to_string(),
            r#""P-1"->"P-3"[color="orange"]"#
        );
    }

    #[test]
    fn test_node_statement_text() {
        assert_eq!(
            Statement::node("P-1", "P-1 (Fix it)").to_string(),
            r#""P-1" [label="P-1 (Fix it)"]"#
        );
        assert_eq!(
            Statement::node_attributes("P-1", "shape=box").to_string(),
            r#""P-1" [shape=box]"#
        );
    }
}

//! Configuration file loading and run options.
//!
//! Settings can come from a TOML file (`--config` or `ISSUE_GRAPH_CONFIG`).
//! Command-line flags take precedence over the file, and the file over the
//! built-in defaults. If no config file is given, defaults apply.
//!
//! ```toml
//! [jira]
//! url = "https://jira.example.com"
//! user = "robot"
//! timeout_secs = 60
//!
//! [graph]
//! exclude_links = ["relates to"]
//! directions = ["outward"]
//! ignore_closed = true
//! label_template = "{issue_key}\\n{assignee.displayName?}"
//!
//! [render]
//! local = true
//! ```

use crate::domain::Direction;
use crate::label::LabelFormatter;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;

/// Default tracker base URL.
pub const DEFAULT_JIRA_URL: &str = "http://jira.example.com";

/// Default chart rendering endpoint.
pub const DEFAULT_CHART_URL: &str = "http://chart.apis.google.com/chart";

/// Default image output path.
pub const DEFAULT_IMAGE_FILE: &str = "issue_graph.png";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Root configuration structure loaded from a TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueGraphConfig {
    /// Tracker connection settings (optional).
    pub jira: Option<JiraConfig>,
    /// Traversal and filtering settings (optional).
    pub graph: Option<GraphConfig>,
    /// Output settings (optional).
    pub render: Option<RenderConfig>,
}

/// Tracker connection settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JiraConfig {
    /// Base URL of the tracker.
    pub url: Option<String>,
    /// Username for basic authentication.
    pub user: Option<String>,
    /// JSESSIONID session cookie.
    pub cookie: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

/// Traversal and filtering settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphConfig {
    /// Link type names that are walked but never drawn.
    pub exclude_links: Option<Vec<String>>,
    /// Directions to walk.
    pub directions: Option<Vec<Direction>>,
    /// Directions to draw.
    pub show_directions: Option<Vec<Direction>>,
    /// Only follow links whose target key contains this text.
    pub include: Option<String>,
    /// Drop closed issues and links to them.
    pub ignore_closed: Option<bool>,
    /// Do not expand epics into their member issues.
    pub ignore_epic: Option<bool>,
    /// Node label template.
    pub label_template: Option<String>,
    /// Node attribute template.
    pub node_template: Option<String>,
}

/// Output settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RenderConfig {
    /// Print DOT text instead of requesting an image.
    pub local: Option<bool>,
    /// Where to write the rendered image.
    pub image_file: Option<String>,
    /// Chart rendering endpoint.
    pub chart_url: Option<String>,
}

impl IssueGraphConfig {
    /// Load configuration from `path` if it exists.
    ///
    /// Returns an empty config if the file doesn't exist.
    /// Returns an error if the file exists but is malformed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: IssueGraphConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(config)
    }

    /// Load a config file that the user named explicitly; it must exist.
    pub fn load_required(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!("Config file not found: {}", path.display());
        }
        Self::load(path)
    }

    pub fn jira(&self) -> JiraConfig {
        self.jira.clone().unwrap_or_default()
    }

    pub fn graph(&self) -> GraphConfig {
        self.graph.clone().unwrap_or_default()
    }

    pub fn render(&self) -> RenderConfig {
        self.render.clone().unwrap_or_default()
    }
}

/// Options consumed by the link classifier and graph walker
#[derive(Debug, Clone)]
pub struct GraphOptions {
    /// Link type names that keep connectivity but produce no edge
    pub excluded_links: BTreeSet<String>,
    /// Directions whose links are followed
    pub walk_directions: BTreeSet<Direction>,
    /// Directions whose links are drawn
    pub show_directions: BTreeSet<Direction>,
    /// Substring a link target key must contain; empty matches everything
    pub include: String,
    /// Drop issues with status "Closed" and links to them
    pub ignore_closed: bool,
    /// Do not query epic members
    pub ignore_epic: bool,
    /// Node label and attribute formatting
    pub labels: LabelFormatter,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            excluded_links: BTreeSet::new(),
            walk_directions: Direction::ALL.into_iter().collect(),
            show_directions: Direction::ALL.into_iter().collect(),
            include: String::new(),
            ignore_closed: false,
            ignore_epic: false,
            labels: LabelFormatter::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let temp = TempDir::new().unwrap();
        let config = IssueGraphConfig::load(&temp.path().join("nope.toml")).unwrap();

        assert!(config.jira.is_none());
        assert!(config.graph().directions.is_none());
        assert!(IssueGraphConfig::load_required(&temp.path().join("nope.toml")).is_err());
    }

    #[test]
    fn test_load_full_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("graph.toml");
        fs::write(
            &path,
            r#"
[jira]
url = "https://tracker.local"
user = "bot"
timeout_secs = 5

[graph]
exclude_links = ["relates to", "clones"]
directions = ["outward"]
show_directions = ["inward", "outward"]
include = "CORE"
ignore_closed = true
label_template = "{issue_key}"

[render]
local = true
chart_url = "http://charts.local/chart"
"#,
        )
        .unwrap();

        let config = IssueGraphConfig::load(&path).unwrap();
        let jira = config.jira();
        assert_eq!(jira.url.as_deref(), Some("https://tracker.local"));
        assert_eq!(jira.timeout_secs, Some(5));

        let graph = config.graph();
        assert_eq!(graph.exclude_links.unwrap().len(), 2);
        assert_eq!(graph.directions, Some(vec![Direction::Outward]));
        assert_eq!(graph.include.as_deref(), Some("CORE"));
        assert_eq!(graph.ignore_closed, Some(true));
        assert_eq!(graph.ignore_epic, None);

        let render = config.render();
        assert_eq!(render.local, Some(true));
        assert_eq!(render.image_file, None);
    }

    #[test]
    fn test_load_malformed_file_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.toml");
        fs::write(&path, "[graph]\ndirections = [\"sideways\"]\n").unwrap();

        let err = IssueGraphConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_default_options_walk_and_show_both_directions() {
        let options = GraphOptions::default();
        assert!(options.walk_directions.contains(&Direction::Inward));
        assert!(options.show_directions.contains(&Direction::Outward));
        assert!(options.include.is_empty());
        assert!(!options.ignore_closed);
    }
}

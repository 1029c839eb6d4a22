//! Command-line interface definitions using clap.

use crate::config::{
    GraphOptions, IssueGraphConfig, DEFAULT_CHART_URL, DEFAULT_IMAGE_FILE, DEFAULT_JIRA_URL,
    DEFAULT_TIMEOUT_SECS,
};
use crate::domain::Direction;
use crate::label::{LabelFormatter, NodeLabeler};
use crate::template::Template;
use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

/// Issue dependency graph
///
/// Follows subtasks, epic members and issue links from one or more issues and
/// renders the result as a Graphviz graph.
///
/// Exit Codes:
///   0  - Command succeeded
///   1  - Generic error occurred
///   2  - Invalid arguments, configuration or template
///   3  - Issue not found
///   5  - Authentication rejected by the tracker
///  10  - External service or file system failed
#[derive(Parser, Debug)]
#[command(name = "issue-graph")]
#[command(about = "Render the dependency graph of tracker issues", long_about = None)]
pub struct Cli {
    /// Username to access the tracker
    #[arg(short, long, env = "ISSUE_GRAPH_USER")]
    pub user: Option<String>,

    /// Password to access the tracker
    #[arg(short, long, env = "ISSUE_GRAPH_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// JSESSIONID session cookie value
    #[arg(short, long, hide_env_values = true)]
    pub cookie: Option<String>,

    /// Tracker base URL
    #[arg(short, long = "jira", value_name = "URL")]
    pub jira_url: Option<String>,

    /// Filename to write the image to
    #[arg(short = 'f', long = "file", value_name = "PATH")]
    pub image_file: Option<PathBuf>,

    /// Print Graphviz code to stdout instead of requesting an image
    #[arg(short, long)]
    pub local: bool,

    /// Print the graph statements as JSON to stdout
    #[arg(long, conflicts_with = "local")]
    pub json: bool,

    /// Don't follow an epic into its member issues
    #[arg(short = 'e', long)]
    pub ignore_epic: bool,

    /// Exclude link type (repeatable); excluded links are walked but not drawn
    #[arg(short = 'x', long = "exclude-link", value_name = "TYPE", action = ArgAction::Append)]
    pub excludes: Vec<String>,

    /// Ignore closed issues
    #[arg(long)]
    pub ignore_closed: bool,

    /// Only follow links to issue keys containing this text
    #[arg(short = 'i', long = "issue-include", value_name = "TEXT")]
    pub include: Option<String>,

    /// Template for node labels, e.g. "{issue_key}\n{assignee.displayName?}"
    #[arg(short = 'F', long = "format", value_name = "TEMPLATE")]
    pub label_template: Option<String>,

    /// Template for extra node attributes, e.g. "color=\"{labels.0?}\""
    #[arg(short = 'N', long = "node-format", value_name = "TEMPLATE")]
    pub node_template: Option<String>,

    /// Which directions to show (inward,outward)
    #[arg(short = 's', long, value_delimiter = ',', value_name = "DIRECTIONS")]
    pub show_directions: Vec<Direction>,

    /// Which directions to walk (inward,outward)
    #[arg(short = 'd', long, value_delimiter = ',', value_name = "DIRECTIONS")]
    pub directions: Vec<Direction>,

    /// TOML configuration file
    #[arg(long, env = "ISSUE_GRAPH_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Read issues from a JSON export instead of the tracker
    #[arg(long, value_name = "PATH")]
    pub offline: Option<PathBuf>,

    /// Chart rendering endpoint
    #[arg(long, value_name = "URL")]
    pub chart_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// The issue keys to start from (e.g. JRADEV-1107 JRADEV-1391)
    #[arg(required = true, value_name = "ISSUE")]
    pub issues: Vec<String>,
}

/// How the finished graph is emitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    /// DOT text on stdout
    Local,
    /// Statements as JSON on stdout
    Json,
    /// Image from the chart service
    Image { chart_url: String, image_file: PathBuf },
}

/// Connection and output settings resolved from flags and config file
#[derive(Clone)]
pub struct RunSettings {
    pub jira_url: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub cookie: Option<String>,
    pub timeout: Duration,
    pub offline: Option<PathBuf>,
    pub output: OutputMode,
}

impl Cli {
    /// Load the config file named by `--config` / `ISSUE_GRAPH_CONFIG`
    pub fn load_config(&self) -> Result<IssueGraphConfig> {
        match &self.config {
            Some(path) => IssueGraphConfig::load_required(path),
            None => Ok(IssueGraphConfig::default()),
        }
    }

    /// Log filter directive implied by -v / -q
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    /// Traversal options; flags override the config file
    pub fn graph_options(&self, config: &IssueGraphConfig) -> Result<GraphOptions> {
        let file = config.graph();

        let excluded_links: BTreeSet<String> = if self.excludes.is_empty() {
            file.exclude_links.unwrap_or_default().into_iter().collect()
        } else {
            self.excludes.iter().cloned().collect()
        };

        let walk_directions = pick_directions(&self.directions, file.directions);
        let show_directions = pick_directions(&self.show_directions, file.show_directions);

        let label_template = self.label_template.clone().or(file.label_template);
        let node_template = self.node_template.clone().or(file.node_template);

        let labeler = match label_template.filter(|t| !t.is_empty()) {
            Some(text) => NodeLabeler::Template(
                Template::parse(&text)
                    .with_context(|| format!("Invalid label template '{}'", text))?,
            ),
            None => NodeLabeler::Default,
        };
        let attributes = node_template
            .filter(|t| !t.is_empty())
            .map(|text| {
                Template::parse(&text)
                    .with_context(|| format!("Invalid node template '{}'", text))
            })
            .transpose()?;

        Ok(GraphOptions {
            excluded_links,
            walk_directions,
            show_directions,
            include: self.include.clone().or(file.include).unwrap_or_default(),
            ignore_closed: self.ignore_closed || file.ignore_closed.unwrap_or(false),
            ignore_epic: self.ignore_epic || file.ignore_epic.unwrap_or(false),
            labels: LabelFormatter::new(labeler, attributes),
        })
    }

    /// Connection and output settings; flags override the config file
    pub fn run_settings(&self, config: &IssueGraphConfig) -> RunSettings {
        let jira = config.jira();
        let render = config.render();

        let output = if self.json {
            OutputMode::Json
        } else if self.local || render.local.unwrap_or(false) {
            OutputMode::Local
        } else {
            OutputMode::Image {
                chart_url: self
                    .chart_url
                    .clone()
                    .or(render.chart_url)
                    .unwrap_or_else(|| DEFAULT_CHART_URL.to_string()),
                image_file: self
                    .image_file
                    .clone()
                    .or(render.image_file.map(PathBuf::from))
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_IMAGE_FILE)),
            }
        };

        RunSettings {
            jira_url: self
                .jira_url
                .clone()
                .or(jira.url)
                .unwrap_or_else(|| DEFAULT_JIRA_URL.to_string()),
            user: self.user.clone().or(jira.user),
            password: self.password.clone(),
            cookie: self.cookie.clone().or(jira.cookie),
            timeout: Duration::from_secs(
                self.timeout
                    .or(jira.timeout_secs)
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            offline: self.offline.clone(),
            output,
        }
    }
}

fn pick_directions(flag: &[Direction], file: Option<Vec<Direction>>) -> BTreeSet<Direction> {
    if !flag.is_empty() {
        return flag.iter().copied().collect();
    }
    match file {
        Some(dirs) if !dirs.is_empty() => dirs.into_iter().collect(),
        _ => Direction::ALL.into_iter().collect(),
    }
}

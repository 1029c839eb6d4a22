//! Issue dependency graph
//!
//! Fetches issues from the tracker (or a JSON export), follows their subtasks,
//! epic members and links, and prints Graphviz DOT text or writes an image
//! rendered by a chart service.

use anyhow::{Context, Result};
use clap::Parser;
use issue_graph::cli::{Cli, OutputMode, RunSettings};
use issue_graph::errors::{self, ActionableError};
use issue_graph::graph::{GraphError, Statement};
use issue_graph::output::{ExitCode, JsonError, JsonOutput, OutputContext};
use issue_graph::render::{to_dot, write_dot, ChartRenderer};
use issue_graph::source::{Auth, IssueSource, JiraClient, JsonFileSource, SourceError};
use issue_graph::template::TemplateError;
use issue_graph::walker::GraphWalker;
use serde::Serialize;
use std::io::{self, BufRead, Write};
use tracing_subscriber::EnvFilter;

/// Helper to determine exit code from an error
fn error_to_exit_code(error: &anyhow::Error) -> ExitCode {
    if let Some(graph_error) = error.downcast_ref::<GraphError>() {
        return match graph_error {
            GraphError::Fetch { source, .. } | GraphError::Query { source, .. } => match source {
                SourceError::NotFound(_) => ExitCode::NotFound,
                SourceError::Unauthorized { .. } => ExitCode::PermissionDenied,
                SourceError::UnsupportedQuery(_) => ExitCode::InvalidArgument,
                SourceError::Transport(_) | SourceError::InvalidResponse(_) => {
                    ExitCode::ExternalError
                }
            },
            GraphError::Template { .. } => ExitCode::InvalidArgument,
        };
    }

    if error.downcast_ref::<TemplateError>().is_some() {
        return ExitCode::InvalidArgument;
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        return match io_error.kind() {
            std::io::ErrorKind::NotFound => ExitCode::NotFound,
            std::io::ErrorKind::PermissionDenied => ExitCode::PermissionDenied,
            _ => ExitCode::ExternalError,
        };
    }

    if error.downcast_ref::<ureq::Error>().is_some() {
        return ExitCode::ExternalError;
    }

    let error_msg = error.to_string().to_lowercase();
    if error_msg.contains("config") || error_msg.contains("invalid") {
        ExitCode::InvalidArgument
    } else if error_msg.contains("not found") || error_msg.contains("failed to read") {
        ExitCode::NotFound
    } else {
        ExitCode::GenericError
    }
}

/// Actionable explanation for the failures users can do something about
fn actionable(error: &anyhow::Error) -> Option<ActionableError> {
    match error.downcast_ref::<GraphError>()? {
        GraphError::Fetch { key, source } => Some(match source {
            SourceError::NotFound(_) => errors::issue_not_found(key),
            SourceError::Unauthorized { .. } => errors::unauthorized("the tracker"),
            other => errors::transport_failed("the tracker", &other.to_string()),
        }),
        GraphError::Query { query, source } => Some(match source {
            SourceError::Unauthorized { .. } => errors::unauthorized("the tracker"),
            other => errors::transport_failed(&format!("query {}", query), &other.to_string()),
        }),
        GraphError::Template { key, source, .. } => {
            Some(errors::template_failed(key, &source.to_string()))
        }
    }
}

fn report_error(error: &anyhow::Error, code: ExitCode, json: bool) {
    if let Some(GraphError::Template { key, fields, .. }) = error.downcast_ref::<GraphError>() {
        tracing::debug!(key = %key, "Raw fields: {}", fields);
    }

    let output = OutputContext::new(false, json);
    if json {
        let message = format!("{:#}", error);
        if let Ok(text) = JsonError::new(code, message).to_json_string() {
            let _ = output.print_data(text);
        }
        return;
    }

    let _ = match actionable(error) {
        Some(actionable) => output.print_error(actionable.to_string().trim_end()),
        None => output.print_error(format!("Error: {:#}", error)),
    };
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_level());
    let json = cli.json;

    let exit_code = match run(cli) {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            let code = error_to_exit_code(&e);
            report_error(&e, code, json);
            code
        }
    };

    if exit_code != ExitCode::Success {
        std::process::exit(exit_code.code());
    }
}

#[derive(Serialize)]
struct GraphReport<'a> {
    seeds: &'a [String],
    statements: &'a [Statement],
    dot: String,
}

fn run(cli: Cli) -> Result<()> {
    let config = cli.load_config()?;
    let options = cli.graph_options(&config)?;
    let settings = cli.run_settings(&config);
    let output = OutputContext::new(cli.quiet, settings.output == OutputMode::Json);

    let source = open_source(&settings)?;
    let walker = GraphWalker::new(source, options);
    let statements = walker.build(cli.issues.as_slice())?;

    match &settings.output {
        OutputMode::Local => match write_dot(&mut io::stdout().lock(), &statements) {
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
            written => written.context("Failed to write graph")?,
        },
        OutputMode::Json => {
            let report = GraphReport {
                seeds: &cli.issues,
                statements: &statements,
                dot: to_dot(&statements),
            };
            output.print_data(JsonOutput::success(report).to_json_string()?)?;
        }
        OutputMode::Image {
            chart_url,
            image_file,
        } => {
            let renderer = ChartRenderer::new(chart_url, settings.timeout);
            let written = renderer.render_to_file(&statements, image_file)?;
            output.print_info(format!("Wrote {}", written.display()))?;
        }
    }

    Ok(())
}

fn open_source(settings: &RunSettings) -> Result<Box<dyn IssueSource>> {
    if let Some(path) = &settings.offline {
        return Ok(Box::new(JsonFileSource::open(path)?));
    }

    let auth = resolve_auth(settings)?;
    tracing::debug!(url = %settings.jira_url, auth = ?auth, "Connecting to tracker");
    Ok(Box::new(JiraClient::new(
        &settings.jira_url,
        auth,
        settings.timeout,
    )))
}

/// Pick cookie or basic auth, prompting for missing credentials
fn resolve_auth(settings: &RunSettings) -> Result<Auth> {
    if let Some(cookie) = &settings.cookie {
        return Ok(Auth::Cookie(cookie.clone()));
    }

    let user = match &settings.user {
        Some(user) => user.clone(),
        None => prompt("Username: ")?,
    };
    let password = match &settings.password {
        Some(password) => password.clone(),
        None => prompt("Password: ")?,
    };

    if user.is_empty() && password.is_empty() {
        return Ok(Auth::Anonymous);
    }
    Ok(Auth::Basic { user, password })
}

fn prompt(label: &str) -> Result<String> {
    let mut stderr = io::stderr();
    write!(stderr, "{}", label)?;
    stderr.flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from terminal")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

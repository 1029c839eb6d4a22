//! Rendering statements as DOT text or as an image from a chart service.
//!
//! This is the only place statements are turned into text.

use crate::graph::Statement;
use anyhow::{Context, Result};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Join statements into a `digraph{...}` body using `separator`
fn digraph(statements: &[Statement], separator: &str) -> String {
    let body = statements
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(separator);
    format!("digraph{{{}}}", body)
}

/// DOT text with one statement per line
///
/// # Example
/// ```
/// use issue_graph::graph::{Edge, Statement};
/// use issue_graph::render::to_dot;
///
/// let dot = to_dot(&[
///     Statement::node("A-1", "A-1 (Root)"),
///     Edge::subtask("A-1", "A-2").into(),
/// ]);
/// assert!(dot.starts_with("digraph{"));
/// assert!(dot.contains("\"A-1\"->\"A-2\""));
/// ```
pub fn to_dot(statements: &[Statement]) -> String {
    digraph(statements, ";\n")
}

/// Write DOT text followed by a newline, then flush
pub fn write_dot<W: Write>(writer: &mut W, statements: &[Statement]) -> io::Result<()> {
    writeln!(writer, "{}", to_dot(statements))?;
    writer.flush()
}

/// Renders graphs through a Graphviz-capable chart HTTP endpoint
pub struct ChartRenderer {
    chart_url: String,
    agent: ureq::Agent,
}

impl ChartRenderer {
    pub fn new(chart_url: &str, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            chart_url: chart_url.to_string(),
            agent,
        }
    }

    /// Query-string graph text as the chart service expects it
    pub fn chart_data(statements: &[Statement]) -> String {
        digraph(statements, ";")
    }

    /// Request an image of the graph and write it to `image_file`
    pub fn render_to_file(&self, statements: &[Statement], image_file: &Path) -> Result<PathBuf> {
        let data = Self::chart_data(statements);
        info!(url = %self.chart_url, "Requesting chart image");
        info!("chl={}", data);

        let mut response = self
            .agent
            .get(&self.chart_url)
            .query("cht", "gv")
            .query("chl", &data)
            .call()
            .with_context(|| format!("Chart request to {} failed", self.chart_url))?;

        let bytes = response
            .body_mut()
            .read_to_vec()
            .context("Failed to read chart image")?;

        info!("Writing to {}", image_file.display());
        fs::write(image_file, bytes)
            .with_context(|| format!("Failed to write image to {}", image_file.display()))?;

        Ok(image_file.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Edge;

    fn statements() -> Vec<Statement> {
        vec![
            Statement::node("A-1", "A-1 (Root)"),
            Edge::link("A-1", "A-2", "blocks").into(),
        ]
    }

    #[test]
    fn test_to_dot_one_statement_per_line() {
        assert_eq!(
            to_dot(&statements()),
            "digraph{\"A-1\" [label=\"A-1 (Root)\"];\n\"A-1\"->\"A-2\"[label=\"blocks\",color=\"red\"]}"
        );
    }

    #[test]
    fn test_empty_graph() {
        assert_eq!(to_dot(&[]), "digraph{}");
    }

    #[test]
    fn test_write_dot_appends_newline() {
        let mut out = Vec::new();
        write_dot(&mut out, &statements()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with("]}\n"));
    }

    #[test]
    fn test_chart_data_uses_single_line() {
        let data = ChartRenderer::chart_data(&statements());
        assert!(!data.contains('\n'));
        assert!(data.contains("(Root)\"];\"A-1\"->"));
    }

    #[test]
    fn test_render_to_unreachable_endpoint_fails() {
        let temp = tempfile::TempDir::new().unwrap();
        let renderer = ChartRenderer::new("http://127.0.0.1:9/chart", Duration::from_secs(2));
        let path = temp.path().join("graph.png");

        assert!(renderer.render_to_file(&statements(), &path).is_err());
        assert!(!path.exists());
    }
}

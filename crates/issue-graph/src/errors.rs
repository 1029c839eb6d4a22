//! Failure messages that tell the user what to try next.
//!
//! The binary turns fetch, authentication and template failures into an
//! `ActionableError` before printing them; other errors are printed as their
//! context chain.

use std::fmt;

/// A hint attached to an error
#[derive(Debug, Clone, PartialEq, Eq)]
enum Hint {
    /// Something that may have caused the failure
    Cause(String),
    /// Something the user can do about it
    Remedy(String),
}

/// An error summary with likely causes and remedies.
///
/// # Example
///
/// ```
/// use issue_graph::errors::ActionableError;
///
/// let error = ActionableError::new("Issue PROJ-1 not found")
///     .with_cause("The issue key may be misspelled")
///     .with_remedy("Open the issue in the browser to check the key");
///
/// assert!(error.to_string().starts_with("Error: Issue PROJ-1 not found\n"));
/// ```
#[derive(Debug, Clone)]
pub struct ActionableError {
    summary: String,
    hints: Vec<Hint>,
}

impl ActionableError {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            hints: Vec::new(),
        }
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.hints.push(Hint::Cause(cause.into()));
        self
    }

    pub fn with_remedy(mut self, remedy: impl Into<String>) -> Self {
        self.hints.push(Hint::Remedy(remedy.into()));
        self
    }

    /// Write one titled list of hints; nothing when `pick` selects none
    fn write_hints(
        &self,
        f: &mut fmt::Formatter<'_>,
        title: &str,
        pick: fn(&Hint) -> Option<&str>,
    ) -> fmt::Result {
        let mut items = self.hints.iter().filter_map(pick).peekable();
        if items.peek().is_none() {
            return Ok(());
        }

        write!(f, "\n{}:\n", title)?;
        for item in items {
            writeln!(f, "  - {}", item)?;
        }
        Ok(())
    }
}

impl Hint {
    fn cause(&self) -> Option<&str> {
        match self {
            Hint::Cause(text) => Some(text.as_str()),
            Hint::Remedy(_) => None,
        }
    }

    fn remedy(&self) -> Option<&str> {
        match self {
            Hint::Remedy(text) => Some(text.as_str()),
            Hint::Cause(_) => None,
        }
    }
}

impl fmt::Display for ActionableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Error: {}", self.summary)?;
        self.write_hints(f, "Possible causes", Hint::cause)?;
        self.write_hints(f, "To fix", Hint::remedy)
    }
}

impl std::error::Error for ActionableError {}

/// Issue key that the tracker does not know about.
pub fn issue_not_found(key: &str) -> ActionableError {
    ActionableError::new(format!("Issue {} not found", key))
        .with_cause("The issue key may be misspelled")
        .with_cause("The issue may have been deleted or moved to another project")
        .with_cause("The account may not be allowed to browse this project")
        .with_remedy("Check the key in the tracker's web UI")
        .with_remedy("Pass the correct tracker base URL with --jira")
}

/// Credentials rejected by the tracker.
pub fn unauthorized(base_url: &str) -> ActionableError {
    ActionableError::new(format!("Authentication to {} failed", base_url))
        .with_cause("The username or password is wrong")
        .with_cause("The session cookie has expired")
        .with_remedy("Retry with --user and --password")
        .with_remedy("Log in with a browser and pass a fresh JSESSIONID with --cookie")
}

/// Network or protocol failure talking to an external service.
pub fn transport_failed(target: &str, detail: &str) -> ActionableError {
    ActionableError::new(format!("Request to {} failed", target))
        .with_cause(detail.trim().to_string())
        .with_cause("The service may be unreachable from this network")
        .with_remedy("Check the URL and your network connection")
        .with_remedy("Raise --timeout if the service is slow")
        .with_remedy("Use --local to print the graph instead of rendering an image")
}

/// Label or node template that could not be evaluated for an issue.
pub fn template_failed(key: &str, detail: &str) -> ActionableError {
    ActionableError::new(format!("Template evaluation failed for issue {}", key))
        .with_cause(detail.trim().to_string())
        .with_remedy("Mark optional paths with a trailing '?', e.g. {assignee.displayName?}")
        .with_remedy("Run with -v to print the issue's raw fields")
}

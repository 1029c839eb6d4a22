//! Structured output formatting for the CLI.
//!
//! Provides quiet-aware printing, the JSON envelope used by `--json`, and the
//! process exit codes.

use serde::Serialize;
use std::fmt::Display;
use std::io::{self, Write};

/// Version of the JSON output format
const OUTPUT_VERSION: &str = "0.1.0";

// ============================================================================
// Output Context for Quiet Mode
// ============================================================================

/// Context for controlling output verbosity
pub struct OutputContext {
    quiet: bool,
    json: bool,
}

impl OutputContext {
    /// Create a new output context
    pub fn new(quiet: bool, json: bool) -> Self {
        Self { quiet, json }
    }

    /// Print essential output (always shown)
    pub fn print_data(&self, msg: impl Display) -> io::Result<()> {
        writeln_safe(&format!("{}", msg))
    }

    /// Print informational message (suppressed by --quiet or --json)
    pub fn print_info(&self, msg: impl Display) -> io::Result<()> {
        if !self.quiet && !self.json {
            writeln_safe(&format!("{}", msg))
        } else {
            Ok(())
        }
    }

    /// Print error (always shown to stderr)
    pub fn print_error(&self, msg: impl Display) -> io::Result<()> {
        writeln_safe_stderr(&format!("{}", msg))
    }
}

/// Safe println that handles broken pipes gracefully
fn writeln_safe(msg: &str) -> io::Result<()> {
    match writeln!(io::stdout(), "{}", msg) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            // Silently exit on broken pipe (expected when piping to head, etc.)
            std::process::exit(0);
        }
        Err(e) => Err(e),
    }
}

/// Safe eprintln that handles broken pipes gracefully
fn writeln_safe_stderr(msg: &str) -> io::Result<()> {
    match writeln!(io::stderr(), "{}", msg) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            std::process::exit(0);
        }
        Err(e) => Err(e),
    }
}

// ============================================================================
// JSON Output Types
// ============================================================================

/// Wrapper for successful command output
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub version: &'static str,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
            version: OUTPUT_VERSION,
        }
    }

    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Error envelope printed on failure in `--json` mode
#[derive(Debug, Serialize)]
pub struct JsonError {
    pub success: bool,
    pub error: JsonErrorDetail,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct JsonErrorDetail {
    pub code: i32,
    pub message: String,
}

impl JsonError {
    pub fn new(code: ExitCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: JsonErrorDetail {
                code: code.code(),
                message: message.into(),
            },
            version: OUTPUT_VERSION,
        }
    }

    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

// ============================================================================
// Exit Codes
// ============================================================================

/// Process exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Command succeeded (0)
    Success = 0,

    /// Generic error (1)
    GenericError = 1,

    /// Invalid arguments, configuration or template (2)
    InvalidArgument = 2,

    /// Issue not found (3)
    NotFound = 3,

    /// Authentication rejected (5)
    PermissionDenied = 5,

    /// Tracker, chart service or file system failed (10)
    ExternalError = 10,
}

impl ExitCode {
    /// Convert exit code to i32 for `std::process::exit`
    pub fn code(self) -> i32 {
        self as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success.code(), 0);
        assert_eq!(ExitCode::InvalidArgument.code(), 2);
        assert_eq!(ExitCode::NotFound.code(), 3);
        assert_eq!(ExitCode::PermissionDenied.code(), 5);
        assert_eq!(ExitCode::ExternalError.code(), 10);
    }

    #[test]
    fn test_json_output_envelope() {
        let output = JsonOutput::success(vec!["a", "b"]);
        let value: serde_json::Value =
            serde_json::from_str(&output.to_json_string().unwrap()).unwrap();

        assert_eq!(value["success"], true);
        assert_eq!(value["data"][1], "b");
        assert_eq!(value["version"], OUTPUT_VERSION);
    }

    #[test]
    fn test_json_error_envelope() {
        let error = JsonError::new(ExitCode::NotFound, "Issue not found: A-1");
        let value: serde_json::Value =
            serde_json::from_str(&error.to_json_string().unwrap()).unwrap();

        assert_eq!(value["success"], false);
        assert_eq!(value["error"]["code"], 3);
        assert_eq!(value["error"]["message"], "Issue not found: A-1");
    }
}

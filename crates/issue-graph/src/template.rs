//! Field templates for node labels and node attributes.
//!
//! A template is literal text with `{path}` placeholders that are looked up in
//! an issue's raw field object:
//!
//! - `{issue_key}` is the issue key
//! - `{summary}`, `{status.name}`, `{assignee.displayName}` walk nested objects
//! - `{labels.0}` indexes into arrays
//! - `{assignee.displayName?}` renders as empty text when the path is missing
//! - `{{` and `}}` produce literal braces
//!
//! Strings render verbatim, arrays as comma separated values and objects as
//! compact JSON.

use serde_json::Value;
use thiserror::Error;

/// Variable name bound to the issue key.
pub const ISSUE_KEY_VAR: &str = "issue_key";

/// Errors raised while parsing or evaluating a template
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Unterminated placeholder starting at position {0}")]
    Unterminated(usize),
    #[error("Empty placeholder at position {0}")]
    EmptyPlaceholder(usize),
    #[error("Unmatched '}}' at position {0}")]
    UnmatchedClose(usize),
    #[error("Invalid path '{0}'")]
    InvalidPath(String),
    #[error("Field '{0}' is missing")]
    MissingField(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathStep {
    Field(String),
    Index(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Placeholder {
    raw: String,
    steps: Vec<PathStep>,
    optional: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(Placeholder),
}

/// A parsed field template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parse template text, rejecting malformed placeholders up front
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let segments = TemplateParser::new(source).parse()?;
        Ok(Self { segments })
    }

    /// Evaluate the template against an issue's fields
    pub fn render(&self, fields: &Value, issue_key: &str) -> Result<String, TemplateError> {
        let mut out = String::new();

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(placeholder) => {
                    match resolve(&placeholder.steps, fields, issue_key) {
                        Some(value) => out.push_str(&render_value(&value)),
                        None if placeholder.optional => {}
                        None => return Err(TemplateError::MissingField(placeholder.raw.clone())),
                    }
                }
            }
        }

        Ok(out)
    }
}

fn resolve(steps: &[PathStep], fields: &Value, issue_key: &str) -> Option<Value> {
    if let [PathStep::Field(name)] = steps {
        if name == ISSUE_KEY_VAR {
            return Some(Value::String(issue_key.to_string()));
        }
    }

    let mut current = fields;
    for step in steps {
        current = match step {
            PathStep::Field(name) => current.get(name.as_str())?,
            PathStep::Index(i) => current.get(*i)?,
        };
    }

    if current.is_null() {
        None
    } else {
        Some(current.clone())
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .filter(|item| !item.is_null())
            .map(render_value)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => value.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Character-level scanner over template text
struct TemplateParser<'a> {
    input: &'a str,
    position: usize,
}

impl<'a> TemplateParser<'a> {
    fn new(input: &'a str) -> Self {
        TemplateParser { input, position: 0 }
    }

    fn parse(mut self) -> Result<Vec<Segment>, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();

        while let Some(ch) = self.current_char() {
            match ch {
                '{' if self.peek_char() == Some('{') => {
                    literal.push('{');
                    self.advance();
                    self.advance();
                }
                '}' if self.peek_char() == Some('}') => {
                    literal.push('}');
                    self.advance();
                    self.advance();
                }
                '{' => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder(self.read_placeholder()?));
                }
                '}' => return Err(TemplateError::UnmatchedClose(self.position)),
                _ => {
                    literal.push(ch);
                    self.advance();
                }
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(segments)
    }

    fn read_placeholder(&mut self) -> Result<Placeholder, TemplateError> {
        let open = self.position;
        self.advance();
        let start = self.position;

        while let Some(ch) = self.current_char() {
            if ch == '}' {
                let raw = self.input[start..self.position].trim().to_string();
                self.advance();
                if raw.is_empty() {
                    return Err(TemplateError::EmptyPlaceholder(open));
                }
                return parse_placeholder(raw);
            }
            if ch == '{' {
                return Err(TemplateError::Unterminated(open));
            }
            self.advance();
        }

        Err(TemplateError::Unterminated(open))
    }

    fn current_char(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn peek_char(&self) -> Option<char> {
        let mut chars = self.input[self.position..].chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            self.position += ch.len_utf8();
        }
    }
}

fn parse_placeholder(raw: String) -> Result<Placeholder, TemplateError> {
    let (path, optional) = match raw.strip_suffix('?') {
        Some(path) => (path.trim_end(), true),
        None => (raw.as_str(), false),
    };

    let steps = path
        .split('.')
        .map(|part| {
            let part = part.trim();
            if part.is_empty() {
                Err(TemplateError::InvalidPath(raw.clone()))
            } else if let Ok(index) = part.parse::<usize>() {
                Ok(PathStep::Index(index))
            } else {
                Ok(PathStep::Field(part.to_string()))
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Placeholder {
        raw: path.to_string(),
        steps,
        optional,
    })
}

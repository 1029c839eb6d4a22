//! Blocking REST client for the tracker.
//!
//! Only two endpoints are used: `/issue/{key}` and `/search`. Both request the
//! same field list so query results can be read like fetched issues.

use super::{IssueSource, SourceError, ISSUE_FIELDS};
use crate::domain::IssueRecord;
use base64::Engine;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

const API_PATH: &str = "/rest/api/latest";

/// Issues requested per `/search` page.
const SEARCH_PAGE_SIZE: usize = 50;

/// How requests authenticate against the tracker
#[derive(Clone)]
pub enum Auth {
    /// HTTP Basic authentication
    Basic { user: String, password: String },
    /// Existing browser session (`JSESSIONID` cookie value)
    Cookie(String),
    /// No credentials (public trackers)
    Anonymous,
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::Basic { user, .. } => write!(f, "Basic({}:***)", user),
            Auth::Cookie(_) => write!(f, "Cookie(***)"),
            Auth::Anonymous => write!(f, "Anonymous"),
        }
    }
}

impl Auth {
    fn header(&self) -> Option<(&'static str, String)> {
        match self {
            Auth::Basic { user, password } => {
                let token = base64::engine::general_purpose::STANDARD
                    .encode(format!("{}:{}", user, password));
                Some(("Authorization", format!("Basic {}", token)))
            }
            Auth::Cookie(session) => Some(("Cookie", format!("JSESSIONID={}", session))),
            Auth::Anonymous => None,
        }
    }
}

/// One page of a `/search` reply
#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    total: Option<usize>,
    #[serde(default)]
    issues: Vec<IssueRecord>,
}

/// Tracker REST client
pub struct JiraClient {
    api_url: String,
    auth: Auth,
    agent: ureq::Agent,
}

impl JiraClient {
    pub fn new(base_url: &str, auth: Auth, timeout: Duration) -> Self {
        let base_url = base_url.trim_end_matches('/');
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();

        Self {
            api_url: format!("{}{}", base_url, API_PATH),
            auth,
            agent,
        }
    }

    fn get(&self, uri: &str, params: &[(&str, &str)]) -> Result<String, ureq::Error> {
        let url = format!("{}{}", self.api_url, uri);
        let mut request = self
            .agent
            .get(&url)
            .header("Content-Type", "application/json");

        for (name, value) in params {
            request = request.query(*name, *value);
        }
        if let Some((name, value)) = self.auth.header() {
            request = request.header(name, &value);
        }

        let mut response = request.call()?;
        response.body_mut().read_to_string()
    }
}

fn map_error(error: ureq::Error, key: Option<&str>) -> SourceError {
    match error {
        ureq::Error::StatusCode(404) => match key {
            Some(key) => SourceError::NotFound(key.to_string()),
            None => SourceError::Transport("HTTP 404".to_string()),
        },
        ureq::Error::StatusCode(status @ (401 | 403)) => SourceError::Unauthorized { status },
        ureq::Error::StatusCode(status) => SourceError::Transport(format!("HTTP {}", status)),
        other => SourceError::Transport(other.to_string()),
    }
}

impl IssueSource for JiraClient {
    fn fetch_issue(&self, key: &str) -> Result<IssueRecord, SourceError> {
        info!("Fetching {}", key);
        let fields = ISSUE_FIELDS.join(",");
        let body = self
            .get(&format!("/issue/{}", key), &[("fields", fields.as_str())])
            .map_err(|e| map_error(e, Some(key)))?;

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| SourceError::InvalidResponse(e.to_string()))?;
        IssueRecord::from_json(value).map_err(|e| SourceError::InvalidResponse(e.to_string()))
    }

    /// Run a search, following `startAt` until `total` issues are read.
    ///
    /// An empty page ends the loop even when the reported total is higher.
    fn query(&self, expression: &str) -> Result<Vec<IssueRecord>, SourceError> {
        info!("Querying {}", expression);
        let fields = ISSUE_FIELDS.join(",");
        let page_size = SEARCH_PAGE_SIZE.to_string();
        let mut issues = Vec::new();

        loop {
            let start_at = issues.len().to_string();
            let body = self
                .get(
                    "/search",
                    &[
                        ("jql", expression),
                        ("fields", fields.as_str()),
                        ("startAt", start_at.as_str()),
                        ("maxResults", page_size.as_str()),
                    ],
                )
                .map_err(|e| map_error(e, None))?;

            let page: SearchResponse = serde_json::from_str(&body)
                .map_err(|e| SourceError::InvalidResponse(e.to_string()))?;
            let received = page.issues.len();
            issues.extend(page.issues);

            let total = page.total.unwrap_or(issues.len());
            if received == 0 || issues.len() >= total {
                break;
            }
            debug!(read = issues.len(), total, "Requesting next search page");
        }

        Ok(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn test_basic_auth_header() {
        let auth = Auth::Basic {
            user: "alice".to_string(),
            password: "secret".to_string(),
        };
        assert_eq!(
            auth.header(),
            Some(("Authorization", "Basic YWxpY2U6c2VjcmV0".to_string()))
        );
    }

    #[test]
    fn test_cookie_auth_header() {
        let auth = Auth::Cookie("ABCDEF012345".to_string());
        assert_eq!(
            auth.header(),
            Some(("Cookie", "JSESSIONID=ABCDEF012345".to_string()))
        );
        assert_eq!(Auth::Anonymous.header(), None);
    }

    #[test]
    fn test_debug_hides_secrets() {
        let auth = Auth::Basic {
            user: "alice".to_string(),
            password: "secret".to_string(),
        };
        assert!(!format!("{:?}", auth).contains("secret"));
        assert!(!format!("{:?}", Auth::Cookie("tok".into())).contains("tok"));
    }

    #[test]
    fn test_status_codes_map_to_source_errors() {
        assert_eq!(
            map_error(ureq::Error::StatusCode(404), Some("A-1")),
            SourceError::NotFound("A-1".to_string())
        );
        assert_eq!(
            map_error(ureq::Error::StatusCode(401), Some("A-1")),
            SourceError::Unauthorized { status: 401 }
        );
        assert_eq!(
            map_error(ureq::Error::StatusCode(500), None),
            SourceError::Transport("HTTP 500".to_string())
        );
    }

    #[test]
    fn test_client_normalizes_base_url() {
        let client = JiraClient::new(
            "https://jira.example.com/",
            Auth::Anonymous,
            Duration::from_secs(1),
        );
        assert_eq!(client.api_url, "https://jira.example.com/rest/api/latest");
    }

    /// Serve `requests` connections, answering each with `respond(request_line)`
    fn serve(
        requests: usize,
        respond: fn(&str) -> String,
    ) -> (String, thread::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let handle = thread::spawn(move || {
            let mut seen = Vec::new();
            for _ in 0..requests {
                let (mut stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());

                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                loop {
                    let mut header = String::new();
                    reader.read_line(&mut header).unwrap();
                    if header == "\r\n" || header.is_empty() {
                        break;
                    }
                }

                let body = respond(&request_line);
                write!(
                    stream,
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                )
                .unwrap();
                seen.push(request_line);
            }
            seen
        });

        (url, handle)
    }

    fn keys(issues: &[IssueRecord]) -> Vec<&str> {
        issues.iter().map(|issue| issue.key.as_str()).collect()
    }

    #[test]
    fn test_query_follows_pages_until_total() {
        let (url, server) = serve(2, |request| {
            let page = if request.contains("startAt=1") {
                r#"{"startAt": 1, "maxResults": 1, "total": 2, "issues": [{"key": "E-3", "fields": {}}]}"#
            } else {
                r#"{"startAt": 0, "maxResults": 1, "total": 2, "issues": [{"key": "E-2", "fields": {}}]}"#
            };
            page.to_string()
        });
        let client = JiraClient::new(&url, Auth::Anonymous, Duration::from_secs(5));

        let issues = client.query(r#""Epic Link" = "E-1""#).unwrap();

        assert_eq!(keys(&issues), vec!["E-2", "E-3"]);
        let requests = server.join().unwrap();
        assert!(requests[0].contains("/rest/api/latest/search?"));
        assert!(requests[0].contains("startAt=0"));
        assert!(requests[1].contains("startAt=1"));
    }

    #[test]
    fn test_query_stops_on_empty_page() {
        let (url, server) = serve(2, |request| {
            let page = if request.contains("startAt=0") {
                r#"{"total": 5, "issues": [{"key": "E-2", "fields": {}}]}"#
            } else {
                r#"{"total": 5, "issues": []}"#
            };
            page.to_string()
        });
        let client = JiraClient::new(&url, Auth::Anonymous, Duration::from_secs(5));

        let issues = client.query(r#""Epic Link" = "E-1""#).unwrap();

        assert_eq!(keys(&issues), vec!["E-2"]);
        assert_eq!(server.join().unwrap().len(), 2);
    }

    #[test]
    fn test_single_page_query_makes_one_request() {
        let (url, server) = serve(1, |_| {
            r#"{"total": 1, "issues": [{"key": "E-2", "fields": {}}]}"#.to_string()
        });
        let client = JiraClient::new(&url, Auth::Anonymous, Duration::from_secs(5));

        assert_eq!(keys(&client.query("x = y").unwrap()), vec!["E-2"]);
        assert_eq!(server.join().unwrap().len(), 1);
    }
}

//! Issue dependency graph library
//!
//! Walks an issue tracker's subtask, epic and link relations from one or more
//! seed issues and produces a deduplicated list of graph statements that can
//! be rendered as Graphviz DOT text or as an image.
//!
//! ```
//! use issue_graph::config::GraphOptions;
//! use issue_graph::render::to_dot;
//! use issue_graph::source::{InMemorySource, IssueBuilder};
//! use issue_graph::walker::GraphWalker;
//!
//! let source = InMemorySource::with_issues([
//!     IssueBuilder::new("PROJ-1", "Root").link_out("blocks", "PROJ-2", "Open").build(),
//!     IssueBuilder::new("PROJ-2", "Blocked").build(),
//! ]);
//! let walker = GraphWalker::new(&source, GraphOptions::default());
//! let statements = walker.build(&["PROJ-1"]).unwrap();
//!
//! assert!(to_dot(&statements).contains("color=\"red\""));
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod graph;
pub mod label;
pub mod link;
pub mod output;
pub mod render;
pub mod source;
pub mod template;
pub mod walker;

// Re-export commonly used types
pub use config::GraphOptions;
pub use domain::{Direction, IssueRecord, LinkRelation};
pub use graph::{Edge, EdgeKind, GraphError, Statement};
pub use output::ExitCode;
pub use source::{IssueSource, SourceError};
pub use walker::{GraphWalker, VisitedSet};

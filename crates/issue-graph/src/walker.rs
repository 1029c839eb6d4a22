//! Graph walker: builds the statement list for one or more seed issues.
//!
//! The relation graph between issues is cyclic (links are visible from both
//! ends), so every key goes through the shared `VisitedSet` before it is
//! expanded. Traversal is a depth-first pre-order driven by an explicit stack:
//! a parent's statements always precede those of its children, and children
//! are visited in discovery order (epic members, then subtasks, then links).

use crate::config::GraphOptions;
use crate::domain::is_closed_status;
use crate::graph::{dedup_statements, Edge, GraphError, Statement};
use crate::link::classify_link;
use crate::source::{epic_members_query, IssueSource};
use std::collections::HashSet;
use tracing::{debug, info};

/// Keys already expanded during one run; only ever grows
#[derive(Debug, Default, Clone)]
pub struct VisitedSet {
    keys: HashSet<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `key` visited; returns `false` if it already was
    pub fn insert(&mut self, key: &str) -> bool {
        self.keys.insert(key.to_string())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Walks an issue source and accumulates graph statements
pub struct GraphWalker<S: IssueSource> {
    source: S,
    options: GraphOptions,
}

impl<S: IssueSource> GraphWalker<S> {
    pub fn new(source: S, options: GraphOptions) -> Self {
        Self { source, options }
    }

    /// Walk every seed with one shared visited set, then deduplicate.
    ///
    /// A key reachable from several seeds is expanded once, under the first
    /// seed that reaches it.
    pub fn build<K: AsRef<str>>(&self, seeds: &[K]) -> Result<Vec<Statement>, GraphError> {
        let mut visited = VisitedSet::new();
        let mut statements = Vec::new();

        for seed in seeds {
            self.walk(seed.as_ref(), &mut visited, &mut statements)?;
        }

        info!(
            issues = visited.len(),
            statements = statements.len(),
            "Graph walk complete"
        );
        Ok(dedup_statements(statements))
    }

    /// Walk everything reachable from `seed` that is not yet visited,
    /// appending statements to `out`.
    pub fn walk(
        &self,
        seed: &str,
        visited: &mut VisitedSet,
        out: &mut Vec<Statement>,
    ) -> Result<(), GraphError> {
        let mut stack = vec![seed.to_string()];

        while let Some(key) = stack.pop() {
            if visited.contains(&key) {
                continue;
            }
            let frontier = self.expand(&key, visited, out)?;
            stack.extend(frontier.into_iter().rev());
        }

        Ok(())
    }

    /// Fetch one issue, emit its statements and return its frontier
    fn expand(
        &self,
        key: &str,
        visited: &mut VisitedSet,
        out: &mut Vec<Statement>,
    ) -> Result<Vec<String>, GraphError> {
        visited.insert(key);
        let issue = self
            .source
            .fetch_issue(key)
            .map_err(|source| GraphError::Fetch {
                key: key.to_string(),
                source,
            })?;

        if self.options.ignore_closed {
            debug!(key, status = issue.status(), "Verifying issue is not closed");
            if is_closed_status(issue.status()) {
                debug!(key, "Skipping closed issue and its children");
                return Ok(Vec::new());
            }
        }

        out.push(Statement::node(key, self.options.labels.label(key, &issue)?));
        if let Some(attributes) = self.options.labels.attributes(key, &issue)? {
            out.push(Statement::node_attributes(key, attributes));
        }

        let mut frontier = Vec::new();

        if issue.is_epic() && !self.options.ignore_epic {
            let query = epic_members_query(key);
            let members = self
                .source
                .query(&query)
                .map_err(|source| GraphError::Query {
                    query: query.clone(),
                    source,
                })?;
            for member in members {
                debug!("{} => references epic => {}", member.key, key);
                out.push(Edge::epic(key, member.key.clone()).into());
                frontier.push(member.key);
            }
        }

        for subtask in issue.subtasks() {
            debug!("{} => has subtask => {}", key, subtask.key);
            out.push(Edge::subtask(key, subtask.key.clone()).into());
            frontier.push(subtask.key.clone());
        }

        for link in issue.links() {
            let decision = classify_link(key, link, &self.options);
            if let Some(edge) = decision.edge() {
                out.push(edge.clone().into());
            }
            if let Some(target) = decision.target() {
                debug!("Appending {}", target);
                frontier.push(target.to_string());
            }
        }

        Ok(frontier)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::source::{InMemorySource, IssueBuilder};
    use proptest::prelude::*;

    const ISSUES: usize = 8;

    fn key(i: usize) -> String {
        format!("K-{}", i)
    }

    fn source_from(links: &[(usize, usize)], subtasks: &[(usize, usize)]) -> InMemorySource {
        let mut builders: Vec<IssueBuilder> = (0..ISSUES)
            .map(|i| IssueBuilder::new(&key(i), "Generated"))
            .collect();
        for &(from, to) in links {
            builders[from] = builders[from].clone().link_out("relates to", &key(to), "Open");
        }
        for &(parent, child) in subtasks {
            builders[parent] = builders[parent].clone().subtask(&key(child));
        }
        InMemorySource::with_issues(builders.into_iter().map(IssueBuilder::build))
    }

    fn pairs() -> impl Strategy<Value = Vec<(usize, usize)>> {
        prop::collection::vec((0..ISSUES, 0..ISSUES), 0..16)
    }

    proptest! {
        /// Property: any graph, cycles included, fetches each issue at most once
        #[test]
        fn prop_each_issue_fetched_at_most_once(
            links in pairs(),
            subtasks in pairs(),
            seeds in prop::collection::vec(0..ISSUES, 1..4),
        ) {
            let source = source_from(&links, &subtasks);
            let walker = GraphWalker::new(&source, GraphOptions::default());
            let seed_keys: Vec<String> = seeds.iter().map(|&i| key(i)).collect();

            let statements = walker.build(seed_keys.as_slice()).unwrap();

            let nodes = statements
                .iter()
                .filter(|s| matches!(s, Statement::Node { .. }))
                .count();
            for i in 0..ISSUES {
                prop_assert!(source.fetch_count(&key(i)) <= 1);
            }
            prop_assert_eq!(nodes, source.total_fetches());
        }
    }
}

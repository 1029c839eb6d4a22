//! Link classification.
//!
//! Decides for one link relation whether its target joins the traversal
//! frontier and whether it is drawn as an edge. Excluded link types and
//! hidden directions still keep their targets in the frontier so the graph
//! stays connected through them.

use crate::config::GraphOptions;
use crate::domain::{is_closed_status, Direction, LinkRelation};
use crate::graph::Edge;
use tracing::debug;

/// Why a relation was dropped entirely
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Neither an inward nor an outward issue is present
    Malformed,
    /// The direction is not walked
    Direction,
    /// The target is closed and closed issues are ignored
    ClosedTarget,
    /// The target key does not contain the include filter
    NotIncluded,
}

/// Outcome of classifying one link relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkDecision {
    Skip(SkipReason),
    /// Walk into `target`; draw `edge` if present
    Follow { target: String, edge: Option<Edge> },
}

impl LinkDecision {
    pub fn target(&self) -> Option<&str> {
        match self {
            LinkDecision::Follow { target, .. } => Some(target),
            LinkDecision::Skip(_) => None,
        }
    }

    pub fn edge(&self) -> Option<&Edge> {
        match self {
            LinkDecision::Follow { edge, .. } => edge.as_ref(),
            LinkDecision::Skip(_) => None,
        }
    }
}

/// Classify a link owned by `owner` under the given options
pub fn classify_link(owner: &str, link: &LinkRelation, options: &GraphOptions) -> LinkDecision {
    let Some(direction) = link.direction() else {
        debug!(owner, "Skipping malformed link without inward or outward issue");
        return LinkDecision::Skip(SkipReason::Malformed);
    };

    if !options.walk_directions.contains(&direction) {
        debug!(owner, %direction, "Skipping link in unwalked direction");
        return LinkDecision::Skip(SkipReason::Direction);
    }

    let Some(target) = link.target(direction) else {
        return LinkDecision::Skip(SkipReason::Malformed);
    };

    if options.ignore_closed {
        debug!(owner, linked = %target.key, status = target.status(), "Verifying linked issue is not closed");
        if is_closed_status(target.status()) {
            return LinkDecision::Skip(SkipReason::ClosedTarget);
        }
    }

    if !target.key.contains(options.include.as_str()) {
        debug!(owner, linked = %target.key, include = %options.include, "Skipping link outside include filter");
        return LinkDecision::Skip(SkipReason::NotIncluded);
    }

    let link_type = link.link_type.name_for(direction);

    if options.excluded_links.contains(link_type) {
        debug!(owner, linked = %target.key, link_type, "Following excluded link without drawing it");
        return LinkDecision::Follow {
            target: target.key.clone(),
            edge: None,
        };
    }

    match direction {
        Direction::Outward => debug!("{} => {} => {}", owner, link_type, target.key),
        Direction::Inward => debug!("{} <= {} <= {}", owner, link_type, target.key),
    }

    let edge = if options.show_directions.contains(&direction) {
        Some(Edge::link(owner, target.key.clone(), link_type))
    } else {
        debug!(owner, %direction, "Direction not shown, following without edge");
        None
    };

    LinkDecision::Follow {
        target: target.key.clone(),
        edge,
    }
}

//! Core domain types for issue records fetched from the tracker.
//!
//! Records mirror the tracker's REST representation closely enough to be
//! deserialized directly from its JSON replies. The raw `fields` object is kept
//! alongside the typed view so label templates can address any field.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Status name that marks an issue as closed.
pub const CLOSED_STATUS: &str = "Closed";

/// Issue type name of grouping parents whose children are found by query.
pub const EPIC_TYPE: &str = "Epic";

/// Side of a link relation, as seen from the issue that owns the link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// The other issue points at the owner (e.g. "is blocked by")
    Inward,
    /// The owner points at the other issue (e.g. "blocks")
    Outward,
}

impl Direction {
    /// Both directions, in the order the tracker lists them
    pub const ALL: [Direction; 2] = [Direction::Inward, Direction::Outward];
}

/// Error returned for an unknown direction name
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid direction '{0}': expected 'inward' or 'outward'")]
pub struct ParseDirectionError(pub String);

impl FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "inward" => Ok(Direction::Inward),
            "outward" => Ok(Direction::Outward),
            _ => Err(ParseDirectionError(s.to_string())),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Inward => write!(f, "inward"),
            Direction::Outward => write!(f, "outward"),
        }
    }
}

/// Named value such as `status` or `issuetype`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Named {
    #[serde(default)]
    pub name: String,
}

/// Bare reference to another issue (subtasks, epic query results)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRef {
    pub key: String,
}

/// Fields carried on the far end of a link relation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedFields {
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: Named,
}

/// The issue on the other side of a link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedIssue {
    pub key: String,
    #[serde(default)]
    pub fields: LinkedFields,
}

impl LinkedIssue {
    pub fn status(&self) -> &str {
        &self.fields.status.name
    }
}

/// Per-direction names of a link type ("blocks" / "is blocked by")
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkType {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub inward: String,
    #[serde(default)]
    pub outward: String,
}

impl LinkType {
    /// Name of the link type as read in the given direction
    pub fn name_for(&self, direction: Direction) -> &str {
        match direction {
            Direction::Inward => &self.inward,
            Direction::Outward => &self.outward,
        }
    }
}

/// A typed link between the owning issue and one other issue.
///
/// Exactly one of `outward_issue` / `inward_issue` is expected to be present;
/// a relation with neither is malformed and gets ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRelation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outward_issue: Option<LinkedIssue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inward_issue: Option<LinkedIssue>,
    #[serde(rename = "type", default)]
    pub link_type: LinkType,
}

impl LinkRelation {
    /// Direction of the relation, `None` if malformed.
    ///
    /// The outward side wins when both are present.
    pub fn direction(&self) -> Option<Direction> {
        if self.outward_issue.is_some() {
            Some(Direction::Outward)
        } else if self.inward_issue.is_some() {
            Some(Direction::Inward)
        } else {
            None
        }
    }

    /// The linked issue on the given side
    pub fn target(&self, direction: Direction) -> Option<&LinkedIssue> {
        match direction {
            Direction::Inward => self.inward_issue.as_ref(),
            Direction::Outward => self.outward_issue.as_ref(),
        }
    }
}

/// Typed view over the fields the graph walker reads
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueFields {
    #[serde(default, deserialize_with = "null_as_default")]
    pub summary: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: Named,
    #[serde(default, deserialize_with = "null_as_default")]
    pub issuetype: Named,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subtasks: Vec<IssueRef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub issuelinks: Vec<LinkRelation>,
}

/// An issue as returned by the tracker.
///
/// Immutable once fetched. `raw_fields` is the untouched `fields` object.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueRecord {
    pub key: String,
    pub fields: IssueFields,
    pub raw_fields: Value,
}

impl IssueRecord {
    /// Build a record from the tracker's JSON shape: `{"key": .., "fields": {..}}`
    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        #[derive(Deserialize)]
        struct Wire {
            key: String,
            #[serde(default)]
            fields: Value,
        }

        let wire: Wire = serde_json::from_value(value)?;
        let raw_fields = if wire.fields.is_null() {
            Value::Object(Default::default())
        } else {
            wire.fields
        };
        let fields: IssueFields = serde_json::from_value(raw_fields.clone())?;

        Ok(Self {
            key: wire.key,
            fields,
            raw_fields,
        })
    }

    pub fn summary(&self) -> &str {
        &self.fields.summary
    }

    pub fn status(&self) -> &str {
        &self.fields.status.name
    }

    pub fn issue_type(&self) -> &str {
        &self.fields.issuetype.name
    }

    pub fn is_epic(&self) -> bool {
        self.issue_type() == EPIC_TYPE
    }

    pub fn subtasks(&self) -> &[IssueRef] {
        &self.fields.subtasks
    }

    pub fn links(&self) -> &[LinkRelation] {
        &self.fields.issuelinks
    }
}

impl<'de> Deserialize<'de> for IssueRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        IssueRecord::from_json(value).map_err(serde::de::Error::custom)
    }
}

impl Serialize for IssueRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serde_json::json!({ "key": self.key, "fields": self.raw_fields }).serialize(serializer)
    }
}

/// `true` when a status name marks the issue closed (exact match)
pub fn is_closed_status(status: &str) -> bool {
    status == CLOSED_STATUS
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "key": "PROJ-1",
            "fields": {
                "summary": "Ship the thing",
                "status": {"name": "Open"},
                "issuetype": {"name": "Story"},
                "assignee": {"displayName": "Dana"},
                "labels": ["backend"],
                "subtasks": [{"key": "PROJ-2"}],
                "issuelinks": [
                    {
                        "type": {"name": "Blocks", "inward": "is blocked by", "outward": "blocks"},
                        "outwardIssue": {"key": "PROJ-3", "fields": {"status": {"name": "Closed"}}}
                    },
                    {
                        "type": {"name": "Relates", "inward": "relates to", "outward": "relates to"},
                        "inwardIssue": {"key": "PROJ-4", "fields": {"status": {"name": "Open"}}}
                    },
                    {
                        "type": {"name": "Broken", "inward": "x", "outward": "y"}
                    }
                ]
            }
        })
    }

    #[test]
    fn test_issue_record_from_tracker_json() {
        let issue = IssueRecord::from_json(sample()).unwrap();

        assert_eq!(issue.key, "PROJ-1");
        assert_eq!(issue.summary(), "Ship the thing");
        assert_eq!(issue.status(), "Open");
        assert_eq!(issue.issue_type(), "Story");
        assert!(!issue.is_epic());
        assert_eq!(issue.subtasks(), &[IssueRef { key: "PROJ-2".into() }]);
        assert_eq!(issue.links().len(), 3);
        assert_eq!(issue.raw_fields["assignee"]["displayName"], "Dana");
    }

    #[test]
    fn test_link_direction_and_target() {
        let issue = IssueRecord::from_json(sample()).unwrap();
        let links = issue.links();

        assert_eq!(links[0].direction(), Some(Direction::Outward));
        assert_eq!(links[0].target(Direction::Outward).unwrap().key, "PROJ-3");
        assert_eq!(links[0].target(Direction::Outward).unwrap().status(), "Closed");
        assert_eq!(links[0].link_type.name_for(Direction::Outward), "blocks");

        assert_eq!(links[1].direction(), Some(Direction::Inward));
        assert_eq!(links[1].link_type.name_for(Direction::Inward), "relates to");

        assert_eq!(links[2].direction(), None);
    }

    #[test]
    fn test_missing_collections_are_empty() {
        let issue = IssueRecord::from_json(json!({
            "key": "A-1",
            "fields": {"summary": "x", "subtasks": null}
        }))
        .unwrap();

        assert!(issue.subtasks().is_empty());
        assert!(issue.links().is_empty());
        assert_eq!(issue.status(), "");
    }

    #[test]
    fn test_direction_from_str() {
        assert_eq!("inward".parse::<Direction>().unwrap(), Direction::Inward);
        assert_eq!("OUTWARD".parse::<Direction>().unwrap(), Direction::Outward);
        assert_eq!(
            "sideways".parse::<Direction>(),
            Err(ParseDirectionError("sideways".to_string()))
        );
    }

    #[test]
    fn test_null_linked_status_reads_as_empty() {
        let issue = IssueRecord::from_json(json!({
            "key": "A-1",
            "fields": {
                "summary": "x",
                "issuelinks": [{
                    "type": {"name": "Blocks", "inward": "is blocked by", "outward": "blocks"},
                    "outwardIssue": {"key": "A-2", "fields": {"status": null}}
                }]
            }
        }))
        .unwrap();

        let target = issue.links()[0].target(Direction::Outward).unwrap();
        assert_eq!(target.key, "A-2");
        assert_eq!(target.status(), "");
    }

    #[test]
    fn test_closed_status_is_exact() {
        assert!(is_closed_status("Closed"));
        assert!(!is_closed_status("Closed-Pending"));
        assert!(!is_closed_status("closed"));
    }

    #[test]
    fn test_record_serializes_back_to_wire_shape() {
        let issue = IssueRecord::from_json(sample()).unwrap();
        let value = serde_json::to_value(&issue).unwrap();
        assert_eq!(value["key"], "PROJ-1");
        assert_eq!(value["fields"]["summary"], "Ship the thing");

        let back: IssueRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, issue);
    }
}

//! Request payloads of the domain config `Repository` service.

use super::snapshot::DomainObject;
use serde::Serialize;
use serde_json::Value;

/// Which version a checkout should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionSelector {
    Head {},
    Version(u64),
}

impl VersionSelector {
    pub fn head() -> Self {
        VersionSelector::Head {}
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Remove { object: Value },
}

/// A commit body: the operations applied on top of the expected version.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Commit {
    pub ops: Vec<Operation>,
}

impl Commit {
    /// A commit that removes exactly one object.
    pub fn remove(object: &DomainObject) -> Self {
        Self {
            ops: vec![Operation::Remove {
                object: object.to_value(),
            }],
        }
    }
}

//! Identifier types shared by the dedupe engine.
//!
//! Package names, module identities and sort positions are kept apart at the
//! type level so they cannot be mixed up when rows flow between phases.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a module in the bundled graph.
///
/// The host keys modules by their resolved file path, so the identity doubles
/// as the path used when choosing a canonical copy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length of the underlying path in characters.
    #[must_use]
    pub fn path_len(&self) -> usize {
        self.0.chars().count()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for NodeId {
    fn from(path: String) -> Self {
        Self(path)
    }
}

/// Name of a package as declared in its manifest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageName(String);

impl PackageName {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PackageName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Position of a row in the host's topologically sorted output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionIndex(pub usize);

impl fmt::Display for PositionIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Target of a dependency edge.
///
/// `External` marks a dependency left out of the bundle and supplied by the
/// runtime environment. In traces it is written as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<NodeId>", into = "Option<NodeId>")]
pub enum Target {
    Node(NodeId),
    External,
}

impl Target {
    /// The bundled module this edge points at, if any.
    #[must_use]
    pub fn node(&self) -> Option<&NodeId> {
        match self {
            Self::Node(id) => Some(id),
            Self::External => None,
        }
    }

    #[must_use]
    pub fn is_external(&self) -> bool {
        matches!(self, Self::External)
    }
}

impl From<Option<NodeId>> for Target {
    fn from(value: Option<NodeId>) -> Self {
        value.map_or(Self::External, Self::Node)
    }
}

impl From<Target> for Option<NodeId> {
    fn from(value: Target) -> Self {
        match value {
            Target::Node(id) => Some(id),
            Target::External => None,
        }
    }
}

impl From<&str> for Target {
    fn from(path: &str) -> Self {
        Self::Node(NodeId::from(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_len_counts_chars() {
        assert_eq!(NodeId::from("/a/b.js").path_len(), 7);
        assert_eq!(NodeId::from("/é.js").path_len(), 5);
    }

    #[test]
    fn test_target_null_is_external() {
        let targets: Vec<Target> = serde_json::from_str(r#"["/x.js", null]"#).unwrap();
        assert_eq!(targets[0], Target::from("/x.js"));
        assert!(targets[1].is_external());
        assert_eq!(serde_json::to_string(&targets).unwrap(), r#"["/x.js",null]"#);
    }
}

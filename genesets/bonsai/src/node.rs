//! Tree node representation

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a tree node.
///
/// Ids are handed out by the owning [`crate::Tree`] and are never reused
/// within one run, even after the node is pruned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named node holding a deduplicated set of gene identifiers.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub parent: Option<NodeId>,
    pub data: HashSet<String>,
}

impl Node {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] ({} genes)", self.name, self.id, self.data.len())
    }
}

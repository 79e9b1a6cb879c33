//! Arena tree of named gene sets
//!
//! This crate holds the shared tree container used across the genesets
//! pipeline. A tree owns the full id -> node mapping, a parent -> children
//! adjacency index kept in creation order, and a name -> ids index used by
//! the structure-driven merge step. Nodes carry a human-readable label and
//! a deduplicated set of gene identifiers.
//!
//! Trees can be grown one node at a time, pruned by subtree, spliced into
//! one another with id re-keying, and round-tripped through a flat node
//! JSON record at the process boundary. A directory-style path listing is
//! also produced for manual inspection; it is not meant to round-trip.

use hashbrown::{HashMap, HashSet};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Read, Write};
use thiserror::Error;

pub mod node;
pub use node::{Node, NodeId};

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("Unknown parent node: {0}")]
    UnknownParent(NodeId),
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),
    #[error("Tree already has a root")]
    DuplicateRoot,
    #[error("Tree has no root")]
    MissingRoot,
    #[error("The root node cannot be pruned")]
    PruneRoot,
    #[error("Duplicated node id in record: {0}")]
    IdCollision(u64),
    #[error("Node {0} is not reachable from the root")]
    DetachedNode(NodeId),
    #[error("No node named {0:?} in tree")]
    NameNotFound(String),
    #[error("More than one node named {0:?} in tree")]
    AmbiguousName(String),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Flat on-disk form of a single node.
#[derive(Debug, Serialize, Deserialize)]
struct NodeRecord {
    id: u64,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent: Option<u64>,
    data: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TreeRecord {
    nodes: Vec<NodeRecord>,
}

/// A rooted tree of gene-set nodes with an instance-owned id allocator.
#[derive(Debug, Default)]
pub struct Tree {
    nodes: HashMap<NodeId, Node>,
    children: HashMap<NodeId, Vec<NodeId>>,
    names: HashMap<String, Vec<NodeId>>,
    root: Option<NodeId>,
    next_id: u64,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Register a new node under `parent`. The very first node must be
    /// created with `parent = None` and becomes the root; any later
    /// parentless node is rejected.
    pub fn create_node(
        &mut self,
        name: &str,
        parent: Option<NodeId>,
        data: HashSet<String>,
    ) -> Result<NodeId, TreeError> {
        match parent {
            Some(p) => {
                if !self.nodes.contains_key(&p) {
                    return Err(TreeError::UnknownParent(p));
                }
            }
            None => {
                if self.root.is_some() {
                    return Err(TreeError::DuplicateRoot);
                }
            }
        }

        let id = self.fresh_id();
        match parent {
            Some(p) => self.children.entry(p).or_default().push(id),
            None => self.root = Some(id),
        }

        self.names.entry(name.to_string()).or_default().push(id);
        self.nodes.insert(
            id,
            Node {
                id,
                name: name.to_string(),
                parent,
                data,
            },
        );

        Ok(id)
    }

    /// Immediate children of `id` in creation order. Empty for leaves and
    /// unknown ids.
    pub fn get_direct_children(&self, id: NodeId) -> Vec<&Node> {
        self.children
            .get(&id)
            .map(|kids| kids.iter().filter_map(|k| self.nodes.get(k)).collect())
            .unwrap_or_default()
    }

    /// All nodes without children, in id order.
    pub fn leaves(&self) -> Vec<&Node> {
        let mut out: Vec<&Node> = self
            .nodes
            .values()
            .filter(|n| self.children.get(&n.id).map_or(true, |c| c.is_empty()))
            .collect();
        out.sort_by_key(|n| n.id);
        out
    }

    /// Distance from the root (root = 0).
    pub fn depth_of(&self, id: NodeId) -> Result<usize, TreeError> {
        let mut node = self.nodes.get(&id).ok_or(TreeError::UnknownNode(id))?;
        let mut depth = 0;

        while let Some(p) = node.parent {
            node = self.nodes.get(&p).ok_or(TreeError::UnknownParent(p))?;
            depth += 1;
        }

        Ok(depth)
    }

    /// Root-to-node id chain.
    pub fn get_path_of(&self, id: NodeId) -> Result<Vec<NodeId>, TreeError> {
        let mut node = self.nodes.get(&id).ok_or(TreeError::UnknownNode(id))?;
        let mut path = vec![node.id];

        while let Some(p) = node.parent {
            node = self.nodes.get(&p).ok_or(TreeError::UnknownParent(p))?;
            path.push(node.id);
        }

        path.reverse();
        Ok(path)
    }

    /// Delete `id` and its whole subtree. Returns the number of removed
    /// nodes. The root may never be pruned.
    pub fn prune(&mut self, id: NodeId) -> Result<usize, TreeError> {
        if !self.nodes.contains_key(&id) {
            return Err(TreeError::UnknownNode(id));
        }
        if Some(id) == self.root {
            return Err(TreeError::PruneRoot);
        }

        if let Some(p) = self.nodes.get(&id).and_then(|n| n.parent) {
            if let Some(kids) = self.children.get_mut(&p) {
                kids.retain(|k| *k != id);
            }
        }

        let mut stack = vec![id];
        let mut removed = 0;
        while let Some(cur) = stack.pop() {
            if let Some(kids) = self.children.remove(&cur) {
                stack.extend(kids);
            }
            if let Some(node) = self.nodes.remove(&cur) {
                removed += 1;
                if let Some(ids) = self.names.get_mut(&node.name) {
                    ids.retain(|x| *x != cur);
                    if ids.is_empty() {
                        self.names.remove(&node.name);
                    }
                }
            }
        }

        Ok(removed)
    }

    /// Resolve a node by name through the name index. Fails loudly when the
    /// name is absent or shared by more than one node.
    pub fn get_one_node_named(&self, name: &str) -> Result<&Node, TreeError> {
        match self.names.get(name).map(|ids| ids.as_slice()) {
            None | Some([]) => Err(TreeError::NameNotFound(name.to_string())),
            Some([id]) => self.nodes.get(id).ok_or(TreeError::UnknownNode(*id)),
            Some(_) => Err(TreeError::AmbiguousName(name.to_string())),
        }
    }

    /// Splice `other` into this tree as a new subtree of `target`.
    ///
    /// Every node of `other` gets a fresh id from this tree's allocator and
    /// the former root of `other` becomes a regular child of `target`. With
    /// `update_data`, `target` and all of its ancestors extend their gene
    /// sets with the union of everything that was pasted in.
    pub fn paste(
        &mut self,
        other: Tree,
        target: NodeId,
        update_data: bool,
    ) -> Result<(), TreeError> {
        if !self.nodes.contains_key(&target) {
            return Err(TreeError::UnknownNode(target));
        }
        let Some(other_root) = other.root else {
            return Ok(());
        };

        let mut old_ids: Vec<NodeId> = other.nodes.keys().copied().collect();
        old_ids.sort();

        let mut remap: HashMap<NodeId, NodeId> = HashMap::new();
        for old in &old_ids {
            let fresh = self.fresh_id();
            remap.insert(*old, fresh);
        }

        let Tree {
            mut nodes,
            children,
            ..
        } = other;

        let mut added: HashSet<String> = HashSet::new();
        for old in &old_ids {
            let node = nodes.remove(old).ok_or(TreeError::UnknownNode(*old))?;
            let new_id = remap[old];
            let parent = match node.parent {
                Some(p) => Some(remap[&p]),
                None => Some(target),
            };

            if update_data {
                added.extend(node.data.iter().cloned());
            }

            self.names.entry(node.name.clone()).or_default().push(new_id);
            self.nodes.insert(
                new_id,
                Node {
                    id: new_id,
                    name: node.name,
                    parent,
                    data: node.data,
                },
            );
        }

        for (old_parent, kids) in children {
            let mapped: Vec<NodeId> = kids.iter().map(|k| remap[k]).collect();
            self.children.insert(remap[&old_parent], mapped);
        }
        self.children
            .entry(target)
            .or_default()
            .push(remap[&other_root]);

        if update_data {
            let mut cursor = Some(target);
            while let Some(id) = cursor {
                let node = self
                    .nodes
                    .get_mut(&id)
                    .ok_or(TreeError::UnknownNode(id))?;
                node.data.extend(added.iter().cloned());
                cursor = node.parent;
            }
        }

        debug!("Pasted {} nodes under node {}", old_ids.len(), target);
        Ok(())
    }

    /// Write the tree as a flat node-JSON record. Node ids ascend and gene
    /// lists are sorted, so equal trees serialize byte-identically.
    pub fn to_node_json<W: Write>(&self, writer: W) -> Result<(), TreeError> {
        let mut nodes: Vec<NodeRecord> = self
            .nodes
            .values()
            .map(|n| {
                let mut data: Vec<String> = n.data.iter().cloned().collect();
                data.sort();
                NodeRecord {
                    id: n.id.0,
                    name: n.name.clone(),
                    parent: n.parent.map(|p| p.0),
                    data,
                }
            })
            .collect();
        nodes.sort_by_key(|r| r.id);

        serde_json::to_writer_pretty(writer, &TreeRecord { nodes })?;
        Ok(())
    }

    /// Rebuild a tree from its node-JSON record. Parent/child structure,
    /// names and gene sets are reconstructed exactly; ids are taken as-is
    /// and the allocator resumes past the highest one.
    pub fn from_node_json<R: Read>(reader: R) -> Result<Tree, TreeError> {
        let record: TreeRecord = serde_json::from_reader(reader)?;
        let mut records = record.nodes;
        records.sort_by_key(|r| r.id);

        let ids: HashSet<u64> = records.iter().map(|r| r.id).collect();
        if ids.len() != records.len() {
            let dup = records
                .windows(2)
                .find(|w| w[0].id == w[1].id)
                .map(|w| w[0].id)
                .unwrap_or_default();
            return Err(TreeError::IdCollision(dup));
        }

        let mut tree = Tree::new();
        for r in records {
            let id = NodeId(r.id);
            match r.parent {
                None => {
                    if tree.root.is_some() {
                        return Err(TreeError::DuplicateRoot);
                    }
                    tree.root = Some(id);
                }
                Some(p) => {
                    if !ids.contains(&p) {
                        return Err(TreeError::UnknownParent(NodeId(p)));
                    }
                    tree.children.entry(NodeId(p)).or_default().push(id);
                }
            }

            tree.names.entry(r.name.clone()).or_default().push(id);
            tree.next_id = tree.next_id.max(r.id + 1);
            tree.nodes.insert(
                id,
                Node {
                    id,
                    name: r.name,
                    parent: r.parent.map(NodeId),
                    data: r.data.into_iter().collect(),
                },
            );
        }

        if tree.root.is_none() && !tree.nodes.is_empty() {
            return Err(TreeError::MissingRoot);
        }

        // parent links that close a cycle off the root would loop forever
        // in depth_of/get_path_of, so reject any node the root cannot reach
        if let Some(root) = tree.root {
            let mut seen: HashSet<NodeId> = HashSet::new();
            let mut stack = vec![root];
            while let Some(id) = stack.pop() {
                if seen.insert(id) {
                    if let Some(kids) = tree.children.get(&id) {
                        stack.extend(kids.iter().copied());
                    }
                }
            }

            if seen.len() != tree.nodes.len() {
                let mut stranded: Vec<u64> = tree
                    .nodes
                    .keys()
                    .filter(|id| !seen.contains(*id))
                    .map(|id| id.0)
                    .collect();
                stranded.sort_unstable();
                return Err(TreeError::DetachedNode(NodeId(stranded[0])));
            }
        }

        Ok(tree)
    }

    /// Write a directory-style listing with one root-to-node path per line,
    /// in depth-first creation order.
    pub fn to_representation<W: Write>(&self, mut writer: W) -> Result<(), TreeError> {
        let Some(root) = self.root else {
            return Ok(());
        };

        let mut stack = vec![(root, String::new())];
        while let Some((id, prefix)) = stack.pop() {
            let node = self.nodes.get(&id).ok_or(TreeError::UnknownNode(id))?;
            let path = if prefix.is_empty() {
                node.name.clone()
            } else {
                format!("{}/{}", prefix, node.name)
            };
            writeln!(writer, "{}", path)?;

            for kid in self.get_direct_children(id).iter().rev() {
                stack.push((kid.id, path.clone()));
            }
        }

        Ok(())
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tree({} nodes)", self.nodes.len())
    }
}

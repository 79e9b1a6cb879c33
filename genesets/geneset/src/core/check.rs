//! Congruency check between two serialized trees
//!
//! Every node is reduced to its root-to-node name path plus its sorted
//! gene list; two trees are congruent when both reductions coincide.
//! Differences are reported per path so independent pipeline runs can be
//! diffed for drift.

use anyhow::Result;
use bonsai::Tree;
use hashbrown::HashMap;
use log::{info, warn};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

pub fn check_trees(one: &PathBuf, two: &PathBuf) -> Result<bool> {
    let one_tree = Tree::from_node_json(BufReader::new(File::open(one)?))?;
    let two_tree = Tree::from_node_json(BufReader::new(File::open(two)?))?;
    info!("Loaded trees: one: {} , two: {}", one_tree, two_tree);

    diff_trees(&one_tree, &two_tree)
}

/// Compare two trees node by node. Returns whether they are congruent,
/// logging every difference found.
pub fn diff_trees(one: &Tree, two: &Tree) -> Result<bool> {
    let one_hashes = hash_tree(one)?;
    let two_hashes = hash_tree(two)?;

    let mut congruent = true;
    for (path, contents) in &one_hashes {
        match two_hashes.get(path) {
            Some(other) if other == contents => {}
            Some(_) => {
                warn!("Content of {} differs between trees", path);
                congruent = false;
            }
            None => {
                warn!("Path {} only present in first tree", path);
                congruent = false;
            }
        }
    }
    for path in two_hashes.keys() {
        if !one_hashes.contains_key(path) {
            warn!("Path {} only present in second tree", path);
            congruent = false;
        }
    }

    if congruent {
        info!("Trees are congruent.");
    } else {
        warn!("Trees differ.");
    }

    Ok(congruent)
}

/// Reduce every node to (name path, sorted gene blob).
fn hash_tree(tree: &Tree) -> Result<HashMap<String, String>> {
    let mut out = HashMap::new();

    for node in tree.nodes() {
        let path: Vec<&str> = tree
            .get_path_of(node.id)?
            .iter()
            .map(|id| tree.get(*id).map(|n| n.name.as_str()).unwrap_or_default())
            .collect();

        let mut contents: Vec<&str> = node.data.iter().map(|g| g.as_str()).collect();
        contents.sort_unstable();

        out.insert(path.join("/"), contents.join("-"));
    }

    Ok(out)
}

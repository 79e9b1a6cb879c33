//! Similarity-driven tree pruner
//!
//! The builder produces many overlapping, near-duplicate gene sets. This
//! pass repeatedly walks the current leaves and removes every leaf whose
//! gene set matches some other node of the tree above a similarity
//! threshold, until a full pass removes nothing. The procedure is greedy
//! and order-dependent on purpose: downstream congruency checks expect the
//! exact selection the reference pipeline makes, so neither the traversal
//! order nor the comparison set may change.

use anyhow::Result;
use bonsai::Tree;
use config::{get_progress_bar, PruneDirection};
use hashbrown::HashSet;
use log::{debug, info};
use std::cmp::Reverse;

/// Sorensen-Dice coefficient between two gene sets. Chosen because it is
/// very easy to compute and close to the Jaccard index anyway; it
/// empirically worked well. Two empty sets score 0.
pub fn calc_similarity(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }

    let intersection = a.intersection(b).count();
    2.0 * intersection as f64 / (a.len() + b.len()) as f64
}

/// Prune near-duplicate leaves until a fixed point is reached. Returns the
/// number of removed nodes.
///
/// `TopDown` processes the deepest leaves first, `BottomUp` the shallowest;
/// the naming is kept inverted exactly as in the reference pipeline. The
/// root never takes part in a comparison, on either side.
pub fn prune_tree(tree: &mut Tree, similarity: f64, direction: PruneDirection) -> Result<usize> {
    let original_len = tree.len();
    info!("Pruning {}.", tree);

    let Some(root) = tree.root() else {
        return Ok(0);
    };
    let reverse_sort = direction == PruneDirection::TopDown;

    let mut cycle = 0;
    let mut pruned = true;
    while pruned {
        pruned = false;
        info!("Prune cycle {} -- {} nodes in tree.", cycle, tree.len());

        let mut leaves = Vec::new();
        for leaf in tree.leaves() {
            leaves.push((tree.depth_of(leaf.id)?, leaf.id));
        }
        if reverse_sort {
            leaves.sort_by_key(|(depth, _)| Reverse(*depth));
        } else {
            leaves.sort_by_key(|(depth, _)| *depth);
        }

        let pb = get_progress_bar(leaves.len() as u64, "Pruning leaves");
        for (_, leaf) in leaves {
            pb.inc(1);

            let Some(node) = tree.get(leaf) else {
                continue;
            };
            let is_similar = tree.nodes().any(|other| {
                other.id != leaf
                    && other.id != root
                    && leaf != root
                    && calc_similarity(&node.data, &other.data) >= similarity
            });

            if is_similar {
                debug!("Pruned node {}", leaf);
                pruned = true;
                tree.prune(leaf)?;
            }
        }
        pb.finish_and_clear();

        cycle += 1;
    }

    let removed = original_len - tree.len();
    info!(
        "Prune finished. Removed {} nodes ({:.3}% of total)",
        removed,
        removed as f64 / original_len as f64 * 100.0
    );

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(genes: &[&str]) -> HashSet<String> {
        genes.iter().map(|g| g.to_string()).collect()
    }

    #[test]
    fn test_similarity_is_symmetric() {
        let a = set(&["g1", "g2", "g3", "g4"]);
        let b = set(&["g1", "g2", "g3", "g5"]);

        assert_eq!(calc_similarity(&a, &b), calc_similarity(&b, &a));
        assert_eq!(calc_similarity(&a, &b), 0.75);
    }

    #[test]
    fn test_similarity_identity_and_disjoint() {
        let a = set(&["g1", "g2"]);
        let b = set(&["g3", "g4"]);

        assert_eq!(calc_similarity(&a, &a), 1.0);
        assert_eq!(calc_similarity(&a, &b), 0.0);
        assert_eq!(calc_similarity(&HashSet::new(), &HashSet::new()), 0.0);
    }

    #[test]
    fn test_near_duplicates_pruned_at_default_threshold() {
        let mut tree = Tree::new();
        let root = tree.create_node("root", None, set(&["g1", "g2", "g3", "g4", "g5"])).unwrap();
        tree.create_node("a", Some(root), set(&["g1", "g2", "g3", "g4"])).unwrap();
        tree.create_node("b", Some(root), set(&["g1", "g2", "g3", "g5"])).unwrap();

        let removed = prune_tree(&mut tree, 0.45, PruneDirection::BottomUp).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_near_duplicates_kept_at_high_threshold() {
        let mut tree = Tree::new();
        let root = tree.create_node("root", None, set(&["g1", "g2", "g3", "g4", "g5"])).unwrap();
        tree.create_node("a", Some(root), set(&["g1", "g2", "g3", "g4"])).unwrap();
        tree.create_node("b", Some(root), set(&["g1", "g2", "g3", "g5"])).unwrap();

        let removed = prune_tree(&mut tree, 0.9, PruneDirection::BottomUp).unwrap();
        assert_eq!(removed, 0);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_root_only_tree_is_noop() {
        let mut tree = Tree::new();
        tree.create_node("root", None, set(&["g1"])).unwrap();

        let removed = prune_tree(&mut tree, 0.45, PruneDirection::BottomUp).unwrap();
        assert_eq!(removed, 0);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_root_never_compared() {
        let mut tree = Tree::new();
        let root = tree.create_node("root", None, set(&["g1", "g2", "g3"])).unwrap();
        // identical to the root, but root-involving comparisons are skipped
        tree.create_node("a", Some(root), set(&["g1", "g2", "g3"])).unwrap();

        let removed = prune_tree(&mut tree, 0.45, PruneDirection::BottomUp).unwrap();
        assert_eq!(removed, 0);
    }

    fn direction_tree() -> (Tree, bonsai::NodeId, bonsai::NodeId) {
        // a's set is diluted so only b and c are mutually similar
        let a_genes: Vec<String> = (1..=4)
            .map(|i| format!("x{}", i))
            .chain((1..=16).map(|i| format!("d{}", i)))
            .collect();

        let mut tree = Tree::new();
        let root = tree.create_node("root", None, HashSet::new()).unwrap();
        let a = tree
            .create_node("a", Some(root), a_genes.iter().cloned().collect())
            .unwrap();
        let b = tree
            .create_node("b", Some(a), set(&["x1", "x2", "x3", "x4", "y"]))
            .unwrap();
        let c = tree
            .create_node("c", Some(root), set(&["x1", "x2", "x3", "x4", "z"]))
            .unwrap();

        (tree, b, c)
    }

    #[test]
    fn test_bottomup_processes_shallow_leaves_first() {
        let (mut tree, b, c) = direction_tree();

        prune_tree(&mut tree, 0.45, PruneDirection::BottomUp).unwrap();
        assert!(tree.get(c).is_none());
        assert!(tree.get(b).is_some());
    }

    #[test]
    fn test_topdown_processes_deep_leaves_first() {
        let (mut tree, b, c) = direction_tree();

        prune_tree(&mut tree, 0.45, PruneDirection::TopDown).unwrap();
        assert!(tree.get(b).is_none());
        assert!(tree.get(c).is_some());
    }

    #[test]
    fn test_surviving_leaves_pairwise_dissimilar() {
        let mut tree = Tree::new();
        let root = tree.create_node("root", None, HashSet::new()).unwrap();
        tree.create_node("a", Some(root), set(&["g1", "g2", "g3", "g4"])).unwrap();
        tree.create_node("b", Some(root), set(&["g1", "g2", "g3", "g5"])).unwrap();
        tree.create_node("c", Some(root), set(&["h1", "h2", "h3"])).unwrap();

        prune_tree(&mut tree, 0.45, PruneDirection::BottomUp).unwrap();

        let leaves = tree.leaves();
        let root_id = tree.root().unwrap();
        for one in &leaves {
            for two in &leaves {
                if one.id == two.id || one.id == root_id || two.id == root_id {
                    continue;
                }
                assert!(calc_similarity(&one.data, &two.data) < 0.45);
            }
        }
    }
}

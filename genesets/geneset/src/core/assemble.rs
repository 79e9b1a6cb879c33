//! Structure-driven composite assembly
//!
//! The structure description is an ordered list of (source, sink) name
//! pairs: for every pair a node named after the sink is created under the
//! source node (or at the composite root when the source is `"root"`), and
//! the pre-built tree of that sink is pasted there with data accumulation
//! turned on, so every ancestor ends up carrying the full gene set beneath
//! it. Name lookup fails loudly on unknown or ambiguous names; the
//! structure description relies on that.

use anyhow::Result;
use bonsai::Tree;
use hashbrown::{HashMap, HashSet};
use log::info;

/// Merge the per-table trees into one composite tree following the
/// structure pair list, in order.
pub fn assemble(structure: &[(String, String)], mut trees: HashMap<String, Tree>) -> Result<Tree> {
    let mut large_tree = Tree::new();

    for (source, sink) in structure {
        let tree = trees.remove(sink).ok_or_else(|| {
            anyhow::anyhow!("ERROR: structure sink {:?} has no matching table", sink)
        })?;

        if source == config::ROOT_SOURCE {
            match large_tree.root() {
                None => large_tree.create_node(sink, None, HashSet::new())?,
                Some(root) => large_tree.create_node(sink, Some(root), HashSet::new())?,
            };
        } else {
            let parent = large_tree.get_one_node_named(source)?.id;
            large_tree.create_node(sink, Some(parent), HashSet::new())?;
        }

        let target = large_tree.get_one_node_named(sink)?.id;
        large_tree.paste(tree, target, true)?;
    }

    info!("Assembled composite tree with {} nodes.", large_tree.len());
    Ok(large_tree)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(genes: &[&str]) -> HashSet<String> {
        genes.iter().map(|g| g.to_string()).collect()
    }

    fn table_tree(name: &str, genes: &[&str]) -> Tree {
        let mut tree = Tree::new();
        let root = tree.create_node(name, None, set(genes)).unwrap();
        tree.create_node(
            &format!("{}_kid", name),
            Some(root),
            set(&genes[..1.min(genes.len())]),
        )
        .unwrap();
        tree
    }

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect()
    }

    #[test]
    fn test_flat_structure() {
        let mut trees = HashMap::new();
        trees.insert("alpha".to_string(), table_tree("alpha", &["g1", "g2"]));
        trees.insert("beta".to_string(), table_tree("beta", &["g3", "g4"]));

        let structure = pairs(&[("root", "alpha"), ("root", "beta")]);
        let composite = assemble(&structure, trees).unwrap();

        // one anchor node per sink plus two pasted nodes per tree
        assert_eq!(composite.len(), 6);

        let root = composite.root().unwrap();
        let root_node = composite.get(root).unwrap();
        assert_eq!(root_node.name, "alpha");

        // update_data accumulated everything at the composite root
        for gene in ["g1", "g2", "g3", "g4"] {
            assert!(root_node.data.contains(gene));
        }

        // the beta anchor holds only beta's genes
        let beta = composite.get_one_node_named("beta").unwrap();
        assert!(beta.data.contains("g3"));
        assert!(!beta.data.contains("g1"));
    }

    #[test]
    fn test_missing_sink_fails() {
        let trees = HashMap::new();
        let structure = pairs(&[("root", "alpha")]);

        assert!(assemble(&structure, trees).is_err());
    }

    #[test]
    fn test_unknown_source_fails() {
        let mut trees = HashMap::new();
        trees.insert("alpha".to_string(), table_tree("alpha", &["g1"]));

        let structure = pairs(&[("nowhere", "alpha")]);
        assert!(assemble(&structure, trees).is_err());
    }

    #[test]
    fn test_ambiguous_source_fails() {
        // pasting tree "alpha" leaves two nodes named alpha in the
        // composite, so using it as a source later must fail loudly
        let mut trees = HashMap::new();
        trees.insert("alpha".to_string(), table_tree("alpha", &["g1", "g2"]));
        trees.insert("beta".to_string(), table_tree("beta", &["g3"]));

        let structure = pairs(&[("root", "alpha"), ("alpha", "beta")]);
        let err = assemble(&structure, trees);
        assert!(err.is_err());
    }
}

//! geneset: gene-set tree construction and pruning
//!
//! Builds hierarchical gene-set taxonomies from categorical annotation
//! tables. Each table is recursively partitioned on its annotation columns
//! into a tree of `column::value` gene sets, the per-table trees are merged
//! into one composite following an externally supplied structure
//! description, and near-duplicate leaves are pruned away with a
//! Sorensen-Dice similarity pass. The resulting tree is serialized as a
//! flat node JSON plus a human-readable path listing, and two serialized
//! trees can be diffed for congruence.

use anyhow::Result;
use config::ArgCheck;

pub mod cli;
pub mod core;
pub mod utils;

pub fn lib_geneset_make(args: Vec<String>) -> Result<()> {
    let args = cli::MakeArgs::from(args);
    args.check()?;

    core::make_genesets(args)
}

pub fn lib_geneset_check(args: Vec<String>) -> Result<bool> {
    let args = cli::CheckArgs::from(args);
    args.check()?;

    core::check_genesets(&args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bonsai::Tree;
    use hashbrown::HashSet;
    use std::fs::File;
    use std::io::BufWriter;
    use std::path::Path;

    fn write_tree(path: &Path) {
        let mut tree = Tree::new();
        let root = tree.create_node("root", None, HashSet::new()).unwrap();
        let genes: HashSet<String> = ["g1".to_string(), "g2".to_string()].into_iter().collect();
        tree.create_node("a", Some(root), genes).unwrap();

        tree.to_node_json(BufWriter::new(File::create(path).unwrap()))
            .unwrap();
    }

    #[test]
    fn test_lib_geneset_check_congruent_files() {
        let dir = std::env::temp_dir();
        let one = dir.join("geneset_lib_check_one.json");
        let two = dir.join("geneset_lib_check_two.json");
        write_tree(&one);
        write_tree(&two);

        let congruent = lib_geneset_check(vec![
            one.to_string_lossy().into_owned(),
            two.to_string_lossy().into_owned(),
        ])
        .unwrap();
        assert!(congruent);

        std::fs::remove_file(one).ok();
        std::fs::remove_file(two).ok();
    }

    #[test]
    fn test_lib_geneset_make_rejects_missing_input() {
        let result = lib_geneset_make(vec![
            "definitely_missing_lists.json".to_string(),
            "out.json".to_string(),
            "out.txt".to_string(),
        ]);

        assert!(result.is_err());
    }
}

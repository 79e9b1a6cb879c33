//! Core module for gene-set tree generation
//!
//! This module wires the full `make` pipeline together: load the large
//! annotation tables named in the gene-list JSON, build one gene-list tree
//! per table, paste the trees into a composite following the structure
//! description, optionally prune near-duplicate leaves, and write the node
//! JSON plus a directory-style listing of the result. The `check` entry
//! point diffs two previously written trees for congruence.

use anyhow::Result;
use hashbrown::HashMap;
use log::info;
use std::fs::File;
use std::io::BufWriter;

use crate::cli::{CheckArgs, MakeArgs};
use crate::utils;

pub mod assemble;
pub mod build;
pub mod check;
pub mod prune;

pub use assemble::assemble;
pub use build::{generate_gene_list_trees, BuildParams};
pub use check::{check_trees, diff_trees};
pub use prune::{calc_similarity, prune_tree};

pub fn make_genesets(args: MakeArgs) -> Result<()> {
    info!("Launching with args: {:?}", args);

    let sets = utils::read_gene_lists(&args.gene_lists)?;

    info!("Making large tables...");
    let tables = utils::load_large_tables(&sets, args.delimiter as u8, config::ID_COL)?;
    info!("Made {} large tables.", tables.len());

    let params = BuildParams {
        id_col: config::ID_COL.to_string(),
        min_pop_score: args.min_pop_score,
        min_set_size: args.min_set_size,
        min_recurse_set_size: args.min_recurse_set_size,
        recurse: !args.no_recurse,
    };

    info!("Generating gene trees...");
    let mut trees = HashMap::new();
    for (name, table) in &tables {
        info!("Processing table {}", name);
        let tree = generate_gene_list_trees(table, name, &params)?;
        trees.insert(name.clone(), tree);
    }

    info!("Pasting trees together...");
    let mut large_tree = assemble(&sets.structure, trees)?;

    if !args.no_prune {
        info!("Pruning tree...");
        prune_tree(&mut large_tree, args.prune_similarity, args.direction()?)?;
    }

    let json = File::create(&args.out_json)?;
    large_tree.to_node_json(BufWriter::new(json))?;

    let repr = File::create(&args.out_repr)?;
    large_tree.to_representation(BufWriter::new(repr))?;

    info!("Finished!");
    Ok(())
}

pub fn check_genesets(args: &CheckArgs) -> Result<bool> {
    check_trees(&args.one, &args.two)
}

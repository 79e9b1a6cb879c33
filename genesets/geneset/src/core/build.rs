//! Gene-list tree builder
//!
//! Recursively partitions an annotation table into a tree of named gene
//! sets, one branch per (column, value) pair. Columns are walked in sorted
//! name order and values in sorted order so that reruns over the same
//! inputs produce byte-identical trees; downstream congruency checks rely
//! on this.

use anyhow::Result;
use bonsai::{NodeId, Tree};
use log::debug;

use crate::utils::AnnotationTable;

/// Thresholds steering the partitioning.
#[derive(Debug, Clone)]
pub struct BuildParams {
    pub id_col: String,
    pub min_pop_score: f64,
    pub min_set_size: usize,
    pub min_recurse_set_size: usize,
    pub recurse: bool,
}

impl Default for BuildParams {
    fn default() -> Self {
        Self {
            id_col: config::ID_COL.to_string(),
            min_pop_score: config::MIN_POP_SCORE,
            min_set_size: config::MIN_SET_SIZE,
            min_recurse_set_size: config::MIN_RECURSE_SET_SIZE,
            recurse: true,
        }
    }
}

/// Build the gene-list tree for one annotation table. The root carries all
/// distinct identifiers; every accepted (column, value) pair becomes a
/// `column::value` child of the node it was derived under.
pub fn generate_gene_list_trees(
    table: &AnnotationTable,
    name: &str,
    params: &BuildParams,
) -> Result<Tree> {
    let mut tree = Tree::new();
    let root = tree.create_node(name, None, table.unique_ids(&params.id_col))?;

    generate_list(&mut tree, root, table, params, 0)?;
    debug!("Generated {} gene lists from table.", tree.len());

    Ok(tree)
}

fn generate_list(
    tree: &mut Tree,
    parent: NodeId,
    frame: &AnnotationTable,
    params: &BuildParams,
    layer: usize,
) -> Result<()> {
    debug!("Enumerating layer {}: {:?}", layer, frame.column_names());

    for col in frame.column_names() {
        if col == params.id_col {
            continue;
        }

        if frame.missing_fraction(col) > 1.0 - params.min_pop_score {
            debug!("Layer {} -- col {} ... SKIPPED (too empty)", layer, col);
            continue;
        }

        for (value, count) in frame.value_counts(col) {
            if count < params.min_set_size {
                debug!(
                    "Layer {} -- col {} -- value {} ... SKIPPED (too small)",
                    layer, col, value
                );
                continue;
            }

            let genes = frame.ids_where(&params.id_col, col, &value);

            // row count and deduplicated set size can differ
            if genes.len() < params.min_set_size {
                debug!(
                    "Layer {} -- col {} -- value {} ... SKIPPED (too small pure set)",
                    layer, col, value
                );
                continue;
            }

            let set_size = genes.len();
            let node_name = format!("{}::{}", col, value);
            let node = tree.create_node(&node_name, Some(parent), genes)?;

            if !params.recurse || set_size < params.min_recurse_set_size {
                debug!(
                    "Layer {} -- col {} -- value {} ... ACCEPTED NR (id : {})",
                    layer, col, value, node
                );
                continue;
            }

            debug!(
                "Layer {} -- col {} -- value {} ... ACCEPTED RC (id : {})",
                layer, col, value, node
            );

            // the triggering column is constant in the sub-table; drop it
            let sub = frame.restrict(col, &value);
            generate_list(tree, node, &sub, params, layer + 1)?;
        }
    }

    Ok(())
}

//! Annotation table loading for the geneset builder
//!
//! Tables arrive at the process boundary as delimited text files with a
//! header row; the database-joining step that produces them lives upstream.
//! Cells matching one of the NA tokens are treated as missing. Several
//! files listed under the same table name are row-concatenated with a
//! column union, mirroring how the large tables are assembled upstream.

use anyhow::{Context, Result};
use config::NA_TOKENS;
use hashbrown::{HashMap, HashSet};
use log::debug;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;

/// Gene-list description consumed from the boundary JSON: table names
/// mapped to the delimited files that form them, plus the ordered
/// (source, sink) structure pairs driving composite assembly.
#[derive(Debug, Deserialize)]
pub struct GeneLists {
    pub tables: HashMap<String, Vec<PathBuf>>,
    pub structure: Vec<(String, String)>,
}

pub fn read_gene_lists(path: &PathBuf) -> Result<GeneLists> {
    let file = File::open(path).with_context(|| format!("ERROR: cannot open {:?}", path))?;
    let lists: GeneLists = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("ERROR: invalid gene-list JSON in {:?}", path))?;

    Ok(lists)
}

/// In-memory column-major annotation table. One identifier column plus any
/// number of categorical columns; cells are `None` when missing.
#[derive(Debug, Clone, Default)]
pub struct AnnotationTable {
    columns: HashMap<String, Vec<Option<String>>>,
    n_rows: usize,
}

impl AnnotationTable {
    pub fn len(&self) -> usize {
        self.n_rows
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn has_column(&self, col: &str) -> bool {
        self.columns.contains_key(col)
    }

    /// Column names in sorted order. Traversal order matters: reruns must
    /// produce byte-identical trees.
    pub fn column_names(&self) -> Vec<&str> {
        let mut cols: Vec<&str> = self.columns.keys().map(|c| c.as_str()).collect();
        cols.sort_unstable();
        cols
    }

    /// Fraction of missing cells in `col`; unknown columns count as fully
    /// missing.
    pub fn missing_fraction(&self, col: &str) -> f64 {
        if self.n_rows == 0 {
            return 1.0;
        }

        self.columns
            .get(col)
            .map(|cells| cells.iter().filter(|c| c.is_none()).count() as f64 / self.n_rows as f64)
            .unwrap_or(1.0)
    }

    /// Row counts of the distinct non-missing values of `col`, sorted by
    /// value.
    pub fn value_counts(&self, col: &str) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        if let Some(cells) = self.columns.get(col) {
            for cell in cells.iter().flatten() {
                *counts.entry(cell.clone()).or_insert(0) += 1;
            }
        }

        counts
    }

    /// Deduplicated identifiers of the rows where `col` equals `value`.
    pub fn ids_where(&self, id_col: &str, col: &str, value: &str) -> HashSet<String> {
        let (Some(ids), Some(cells)) = (self.columns.get(id_col), self.columns.get(col)) else {
            return HashSet::new();
        };

        ids.iter()
            .zip(cells)
            .filter(|(_, cell)| cell.as_deref() == Some(value))
            .filter_map(|(id, _)| id.clone())
            .collect()
    }

    /// All distinct identifiers in the table.
    pub fn unique_ids(&self, id_col: &str) -> HashSet<String> {
        self.columns
            .get(id_col)
            .map(|cells| cells.iter().flatten().cloned().collect())
            .unwrap_or_default()
    }

    /// Sub-table with only the rows where `col` equals `value`, and with
    /// `col` itself dropped (it is constant there).
    pub fn restrict(&self, col: &str, value: &str) -> AnnotationTable {
        let Some(cells) = self.columns.get(col) else {
            return AnnotationTable::default();
        };
        let keep: Vec<bool> = cells.iter().map(|c| c.as_deref() == Some(value)).collect();
        let n_rows = keep.iter().filter(|k| **k).count();

        let columns = self
            .columns
            .iter()
            .filter(|(name, _)| name.as_str() != col)
            .map(|(name, vals)| {
                let kept: Vec<Option<String>> = vals
                    .iter()
                    .zip(&keep)
                    .filter(|(_, k)| **k)
                    .map(|(v, _)| v.clone())
                    .collect();
                (name.clone(), kept)
            })
            .collect();

        AnnotationTable { columns, n_rows }
    }

    /// Row-concatenate `other` onto this table, taking the union of the
    /// column sets and padding absent columns with missing cells.
    pub fn merge(&mut self, other: AnnotationTable) {
        let all: HashSet<String> = self
            .columns
            .keys()
            .chain(other.columns.keys())
            .cloned()
            .collect();
        let (n, m) = (self.n_rows, other.n_rows);

        for col in all {
            let mut cells = self.columns.remove(&col).unwrap_or_else(|| vec![None; n]);
            match other.columns.get(&col) {
                Some(vals) => cells.extend(vals.iter().cloned()),
                None => cells.extend(std::iter::repeat(None).take(m)),
            }
            self.columns.insert(col, cells);
        }

        self.n_rows = n + m;
    }
}

/// Parse a delimited table with a header row into column-major form.
pub fn read_table<R: Read>(reader: R, delimiter: u8) -> Result<AnnotationTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
    let mut columns: HashMap<String, Vec<Option<String>>> = headers
        .iter()
        .map(|h| (h.clone(), Vec::new()))
        .collect();

    let mut n_rows = 0;
    for record in rdr.deserialize() {
        let record: HashMap<String, String> = record?;
        for header in &headers {
            let cell = record.get(header).map(|v| v.as_str()).unwrap_or("");
            let cell = if NA_TOKENS.contains(&cell) {
                None
            } else {
                Some(cell.to_string())
            };
            columns.entry(header.clone()).or_default().push(cell);
        }
        n_rows += 1;
    }

    Ok(AnnotationTable { columns, n_rows })
}

/// Load every table named in the gene-list description, concatenating its
/// member files. Tables come back sorted by name so downstream processing
/// order is stable.
pub fn load_large_tables(
    lists: &GeneLists,
    delimiter: u8,
    id_col: &str,
) -> Result<Vec<(String, AnnotationTable)>> {
    let mut names: Vec<&String> = lists.tables.keys().collect();
    names.sort();

    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        let mut table = AnnotationTable::default();
        for path in &lists.tables[name] {
            debug!("Loading table {} from {:?}", name, path);
            let file =
                File::open(path).with_context(|| format!("ERROR: cannot open {:?}", path))?;
            let part = read_table(BufReader::new(file), delimiter)
                .with_context(|| format!("ERROR: malformed table in {:?}", path))?;
            table.merge(part);
        }

        if !table.has_column(id_col) {
            anyhow::bail!("ERROR: table {} has no {:?} column", name, id_col);
        }

        tables.push((name.clone(), table));
    }

    Ok(tables)
}

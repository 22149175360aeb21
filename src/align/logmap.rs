//! Exact source mapping from a scored alignment file.
//!
//! Reads the RDF/XML output of LogMap (or any tool writing the Alignment API
//! format): one `Cell` per candidate pair with `entity1`, `entity2` and a
//! confidence `measure`. Cells scoring at least the threshold are accepted.

use std::path::{Path, PathBuf};

use oxigraph::io::RdfFormat;

use super::{MappingSource, MappingTable, DEFAULT_THRESHOLD};
use crate::error::{LoadError, LoadResult};
use crate::identifier::strip_default;
use crate::sparql::{LocalStore, QueryService};

/// Alignment API namespace. It has no trailing `#`, so terms read as
/// `...alignmentCell`, `...alignmententity1`.
pub const ALIGNMENT_NS: &str = "http://knowledgeweb.semanticweb.org/heterogeneity/alignment";

/// One candidate equivalence from an alignment file.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentCell {
    pub entity1: String,
    pub entity2: String,
    pub measure: f64,
}

impl AlignmentCell {
    pub fn new(entity1: impl Into<String>, entity2: impl Into<String>, measure: f64) -> Self {
        Self {
            entity1: entity1.into(),
            entity2: entity2.into(),
            measure,
        }
    }
}

/// Accept cells with `measure >= threshold`, in the order given.
///
/// A later accepted cell replaces an earlier one with the same source key.
pub fn accept_cells<'a>(
    cells: impl IntoIterator<Item = &'a AlignmentCell>,
    threshold: f64,
    strip: bool,
) -> MappingTable {
    let mut table = MappingTable::new();
    for cell in cells {
        if cell.measure < threshold {
            continue;
        }
        if strip {
            table.insert(strip_default(&cell.entity1), strip_default(&cell.entity2));
        } else {
            table.insert(cell.entity1.clone(), cell.entity2.clone());
        }
    }
    table
}

/// Alignment loaded from a LogMap RDF/XML output file.
#[derive(Debug, Clone)]
pub struct LogMapMapping {
    path: PathBuf,
    threshold: f64,
    strip: bool,
}

impl LogMapMapping {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            threshold: DEFAULT_THRESHOLD,
            strip: false,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Remove namespaces from both endpoints before storing.
    pub fn with_strip(mut self, strip: bool) -> Self {
        self.strip = strip;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every well-formed cell, ordered by source key then ascending
    /// measure, so the best-scoring accepted cell for a key is seen last.
    /// With strip enabled the source key is the stripped `entity1`.
    pub fn read_cells(&self) -> LoadResult<Vec<AlignmentCell>> {
        let path = self.path.display().to_string();
        let file = std::fs::File::open(&self.path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;

        let store = LocalStore::in_memory(path.clone()).map_err(|e| LoadError::Malformed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        store
            .load(RdfFormat::RdfXml, std::io::BufReader::new(file))
            .map_err(|e| LoadError::Malformed {
                path: path.clone(),
                message: e.to_string(),
            })?;

        let query = format!(
            "SELECT ?e1 ?e2 ?m WHERE {{\n  \
               ?cell a <{ALIGNMENT_NS}Cell> ;\n        \
                     <{ALIGNMENT_NS}entity1> ?e1 ;\n        \
                     <{ALIGNMENT_NS}entity2> ?e2 ;\n        \
                     <{ALIGNMENT_NS}measure> ?m .\n}}"
        );
        let rows = store
            .select(&query, &["e1", "e2", "m"])
            .map_err(|e| LoadError::Malformed {
                path: path.clone(),
                message: e.to_string(),
            })?;

        let mut cells = Vec::with_capacity(rows.len());
        for row in rows {
            let [Some(e1), Some(e2), Some(m)] = <[Option<String>; 3]>::try_from(row)
                .unwrap_or([None, None, None])
            else {
                continue;
            };
            match m.trim().parse::<f64>() {
                Ok(measure) => cells.push(AlignmentCell::new(e1, e2, measure)),
                Err(_) => {
                    tracing::debug!(
                        file = %path,
                        entity1 = %e1,
                        measure = %m,
                        "skipping cell with non-numeric measure"
                    );
                }
            }
        }

        let mut keyed: Vec<(String, AlignmentCell)> = cells
            .into_iter()
            .map(|cell| {
                let key = if self.strip {
                    strip_default(&cell.entity1)
                } else {
                    cell.entity1.clone()
                };
                (key, cell)
            })
            .collect();
        keyed.sort_by(|(ka, a), (kb, b)| ka.cmp(kb).then(a.measure.total_cmp(&b.measure)));
        Ok(keyed.into_iter().map(|(_, cell)| cell).collect())
    }
}

impl MappingSource for LogMapMapping {
    fn describe(&self) -> String {
        format!(
            "logmap {} (threshold {})",
            self.path.display(),
            self.threshold
        )
    }

    fn load(&self) -> LoadResult<MappingTable> {
        let cells = self.read_cells()?;
        let table = accept_cells(&cells, self.threshold, self.strip);
        tracing::debug!(
            file = %self.path.display(),
            cells = cells.len(),
            accepted = table.len(),
            "alignment cells filtered"
        );
        Ok(table)
    }
}

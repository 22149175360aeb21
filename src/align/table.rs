//! Exact source mapping from a downloaded two-column table.
//!
//! One declared correspondence per row, no scoring. Blank lines and lines
//! starting with `#` are skipped; the first data line can be declared a header.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use super::{MappingSource, MappingTable};
use crate::error::{LoadError, LoadResult};

/// Alignment read from a delimited file such as a TSV export.
#[derive(Debug, Clone)]
pub struct TableMapping {
    path: PathBuf,
    delimiter: char,
    has_header: bool,
    from_column: usize,
    to_column: usize,
}

impl TableMapping {
    /// Tab-separated, no header, columns 0 and 1.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: '\t',
            has_header: false,
            from_column: 0,
            to_column: 1,
        }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Pick which columns hold the source and target identifiers.
    pub fn with_columns(mut self, from: usize, to: usize) -> Self {
        self.from_column = from;
        self.to_column = to;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse rows from any reader. `origin` names the input in errors.
    pub fn parse(&self, reader: impl BufRead, origin: &str) -> LoadResult<MappingTable> {
        let mut table = MappingTable::new();
        let mut header_pending = self.has_header;
        let needed = self.from_column.max(self.to_column) + 1;

        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| LoadError::Io {
                path: origin.to_string(),
                source,
            })?;
            let trimmed = line.trim_end_matches(['\r', '\n']);
            if trimmed.trim().is_empty() || trimmed.trim_start().starts_with('#') {
                continue;
            }
            if header_pending {
                header_pending = false;
                continue;
            }

            let fields: Vec<&str> = trimmed.split(self.delimiter).map(str::trim).collect();
            if fields.len() < needed {
                return Err(LoadError::Malformed {
                    path: origin.to_string(),
                    message: format!(
                        "line {}: expected at least {needed} columns, found {}",
                        index + 1,
                        fields.len()
                    ),
                });
            }
            let (from, to) = (fields[self.from_column], fields[self.to_column]);
            if from.is_empty() || to.is_empty() {
                tracing::debug!(file = %origin, line = index + 1, "skipping row with empty identifier");
                continue;
            }
            table.insert(from, to);
        }
        Ok(table)
    }
}

impl MappingSource for TableMapping {
    fn describe(&self) -> String {
        format!("table {}", self.path.display())
    }

    fn load(&self) -> LoadResult<MappingTable> {
        let origin = self.path.display().to_string();
        let file = std::fs::File::open(&self.path).map_err(|source| LoadError::Io {
            path: origin.clone(),
            source,
        })?;
        self.parse(std::io::BufReader::new(file), &origin)
    }
}

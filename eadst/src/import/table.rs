//! Source table loading

use csv::ReaderBuilder;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

use super::error::LoadError;

/// Rows of raw string cells under named columns, in file order
#[derive(Debug, Clone, PartialEq)]
pub struct SourceTable {
    origin: String,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl SourceTable {
    /// Build a table directly; every row is padded or cut to the column count
    pub fn new(origin: impl Into<String>, columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self {
            origin: origin.into(),
            columns,
            rows,
        }
    }

    /// Where the table was loaded from (file path or a caller-supplied label)
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cells of one row, in column order
    pub fn row(&self, index: usize) -> Option<&[String]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[String]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Value of `column` in row `index`
    pub fn cell(&self, index: usize, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.rows.get(index).map(|row| row[col].as_str())
    }
}

/// Reads delimited text files into [`SourceTable`]s
#[derive(Debug, Clone)]
pub struct Loader {
    delimiter: u8,
}

impl Default for Loader {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set custom delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Load a delimited file. The first record is the header row.
    pub fn load_path(&self, path: &Path) -> Result<SourceTable, LoadError> {
        let origin = path.display().to_string();
        debug!(%origin, "Loader::load_path: called");
        let bytes = std::fs::read(path).map_err(|source| LoadError::Unreadable {
            origin: origin.clone(),
            source,
        })?;
        let content = String::from_utf8(bytes).map_err(|source| LoadError::Encoding {
            origin: origin.clone(),
            source,
        })?;
        let table = self.load_str(&content, &origin)?;
        info!(%origin, rows = table.len(), columns = table.columns().len(), "Loaded source table");
        Ok(table)
    }

    /// Parse delimited text already in memory; `origin` labels errors
    pub fn load_str(&self, content: &str, origin: &str) -> Result<SourceTable, LoadError> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        if content.trim().is_empty() {
            return Err(LoadError::Empty(origin.to_string()));
        }

        let malformed = |message: String| LoadError::Malformed {
            origin: origin.to_string(),
            message,
        };

        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| malformed(format!("failed to read header row: {}", e)))?
            .clone();
        if headers.is_empty() {
            return Err(LoadError::Empty(origin.to_string()));
        }

        let mut seen = HashSet::new();
        let mut columns = Vec::with_capacity(headers.len());
        for (position, name) in headers.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(LoadError::BlankColumn {
                    origin: origin.to_string(),
                    position: position + 1,
                });
            }
            if !seen.insert(name) {
                return Err(LoadError::DuplicateColumn {
                    origin: origin.to_string(),
                    column: name.to_string(),
                });
            }
            columns.push(name.to_string());
        }

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|e| malformed(e.to_string()))?;
            if record.len() > columns.len() {
                let line = record.position().map(|p| p.line()).unwrap_or(0);
                return Err(malformed(format!(
                    "line {}: expected {} fields, found {}",
                    line,
                    columns.len(),
                    record.len()
                )));
            }
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(SourceTable::new(origin, columns, rows))
    }
}

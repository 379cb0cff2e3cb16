// 📄 Raw Table Reader
// Delimited text → header + rows of text cells, nothing interpreted yet

use crate::error::{PipelineError, Result};
use csv::ReaderBuilder;
use std::fs;
use std::path::Path;

/// RawTable - a 2D grid of text cells as found in the source file
///
/// `header[0]` labels the row-label column ("States", "Components", ...);
/// the remaining header cells are period labels. Rows are padded or
/// truncated to the header width, which is always at least 2.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Label column plus at least one period column
const MIN_WIDTH: usize = 2;

impl RawTable {
    /// Build a table from in-memory cells
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        if header.len() < MIN_WIDTH {
            return Err(PipelineError::Layout(format!(
                "expected a label column plus period columns, found {} column(s)",
                header.len()
            )));
        }
        let width = header.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Ok(RawTable { header, rows })
    }

    #[cfg(test)]
    pub(crate) fn from_strs(header: &[&str], rows: &[&[&str]]) -> Self {
        RawTable::new(
            header.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
        .expect("fixture has a label column and a period column")
    }

    /// Read a comma-delimited file
    ///
    /// Bytes that are not valid UTF-8 are replaced rather than rejected; the
    /// numeric normalizer strips the resulting replacement characters.
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|source| PipelineError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_bytes(&bytes).map_err(|reason| PipelineError::NotTabular {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Parse delimited bytes; `Err` carries the reason it is not a table
    pub fn parse_bytes(bytes: &[u8]) -> std::result::Result<Self, String> {
        let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes);

        let mut records = reader.byte_records();
        let header: Vec<String> = match records.next() {
            Some(Ok(record)) => record.iter().map(lossy_cell).collect(),
            Some(Err(e)) => return Err(format!("bad header: {}", e)),
            None => return Err("file is empty".to_string()),
        };

        let mut rows = Vec::new();
        for (line_num, result) in records.enumerate() {
            let record =
                result.map_err(|e| format!("failed to parse line {}: {}", line_num + 2, e))?;
            let row: Vec<String> = record.iter().map(lossy_cell).collect();
            if row.iter().all(|c| c.is_empty()) {
                continue;
            }
            rows.push(row);
        }

        RawTable::new(header, rows).map_err(|e| e.to_string())
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Period column labels (everything after the label column)
    pub fn period_labels(&self) -> &[String] {
        &self.header[1..]
    }

    pub fn width(&self) -> usize {
        self.header.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn lossy_cell(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_string()
}

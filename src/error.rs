//! Error types for the normalization pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors surfaced by a table-parse call.
///
/// Cell-level problems never show up here: bad numbers, year-less columns and
/// orphaned rows are dropped and counted in a [`crate::ParseReport`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The source file could not be opened or read
    #[error("Cannot read {}: {source}", path.display())]
    Unreadable {
        /// Path of the source file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The source was read but is not a delimited table
    #[error("{} is not a table: {reason}", path.display())]
    NotTabular {
        /// Path of the source file
        path: PathBuf,
        /// What was wrong with it
        reason: String,
    },

    /// Parsing succeeded but produced no fact records
    #[error("No data in dataset '{dataset}'")]
    EmptyResult {
        /// Dataset (or source) name
        dataset: String,
    },

    /// A table violated its column layout precondition
    #[error("Invalid table layout: {0}")]
    Layout(String),

    /// Dataset name not present in the configuration
    #[error("Unknown dataset: {0}")]
    UnknownDataset(String),

    /// CSV writing/reading error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error outside of source loading (e.g. writing exports)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// True for the "no data" signal that lets callers skip rendering
    pub fn is_empty_result(&self) -> bool {
        matches!(self, PipelineError::EmptyResult { .. })
    }
}

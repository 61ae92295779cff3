use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::FieldName;

/// Error type for configuration, load, schema, and persistence failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Invalid parameters, worker count, or alias table.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A file could not be read or parsed as CSV.
    #[error("failed loading '{}' as tabular data: {reason}", path.display())]
    Load {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying reader error.
        reason: String,
    },
    /// A file lacks a column for a required canonical field.
    #[error("file '{}' has no column resolving to required field '{field}'", path.display())]
    Schema {
        /// File with the incomplete header.
        path: PathBuf,
        /// Canonical field with no matching column.
        field: FieldName,
    },
    /// The worker pool could not be built.
    #[error("worker pool failure: {0}")]
    WorkerPool(String),
    /// Filesystem failure outside a single file load.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// CSV writer failure.
    #[error(transparent)]
    Csv(#[from] csv::Error),
    /// Malformed JSON configuration.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

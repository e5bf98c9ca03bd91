//! Domain-specific errors.

use std::path::PathBuf;

use thiserror::Error;

use super::range::Position;

/// Rejected text range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("range start {start} is after end {end}")]
    Inverted { start: Position, end: Position },
    #[error("negative coordinate {value} in {field}")]
    NegativeCoordinate { field: &'static str, value: i64 },
}

/// Failures surfaced by the question store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid range: {0}")]
    InvalidRange(#[from] RangeError),
    #[error("{0}")]
    Validation(String),
    #[error("question id '{0}' already exists")]
    DuplicateId(String),
    #[error("no question with id '{0}'")]
    NotFound(String),
    #[error("question store at {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("question store at {} is inconsistent: {reason}", path.display())]
    Inconsistent { path: PathBuf, reason: String },
    #[error("failed to access question store at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

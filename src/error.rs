use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    /// The iterator has already yielded every retained entry.
    #[error("no more history entries")]
    NoMoreElements,

    #[error("operation not supported: {0}")]
    UnsupportedOperation(&'static str),

    /// No history file exists yet. Callers usually treat this as an empty history.
    #[error("history file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("malformed history file {}: {reason}", path.display())]
    Format { path: PathBuf, reason: String },

    #[error("not a valid history file: {}", .0.display())]
    InvalidHistoryFile(PathBuf),

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl HistoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, HistoryError::NotFound(_))
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        HistoryError::Io { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, HistoryError>;

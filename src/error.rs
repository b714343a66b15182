use thiserror::Error;

use std::{fmt::Display, path::PathBuf};

/// Fatal conditions that stop a run before any figures are computed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("unknown dedup policy {0:?} (expected one of: first, max_venta, min_costo, avg)")]
    UnknownPolicy(String),

    #[error("{}: missing column {column:?}", path.display())]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("{}: no sheet named {sheet:?}", path.display())]
    MissingSheet { path: PathBuf, sheet: String },
}

/// A single input row that was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub file: PathBuf,
    /// 1-based line (CSV) or row (spreadsheet) number.
    pub line: u64,
    pub message: String,
}

impl RowError {
    pub(crate) fn new(file: impl Into<PathBuf>, line: u64, message: impl Display) -> Self {
        Self {
            file: file.into(),
            line,
            message: message.to_string(),
        }
    }
}

impl Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.file.display(), self.line, self.message)
    }
}

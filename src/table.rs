use anyhow::{Context, Result};
use csv::{Position, ReaderBuilder, StringRecord, Trim};
use serde::de::DeserializeOwned;

use std::path::Path;

use crate::{error::Error, error::RowError, normalize::normalize_header};

/// Rows successfully read from a tabular file, each with its 1-based line
/// number, plus the rows that had to be skipped.
#[derive(Debug)]
pub(crate) struct Rows<T> {
    pub(crate) rows: Vec<(u64, T)>,
    pub(crate) rejected: Vec<RowError>,
}

/// Finds the first header matching any of `aliases`.
///
/// `headers` must already be normalized with [`normalize_header`]. The first
/// alias is the canonical column name used in error messages.
pub(crate) fn require_column(
    headers: &[String],
    aliases: &[&'static str],
    path: &Path,
) -> Result<usize, Error> {
    headers
        .iter()
        .position(|h| aliases.contains(&h.as_str()))
        .ok_or_else(|| Error::MissingColumn {
            path: path.to_path_buf(),
            column: aliases[0],
        })
}

/// Reads the CSV file at `path`, deserializing each record into `T`.
///
/// Headers are normalized and every column in `columns` is renamed to its
/// canonical (first) alias, so `T` only needs `#[serde(rename)]` for those.
/// Records that fail to parse are collected as [`RowError`]s rather than
/// aborting the read.
///
/// # Errors
///
/// Returns errors if the file cannot be opened or read, or a required column
/// is missing.
pub(crate) fn read_csv<T: DeserializeOwned>(
    path: &Path,
    columns: &[&[&'static str]],
) -> Result<Rows<T>> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let headers: Vec<String> = rdr
        .headers()
        .with_context(|| format!("reading {}", path.display()))?
        .iter()
        .map(normalize_header)
        .collect();
    let mut names = headers.clone();
    for aliases in columns {
        let idx = require_column(&headers, aliases, path)?;
        names[idx] = aliases[0].to_string();
    }
    let names = StringRecord::from(names);
    rdr.set_headers(names.clone());

    let mut rows = Rows {
        rows: Vec::new(),
        rejected: Vec::new(),
    };
    for result in rdr.records() {
        let record = match result {
            Ok(record) => record,
            Err(err) if err.is_io_error() => {
                return Err(err).with_context(|| format!("reading {}", path.display()));
            }
            Err(err) => {
                let line = err.position().map_or(0, Position::line);
                rows.rejected.push(RowError::new(path, line, err));
                continue;
            }
        };
        let line = record.position().map_or(0, Position::line);
        match record.deserialize::<T>(Some(&names)) {
            Ok(row) => rows.rows.push((line, row)),
            Err(err) => rows.rejected.push(RowError::new(path, line, field_error(&err))),
        }
    }
    Ok(rows)
}

fn field_error(err: &csv::Error) -> String {
    match err.kind() {
        csv::ErrorKind::Deserialize { err, .. } => err.to_string(),
        _ => err.to_string(),
    }
}

//! Tabular sources
//!
//! Turns a workbook, a CSV file or a directory of CSV files into the ordered
//! list of [`RawSheet`]s the import pipeline consumes.

pub mod delimited;
pub mod workbook;

use anyhow::{Context, Result, bail};
use std::path::Path;

pub use crate::graph::types::{CellKind, RawCell, RawSheet};
pub use delimited::read_csv;
pub use workbook::read_workbook;

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Read sheets from `path`, dispatching on its extension
///
/// A directory yields every `*.csv` file inside it, in file name order.
pub fn read_source<P: AsRef<Path>>(path: P) -> Result<Vec<RawSheet>> {
    let path = path.as_ref();

    if path.is_dir() {
        let mut files: Vec<_> = std::fs::read_dir(path)
            .with_context(|| format!("Failed to list directory: {}", path.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| has_extension(p, &["csv"]))
            .collect();
        files.sort();
        if files.is_empty() {
            bail!("No CSV files found in {}", path.display());
        }
        return files.iter().map(read_csv).collect();
    }

    if has_extension(path, &["csv"]) {
        return Ok(vec![read_csv(path)?]);
    }
    if has_extension(path, WORKBOOK_EXTENSIONS) {
        return read_workbook(path);
    }
    bail!(
        "Unsupported input '{}': expected a workbook ({}), a CSV file or a directory of CSV files",
        path.display(),
        WORKBOOK_EXTENSIONS.join(", ")
    )
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
}

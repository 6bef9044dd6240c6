//! Read CSV files into raw sheets

use anyhow::{Context, Result};
use std::path::Path;

use crate::graph::types::{RawCell, RawSheet};

/// Read one CSV file as one sheet named after the file stem
///
/// CSV cells carry no type, so each cell's kind is inferred from its text.
pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<RawSheet> {
    let path = path.as_ref();
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .with_context(|| format!("Invalid CSV file name: {}", path.display()))?
        .to_string();

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("Failed to read CSV header row: {}", path.display()))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record
            .with_context(|| format!("Failed to read CSV row {} in {}", idx + 2, path.display()))?;
        rows.push(record.iter().map(RawCell::infer).collect());
    }

    log::debug!("Read CSV sheet '{}': {} row(s)", name, rows.len());
    Ok(RawSheet::new(name, headers, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::types::CellKind;

    #[test]
    fn test_read_csv_infers_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("#Employee.csv");
        std::fs::write(
            &path,
            "\u{feff}*Department.nome,nome,age,active\nSales,\"Alice, Jr.\",30,TRUE\nOps,Bob,,false\n",
        )
        .unwrap();

        let sheet = read_csv(&path).unwrap();
        assert_eq!(sheet.name, "#Employee");
        assert_eq!(sheet.headers, vec!["*Department.nome", "nome", "age", "active"]);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0][1], RawCell::text("Alice, Jr."));
        assert_eq!(sheet.rows[0][2], RawCell::number("30"));
        assert_eq!(sheet.rows[0][3].kind, CellKind::Bool);
        assert_eq!(sheet.rows[1][2], RawCell::blank());
    }
}

//! Read spreadsheets (`.xlsx`, `.xls`, `.ods`) into raw sheets

use anyhow::{Context, Result};
use calamine::{Data, Reader, open_workbook_auto};
use std::path::Path;

use crate::graph::types::{CellKind, RawCell, RawSheet};

/// Display format for date cells
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Convert a spreadsheet cell to a raw cell
///
/// Whole numbers lose their fractional part, dates become `dd/mm/yyyy`,
/// error cells are blank.
pub fn cell_to_raw(cell: &Data) -> RawCell {
    match cell {
        Data::Empty | Data::Error(_) => RawCell::blank(),
        Data::String(s) if s.trim().is_empty() => RawCell::blank(),
        Data::String(s) => RawCell::text(s.clone()),
        Data::Int(i) => RawCell::number(i.to_string()),
        Data::Float(f) => {
            if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                RawCell::number((*f as i64).to_string())
            } else {
                RawCell::number(f.to_string())
            }
        }
        Data::Bool(b) => RawCell::boolean(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) => RawCell::new(CellKind::Date, datetime.format(DATE_FORMAT).to_string()),
            None => RawCell::number(dt.as_f64().to_string()),
        },
        Data::DateTimeIso(s) => match chrono::NaiveDate::parse_from_str(s.get(..10).unwrap_or(s), "%Y-%m-%d") {
            Ok(date) => RawCell::new(CellKind::Date, date.format(DATE_FORMAT).to_string()),
            Err(_) => RawCell::text(s.clone()),
        },
        Data::DurationIso(s) => RawCell::text(s.clone()),
    }
}

/// Header text of a cell
fn header_text(cell: &Data) -> String {
    match cell_to_raw(cell) {
        raw if raw.is_blank() => String::new(),
        raw => raw.text.trim().to_string(),
    }
}

/// Read every worksheet of a workbook, in workbook order
///
/// The first used row of each sheet is its header row. Empty sheets are
/// returned with no headers.
pub fn read_workbook<P: AsRef<Path>>(path: P) -> Result<Vec<RawSheet>> {
    let path = path.as_ref();
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook: {}", path.display()))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let mut sheets = Vec::new();

    for sheet_name in sheet_names {
        let range = workbook
            .worksheet_range(&sheet_name)
            .with_context(|| format!("Failed to read sheet: {}", sheet_name))?;

        let header_row = range.start().map(|(row, _)| row as usize + 1).unwrap_or(1);
        let mut rows = range.rows();
        let headers: Vec<String> = rows
            .next()
            .map(|r| r.iter().map(header_text).collect())
            .unwrap_or_default();
        let rows: Vec<Vec<RawCell>> = rows.map(|r| r.iter().map(cell_to_raw).collect()).collect();

        log::debug!(
            "Read sheet '{}': {} column(s), {} row(s)",
            sheet_name,
            headers.len(),
            rows.len()
        );
        sheets.push(RawSheet::new(sheet_name, headers, rows).with_header_row(header_row));
    }

    log::info!("Read {} sheet(s) from {}", sheets.len(), path.display());
    Ok(sheets)
}

//! Sheets and sheet classification
//!
//! Sheet names carry meaning:
//! - `Department` - ordinary entity sheet, one create per row
//! - `#Employee` - composition sheet, rows created nested in their parent
//! - `_mapping` - rename directive (old name, new name), applied then dropped

use std::collections::{HashMap, HashSet};

use super::cell::RawCell;
use super::header::{Header, Reference};
use crate::graph::error::ImportError;
use crate::graph::events::EventSink;

/// Prefix marking a composition sheet
pub const COMPOSITION_MARKER: char = '#';

/// Name of the sheet holding rename directives (case-insensitive)
pub const MAPPING_SHEET_NAME: &str = "_mapping";

/// A sheet as produced by the tabular source, before header parsing
#[derive(Debug, Clone, PartialEq)]
pub struct RawSheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<RawCell>>,
    /// 1-based workbook row number of the header row
    pub header_row: usize,
}

impl RawSheet {
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<RawCell>>) -> Self {
        RawSheet {
            name: name.into(),
            headers,
            rows,
            header_row: 1,
        }
    }

    pub fn with_header_row(mut self, header_row: usize) -> Self {
        self.header_row = header_row;
        self
    }

    pub fn is_mapping(&self) -> bool {
        self.name.trim().eq_ignore_ascii_case(MAPPING_SHEET_NAME)
    }

    pub fn is_composition(&self) -> bool {
        self.name.trim().starts_with(COMPOSITION_MARKER)
    }

    /// Entity type name for an ordinary sheet
    pub fn entity_name(&self) -> &str {
        self.name.trim()
    }
}

/// Kind of a (non-mapping) sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetKind {
    /// Rows become `create` mutations of the sheet's entity type
    Entity,
    /// Rows become nested creates inside an update of their parent
    Composition,
}

impl std::fmt::Display for SheetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetKind::Entity => write!(f, "entity"),
            SheetKind::Composition => write!(f, "composition"),
        }
    }
}

/// A data row, aligned with the sheet's parsed headers
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// 1-based workbook row number, for error reporting
    pub number: usize,
    pub cells: Vec<RawCell>,
}

impl Row {
    pub fn cell(&self, col: usize) -> Option<&RawCell> {
        self.cells.get(col)
    }

    /// Non-blank cell of column `col`
    pub fn value(&self, col: usize) -> Option<&RawCell> {
        self.cell(col).filter(|cell| !cell.is_blank())
    }
}

/// A classified sheet with parsed headers
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    name: String,
    kind: SheetKind,
    headers: Vec<Header>,
    rows: Vec<Row>,
}

impl Sheet {
    /// Classify a raw sheet and parse its headers
    ///
    /// Columns with an empty header are dropped, as are rows that are blank in
    /// every remaining column. A composition sheet's first column must be a
    /// reference to the parent entity.
    pub fn parse(raw: &RawSheet) -> Result<Self, ImportError> {
        let name = raw.name.trim().to_string();
        let kind = if raw.is_composition() {
            SheetKind::Composition
        } else {
            SheetKind::Entity
        };

        let mut headers = Vec::new();
        let mut columns = Vec::new();
        let mut seen = HashSet::new();
        for (idx, text) in raw.headers.iter().enumerate() {
            if text.trim().is_empty() {
                continue;
            }
            let header = Header::parse(text).map_err(|source| ImportError::HeaderParse {
                sheet: name.clone(),
                source,
            })?;
            if !seen.insert(header.key().to_string()) {
                return Err(ImportError::InvalidSheet {
                    sheet: name,
                    reason: format!("duplicate column '{}'", header.key()),
                });
            }
            headers.push(header);
            columns.push(idx);
        }

        if kind == SheetKind::Composition
            && !headers.first().is_some_and(|header| header.is_reference())
        {
            return Err(ImportError::InvalidSheet {
                sheet: name,
                reason: "the first column of a composition sheet must reference the parent entity (e.g. '*Parent.attribute')".to_string(),
            });
        }

        let rows = raw
            .rows
            .iter()
            .enumerate()
            .filter_map(|(idx, cells)| {
                let cells: Vec<RawCell> = columns
                    .iter()
                    .map(|&col| cells.get(col).cloned().unwrap_or_else(RawCell::blank))
                    .collect();
                if cells.iter().all(RawCell::is_blank) {
                    return None;
                }
                Some(Row {
                    number: raw.header_row + 1 + idx,
                    cells,
                })
            })
            .collect();

        Ok(Sheet {
            name,
            kind,
            headers,
            rows,
        })
    }

    /// Sheet name as it appears in the workbook (after renaming)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SheetKind {
        self.kind
    }

    pub fn is_composition(&self) -> bool {
        self.kind == SheetKind::Composition
    }

    /// Entity type for ordinary sheets, composition role for composition sheets
    pub fn entity_name(&self) -> &str {
        match self.kind {
            SheetKind::Entity => &self.name,
            SheetKind::Composition => self.role_name(),
        }
    }

    /// Composition role name: the sheet name without its marker
    pub fn role_name(&self) -> &str {
        self.name
            .strip_prefix(COMPOSITION_MARKER)
            .unwrap_or(&self.name)
            .trim()
    }

    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Reference to the parent entity (first column of a composition sheet)
    pub fn parent_reference(&self) -> Option<&Reference> {
        match self.kind {
            SheetKind::Composition => self.headers.first().and_then(Header::reference),
            SheetKind::Entity => None,
        }
    }

    /// Index of the plain column filling attribute `name`
    pub fn attribute_column(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|header| !header.is_reference() && header.attribute_name() == name)
    }
}

/// Apply the `_mapping` sheet, if any, and drop it
///
/// The mapping sheet must have exactly two columns; each data row renames the
/// sheet named in the first column to the name in the second.
pub fn apply_sheet_mapping(
    mut sheets: Vec<RawSheet>,
    events: &dyn EventSink,
) -> Result<Vec<RawSheet>, ImportError> {
    let mapping_positions: Vec<usize> = sheets
        .iter()
        .enumerate()
        .filter(|(_, sheet)| sheet.is_mapping())
        .map(|(idx, _)| idx)
        .collect();

    let position = match mapping_positions.as_slice() {
        [] => return Ok(sheets),
        [position] => *position,
        _ => {
            return Err(ImportError::InvalidSheet {
                sheet: MAPPING_SHEET_NAME.to_string(),
                reason: "more than one mapping sheet".to_string(),
            });
        }
    };

    let mapping = sheets.remove(position);
    let columns: Vec<usize> = mapping
        .headers
        .iter()
        .enumerate()
        .filter(|(_, h)| !h.trim().is_empty())
        .map(|(idx, _)| idx)
        .collect();
    let [old_col, new_col] = columns.as_slice() else {
        return Err(ImportError::InvalidSheet {
            sheet: mapping.name,
            reason: format!(
                "mapping sheet must have exactly two columns (old name, new name), found {}",
                columns.len()
            ),
        });
    };

    let mut renames: HashMap<String, String> = HashMap::new();
    for row in &mapping.rows {
        let old = row.get(*old_col).map(|c| c.text.trim()).unwrap_or("");
        let new = row.get(*new_col).map(|c| c.text.trim()).unwrap_or("");
        if old.is_empty() || new.is_empty() {
            continue;
        }
        renames.insert(old.to_string(), new.to_string());
    }

    for sheet in &mut sheets {
        if let Some(new_name) = renames.get(sheet.name.trim()) {
            events.info(&format!("Sheet '{}' renamed to '{}'", sheet.name, new_name));
            sheet.name = new_name.clone();
        }
    }

    Ok(sheets)
}

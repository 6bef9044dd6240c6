//! Import errors
//!
//! [`ImportError`] aborts the run. [`RowIssue`] records a row that was dropped
//! while the rest of its sheet carried on.

use serde::Serialize;

use crate::api::ExecuteError;
use crate::graph::types::HeaderParseError;

/// Fatal error raised while compiling or executing an import
#[derive(Debug)]
pub enum ImportError {
    /// A column header could not be parsed
    HeaderParse {
        sheet: String,
        source: HeaderParseError,
    },
    /// A lookup returned more than one identifier for the same source value
    AmbiguousReference {
        class: String,
        attribute: String,
        /// Every duplicated source value, sorted
        values: Vec<String>,
    },
    /// A reference value of an entity row has no resolved identifier
    UnresolvedReference {
        sheet: String,
        /// 1-based workbook row number
        row: usize,
        column: String,
        value: String,
    },
    /// The lookup request for a reference failed
    Resolution {
        class: String,
        attribute: String,
        source: ExecuteError,
    },
    /// A mutation request failed
    Execution {
        sheet: String,
        source: ExecuteError,
    },
    /// Sheet structure is unusable
    InvalidSheet { sheet: String, reason: String },
    /// Nested compositions reference each other in a loop
    CompositionCycle { sheets: Vec<String> },
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::HeaderParse { sheet, source } => {
                write!(f, "Sheet '{}': {}", sheet, source)
            }
            ImportError::AmbiguousReference {
                class,
                attribute,
                values,
            } => write!(
                f,
                "Ambiguous reference: {}.{} matches more than one record for value(s) [{}]",
                class,
                attribute,
                values.join(", ")
            ),
            ImportError::UnresolvedReference {
                sheet,
                row,
                column,
                value,
            } => write!(
                f,
                "Sheet '{}', row {}, column '{}': no record found for '{}'",
                sheet, row, column, value
            ),
            ImportError::Resolution {
                class,
                attribute,
                source,
            } => write!(f, "Lookup of {}.{} failed: {}", class, attribute, source),
            ImportError::Execution { sheet, source } => {
                write!(f, "Sheet '{}': mutation failed: {}", sheet, source)
            }
            ImportError::InvalidSheet { sheet, reason } => {
                write!(f, "Sheet '{}': {}", sheet, reason)
            }
            ImportError::CompositionCycle { sheets } => write!(
                f,
                "Composition sheets form a cycle: {}",
                sheets.join(" -> ")
            ),
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::HeaderParse { source, .. } => Some(source),
            ImportError::Resolution { source, .. } | ImportError::Execution { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }
}

/// Why a row was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowIssueReason {
    /// Composition row without a parent reference value
    MissingParent,
    /// Composition row whose parent reference did not resolve
    UnresolvedParent,
    /// Composition row with another reference that did not resolve
    UnresolvedReference,
}

impl std::fmt::Display for RowIssueReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowIssueReason::MissingParent => write!(f, "missing parent reference"),
            RowIssueReason::UnresolvedParent => write!(f, "parent reference not found"),
            RowIssueReason::UnresolvedReference => write!(f, "reference not found"),
        }
    }
}

/// A non-fatal row-level data problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowIssue {
    pub sheet: String,
    pub row: usize,
    pub column: String,
    pub value: String,
    pub reason: RowIssueReason,
}

impl std::fmt::Display for RowIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.value.is_empty() {
            write!(
                f,
                "Sheet '{}', row {}, column '{}': {} (row skipped)",
                self.sheet, self.row, self.column, self.reason
            )
        } else {
            write!(
                f,
                "Sheet '{}', row {}, column '{}': {} for '{}' (row skipped)",
                self.sheet, self.row, self.column, self.reason, self.value
            )
        }
    }
}

//! Core data types: headers, cells, sheets and mutation payload trees

pub mod cell;
pub mod header;
pub mod node;
pub mod sheet;

pub use cell::{CellKind, QuotingPlan, RawCell};
pub use header::{Header, HeaderKind, HeaderParseError, HeaderParseErrorKind, Reference};
pub use node::Node;
pub use sheet::{RawSheet, Row, Sheet, SheetKind, apply_sheet_mapping};

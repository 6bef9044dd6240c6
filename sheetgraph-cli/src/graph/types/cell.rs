//! Cell values and literal formatting
//!
//! Formatting happens in two passes. [`QuotingPlan::scan`] first decides for
//! every column whether its values must be sent as string literals; only then
//! are literals produced, so the output never depends on row order.

use serde::{Deserialize, Serialize};

use super::header::Header;
use super::sheet::Sheet;

/// Type of a cell as reported by the tabular source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellKind {
    Blank,
    Text,
    Number,
    Bool,
    Date,
}

/// A cell as read from the source: its type plus its text rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCell {
    pub kind: CellKind,
    pub text: String,
}

impl RawCell {
    pub fn new(kind: CellKind, text: impl Into<String>) -> Self {
        RawCell {
            kind,
            text: text.into(),
        }
    }

    pub fn blank() -> Self {
        RawCell::new(CellKind::Blank, "")
    }

    pub fn text(text: impl Into<String>) -> Self {
        RawCell::new(CellKind::Text, text)
    }

    pub fn number(text: impl Into<String>) -> Self {
        RawCell::new(CellKind::Number, text)
    }

    pub fn boolean(value: bool) -> Self {
        RawCell::new(CellKind::Bool, value.to_string())
    }

    /// Build a cell from untyped text, inferring its kind
    ///
    /// Used for sources without cell types (CSV): `true`/`false` become
    /// booleans, anything parseable as a number becomes a number.
    pub fn infer(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return RawCell::blank();
        }
        if trimmed.eq_ignore_ascii_case("true") || trimmed.eq_ignore_ascii_case("false") {
            return RawCell::new(CellKind::Bool, trimmed.to_lowercase());
        }
        if normalize_number(trimmed).is_some() {
            return RawCell::number(trimmed);
        }
        RawCell::text(text)
    }

    pub fn is_blank(&self) -> bool {
        self.kind == CellKind::Blank || self.text.trim().is_empty()
    }

    /// Whether this value cannot be sent bare, regardless of its column
    fn needs_quotation(&self) -> bool {
        match self.kind {
            CellKind::Blank => false,
            CellKind::Bool => parse_bool(&self.text).is_none(),
            CellKind::Number => integral_literal(&self.text).is_none(),
            CellKind::Text | CellKind::Date => true,
        }
    }
}

/// Canonical plain-decimal rendering of a number, trailing zeros stripped
///
/// Returns `None` when the text is not a finite number.
/// `"42.500"` -> `"42.5"`, `"42.0"` -> `"42"`, `"1e3"` -> `"1000"`.
pub fn normalize_number(text: &str) -> Option<String> {
    let text = text.trim();
    let value: f64 = text.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    if text.contains(['e', 'E']) {
        return Some(format!("{}", value));
    }

    let (negative, digits) = match text.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
    let int_part = match int_part.trim_start_matches('0') {
        "" => "0",
        trimmed => trimmed,
    };
    let frac_part = frac_part.trim_end_matches('0');

    let body = if frac_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{}.{}", int_part, frac_part)
    };
    if negative && body != "0" {
        Some(format!("-{}", body))
    } else {
        Some(body)
    }
}

/// Normalized integer literal, or `None` if the text is not an integral number
pub fn integral_literal(text: &str) -> Option<String> {
    normalize_number(text).filter(|n| !n.contains('.'))
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Escape text for embedding in a string literal
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

/// Wrap text in quotes, escaping it
pub fn quote(text: &str) -> String {
    format!("\"{}\"", escape(text))
}

/// Per-column quoting decision for one sheet
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuotingPlan {
    quoted: Vec<bool>,
}

impl QuotingPlan {
    /// Scan every row of a sheet and fix the quoting of each column
    ///
    /// A column is quoted when its header forces it (`§`) or when any
    /// non-blank value in it cannot be sent bare. Blank cells do not count.
    pub fn scan(sheet: &Sheet) -> Self {
        let quoted = sheet
            .headers()
            .iter()
            .enumerate()
            .map(|(col, header)| {
                header.forced_quotation()
                    || sheet.rows().iter().any(|row| {
                        row.cell(col)
                            .is_some_and(|cell| !cell.is_blank() && cell.needs_quotation())
                    })
            })
            .collect();
        QuotingPlan { quoted }
    }

    /// Whether column `col` is sent as string literals
    pub fn is_quoted(&self, col: usize) -> bool {
        self.quoted.get(col).copied().unwrap_or(true)
    }

    /// Format a cell of column `col` as a mutation literal
    ///
    /// Blank cells yield `None`: the attribute is omitted, never sent empty.
    pub fn format(&self, col: usize, header: &Header, cell: &RawCell) -> Option<String> {
        if cell.is_blank() {
            return None;
        }
        let text = cell.text.trim();
        let literal = match cell.kind {
            CellKind::Bool => match parse_bool(text) {
                Some(value) if header.forced_quotation() => quote(&value.to_string()),
                Some(value) => value.to_string(),
                None => quote(text),
            },
            CellKind::Number => match integral_literal(text) {
                Some(integer) if !self.is_quoted(col) => integer,
                Some(integer) => quote(&integer),
                None => quote(text),
            },
            CellKind::Text | CellKind::Date | CellKind::Blank => quote(&cell.text),
        };
        Some(literal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::types::sheet::{RawSheet, Sheet};

    fn sheet(headers: &[&str], rows: Vec<Vec<RawCell>>) -> Sheet {
        let raw = RawSheet::new(
            "Department",
            headers.iter().map(|h| h.to_string()).collect(),
            rows,
        );
        Sheet::parse(&raw).unwrap()
    }

    #[test]
    fn test_normalize_number() {
        assert_eq!(normalize_number("42"), Some("42".to_string()));
        assert_eq!(normalize_number("42.0"), Some("42".to_string()));
        assert_eq!(normalize_number("42.500"), Some("42.5".to_string()));
        assert_eq!(normalize_number("-0.0"), Some("0".to_string()));
        assert_eq!(normalize_number("007"), Some("7".to_string()));
        assert_eq!(normalize_number(".5"), Some("0.5".to_string()));
        assert_eq!(normalize_number("1e3"), Some("1000".to_string()));
        assert_eq!(normalize_number("+12"), Some("12".to_string()));
        assert_eq!(normalize_number("abc"), None);
        assert_eq!(normalize_number("inf"), None);
        assert_eq!(normalize_number(""), None);
    }

    #[test]
    fn test_integral_literal() {
        assert_eq!(integral_literal("123.0"), Some("123".to_string()));
        assert_eq!(integral_literal("123.5"), None);
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("a\"b\\c\nd\re\tf"), "a\\\"b\\\\c\\nd\\re\\tf");
        assert_eq!(quote("Sales"), "\"Sales\"");
    }

    #[test]
    fn test_infer() {
        assert_eq!(RawCell::infer("TRUE"), RawCell::new(CellKind::Bool, "true"));
        assert_eq!(RawCell::infer("12.5").kind, CellKind::Number);
        assert_eq!(RawCell::infer("  ").kind, CellKind::Blank);
        assert_eq!(RawCell::infer("Sales").kind, CellKind::Text);
    }

    #[test]
    fn test_integer_column_is_bare() {
        let sheet = sheet(
            &["code"],
            vec![vec![RawCell::number("42")], vec![RawCell::number("7.0")]],
        );
        let plan = QuotingPlan::scan(&sheet);
        let header = &sheet.headers()[0];
        assert!(!plan.is_quoted(0));
        assert_eq!(plan.format(0, header, &RawCell::number("42")), Some("42".to_string()));
        assert_eq!(plan.format(0, header, &RawCell::number("7.0")), Some("7".to_string()));
    }

    #[test]
    fn test_fractional_value_quotes_whole_column() {
        // the fractional value comes last: earlier rows are still quoted
        let sheet = sheet(
            &["code"],
            vec![vec![RawCell::number("42")], vec![RawCell::number("42.5")]],
        );
        let plan = QuotingPlan::scan(&sheet);
        let header = &sheet.headers()[0];
        assert!(plan.is_quoted(0));
        assert_eq!(plan.format(0, header, &RawCell::number("42")), Some("\"42\"".to_string()));
        assert_eq!(
            plan.format(0, header, &RawCell::number("42.5")),
            Some("\"42.5\"".to_string())
        );
    }

    #[test]
    fn test_text_value_quotes_numeric_column() {
        let sheet = sheet(
            &["code"],
            vec![vec![RawCell::text("A12")], vec![RawCell::number("12")]],
        );
        let plan = QuotingPlan::scan(&sheet);
        assert_eq!(
            plan.format(0, &sheet.headers()[0], &RawCell::number("12")),
            Some("\"12\"".to_string())
        );
    }

    #[test]
    fn test_blank_cells_do_not_latch_quotation() {
        let sheet = sheet(
            &["code"],
            vec![vec![RawCell::blank()], vec![RawCell::number("12")]],
        );
        let plan = QuotingPlan::scan(&sheet);
        assert!(!plan.is_quoted(0));
        assert_eq!(plan.format(0, &sheet.headers()[0], &RawCell::blank()), None);
    }

    #[test]
    fn test_forced_quotation() {
        let sheet = sheet(&["§cap"], vec![vec![RawCell::number("00100")]]);
        let plan = QuotingPlan::scan(&sheet);
        assert!(plan.is_quoted(0));
        assert_eq!(
            plan.format(0, &sheet.headers()[0], &RawCell::number("100")),
            Some("\"100\"".to_string())
        );
    }

    #[test]
    fn test_booleans_are_bare() {
        let sheet = sheet(
            &["active"],
            vec![vec![RawCell::boolean(true)], vec![RawCell::new(CellKind::Bool, "FALSE")]],
        );
        let plan = QuotingPlan::scan(&sheet);
        let header = &sheet.headers()[0];
        assert_eq!(plan.format(0, header, &RawCell::boolean(true)), Some("true".to_string()));
        assert_eq!(
            plan.format(0, header, &RawCell::new(CellKind::Bool, "FALSE")),
            Some("false".to_string())
        );
    }

    #[test]
    fn test_forced_quotation_applies_to_booleans() {
        let sheet = sheet(
            &["§active"],
            vec![vec![RawCell::boolean(true)], vec![RawCell::infer("FALSE")]],
        );
        let plan = QuotingPlan::scan(&sheet);
        let header = &sheet.headers()[0];
        assert_eq!(
            plan.format(0, header, &RawCell::boolean(true)),
            Some("\"true\"".to_string())
        );
        assert_eq!(
            plan.format(0, header, &RawCell::infer("FALSE")),
            Some("\"false\"".to_string())
        );
    }

    #[test]
    fn test_text_is_escaped() {
        let sheet = sheet(&["note"], vec![vec![RawCell::text("say \"hi\"\n")]]);
        let plan = QuotingPlan::scan(&sheet);
        assert_eq!(
            plan.format(0, &sheet.headers()[0], &RawCell::text("say \"hi\"\n")),
            Some("\"say \\\"hi\\\"\\n\"".to_string())
        );
    }
}

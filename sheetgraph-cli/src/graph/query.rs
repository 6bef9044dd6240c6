//! Lookup query text

use super::types::header::ID_ATTRIBUTE;

/// Page size requested by lookups; large enough to return every match of one batch
pub const LOOKUP_PAGE_SIZE: u32 = 999_999;

/// Build a "get page where attribute in [values]" query for one batch
///
/// `literals` are already formatted (quoted or bare). The projection lists
/// the attribute and `_id`, or only `_id` for lookups by identifier.
pub fn build_lookup_query(class: &str, attribute: &str, literals: &[String]) -> String {
    let mut projection = String::new();
    if attribute != ID_ATTRIBUTE {
        projection.push_str(&format!("      {}\n", attribute));
    }
    projection.push_str(&format!("      {}\n", ID_ATTRIBUTE));

    format!(
        "query {{\n  {class}___getPage(options: {{\n    filter: {{\n      {attribute}___in: [{values}]\n    }}\n    offset: 0,\n    next: {next}\n  }}) {{\n    items {{\n{projection}    }}\n  }}\n}}",
        class = class,
        attribute = attribute,
        values = literals.join(", "),
        next = LOOKUP_PAGE_SIZE,
        projection = projection,
    )
}

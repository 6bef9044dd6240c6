//! Column header semantics
//!
//! The first row of every sheet names its columns. Besides plain attribute
//! names a header can encode a reference to another entity type and a
//! quoting hint:
//!
//! - `nome` - plain attribute
//! - `§cap` - plain attribute whose values are always sent as strings
//! - `*Department.nome` - reference to a `Department` matched by its `nome`
//! - `*Disease[hepatic_disease].nome` - same, stored under an explicit role name
//! - `*Sensor._id` - reference by primary identifier

use once_cell::sync::Lazy;
use regex::Regex;

/// Prefix marking a column as an external reference
pub const REFERENCE_MARKER: char = '*';

/// Prefix forcing string quotation for every value in the column
pub const FORCE_QUOTE_MARKER: char = '§';

/// Separator between class name and attribute name in a reference header
pub const SEPARATOR: char = '.';

/// Attribute name meaning "the primary identifier itself"
pub const ID_ATTRIBUTE: &str = "_id";

/// `Class` or `Class[role]`
static CLASS_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<class>[^\[\]]*?)\s*(?:\[(?P<role>[^\[\]]*)\])?$").expect("class segment regex")
});

/// A reference to another entity type, parsed from a header like `*Class[role].attribute`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    /// Referenced entity type (e.g., "Department")
    pub class_name: String,
    /// Attribute of the referenced type used for matching (e.g., "nome")
    pub attribute_name: String,
    /// Attribute under which the resolved identifier is stored in the mutation
    pub role_name: String,
}

impl Reference {
    /// Whether the reference targets the primary identifier directly
    pub fn is_by_id(&self) -> bool {
        self.attribute_name == ID_ATTRIBUTE
    }
}

/// What a column means
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderKind {
    /// Plain attribute copied into the mutation
    Attribute { name: String },
    /// External reference resolved to an identifier before emission
    Reference(Reference),
}

/// A parsed column header. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    raw: String,
    kind: HeaderKind,
    forced_quotation: bool,
}

/// Why a header could not be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderParseErrorKind {
    /// Nothing left after stripping markers
    Empty,
    /// `*` marker without a class/attribute separator
    MissingSeparator,
    /// More than one separator (`*A.b.c`)
    ExtraSeparator,
    /// Empty class segment (`*.nome`)
    EmptyClass,
    /// Empty attribute segment (`*Department.`)
    EmptyAttribute,
    /// Unbalanced or misplaced `[role]` segment, or an empty role
    MalformedRole,
}

impl HeaderParseErrorKind {
    fn describe(&self) -> &'static str {
        match self {
            HeaderParseErrorKind::Empty => "header is empty",
            HeaderParseErrorKind::MissingSeparator => {
                "reference header must have the form 'Class.attribute'"
            }
            HeaderParseErrorKind::ExtraSeparator => {
                "reference header must contain exactly one '.' separator"
            }
            HeaderParseErrorKind::EmptyClass => "referenced class name is empty",
            HeaderParseErrorKind::EmptyAttribute => "referenced attribute name is empty",
            HeaderParseErrorKind::MalformedRole => {
                "role name must be a non-empty '[role]' segment right before the separator"
            }
        }
    }
}

/// Malformed column header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderParseError {
    /// The offending header text
    pub header: String,
    pub kind: HeaderParseErrorKind,
}

impl std::fmt::Display for HeaderParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid header '{}': {}", self.header, self.kind.describe())
    }
}

impl std::error::Error for HeaderParseError {}

impl Header {
    /// Parse a raw column name
    pub fn parse(raw: &str) -> Result<Self, HeaderParseError> {
        let err = |kind| HeaderParseError {
            header: raw.to_string(),
            kind,
        };

        let mut rest = raw.trim();
        let mut marked = false;
        let mut forced_quotation = false;
        loop {
            if let Some(stripped) = rest.strip_prefix(REFERENCE_MARKER) {
                marked = true;
                rest = stripped;
            } else if let Some(stripped) = rest.strip_prefix(FORCE_QUOTE_MARKER) {
                forced_quotation = true;
                rest = stripped;
            } else {
                break;
            }
        }
        let rest = rest.trim();

        if rest.is_empty() {
            return Err(err(HeaderParseErrorKind::Empty));
        }

        let Some((class_segment, attribute)) = rest.split_once(SEPARATOR) else {
            if marked {
                return Err(err(HeaderParseErrorKind::MissingSeparator));
            }
            return Ok(Header {
                raw: raw.to_string(),
                kind: HeaderKind::Attribute {
                    name: rest.to_string(),
                },
                forced_quotation,
            });
        };

        if attribute.contains(SEPARATOR) {
            return Err(err(HeaderParseErrorKind::ExtraSeparator));
        }
        let attribute = attribute.trim();
        if attribute.is_empty() {
            return Err(err(HeaderParseErrorKind::EmptyAttribute));
        }

        let caps = CLASS_SEGMENT
            .captures(class_segment.trim())
            .ok_or_else(|| err(HeaderParseErrorKind::MalformedRole))?;
        let class_name = caps.name("class").map(|m| m.as_str().trim()).unwrap_or("");
        if class_name.is_empty() {
            return Err(err(HeaderParseErrorKind::EmptyClass));
        }
        let role_name = match caps.name("role") {
            Some(role) if role.as_str().trim().is_empty() => {
                return Err(err(HeaderParseErrorKind::MalformedRole));
            }
            Some(role) => role.as_str().trim().to_string(),
            None => default_role_name(class_name),
        };

        Ok(Header {
            raw: raw.to_string(),
            kind: HeaderKind::Reference(Reference {
                class_name: class_name.to_string(),
                attribute_name: attribute.to_string(),
                role_name,
            }),
            forced_quotation,
        })
    }

    /// Original header text
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Normalized header text, used as the column's identity
    pub fn key(&self) -> &str {
        self.raw.trim()
    }

    pub fn kind(&self) -> &HeaderKind {
        &self.kind
    }

    pub fn is_reference(&self) -> bool {
        matches!(self.kind, HeaderKind::Reference(_))
    }

    pub fn reference(&self) -> Option<&Reference> {
        match &self.kind {
            HeaderKind::Reference(reference) => Some(reference),
            HeaderKind::Attribute { .. } => None,
        }
    }

    /// Name of the attribute this column fills in an outgoing mutation
    ///
    /// Plain columns use their marker-stripped name, references their role name.
    pub fn attribute_name(&self) -> &str {
        match &self.kind {
            HeaderKind::Attribute { name } => name,
            HeaderKind::Reference(reference) => &reference.role_name,
        }
    }

    /// Whether the `§` marker forces string literals for this column
    pub fn forced_quotation(&self) -> bool {
        self.forced_quotation
    }
}

/// Default role name: class name with a lowercase first letter and a trailing underscore
pub fn default_role_name(class_name: &str) -> String {
    let mut chars = class_name.chars();
    match chars.next() {
        Some(first) => format!("{}{}_", first.to_lowercase(), chars.as_str()),
        None => "_".to_string(),
    }
}

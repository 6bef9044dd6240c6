//! GraphQL response parsing and classification

use serde::Deserialize;
use serde_json::Value;

use super::executor::ExecuteError;

/// Issue level the API uses for non-fatal diagnostics
pub const WARNING_LEVEL: &str = "WARNING";

/// Message fragment returned when an endpoint does not expose the requested operation
pub const UNDEFINED_QUERY_MARKER: &str = "'Query' is undefined @";

/// Top-level GraphQL response envelope
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphqlResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphqlError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub locations: Vec<ErrorLocation>,
    #[serde(default)]
    pub extensions: Option<ErrorExtensions>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorLocation {
    #[serde(default)]
    pub line: Option<u64>,
    #[serde(default)]
    pub column: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorExtensions {
    #[serde(default)]
    pub issue_level: Option<String>,
    #[serde(default)]
    pub classification: Option<String>,
}

impl GraphqlError {
    pub fn is_warning(&self) -> bool {
        self.extensions
            .as_ref()
            .and_then(|ext| ext.issue_level.as_deref())
            .is_some_and(|level| level.eq_ignore_ascii_case(WARNING_LEVEL))
    }

    /// Human readable description, with positions and classification when present
    pub fn describe(&self) -> String {
        let mut out = if self.message.is_empty() {
            "no message".to_string()
        } else {
            self.message.clone()
        };
        for location in &self.locations {
            out.push_str(&format!(
                " (line {}, column {})",
                location.line.map_or("?".to_string(), |l| l.to_string()),
                location.column.map_or("?".to_string(), |c| c.to_string())
            ));
        }
        if let Some(classification) = self
            .extensions
            .as_ref()
            .and_then(|ext| ext.classification.as_deref())
        {
            out.push_str(&format!(" [{}]", classification));
        }
        out
    }
}

/// Outcome of one response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseClass {
    /// No errors, or warnings only
    Success { warnings: Vec<String> },
    /// The endpoint does not know the operation; another endpoint may
    Soft { errors: Vec<String> },
    /// A real error; stop
    Hard { errors: Vec<String> },
}

pub fn parse_response(body: &str) -> Result<GraphqlResponse, ExecuteError> {
    serde_json::from_str(body).map_err(|e| ExecuteError::MalformedResponse(e.to_string()))
}

/// Classify a parsed response
pub fn classify(response: &GraphqlResponse) -> ResponseClass {
    let (warnings, errors): (Vec<&GraphqlError>, Vec<&GraphqlError>) =
        response.errors.iter().partition(|e| e.is_warning());

    if errors.is_empty() {
        return ResponseClass::Success {
            warnings: warnings.iter().map(|w| w.describe()).collect(),
        };
    }

    let descriptions = errors.iter().map(|e| e.describe()).collect();
    if errors
        .iter()
        .any(|e| e.message.contains(UNDEFINED_QUERY_MARKER))
    {
        ResponseClass::Soft {
            errors: descriptions,
        }
    } else {
        ResponseClass::Hard {
            errors: descriptions,
        }
    }
}

/// Pull `(attribute value, _id)` pairs from `data.<first field>.items`
///
/// Items missing either field are ignored. Scalars of any JSON type are
/// rendered as text, so numeric identifiers work too.
pub fn extract_ids(body: &str, attribute: &str) -> Result<Vec<(String, String)>, ExecuteError> {
    let response = parse_response(body)?;
    let Some(Value::Object(data)) = response.data else {
        return Err(ExecuteError::MalformedResponse(
            "response has no data object".to_string(),
        ));
    };
    let Some((_, page)) = data.into_iter().next() else {
        return Ok(Vec::new());
    };
    let items = match page.get("items") {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::Null) | None => return Ok(Vec::new()),
        Some(other) => {
            return Err(ExecuteError::MalformedResponse(format!(
                "expected an items array, found {}",
                other
            )));
        }
    };

    Ok(items
        .iter()
        .filter_map(|item| {
            let key = scalar_text(item.get(attribute)?)?;
            let id = scalar_text(item.get("_id")?)?;
            Some((key, id))
        })
        .collect())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

//! In-memory executor for tests
//!
//! Answers `X___getPage` lookups from registered records, accepts every
//! mutation, and records every request it sees.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value, json};

use crate::api::{ExecuteError, Executor};
use crate::graph::types::cell::normalize_number;

static LOOKUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)(\w+)___getPage\(.*?(\w+)___in: \[(.*?)\]\n").unwrap());

static LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""((?:[^"\\]|\\.)*)"|([^,\s]+)"#).unwrap());

/// Numbers compare by value, like a backend filtering a numeric field
fn canonical(value: &str) -> String {
    normalize_number(value).unwrap_or_else(|| value.trim().to_string())
}

#[derive(Default)]
pub struct MockExecutor {
    /// (class, attribute) -> (value, id) records, duplicates allowed
    records: HashMap<(String, String), Vec<(String, String)>>,
    failures: Vec<(String, ExecuteError)>,
    requests: Mutex<Vec<String>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(mut self, class: &str, attribute: &str, records: &[(&str, &str)]) -> Self {
        self.records
            .entry((class.to_string(), attribute.to_string()))
            .or_default()
            .extend(records.iter().map(|(v, id)| (v.to_string(), id.to_string())));
        self
    }

    /// Fail every request containing `fragment`
    pub fn fail_on(mut self, fragment: &str, error: ExecuteError) -> Self {
        self.failures.push((fragment.to_string(), error));
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn lookup_requests(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|r| r.starts_with("query"))
            .collect()
    }

    pub fn mutation_requests(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|r| r.starts_with("mutation"))
            .collect()
    }

    fn answer_lookup(&self, request: &str) -> Option<String> {
        let caps = LOOKUP.captures(request)?;
        let class = &caps[1];
        let attribute = &caps[2];
        let wanted: Vec<String> = LITERAL
            .captures_iter(&caps[3])
            .map(|c| match c.get(1) {
                Some(quoted) => quoted.as_str().replace("\\\"", "\"").replace("\\\\", "\\"),
                None => c[2].to_string(),
            })
            .map(|v| canonical(&v))
            .collect();

        let items: Vec<Value> = self
            .records
            .get(&(class.to_string(), attribute.to_string()))
            .map(|records| {
                records
                    .iter()
                    .filter(|(value, _)| wanted.contains(&canonical(value)))
                    .map(|(value, id)| {
                        let mut item = Map::new();
                        item.insert(attribute.to_string(), json!(value));
                        item.insert("_id".to_string(), json!(id));
                        Value::Object(item)
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut data = Map::new();
        data.insert(format!("{}___getPage", class), json!({ "items": items }));
        Some(json!({ "data": Value::Object(data) }).to_string())
    }
}

#[async_trait]
impl Executor for MockExecutor {
    async fn execute(&self, request: &str) -> Result<String, ExecuteError> {
        self.requests.lock().unwrap().push(request.to_string());

        if let Some((_, error)) = self.failures.iter().find(|(f, _)| request.contains(f.as_str())) {
            return Err(error.clone());
        }
        if let Some(response) = self.answer_lookup(request) {
            return Ok(response);
        }
        Ok(json!({ "data": { "mutation": { "_id": "1" } } }).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_answers_lookups() {
        let executor = MockExecutor::new()
            .with_records("Department", "nome", &[("Sales", "7"), ("Ops", "8")]);
        let query = crate::graph::query::build_lookup_query(
            "Department",
            "nome",
            &["\"Sales\"".to_string(), "\"R&D \\\"x\\\"\"".to_string()],
        );
        let response = executor.execute(&query).await.unwrap();
        let pairs = executor.extract_ids(&response, "nome").unwrap();
        assert_eq!(pairs, vec![("Sales".to_string(), "7".to_string())]);
    }
}

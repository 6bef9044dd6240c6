//! Reference resolution
//!
//! Turns human-readable reference values (`Department.nome = "Sales"`) into
//! backend identifiers. Lookups are batched, and every queried key is cached
//! for the rest of the run, found or not, so no key is ever queried twice.
//!
//! A value that matches more than one record is an error: nothing from that
//! resolution is cached and the run stops.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::api::Executor;
use crate::graph::error::ImportError;
use crate::graph::events::EventSink;
use crate::graph::query::build_lookup_query;
use crate::graph::types::cell::{CellKind, RawCell, normalize_number};
use crate::graph::types::header::ID_ATTRIBUTE;

/// Default number of values per lookup request
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// A value to look up: its cache key and the literal sent in the filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupValue {
    pub key: String,
    pub literal: String,
}

impl LookupValue {
    pub fn new(key: impl Into<String>, literal: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            literal: literal.into(),
        }
    }
}

/// Cache key form of a raw reference value
///
/// Values are trimmed; identifiers are also normalized numerically so that
/// `123` and `123.0` address the same entry.
pub fn normalize_key(attribute: &str, raw: &str) -> String {
    let trimmed = raw.trim();
    if attribute == ID_ATTRIBUTE {
        if let Some(number) = normalize_number(trimmed) {
            return number;
        }
    }
    trimmed.to_string()
}

/// Cache key of a reference cell
///
/// Number cells are keyed by their canonical form, the same form the lookup
/// literal carries, so `42.0` read from a CSV file addresses the record `42`.
pub fn cell_key(attribute: &str, cell: &RawCell) -> String {
    match cell.kind {
        CellKind::Number => normalize_number(&cell.text)
            .unwrap_or_else(|| normalize_key(attribute, &cell.text)),
        _ => normalize_key(attribute, &cell.text),
    }
}

/// Key under which a returned attribute value is stored
///
/// The backend may echo a requested number in a different textual form, so a
/// value that does not match a requested key verbatim is retried in its
/// canonical numeric form.
fn response_key(attribute: &str, value: &str, requested: &HashSet<&str>) -> String {
    let trimmed = value.trim();
    if requested.contains(trimmed) {
        return trimmed.to_string();
    }
    match normalize_number(trimmed) {
        Some(number) if requested.contains(number.as_str()) => number,
        _ => normalize_key(attribute, trimmed),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub class: String,
    pub attribute: String,
    pub value: String,
}

impl CacheKey {
    pub fn new(class: &str, attribute: &str, value: &str) -> Self {
        Self {
            class: class.to_string(),
            attribute: attribute.to_string(),
            value: value.to_string(),
        }
    }
}

/// Run-scoped identifier cache
#[derive(Debug, Clone, Default)]
pub struct ReferenceCache {
    entries: HashMap<CacheKey, String>,
    queried: HashSet<CacheKey>,
}

impl ReferenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolved identifier for an already-normalized key
    pub fn get(&self, class: &str, attribute: &str, key: &str) -> Option<&str> {
        self.entries
            .get(&CacheKey::new(class, attribute, key))
            .map(String::as_str)
    }

    /// Resolved identifier for a reference cell
    pub fn lookup(&self, class: &str, attribute: &str, cell: &RawCell) -> Option<&str> {
        self.get(class, attribute, &cell_key(attribute, cell))
    }

    pub fn was_queried(&self, class: &str, attribute: &str, key: &str) -> bool {
        self.queried.contains(&CacheKey::new(class, attribute, key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Batched, cached reference lookups through an [`Executor`]
pub struct ReferenceResolver<'a> {
    executor: &'a dyn Executor,
    events: &'a dyn EventSink,
    batch_size: usize,
    cache: ReferenceCache,
    requests: usize,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(executor: &'a dyn Executor, events: &'a dyn EventSink, batch_size: usize) -> Self {
        Self {
            executor,
            events,
            batch_size: batch_size.max(1),
            cache: ReferenceCache::new(),
            requests: 0,
        }
    }

    pub fn cache(&self) -> &ReferenceCache {
        &self.cache
    }

    /// Number of lookup requests sent so far
    pub fn requests(&self) -> usize {
        self.requests
    }

    /// Resolved identifier for a reference cell
    pub fn lookup(&self, class: &str, attribute: &str, cell: &RawCell) -> Option<&str> {
        self.cache.lookup(class, attribute, cell)
    }

    /// Resolve `values` of `class.attribute` to identifiers
    ///
    /// Returns key -> identifier for every value that matched a record.
    /// Values without a match are simply absent from the map.
    pub async fn resolve(
        &mut self,
        class: &str,
        attribute: &str,
        values: &[LookupValue],
    ) -> Result<HashMap<String, String>, ImportError> {
        let mut seen = HashSet::new();
        let pending: Vec<&LookupValue> = values
            .iter()
            .filter(|v| !v.key.is_empty())
            .filter(|v| seen.insert(v.key.as_str()))
            .filter(|v| !self.cache.was_queried(class, attribute, &v.key))
            .collect();

        if !pending.is_empty() {
            let batches = pending.len().div_ceil(self.batch_size);
            self.events.info(&format!(
                "Resolving {} value(s) of {}.{} in {} batch(es)",
                pending.len(),
                class,
                attribute,
                batches
            ));

            let requested: HashSet<&str> = pending.iter().map(|v| v.key.as_str()).collect();
            let mut found: HashMap<String, String> = HashMap::new();
            let mut duplicates: BTreeSet<String> = BTreeSet::new();

            for batch in pending.chunks(self.batch_size) {
                let literals: Vec<String> = batch.iter().map(|v| v.literal.clone()).collect();
                let query = build_lookup_query(class, attribute, &literals);
                self.requests += 1;

                let resolution_error = |source| ImportError::Resolution {
                    class: class.to_string(),
                    attribute: attribute.to_string(),
                    source,
                };
                let response = self
                    .executor
                    .execute(&query)
                    .await
                    .map_err(resolution_error)?;
                let pairs = self
                    .executor
                    .extract_ids(&response, attribute)
                    .map_err(resolution_error)?;

                for (value, id) in pairs {
                    let key = response_key(attribute, &value, &requested);
                    match found.get(&key) {
                        Some(existing) if *existing != id => {
                            duplicates.insert(key);
                        }
                        Some(_) => {}
                        None => {
                            found.insert(key, id);
                        }
                    }
                }
            }

            if !duplicates.is_empty() {
                let values: Vec<String> = duplicates.into_iter().collect();
                self.events.error(&format!(
                    "Ambiguous values for {}.{}: {}",
                    class,
                    attribute,
                    values.join(", ")
                ));
                return Err(ImportError::AmbiguousReference {
                    class: class.to_string(),
                    attribute: attribute.to_string(),
                    values,
                });
            }

            let missing = pending
                .iter()
                .filter(|v| !found.contains_key(&v.key))
                .count();
            if missing > 0 {
                log::warn!(
                    "{} of {} value(s) of {}.{} matched no record",
                    missing,
                    pending.len(),
                    class,
                    attribute
                );
            }

            for value in &pending {
                self.cache
                    .queried
                    .insert(CacheKey::new(class, attribute, &value.key));
            }
            for (key, id) in found {
                log::debug!("{}.{} '{}' -> {}", class, attribute, key, id);
                self.cache
                    .entries
                    .insert(CacheKey::new(class, attribute, &key), id);
            }
        }

        Ok(values
            .iter()
            .filter_map(|v| {
                self.cache
                    .get(class, attribute, &v.key)
                    .map(|id| (v.key.clone(), id.to_string()))
            })
            .collect())
    }
}

//! Spreadsheet to GraphQL mutation compilation
//!
//! Column headers decide what every cell means, reference values are resolved
//! to backend identifiers in batches, and each row becomes a `create` (entity
//! sheets) or a nested `create` inside a parent `update` (composition sheets).

pub mod compiler;
pub mod error;
pub mod events;
pub mod mutation;
pub mod nested;
pub mod pipeline;
pub mod query;
pub mod resolver;
pub mod types;

#[cfg(test)]
pub mod testing;

pub use error::{ImportError, RowIssue, RowIssueReason};
pub use events::{EventSink, LogSink, MemorySink};
pub use mutation::{Mutation, MutationKind};
pub use pipeline::{Pipeline, PipelineOptions, RunMode, RunReport, SheetReport};
pub use resolver::{ReferenceCache, ReferenceResolver};
pub use types::{RawCell, RawSheet, Sheet, SheetKind};

//! Compile spreadsheets into GraphQL mutations for an object-graph backend.
//!
//! Each ordinary sheet names an entity type and each row becomes one
//! `create` mutation; sheets whose name starts with `#` hold composition
//! rows nested under an existing parent. Columns prefixed with `*` are
//! references resolved to backend identifiers before emission.

pub mod api;
pub mod config;
pub mod graph;
pub mod source;

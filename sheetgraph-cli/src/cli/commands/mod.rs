//! Command handlers

pub mod connection;
pub mod delete;
pub mod import;
pub mod inspect;
pub mod summary;

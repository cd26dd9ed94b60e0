//! Utilities for schema_reconcile

pub mod document;
pub mod logging;
pub mod naming;

pub use naming::{derived_identifier, max_identifier_length, truncate_identifier};

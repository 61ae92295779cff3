//! Schema reconciliation across historical column-name revisions.
//!
//! Ownership model:
//! - `AliasTable` is an immutable value validated once at construction.
//! - `Canonicalizer` wraps an alias table and resolves raw headers; it is
//!   built once per pipeline run and shared read-only across workers.

/// Canonical field to historical alias mapping.
pub mod alias_table;
/// Raw header resolution through an alias table.
pub mod canonicalizer;

pub use alias_table::AliasTable;
pub use canonicalizer::Canonicalizer;

//! Core types for live collections: entries, queries, and ordering helpers.

/// Raw key/value units delivered by a record source.
pub mod entry;
/// Binary-search insertion for sorted sequences.
pub mod order;
/// Query descriptions passed through to record sources.
pub mod query;
/// Total ordering over entry payload values.
pub mod value;

pub use entry::{Entry, Key};
pub use order::{insertion_index, search};
pub use query::{Boundary, Limit, OrderBy, Query, SortDirection};
pub use serde_json::Value;
pub use value::compare_values;

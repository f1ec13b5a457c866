//! Live collections: sorted, filtered views of a record source.
//!
//! A [`LiveCollection`] subscribes to one query, ingests the initial snapshot,
//! then applies `added`/`changed`/`removed`/`moved` events to a sorted
//! sequence of decoded [`Record`]s. Every change is reported to a
//! [`CollectionDelegate`] with explicit indices. [`PaginatedLiveCollection`]
//! builds the same sequence from consecutive bounded pages of a query.

/// Declarative settings loaded from TOML.
pub mod config;
/// Delegate contract and change notifications.
pub mod delegate;
mod engine;
/// Error types for collection operations.
pub mod error;
mod link;
mod live;
mod paginated;
/// Record contract for decoded entries.
pub mod record;
/// Sort orders, rules and filters.
pub mod sort;
mod state;
#[cfg(test)]
mod test_support;

pub use config::{CollectionConfig, DEFAULT_PAGE_SIZE, SortRuleConfig};
pub use delegate::{CollectionDelegate, Notification};
pub use error::{CollectionError, ConfigError};
pub use live::LiveCollection;
pub use livelist_primitives::{Boundary, Entry, Key, OrderBy, Query, SortDirection, Value};
pub use livelist_source::{MemorySource, RecordSource, SourceError};
pub use paginated::{PageLoad, PaginatedLiveCollection};
pub use record::{DecodeError, RawRecord, Record, decode_value};
pub use sort::{CollectionOptions, Comparator, Filter, SortOrder, SortRule};

//! Error types for collection operations.

use thiserror::Error;

/// Caller-side misuse of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CollectionError {
	/// `get` was called with an index outside `0..len`.
	#[error("index {index} out of range for collection of length {len}")]
	IndexOutOfRange {
		/// Requested index.
		index: usize,
		/// Number of visible records at the time of the call.
		len: usize,
	},

	/// `subscribe` was called on a collection that is already subscribed.
	#[error("collection is already subscribed")]
	AlreadySubscribed,

	/// A paginated collection was created with a page size of zero.
	#[error("page size must be at least 1")]
	ZeroPageSize,
}

/// Result type for collection operations.
pub type Result<T> = std::result::Result<T, CollectionError>;

/// Errors that can occur when loading collection configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// The input is not valid TOML or does not match the schema.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// `page_size` must be at least 1.
	#[error("invalid page size: {0}")]
	InvalidPageSize(usize),

	/// A sort rule names no field.
	#[error("sort rule {index} has an empty field path")]
	EmptySortField {
		/// Position of the rule in the `sort` list.
		index: usize,
	},
}

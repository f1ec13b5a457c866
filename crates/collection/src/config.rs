//! Declarative collection settings, loaded from TOML.
//!
//! ```toml
//! page_size = 20
//!
//! [[sort]]
//! field = "meta/rank"
//! direction = "descending"
//!
//! [[sort]]
//! field = "title"
//! ```

use livelist_primitives::SortDirection;
use serde::{Deserialize, Serialize};

use crate::error::{self, ConfigError};
use crate::paginated::PaginatedLiveCollection;
use crate::record::Record;
use crate::sort::{CollectionOptions, SortOrder, SortRule};

/// Page size used when the configuration does not set one.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Sort rules and paging for a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollectionConfig {
	/// Rules applied in order; key order breaks remaining ties.
	pub sort: Vec<SortRuleConfig>,
	pub page_size: usize,
}

impl Default for CollectionConfig {
	fn default() -> Self {
		Self {
			sort: Vec::new(),
			page_size: DEFAULT_PAGE_SIZE,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SortRuleConfig {
	/// `/`-separated path resolved through [`Record::field`].
	pub field: String,
	#[serde(default)]
	pub direction: SortDirection,
}

impl CollectionConfig {
	/// Parses and validates a TOML document.
	pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(input)?;
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.page_size == 0 {
			return Err(ConfigError::InvalidPageSize(self.page_size));
		}
		if let Some(index) = self.sort.iter().position(|rule| rule.field.trim().is_empty()) {
			return Err(ConfigError::EmptySortField { index });
		}
		Ok(())
	}

	/// Runtime ordering described by the `sort` rules.
	pub fn sort_order<R: Record>(&self) -> SortOrder<R> {
		if self.sort.is_empty() {
			return SortOrder::Key;
		}
		SortOrder::Rules(
			self.sort
				.iter()
				.map(|rule| SortRule::field(rule.field.as_str(), rule.direction))
				.collect(),
		)
	}

	pub fn options<R: Record>(&self) -> CollectionOptions<R> {
		CollectionOptions::new().order(self.sort_order())
	}

	/// Builds an unsubscribed paginated collection from these settings.
	pub fn paginated<R: Record>(&self) -> error::Result<PaginatedLiveCollection<R>> {
		PaginatedLiveCollection::new(self.page_size, self.options())
	}
}

#[cfg(test)]
mod tests;

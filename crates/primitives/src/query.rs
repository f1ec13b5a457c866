//! Query descriptions.
//!
//! A [`Query`] names a store location plus ordering, range and limit
//! parameters. Live collections pass queries through to their source without
//! interpreting them, except to derive page [`Boundary`] markers from the
//! last entry of a page. Sources (and tests) evaluate them with
//! [`Query::evaluate`].

use std::borrow::Cow;
use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entry::{Entry, Key};
use crate::value::compare_values;

/// Direction applied to a comparison result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
	#[default]
	Ascending,
	Descending,
}

impl SortDirection {
	/// Applies the direction to an ascending comparison.
	pub const fn apply(self, ordering: Ordering) -> Ordering {
		match self {
			Self::Ascending => ordering,
			Self::Descending => ordering.reverse(),
		}
	}
}

/// What a query orders its children by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderBy {
	/// Child key.
	#[default]
	Key,
	/// Value at a `/`-separated path inside the payload.
	Child(String),
	/// The whole payload.
	Value,
	/// The entry's priority.
	Priority,
}

impl OrderBy {
	/// Sort value of `entry` under this ordering. Missing values sort as `null`.
	pub fn sort_value<'a>(&self, entry: &'a Entry) -> Cow<'a, Value> {
		match self {
			Self::Key => Cow::Owned(Value::String(entry.key.as_str().to_owned())),
			Self::Child(path) => entry.child(path).map_or(Cow::Owned(Value::Null), Cow::Borrowed),
			Self::Value => Cow::Borrowed(&entry.value),
			Self::Priority => entry.priority.as_ref().map_or(Cow::Owned(Value::Null), Cow::Borrowed),
		}
	}

	/// Total order over entries: sort value first, key second.
	pub fn compare(&self, lhs: &Entry, rhs: &Entry) -> Ordering {
		let by_value = match self {
			Self::Key => Ordering::Equal,
			_ => compare_values(&self.sort_value(lhs), &self.sort_value(rhs)),
		};
		by_value.then_with(|| lhs.key.cmp(&rhs.key))
	}
}

/// Inclusive start cursor for a bounded query.
///
/// `key` disambiguates entries sharing the same sort value; when absent,
/// every entry whose value equals `value` is admitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
	pub value: Value,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub key: Option<Key>,
}

impl Boundary {
	/// Boundary at a bare sort value.
	pub const fn at(value: Value) -> Self {
		Self { value, key: None }
	}

	/// Boundary sitting exactly on `entry` under `order_by`.
	pub fn on_entry(order_by: &OrderBy, entry: &Entry) -> Self {
		Self {
			value: order_by.sort_value(entry).into_owned(),
			key: Some(entry.key.clone()),
		}
	}

	/// Returns true when `entry` sorts at or after this boundary.
	pub fn admits(&self, order_by: &OrderBy, entry: &Entry) -> bool {
		match compare_values(&order_by.sort_value(entry), &self.value) {
			Ordering::Greater => true,
			Ordering::Less => false,
			Ordering::Equal => self.key.as_ref().is_none_or(|key| entry.key >= *key),
		}
	}
}

/// Result-count limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Limit {
	/// Keep the first `n` children in query order.
	First(usize),
	/// Keep the last `n` children in query order.
	Last(usize),
}

/// Location plus ordering, range, equality and limit parameters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Query {
	path: String,
	#[serde(default)]
	order_by: OrderBy,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	start_at: Option<Boundary>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	limit: Option<Limit>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	equal_to: Option<Value>,
}

impl Query {
	/// Unbounded, key-ordered query over the children of `path`.
	pub fn new(path: impl Into<String>) -> Self {
		Self {
			path: path.into(),
			..Self::default()
		}
	}

	#[must_use]
	pub fn order_by_key(mut self) -> Self {
		self.order_by = OrderBy::Key;
		self
	}

	#[must_use]
	pub fn order_by_child(mut self, path: impl Into<String>) -> Self {
		self.order_by = OrderBy::Child(path.into());
		self
	}

	#[must_use]
	pub fn order_by_value(mut self) -> Self {
		self.order_by = OrderBy::Value;
		self
	}

	#[must_use]
	pub fn order_by_priority(mut self) -> Self {
		self.order_by = OrderBy::Priority;
		self
	}

	#[must_use]
	pub fn start_at(mut self, boundary: Boundary) -> Self {
		self.start_at = Some(boundary);
		self
	}

	#[must_use]
	pub fn limit_to_first(mut self, count: usize) -> Self {
		self.limit = Some(Limit::First(count));
		self
	}

	#[must_use]
	pub fn limit_to_last(mut self, count: usize) -> Self {
		self.limit = Some(Limit::Last(count));
		self
	}

	/// Restricts results to children whose sort value equals `value`.
	#[must_use]
	pub fn equal_to(mut self, value: Value) -> Self {
		self.equal_to = Some(value);
		self
	}

	pub fn path(&self) -> &str {
		&self.path
	}

	pub const fn order(&self) -> &OrderBy {
		&self.order_by
	}

	pub const fn start(&self) -> Option<&Boundary> {
		self.start_at.as_ref()
	}

	pub const fn limit(&self) -> Option<Limit> {
		self.limit
	}

	pub const fn equality(&self) -> Option<&Value> {
		self.equal_to.as_ref()
	}

	/// Returns true when `entry` passes the range and equality filters.
	///
	/// Limits are positional and only apply in [`Query::evaluate`].
	pub fn matches(&self, entry: &Entry) -> bool {
		let in_range = self
			.start_at
			.as_ref()
			.is_none_or(|start| start.admits(&self.order_by, entry));
		let equal = self.equal_to.as_ref().is_none_or(|expected| {
			compare_values(&self.order_by.sort_value(entry), expected) == Ordering::Equal
		});
		in_range && equal
	}

	/// Applies filters, ordering and limit to a set of children.
	pub fn evaluate<'a>(&self, entries: impl IntoIterator<Item = &'a Entry>) -> Vec<Entry> {
		let mut selected: Vec<&Entry> = entries.into_iter().filter(|entry| self.matches(entry)).collect();
		selected.sort_by(|a, b| self.order_by.compare(a, b));
		let window = match self.limit {
			None => &selected[..],
			Some(Limit::First(count)) => &selected[..count.min(selected.len())],
			Some(Limit::Last(count)) => &selected[selected.len().saturating_sub(count)..],
		};
		window.iter().map(|entry| (*entry).clone()).collect()
	}

	/// Boundary marker that starts a follow-up query on `entry`.
	pub fn boundary_for(&self, entry: &Entry) -> Boundary {
		Boundary::on_entry(&self.order_by, entry)
	}

	/// Bounded copy of this query: first `limit` children at or after `start`.
	#[must_use]
	pub fn page(&self, limit: usize, start: Option<Boundary>) -> Self {
		Self {
			start_at: start.or_else(|| self.start_at.clone()),
			limit: Some(Limit::First(limit)),
			..self.clone()
		}
	}
}

//! Ordering and filtering of records.
//!
//! Every [`SortOrder`] is completed with an ascending key comparison, so two
//! distinct records never compare equal.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use livelist_primitives::{SortDirection, Value, compare_values};

use crate::record::Record;

/// Shared comparison callback.
pub type Comparator<R> = Arc<dyn Fn(&R, &R) -> Ordering + Send + Sync>;

/// Shared visibility predicate. Records for which it returns false are hidden.
pub type Filter<R> = Arc<dyn Fn(&R) -> bool + Send + Sync>;

/// One configured sort criterion.
pub struct SortRule<R> {
	compare: Comparator<R>,
	direction: SortDirection,
}

impl<R: Record> SortRule<R> {
	/// Orders by the value at `path`, as reported by [`Record::field`].
	///
	/// Missing fields compare as `null`.
	pub fn field(path: impl Into<String>, direction: SortDirection) -> Self {
		let path: String = path.into();
		Self {
			compare: Arc::new(move |lhs: &R, rhs: &R| {
				let lhs = lhs.field(&path);
				let rhs = rhs.field(&path);
				compare_values(lhs.as_deref().unwrap_or(&Value::Null), rhs.as_deref().unwrap_or(&Value::Null))
			}),
			direction,
		}
	}

	/// Orders by a selector over the record.
	pub fn by_key<K, F>(selector: F, direction: SortDirection) -> Self
	where
		K: Ord,
		F: Fn(&R) -> K + Send + Sync + 'static,
	{
		Self {
			compare: Arc::new(move |lhs: &R, rhs: &R| selector(lhs).cmp(&selector(rhs))),
			direction,
		}
	}
}

impl<R> SortRule<R> {
	pub const fn direction(&self) -> SortDirection {
		self.direction
	}

	fn compare(&self, lhs: &R, rhs: &R) -> Ordering {
		self.direction.apply((self.compare)(lhs, rhs))
	}
}

impl<R> Clone for SortRule<R> {
	fn clone(&self) -> Self {
		Self {
			compare: Arc::clone(&self.compare),
			direction: self.direction,
		}
	}
}

impl<R> fmt::Debug for SortRule<R> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SortRule").field("direction", &self.direction).finish_non_exhaustive()
	}
}

/// Active ordering of a collection's visible records.
pub enum SortOrder<R> {
	/// Ascending key order.
	Key,
	/// Custom comparison, ties broken by key.
	Comparator(Comparator<R>),
	/// Rules applied in order; the first non-equal result decides, then key.
	Rules(Vec<SortRule<R>>),
}

impl<R: Record> SortOrder<R> {
	/// Builds an order from a plain comparison function.
	pub fn by(compare: impl Fn(&R, &R) -> Ordering + Send + Sync + 'static) -> Self {
		Self::Comparator(Arc::new(compare))
	}

	/// Total order over records.
	pub fn compare(&self, lhs: &R, rhs: &R) -> Ordering {
		let primary = match self {
			Self::Key => Ordering::Equal,
			Self::Comparator(compare) => compare(lhs, rhs),
			Self::Rules(rules) => rules
				.iter()
				.map(|rule| rule.compare(lhs, rhs))
				.find(|ordering| ordering.is_ne())
				.unwrap_or(Ordering::Equal),
		};
		primary.then_with(|| lhs.key().cmp(rhs.key()))
	}

	/// Strict "ordered before" predicate derived from [`SortOrder::compare`].
	pub fn is_before(&self, lhs: &R, rhs: &R) -> bool {
		self.compare(lhs, rhs) == Ordering::Less
	}
}

impl<R> Default for SortOrder<R> {
	fn default() -> Self {
		Self::Key
	}
}

impl<R> Clone for SortOrder<R> {
	fn clone(&self) -> Self {
		match self {
			Self::Key => Self::Key,
			Self::Comparator(compare) => Self::Comparator(Arc::clone(compare)),
			Self::Rules(rules) => Self::Rules(rules.clone()),
		}
	}
}

impl<R> fmt::Debug for SortOrder<R> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Key => f.write_str("Key"),
			Self::Comparator(_) => f.write_str("Comparator(..)"),
			Self::Rules(rules) => f.debug_tuple("Rules").field(rules).finish(),
		}
	}
}

/// Ordering and filter a collection starts with.
pub struct CollectionOptions<R> {
	pub order: SortOrder<R>,
	pub filter: Option<Filter<R>>,
}

impl<R> Default for CollectionOptions<R> {
	fn default() -> Self {
		Self {
			order: SortOrder::Key,
			filter: None,
		}
	}
}

impl<R> CollectionOptions<R> {
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn order(mut self, order: SortOrder<R>) -> Self {
		self.order = order;
		self
	}

	#[must_use]
	pub fn filter(mut self, filter: impl Fn(&R) -> bool + Send + Sync + 'static) -> Self {
		self.filter = Some(Arc::new(filter));
		self
	}
}

impl<R> Clone for CollectionOptions<R> {
	fn clone(&self) -> Self {
		Self {
			order: self.order.clone(),
			filter: self.filter.clone(),
		}
	}
}

impl<R> fmt::Debug for CollectionOptions<R> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CollectionOptions")
			.field("order", &self.order)
			.field("filter", &self.filter.is_some())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use livelist_primitives::Entry;
	use rstest::rstest;
	use serde_json::json;

	use super::*;
	use crate::record::RawRecord;

	fn raw(key: &str, value: Value) -> RawRecord {
		RawRecord::decode(&Entry::new(key, value)).unwrap()
	}

	#[rstest]
	#[case(SortDirection::Ascending, Ordering::Less)]
	#[case(SortDirection::Descending, Ordering::Greater)]
	fn field_rule_honors_direction(#[case] direction: SortDirection, #[case] expected: Ordering) {
		let order = SortOrder::Rules(vec![SortRule::field("n", direction)]);
		assert_eq!(order.compare(&raw("b", json!({ "n": 1 })), &raw("a", json!({ "n": 2 }))), expected);
	}

	#[test]
	fn ties_fall_through_rules_then_key() {
		let order = SortOrder::Rules(vec![
			SortRule::field("group", SortDirection::Ascending),
			SortRule::field("rank", SortDirection::Descending),
		]);
		let a = raw("a", json!({ "group": 1, "rank": 1 }));
		let b = raw("b", json!({ "group": 1, "rank": 5 }));
		let c = raw("c", json!({ "group": 1, "rank": 5 }));
		assert_eq!(order.compare(&b, &a), Ordering::Less);
		assert_eq!(order.compare(&b, &c), Ordering::Less);
		assert_eq!(order.compare(&c, &c), Ordering::Equal);
	}

	#[test]
	fn missing_field_sorts_first() {
		let order = SortOrder::Rules(vec![SortRule::field("n", SortDirection::Ascending)]);
		assert!(order.is_before(&raw("z", json!({})), &raw("a", json!({ "n": 0 }))));
	}

	#[test]
	fn comparator_is_completed_by_key() {
		let order = SortOrder::<RawRecord>::by(|_, _| Ordering::Equal);
		assert!(order.is_before(&raw("a", json!(1)), &raw("b", json!(0))));
	}

	#[test]
	fn selector_rule_orders_by_projection() {
		let order = SortOrder::Rules(vec![SortRule::by_key(
			|record: &RawRecord| record.value().as_str().map(str::len),
			SortDirection::Ascending,
		)]);
		assert!(order.is_before(&raw("b", json!("xy")), &raw("a", json!("xyz"))));
	}
}

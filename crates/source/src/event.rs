use std::fmt;
use std::sync::Arc;

use livelist_primitives::Entry;

use crate::SourceError;

/// Event stream a subscription is registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
	/// One-shot bulk snapshot of the query result.
	Initial,
	Added,
	Changed,
	Removed,
	Moved,
}

impl ListenerKind {
	/// Every kind, snapshot first.
	pub const ALL: [Self; 5] = [Self::Initial, Self::Added, Self::Changed, Self::Removed, Self::Moved];

	/// Returns true for kinds that release themselves after one delivery.
	pub const fn is_one_shot(self) -> bool {
		matches!(self, Self::Initial)
	}
}

/// Single notification delivered to a listener.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
	/// Full query result, in query order.
	Initial(Vec<Entry>),
	Added(Entry),
	Changed(Entry),
	Removed(Entry),
	Moved(Entry),
	/// The subscription is dead; no further events follow.
	Cancelled(SourceError),
}

/// Opaque handle identifying one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
	pub const fn new(raw: u64) -> Self {
		Self(raw)
	}

	pub const fn get(self) -> u64 {
		self.0
	}
}

impl fmt::Display for SubscriptionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "sub#{}", self.0)
	}
}

/// Callback invoked by a source for every event of a subscription.
pub type Listener = Arc<dyn Fn(SourceEvent) + Send + Sync>;

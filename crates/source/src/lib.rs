//! Record source contract: subscriptions over a hierarchical key-value store
//! yielding child-level change events.
//!
//! A source delivers one initial snapshot per [`ListenerKind::Initial`]
//! subscription and a stream of `added`/`changed`/`removed`/`moved` events
//! for the incremental kinds. Failures arrive as
//! [`SourceEvent::Cancelled`]. Retry and reconnection belong to the source.

mod error;
mod event;
pub mod memory;

use livelist_primitives::Query;

pub use error::SourceError;
pub use event::{Listener, ListenerKind, SourceEvent, SubscriptionId};
pub use memory::MemorySource;

/// Hierarchical key-value backend that live collections subscribe to.
///
/// Implementations must not hold internal locks while invoking listeners: a
/// listener may call [`RecordSource::unsubscribe`] re-entrantly.
pub trait RecordSource: Send + Sync {
	/// Registers `listener` for events of `kind` on `query`.
	///
	/// [`ListenerKind::Initial`] subscriptions fire once and then release
	/// themselves.
	fn subscribe(&self, query: &Query, kind: ListenerKind, listener: Listener) -> SubscriptionId;

	/// Releases a subscription. Unknown or already released ids are ignored.
	fn unsubscribe(&self, id: SubscriptionId);
}

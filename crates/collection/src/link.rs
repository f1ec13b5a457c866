//! Generation-scoped subscriptions against a record source.
//!
//! Every attach starts a new generation. Listeners carry the generation they
//! were opened under, and events from any other generation are dropped, so a
//! released subscription can never touch state that has moved on.

use std::sync::Arc;

use livelist_primitives::Query;
use livelist_source::{Listener, ListenerKind, RecordSource, SubscriptionId};

use crate::error::{CollectionError, Result};

#[derive(Default)]
pub(crate) struct SourceLink {
	source: Option<Arc<dyn RecordSource>>,
	generation: u64,
	subscriptions: Vec<SubscriptionId>,
}

impl SourceLink {
	/// Binds to `source` and returns the new generation.
	pub fn attach(&mut self, source: Arc<dyn RecordSource>) -> Result<u64> {
		if self.source.is_some() {
			return Err(CollectionError::AlreadySubscribed);
		}
		self.source = Some(source);
		self.generation = self.generation.wrapping_add(1);
		Ok(self.generation)
	}

	pub const fn is_attached(&self) -> bool {
		self.source.is_some()
	}

	/// Returns true when events of `generation` should still be applied.
	pub fn is_current(&self, generation: u64) -> bool {
		self.source.is_some() && self.generation == generation
	}

	pub fn source(&self) -> Option<Arc<dyn RecordSource>> {
		self.source.clone()
	}

	pub const fn generation(&self) -> u64 {
		self.generation
	}

	/// Records subscriptions opened for `generation`.
	///
	/// When that generation has already been released, the subscriptions are
	/// handed back for release instead.
	pub fn adopt(&mut self, generation: u64, source: Arc<dyn RecordSource>, ids: Vec<SubscriptionId>) -> Release {
		if self.is_current(generation) {
			self.subscriptions.extend(ids);
			Release::default()
		} else {
			tracing::trace!(generation, count = ids.len(), "releasing subscriptions of stale generation");
			Release {
				source: Some(source),
				ids,
			}
		}
	}

	/// Ends the current generation and returns everything it still holds.
	pub fn detach(&mut self) -> Release {
		let Some(source) = self.source.take() else {
			return Release::default();
		};
		self.generation = self.generation.wrapping_add(1);
		Release {
			source: Some(source),
			ids: std::mem::take(&mut self.subscriptions),
		}
	}
}

/// Subscriptions to release once no collection lock is held.
#[derive(Default)]
#[must_use = "subscriptions are only released by `Release::run`"]
pub(crate) struct Release {
	source: Option<Arc<dyn RecordSource>>,
	ids: Vec<SubscriptionId>,
}

impl Release {
	pub fn run(self) {
		let Some(source) = self.source else {
			return;
		};
		if !self.ids.is_empty() {
			tracing::debug!(count = self.ids.len(), "releasing subscriptions");
		}
		for id in self.ids {
			source.unsubscribe(id);
		}
	}
}

/// Opens the snapshot listener and the four incremental listeners on `query`.
pub(crate) fn open_listeners(source: &dyn RecordSource, query: &Query, listener: &Listener) -> Vec<SubscriptionId> {
	ListenerKind::ALL
		.into_iter()
		.map(|kind| source.subscribe(query, kind, Arc::clone(listener)))
		.collect()
}

//! In-process record source.
//!
//! Stores entries per location and evaluates every registered query after
//! each mutation, queueing the window diff as child events. Nothing is
//! delivered until the owner pumps the queue with [`MemorySource::flush`] or
//! [`MemorySource::deliver_next`], which lets callers control interleaving.
//!
//! Delivery semantics follow a realtime key-value backend:
//! - an `Initial` listener receives the query result once, then releases itself;
//! - an `Added` listener first receives every entry already in its window;
//! - limited windows emit `added`/`removed` as children slide in and out;
//! - `moved` fires for a changed child whose position among the surviving
//!   children differs.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use livelist_primitives::{Entry, Key, Query, Value};
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{Listener, ListenerKind, RecordSource, SourceError, SourceEvent, SubscriptionId};

/// In-memory [`RecordSource`] with a manually pumped event queue.
#[derive(Default)]
pub struct MemorySource {
	state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
	tables: FxHashMap<String, FxHashMap<Key, Entry>>,
	slots: BTreeMap<SubscriptionId, Slot>,
	queue: VecDeque<Delivery>,
	denied: FxHashSet<String>,
	next_id: u64,
}

struct Slot {
	query: Query,
	kind: ListenerKind,
	listener: Listener,
	/// Last evaluated query result.
	window: Vec<Entry>,
}

struct Delivery {
	id: SubscriptionId,
	listener: Listener,
	event: SourceEvent,
}

impl MemorySource {
	pub fn new() -> Self {
		Self::default()
	}

	/// Writes `value` under `path/key`.
	pub fn set(&self, path: &str, key: impl Into<Key>, value: Value) {
		self.put(path, Entry::new(key, value));
	}

	/// Writes a full entry (including priority) under `path`.
	pub fn put(&self, path: &str, entry: Entry) {
		let mut state = self.state.lock();
		state
			.tables
			.entry(path.to_owned())
			.or_default()
			.insert(entry.key.clone(), entry);
		state.refresh(path);
	}

	/// Deletes `path/key`, returning the removed entry.
	pub fn remove(&self, path: &str, key: &str) -> Option<Entry> {
		let mut state = self.state.lock();
		let removed = state.tables.get_mut(path).and_then(|table| table.remove(key));
		if removed.is_some() {
			state.refresh(path);
		}
		removed
	}

	pub fn get(&self, path: &str, key: &str) -> Option<Entry> {
		self.state.lock().tables.get(path).and_then(|table| table.get(key)).cloned()
	}

	/// Number of children stored under `path`.
	pub fn len(&self, path: &str) -> usize {
		self.state.lock().tables.get(path).map_or(0, |table| table.len())
	}

	/// Makes future subscriptions on `path` fail with [`SourceError::PermissionDenied`].
	pub fn deny(&self, path: &str) {
		self.state.lock().denied.insert(path.to_owned());
	}

	pub fn allow(&self, path: &str) {
		self.state.lock().denied.remove(path);
	}

	/// Cancels every live subscription on `path` with `error`.
	///
	/// Queued events for those subscriptions are dropped and replaced by one
	/// `Cancelled` event each. Returns the number of subscriptions severed.
	pub fn sever(&self, path: &str, error: SourceError) -> usize {
		let mut state = self.state.lock();
		let ids: Vec<SubscriptionId> = state
			.slots
			.iter()
			.filter(|(_, slot)| slot.query.path() == path)
			.map(|(id, _)| *id)
			.collect();
		for id in &ids {
			if let Some(slot) = state.slots.remove(id) {
				state.queue.retain(|delivery| delivery.id != *id);
				state.queue.push_back(Delivery {
					id: *id,
					listener: slot.listener,
					event: SourceEvent::Cancelled(error.clone()),
				});
			}
		}
		tracing::debug!(path, severed = ids.len(), %error, "memory source severed subscriptions");
		ids.len()
	}

	/// Delivers the oldest queued event. Returns false when the queue is empty.
	///
	/// The listener runs without the source lock held.
	pub fn deliver_next(&self) -> bool {
		let delivery = {
			let mut state = self.state.lock();
			let Some(delivery) = state.queue.pop_front() else {
				return false;
			};
			if matches!(delivery.event, SourceEvent::Initial(_) | SourceEvent::Cancelled(_)) {
				state.slots.remove(&delivery.id);
			}
			delivery
		};
		tracing::trace!(id = %delivery.id, "memory source delivering event");
		(delivery.listener)(delivery.event);
		true
	}

	/// Delivers queued events until the queue is empty, including events
	/// queued by listeners along the way. Returns the number delivered.
	pub fn flush(&self) -> usize {
		let mut delivered = 0;
		while self.deliver_next() {
			delivered += 1;
		}
		delivered
	}

	/// Number of queued, undelivered events.
	pub fn pending(&self) -> usize {
		self.state.lock().queue.len()
	}

	/// Number of registered subscriptions, one-shot ones included until they fire.
	pub fn listener_count(&self) -> usize {
		self.state.lock().slots.len()
	}
}

impl MemoryState {
	fn entries<'a>(&'a self, path: &str) -> impl Iterator<Item = &'a Entry> + 'a {
		self.tables.get(path).into_iter().flat_map(|table| table.values())
	}

	fn enqueue(&mut self, id: SubscriptionId, listener: &Listener, event: SourceEvent) {
		self.queue.push_back(Delivery {
			id,
			listener: Arc::clone(listener),
			event,
		});
	}

	/// Re-evaluates every incremental subscription on `path` and queues the diffs.
	fn refresh(&mut self, path: &str) {
		let Self {
			tables, slots, queue, ..
		} = self;
		let table = tables.get(path);
		for (id, slot) in slots.iter_mut() {
			if slot.kind.is_one_shot() || slot.query.path() != path {
				continue;
			}
			let next = slot.query.evaluate(table.into_iter().flat_map(|table| table.values()));
			for event in diff(slot.kind, &slot.window, &next) {
				queue.push_back(Delivery {
					id: *id,
					listener: Arc::clone(&slot.listener),
					event,
				});
			}
			slot.window = next;
		}
	}
}

impl RecordSource for MemorySource {
	fn subscribe(&self, query: &Query, kind: ListenerKind, listener: Listener) -> SubscriptionId {
		let mut state = self.state.lock();
		state.next_id += 1;
		let id = SubscriptionId::new(state.next_id);

		if state.denied.contains(query.path()) {
			tracing::debug!(%id, path = query.path(), "memory source denied subscription");
			let error = SourceError::PermissionDenied {
				path: query.path().to_owned(),
			};
			state.enqueue(id, &listener, SourceEvent::Cancelled(error));
			return id;
		}

		let window = query.evaluate(state.entries(query.path()));
		match kind {
			ListenerKind::Initial => state.enqueue(id, &listener, SourceEvent::Initial(window.clone())),
			ListenerKind::Added => {
				for entry in &window {
					state.enqueue(id, &listener, SourceEvent::Added(entry.clone()));
				}
			}
			ListenerKind::Changed | ListenerKind::Removed | ListenerKind::Moved => {}
		}
		state.slots.insert(id, Slot {
			query: query.clone(),
			kind,
			listener,
			window,
		});
		id
	}

	fn unsubscribe(&self, id: SubscriptionId) {
		let mut state = self.state.lock();
		if state.slots.remove(&id).is_some() {
			tracing::trace!(%id, "memory source released subscription");
		}
		state.queue.retain(|delivery| delivery.id != id);
	}
}

/// Child events of `kind` that turn `before` into `after`.
fn diff(kind: ListenerKind, before: &[Entry], after: &[Entry]) -> Vec<SourceEvent> {
	let old: FxHashMap<&Key, &Entry> = before.iter().map(|entry| (&entry.key, entry)).collect();
	let new: FxHashMap<&Key, &Entry> = after.iter().map(|entry| (&entry.key, entry)).collect();
	let changed = |entry: &Entry| old.get(&entry.key).is_some_and(|prev| *prev != entry);

	match kind {
		ListenerKind::Initial => Vec::new(),
		ListenerKind::Added => after
			.iter()
			.filter(|entry| !old.contains_key(&entry.key))
			.cloned()
			.map(SourceEvent::Added)
			.collect(),
		ListenerKind::Removed => before
			.iter()
			.filter(|entry| !new.contains_key(&entry.key))
			.cloned()
			.map(SourceEvent::Removed)
			.collect(),
		ListenerKind::Changed => after
			.iter()
			.filter(|entry| changed(*entry))
			.cloned()
			.map(SourceEvent::Changed)
			.collect(),
		ListenerKind::Moved => {
			let rank_before = surviving_ranks(before, &new);
			let rank_after = surviving_ranks(after, &old);
			after
				.iter()
				.filter(|entry| changed(*entry) && rank_before.get(&entry.key) != rank_after.get(&entry.key))
				.cloned()
				.map(SourceEvent::Moved)
				.collect()
		}
	}
}

/// Position of each entry among those also present in `other`.
fn surviving_ranks<'a>(entries: &'a [Entry], other: &FxHashMap<&Key, &Entry>) -> FxHashMap<&'a Key, usize> {
	entries
		.iter()
		.filter(|entry| other.contains_key(&entry.key))
		.enumerate()
		.map(|(rank, entry)| (&entry.key, rank))
		.collect()
}

#[cfg(test)]
mod tests;

//! Materialized state of a live collection.
//!
//! [`CollectionState`] applies source events to the sorted visible sequence
//! and the hidden set, and appends the resulting delegate calls to an outbox.
//! It never talks to a source or a delegate itself.
//!
//! Invariants after every operation:
//! - `visible` is strictly ordered by the active [`SortOrder`];
//! - `known` holds exactly the keys of `visible` and `hidden`;
//! - a key is never both visible and hidden, nor visible twice.

use std::sync::Arc;

use livelist_primitives::{Entry, Key, insertion_index};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::delegate::Notification;
use crate::error::{CollectionError, Result};
use crate::record::Record;
use crate::sort::{CollectionOptions, Filter, SortOrder};

/// Delegate calls collected while state is being mutated.
pub(crate) type Outbox<R> = Vec<Notification<R>>;

pub(crate) struct CollectionState<R> {
	visible: Vec<Arc<R>>,
	hidden: FxHashMap<Key, Arc<R>>,
	known: FxHashSet<Key>,
	order: SortOrder<R>,
	filter: Option<Filter<R>>,
	initialized: bool,
}

impl<R: Record> CollectionState<R> {
	pub fn new(options: CollectionOptions<R>) -> Self {
		Self {
			visible: Vec::new(),
			hidden: FxHashMap::default(),
			known: FxHashSet::default(),
			order: options.order,
			filter: options.filter,
			initialized: false,
		}
	}

	/// Forgets every record. Ordering and filter are kept.
	pub fn reset(&mut self) {
		self.visible.clear();
		self.hidden.clear();
		self.known.clear();
		self.initialized = false;
	}

	pub fn visible(&self) -> &[Arc<R>] {
		&self.visible
	}

	pub fn len(&self) -> usize {
		self.visible.len()
	}

	pub const fn is_initialized(&self) -> bool {
		self.initialized
	}

	pub fn get(&self, index: usize) -> Result<Arc<R>> {
		self.visible.get(index).cloned().ok_or(CollectionError::IndexOutOfRange {
			index,
			len: self.visible.len(),
		})
	}

	pub fn index_of(&self, key: &str) -> Option<usize> {
		if !self.known.contains(key) {
			return None;
		}
		self.visible.iter().position(|record| record.key() == key)
	}

	pub fn get_by_key(&self, key: &str) -> Option<Arc<R>> {
		self.index_of(key).map(|index| Arc::clone(&self.visible[index]))
	}

	/// Visible or hidden record stored under `key`.
	pub fn record(&self, key: &str) -> Option<Arc<R>> {
		self.hidden.get(key).cloned().or_else(|| self.get_by_key(key))
	}

	/// Returns true when `key` is visible or hidden.
	pub fn contains_key(&self, key: &str) -> bool {
		self.known.contains(key)
	}

	/// Ingests a full snapshot and marks the state initialized.
	///
	/// Undecodable entries and repeated keys are skipped.
	pub fn ingest_initial(&mut self, entries: &[Entry], out: &mut Outbox<R>) {
		for entry in entries {
			if self.known.contains(&entry.key) {
				tracing::trace!(key = %entry.key, "skipping duplicate snapshot entry");
				continue;
			}
			let Some(record) = decode(entry) else {
				continue;
			};
			self.place(entry.key.clone(), record);
		}
		self.initialized = true;
		tracing::debug!(visible = self.visible.len(), hidden = self.hidden.len(), "collection initialized");
		out.push(Notification::Initialized(self.visible.clone()));
	}

	/// Inserts a new record. Returns false when the event was absorbed.
	pub fn apply_added(&mut self, entry: &Entry, out: &mut Outbox<R>) -> bool {
		if !self.initialized {
			tracing::trace!(key = %entry.key, "ignoring added event before snapshot");
			return false;
		}
		if self.known.contains(&entry.key) {
			tracing::trace!(key = %entry.key, "ignoring added event for known key");
			return false;
		}
		let Some(record) = decode(entry) else {
			return false;
		};
		if let Some(index) = self.place(entry.key.clone(), Arc::clone(&record)) {
			out.push(Notification::Added(record, index));
		}
		true
	}

	pub fn apply_changed(&mut self, entry: &Entry, out: &mut Outbox<R>) {
		if !self.known.contains(&entry.key) {
			tracing::trace!(key = %entry.key, "ignoring changed event for unknown key");
			return;
		}
		let Some(record) = decode(entry) else {
			return;
		};
		let admitted = self.admits(&record);

		if let Some(index) = self.position(entry.key.as_str()) {
			let previous = self.visible.remove(index);
			if !admitted {
				self.hidden.insert(entry.key.clone(), record);
				out.push(Notification::Removed(previous, index));
				return;
			}
			let to = self.insert_visible(Arc::clone(&record));
			out.push(Notification::Changed(Arc::clone(&record), index));
			if to != index {
				out.push(Notification::Moved { record, from: index, to });
			}
		} else if admitted {
			self.hidden.remove(&entry.key);
			let index = self.insert_visible(Arc::clone(&record));
			out.push(Notification::Added(record, index));
		} else {
			self.hidden.insert(entry.key.clone(), record);
		}
	}

	/// Drops the record under `key`. Returns false when the key was unknown.
	pub fn apply_removed(&mut self, key: &str, out: &mut Outbox<R>) -> bool {
		if !self.known.remove(key) {
			tracing::trace!(key, "ignoring removed event for unknown key");
			return false;
		}
		if self.hidden.remove(key).is_none()
			&& let Some(index) = self.position(key)
		{
			let record = self.visible.remove(index);
			out.push(Notification::Removed(record, index));
		}
		true
	}

	/// Re-positions a visible record after an upstream reorder.
	pub fn apply_moved(&mut self, entry: &Entry, out: &mut Outbox<R>) {
		let Some(from) = self.position(entry.key.as_str()) else {
			tracing::trace!(key = %entry.key, "ignoring moved event for record that is not visible");
			return;
		};
		let Some(record) = decode(entry) else {
			return;
		};
		let previous = self.visible.remove(from);
		if !self.admits(&record) {
			self.hidden.insert(entry.key.clone(), record);
			out.push(Notification::Removed(previous, from));
			return;
		}
		let to = self.insert_visible(Arc::clone(&record));
		out.push(Notification::Moved { record, from, to });
	}

	/// Replaces the filter and reconciles visibility in one batch.
	///
	/// Removals are reported in descending index order, then reveals in
	/// ascending order.
	pub fn set_filter(&mut self, filter: Option<Filter<R>>, out: &mut Outbox<R>) {
		self.filter = filter;
		out.push(Notification::BeginUpdates);

		for index in (0..self.visible.len()).rev() {
			if self.admits(&self.visible[index]) {
				continue;
			}
			let record = self.visible.remove(index);
			self.hidden.insert(Key::from(record.key()), Arc::clone(&record));
			out.push(Notification::Removed(record, index));
		}

		let mut revealed: Vec<Arc<R>> = self
			.hidden
			.values()
			.filter(|record| self.admits(record))
			.cloned()
			.collect();
		revealed.sort_by(|a, b| self.order.compare(a, b));
		for record in revealed {
			self.hidden.remove(record.key());
			let index = self.insert_visible(Arc::clone(&record));
			out.push(Notification::Added(record, index));
		}

		out.push(Notification::EndUpdates);
	}

	/// Replaces the ordering and re-sorts the visible sequence.
	pub fn set_order(&mut self, order: SortOrder<R>, out: &mut Outbox<R>) {
		self.order = order;
		let order = &self.order;
		self.visible.sort_by(|a, b| order.compare(a, b));
		out.push(Notification::ReorderedAll(self.visible.clone()));
	}

	fn admits(&self, record: &R) -> bool {
		self.filter.as_ref().is_none_or(|filter| filter(record))
	}

	fn position(&self, key: &str) -> Option<usize> {
		self.visible.iter().position(|record| record.key() == key)
	}

	fn insert_visible(&mut self, record: Arc<R>) -> usize {
		let order = &self.order;
		let index = insertion_index(&self.visible, &record, |a, b| order.is_before(a, b));
		self.visible.insert(index, record);
		index
	}

	/// Stores a record under a fresh key. Returns its visible index, or `None`
	/// when the filter hid it.
	fn place(&mut self, key: Key, record: Arc<R>) -> Option<usize> {
		self.known.insert(key.clone());
		if self.admits(&record) {
			Some(self.insert_visible(record))
		} else {
			self.hidden.insert(key, record);
			None
		}
	}

	#[cfg(test)]
	pub fn hidden_len(&self) -> usize {
		self.hidden.len()
	}

	/// Panics when any structural invariant is violated.
	#[cfg(test)]
	pub fn check_invariants(&self) {
		for pair in self.visible.windows(2) {
			assert!(
				self.order.is_before(&pair[0], &pair[1]),
				"visible out of order at {} / {}",
				pair[0].key(),
				pair[1].key()
			);
		}
		let mut keys: FxHashSet<&str> = FxHashSet::default();
		for record in &self.visible {
			assert!(keys.insert(record.key()), "duplicate visible key {}", record.key());
		}
		for key in self.hidden.keys() {
			assert!(keys.insert(key.as_str()), "key {key} is both visible and hidden");
		}
		let known: FxHashSet<&str> = self.known.iter().map(Key::as_str).collect();
		assert_eq!(keys, known, "known keys diverged from visible and hidden");
	}
}

fn decode<R: Record>(entry: &Entry) -> Option<Arc<R>> {
	match R::decode(entry) {
		Ok(record) => Some(Arc::new(record)),
		Err(error) => {
			tracing::trace!(key = %entry.key, %error, "skipping undecodable entry");
			None
		}
	}
}

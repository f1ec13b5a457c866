//! Shared engine behind both collection types.
//!
//! State lives behind one lock. Mutations collect delegate calls in an outbox
//! that is delivered after the lock is released, and source subscriptions are
//! only opened or released outside of it. Delegates and sources may therefore
//! call back into the collection from any notification.

use std::sync::{Arc, Weak};

use livelist_primitives::Entry;
use livelist_source::{SourceError, SourceEvent};
use parking_lot::Mutex;

use crate::delegate::{CollectionDelegate, Notification};
use crate::error::Result;
use crate::link::{Release, SourceLink};
use crate::record::Record;
use crate::sort::{Filter, SortOrder};
use crate::state::{CollectionState, Outbox};

/// Lock-protected part of a collection.
pub(crate) trait Engine<R>: Send + 'static {
	fn state(&self) -> &CollectionState<R>;

	fn state_mut(&mut self) -> &mut CollectionState<R>;

	fn link(&mut self) -> &mut SourceLink;

	/// Tears down the current subscription generation.
	fn detach(&mut self) -> Release {
		self.link().detach()
	}
}

pub(crate) struct Core<R, I> {
	inner: Mutex<I>,
	delegate: Mutex<Option<Weak<dyn CollectionDelegate<R>>>>,
}

impl<R: Record, I: Engine<R>> Core<R, I> {
	pub fn new(inner: I) -> Self {
		Self {
			inner: Mutex::new(inner),
			delegate: Mutex::new(None),
		}
	}

	pub fn set_delegate(&self, delegate: Weak<dyn CollectionDelegate<R>>) {
		*self.delegate.lock() = Some(delegate);
	}

	pub fn clear_delegate(&self) {
		*self.delegate.lock() = None;
	}

	fn delegate(&self) -> Option<Arc<dyn CollectionDelegate<R>>> {
		self.delegate.lock().as_ref().and_then(Weak::upgrade)
	}

	pub fn read<T>(&self, f: impl FnOnce(&I) -> T) -> T {
		f(&*self.inner.lock())
	}

	/// Runs `f` under the lock, then delivers the notifications it produced.
	pub fn update<T>(&self, f: impl FnOnce(&mut I, &mut Outbox<R>) -> T) -> T {
		let mut out = Vec::new();
		let result = f(&mut *self.inner.lock(), &mut out);
		self.emit(out);
		result
	}

	/// Delivers notifications to the delegate, if it is still alive.
	pub fn emit(&self, out: Outbox<R>) {
		if out.is_empty() {
			return;
		}
		let Some(delegate) = self.delegate() else {
			tracing::trace!(dropped = out.len(), "no delegate for notifications");
			return;
		};
		for notification in &out {
			notification.deliver_to(&*delegate);
		}
	}

	pub fn len(&self) -> usize {
		self.read(|inner| inner.state().len())
	}

	pub fn get(&self, index: usize) -> Result<Arc<R>> {
		self.read(|inner| inner.state().get(index))
	}

	pub fn get_by_key(&self, key: &str) -> Option<Arc<R>> {
		self.read(|inner| inner.state().get_by_key(key))
	}

	pub fn index_of(&self, key: &str) -> Option<usize> {
		self.read(|inner| inner.state().index_of(key))
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.read(|inner| inner.state().contains_key(key))
	}

	pub fn snapshot(&self) -> Vec<Arc<R>> {
		self.read(|inner| inner.state().visible().to_vec())
	}

	pub fn is_initialized(&self) -> bool {
		self.read(|inner| inner.state().is_initialized())
	}

	pub fn is_subscribed(&self) -> bool {
		self.inner.lock().link().is_attached()
	}

	pub fn set_filter(&self, filter: Option<Filter<R>>) {
		self.update(|inner, out| inner.state_mut().set_filter(filter, out));
	}

	pub fn set_order(&self, order: SortOrder<R>) {
		self.update(|inner, out| inner.state_mut().set_order(order, out));
	}

	/// Releases every subscription. Safe to call repeatedly and from delegate
	/// callbacks.
	pub fn unsubscribe(&self) {
		let release = self.inner.lock().detach();
		release.run();
	}

	/// Forwards a cancellation of the current generation and releases the rest
	/// of its subscriptions.
	pub fn cancel(&self, generation: u64, error: SourceError) {
		let release = self.update(|inner, out| {
			if !inner.link().is_current(generation) {
				return Release::default();
			}
			tracing::warn!(%error, "collection subscription cancelled");
			out.push(Notification::Cancelled(error));
			inner.detach()
		});
		release.run();
	}
}

/// Applies one incremental event to `state`.
pub(crate) fn apply_incremental<R: Record>(state: &mut CollectionState<R>, event: &SourceEvent, out: &mut Outbox<R>) {
	match event {
		SourceEvent::Added(entry) => {
			state.apply_added(entry, out);
		}
		SourceEvent::Changed(entry) => state.apply_changed(entry, out),
		SourceEvent::Removed(entry) => {
			state.apply_removed(entry.key.as_str(), out);
		}
		SourceEvent::Moved(entry) => state.apply_moved(entry, out),
		SourceEvent::Initial(_) | SourceEvent::Cancelled(_) => {}
	}
}

/// Entry carried by an incremental event.
pub(crate) const fn event_entry(event: &SourceEvent) -> Option<&Entry> {
	match event {
		SourceEvent::Added(entry) | SourceEvent::Changed(entry) | SourceEvent::Removed(entry) | SourceEvent::Moved(entry) => {
			Some(entry)
		}
		SourceEvent::Initial(_) | SourceEvent::Cancelled(_) => None,
	}
}

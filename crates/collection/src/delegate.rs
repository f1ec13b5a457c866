//! Change notifications produced by collections.

use std::sync::Arc;

use livelist_source::SourceError;

/// Observer of a collection's visible sequence.
///
/// Every method defaults to a no-op. Indices refer to the visible sequence at
/// the moment of the notification: `removed` indices are positions before the
/// removal, `added` indices positions after the insertion.
///
/// Callbacks run without any collection lock held and may call back into the
/// collection, including `unsubscribe`.
#[allow(unused_variables)]
pub trait CollectionDelegate<R>: Send + Sync {
	/// The initial snapshot has been ingested.
	fn initialized(&self, snapshot: &[Arc<R>]) {}

	fn added(&self, record: &Arc<R>, index: usize) {}

	/// `record` replaced the previous record at `index`.
	fn changed(&self, record: &Arc<R>, index: usize) {}

	fn removed(&self, record: &Arc<R>, index: usize) {}

	fn moved(&self, record: &Arc<R>, from: usize, to: usize) {}

	/// The whole sequence was re-sorted.
	fn reordered_all(&self, snapshot: &[Arc<R>]) {}

	/// Opens a batch of related notifications.
	fn begin_updates(&self) {}

	fn end_updates(&self) {}

	/// A subscription failed. No further events follow until the collection
	/// is subscribed again.
	fn cancelled(&self, error: &SourceError) {}
}

/// A pending delegate call, collected while the collection is locked.
#[derive(Debug)]
pub enum Notification<R> {
	Initialized(Vec<Arc<R>>),
	Added(Arc<R>, usize),
	Changed(Arc<R>, usize),
	Removed(Arc<R>, usize),
	Moved { record: Arc<R>, from: usize, to: usize },
	ReorderedAll(Vec<Arc<R>>),
	BeginUpdates,
	EndUpdates,
	Cancelled(SourceError),
}

impl<R> Notification<R> {
	/// Invokes the matching delegate method.
	pub fn deliver_to(&self, delegate: &dyn CollectionDelegate<R>) {
		match self {
			Self::Initialized(snapshot) => delegate.initialized(snapshot),
			Self::Added(record, index) => delegate.added(record, *index),
			Self::Changed(record, index) => delegate.changed(record, *index),
			Self::Removed(record, index) => delegate.removed(record, *index),
			Self::Moved { record, from, to } => delegate.moved(record, *from, *to),
			Self::ReorderedAll(snapshot) => delegate.reordered_all(snapshot),
			Self::BeginUpdates => delegate.begin_updates(),
			Self::EndUpdates => delegate.end_updates(),
			Self::Cancelled(error) => delegate.cancelled(error),
		}
	}
}

//! Live collection over a single unbounded query.

use std::sync::Arc;

use livelist_primitives::Query;
use livelist_source::{Listener, RecordSource, SourceEvent};

use crate::delegate::CollectionDelegate;
use crate::engine::{Core, Engine, apply_incremental};
use crate::error::{CollectionError, Result};
use crate::link::{SourceLink, open_listeners};
use crate::record::Record;
use crate::sort::{CollectionOptions, Filter, SortOrder};
use crate::state::CollectionState;

type LiveCore<R> = Core<R, LiveEngine<R>>;

pub(crate) struct LiveEngine<R> {
	state: CollectionState<R>,
	link: SourceLink,
	query: Option<Query>,
}

impl<R: Record> Engine<R> for LiveEngine<R> {
	fn state(&self) -> &CollectionState<R> {
		&self.state
	}

	fn state_mut(&mut self) -> &mut CollectionState<R> {
		&mut self.state
	}

	fn link(&mut self) -> &mut SourceLink {
		&mut self.link
	}
}

/// Sorted, filtered view of a query, kept in sync with a [`RecordSource`].
///
/// Dropping the collection releases its subscriptions.
pub struct LiveCollection<R: Record> {
	core: Arc<LiveCore<R>>,
}

impl<R: Record> LiveCollection<R> {
	/// Key-ordered collection without a filter.
	pub fn new() -> Self {
		Self::with_options(CollectionOptions::default())
	}

	pub fn with_options(options: CollectionOptions<R>) -> Self {
		Self {
			core: Arc::new(Core::new(LiveEngine {
				state: CollectionState::new(options),
				link: SourceLink::default(),
				query: None,
			})),
		}
	}

	/// Registers the delegate. Only a weak reference is kept.
	pub fn set_delegate<D: CollectionDelegate<R> + 'static>(&self, delegate: &Arc<D>) {
		let delegate: Arc<dyn CollectionDelegate<R>> = delegate.clone();
		self.core.set_delegate(Arc::downgrade(&delegate));
	}

	pub fn clear_delegate(&self) {
		self.core.clear_delegate();
	}

	/// Starts observing `query` on `source`.
	///
	/// Previously held records are discarded; the delegate receives
	/// `initialized` once the snapshot arrives.
	///
	/// # Errors
	///
	/// [`CollectionError::AlreadySubscribed`] when called again without
	/// unsubscribing first.
	pub fn subscribe(&self, source: Arc<dyn RecordSource>, query: Query) -> Result<()> {
		let generation = self.core.update(|engine, _| {
			let generation = engine.link.attach(Arc::clone(&source))?;
			engine.state.reset();
			engine.query = Some(query.clone());
			Ok::<_, CollectionError>(generation)
		})?;
		tracing::debug!(path = query.path(), generation, "subscribing live collection");

		let ids = open_listeners(&*source, &query, &listener(&self.core, generation));
		self.core.update(|engine, _| engine.link.adopt(generation, source, ids)).run();
		Ok(())
	}

	/// Releases all subscriptions. Records stay readable.
	pub fn unsubscribe(&self) {
		self.core.unsubscribe();
	}

	pub fn is_subscribed(&self) -> bool {
		self.core.is_subscribed()
	}

	/// Returns true once the initial snapshot has been ingested.
	pub fn is_initialized(&self) -> bool {
		self.core.is_initialized()
	}

	/// Query of the current or most recent subscription.
	pub fn query(&self) -> Option<Query> {
		self.core.read(|engine| engine.query.clone())
	}

	pub fn len(&self) -> usize {
		self.core.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Visible record at `index`.
	///
	/// # Errors
	///
	/// [`CollectionError::IndexOutOfRange`] when `index >= len()`.
	pub fn get(&self, index: usize) -> Result<Arc<R>> {
		self.core.get(index)
	}

	pub fn get_by_key(&self, key: &str) -> Option<Arc<R>> {
		self.core.get_by_key(key)
	}

	pub fn index_of(&self, key: &str) -> Option<usize> {
		self.core.index_of(key)
	}

	/// Returns true when `key` is held, visible or hidden by the filter.
	pub fn contains_key(&self, key: &str) -> bool {
		self.core.contains_key(key)
	}

	/// Copy of the visible sequence.
	pub fn snapshot(&self) -> Vec<Arc<R>> {
		self.core.snapshot()
	}

	/// Replaces the filter; `None` shows every record.
	pub fn set_filter(&self, filter: Option<Filter<R>>) {
		self.core.set_filter(filter);
	}

	pub fn set_order(&self, order: SortOrder<R>) {
		self.core.set_order(order);
	}
}

impl<R: Record> Default for LiveCollection<R> {
	fn default() -> Self {
		Self::new()
	}
}

impl<R: Record> Drop for LiveCollection<R> {
	fn drop(&mut self) {
		self.core.unsubscribe();
	}
}

fn listener<R: Record>(core: &Arc<LiveCore<R>>, generation: u64) -> Listener {
	let core = Arc::downgrade(core);
	Arc::new(move |event| {
		if let Some(core) = core.upgrade() {
			handle_event(&core, generation, event);
		}
	})
}

fn handle_event<R: Record>(core: &LiveCore<R>, generation: u64, event: SourceEvent) {
	if let SourceEvent::Cancelled(error) = event {
		core.cancel(generation, error);
		return;
	}
	core.update(|engine, out| {
		if !engine.link.is_current(generation) {
			tracing::trace!(generation, "dropping event from released subscription");
			return;
		}
		match &event {
			SourceEvent::Initial(entries) => engine.state.ingest_initial(entries, out),
			incremental => apply_incremental(&mut engine.state, incremental, out),
		}
	});
}

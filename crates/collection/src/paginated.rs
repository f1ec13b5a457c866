//! Live collection fed by consecutive bounded pages of one query.
//!
//! Every page asks for one entry more than it needs, so a short snapshot
//! always means the end of the data. Page 0 asks for `page_size + 1` entries.
//! Every later page starts at the boundary recorded from the last entry of the
//! page before it. Start bounds are inclusive, so a later page asks for
//! `page_size + 2` entries and drops its first one when it is the boundary
//! entry itself. All pages feed one merged, sorted sequence.
//!
//! Page windows overlap at their boundaries and slide as entries come and go
//! upstream. A key is only removed from the merged sequence once no page
//! window holds it any more.

use std::sync::Arc;

use livelist_primitives::{Boundary, Entry, Key, Query};
use livelist_source::{Listener, RecordSource, SourceEvent};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::delegate::{CollectionDelegate, Notification};
use crate::engine::{Core, Engine, event_entry};
use crate::error::{CollectionError, Result};
use crate::link::{Release, SourceLink, open_listeners};
use crate::record::Record;
use crate::sort::{CollectionOptions, Filter, SortOrder};
use crate::state::{CollectionState, Outbox};

type PagedCore<R> = Core<R, PagedEngine<R>>;

/// Outcome of [`PaginatedLiveCollection::load_next_page`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLoad {
	/// A new page was opened under this index.
	Opened(usize),
	/// The snapshot of this page is still pending; nothing was opened.
	InFlight(usize),
	/// The last page has been seen; nothing was opened.
	FullyLoaded,
	/// The collection is not subscribed.
	Unsubscribed,
}

/// Pages currently holding a key, and the newest entry any of them reported.
struct Owners {
	pages: SmallVec<[usize; 2]>,
	entry: Entry,
}

pub(crate) struct PagedEngine<R> {
	state: CollectionState<R>,
	link: SourceLink,
	query: Option<Query>,
	page_size: usize,
	/// Start boundary of every opened page.
	pages: Vec<Option<Boundary>>,
	next_start: Option<Boundary>,
	in_flight: Option<usize>,
	fully_loaded: bool,
	last_entry: Option<Arc<R>>,
	owners: FxHashMap<Key, Owners>,
}

struct PendingPage {
	page: usize,
	generation: u64,
	query: Query,
}

impl<R: Record> Engine<R> for PagedEngine<R> {
	fn state(&self) -> &CollectionState<R> {
		&self.state
	}

	fn state_mut(&mut self) -> &mut CollectionState<R> {
		&mut self.state
	}

	fn link(&mut self) -> &mut SourceLink {
		&mut self.link
	}

	fn detach(&mut self) -> Release {
		self.in_flight = None;
		self.link.detach()
	}
}

impl<R: Record> PagedEngine<R> {
	const fn page_limit(&self, page: usize) -> usize {
		if page == 0 { self.page_size + 1 } else { self.page_size + 2 }
	}

	fn reset(&mut self) {
		self.state.reset();
		self.pages.clear();
		self.next_start = None;
		self.in_flight = None;
		self.fully_loaded = false;
		self.last_entry = None;
		self.owners.clear();
	}

	fn open_page(&mut self, base: &Query, start: Option<Boundary>) -> PendingPage {
		let page = self.pages.len();
		let query = base.page(self.page_limit(page), start.clone());
		self.pages.push(start);
		self.in_flight = Some(page);
		PendingPage {
			page,
			generation: self.link.generation(),
			query,
		}
	}

	fn next_page(&mut self) -> std::result::Result<(Arc<dyn RecordSource>, PendingPage), PageLoad> {
		let (Some(source), Some(base)) = (self.link.source(), self.query.clone()) else {
			return Err(PageLoad::Unsubscribed);
		};
		if let Some(page) = self.in_flight {
			return Err(PageLoad::InFlight(page));
		}
		if self.fully_loaded {
			return Err(PageLoad::FullyLoaded);
		}
		let start = self.next_start.take();
		Ok((source, self.open_page(&base, start)))
	}

	/// Records that `page` holds `entry`. Returns true when another page
	/// reported a different payload for the same key before.
	fn claim(&mut self, page: usize, entry: &Entry) -> bool {
		match self.owners.get_mut(&entry.key) {
			Some(owners) => {
				if !owners.pages.contains(&page) {
					owners.pages.push(page);
				}
				let stale = owners.entry != *entry;
				if stale {
					owners.entry = entry.clone();
				}
				stale
			}
			None => {
				self.owners.insert(
					entry.key.clone(),
					Owners {
						pages: SmallVec::from_elem(page, 1),
						entry: entry.clone(),
					},
				);
				false
			}
		}
	}

	/// Drops `page` from the holders of `key`. Returns true once no page holds it.
	fn release(&mut self, page: usize, key: &str) -> bool {
		let Some(owners) = self.owners.get_mut(key) else {
			return true;
		};
		owners.pages.retain(|held| *held != page);
		if owners.pages.is_empty() {
			self.owners.remove(key);
			true
		} else {
			tracing::trace!(key, page, "key still held by another page");
			false
		}
	}

	/// Adds `entry` to the merged sequence, or refreshes it when it is already
	/// known with an older payload.
	fn merge(&mut self, page: usize, entry: &Entry, out: &mut Outbox<R>) {
		let stale = self.claim(page, entry);
		if stale && self.state.contains_key(entry.key.as_str()) {
			self.state.apply_changed(entry, out);
		} else {
			self.state.apply_added(entry, out);
		}
	}

	fn ingest_page(&mut self, page: usize, entries: &[Entry], out: &mut Outbox<R>) {
		if self.in_flight == Some(page) {
			self.in_flight = None;
		}

		if page == 0 {
			for entry in entries {
				self.claim(page, entry);
			}
			self.state.ingest_initial(entries, out);
		} else {
			out.push(Notification::BeginUpdates);
			let boundary = self.pages.get(page).and_then(Option::as_ref).and_then(|start| start.key.as_ref());
			let mut fresh = entries;
			if let Some(first) = entries.first()
				&& Some(&first.key) == boundary
				&& self.state.contains_key(first.key.as_str())
			{
				tracing::trace!(key = %first.key, page, "skipping boundary entry");
				if self.claim(page, first) {
					self.state.apply_changed(first, out);
				}
				fresh = &entries[1..];
			}
			for entry in fresh {
				self.merge(page, entry, out);
			}
			out.push(Notification::EndUpdates);
		}

		if let Some(last) = entries.iter().rev().find_map(|entry| self.state.get_by_key(entry.key.as_str())) {
			self.last_entry = Some(last);
		} else if let Some(last) = self.state.visible().last() {
			self.last_entry = Some(Arc::clone(last));
		}
		if entries.len() < self.page_limit(page) {
			self.fully_loaded = true;
			self.next_start = None;
			tracing::debug!(page, raw = entries.len(), "collection fully loaded");
		} else {
			self.next_start = entries.last().zip(self.query.as_ref()).map(|(last, query)| query.boundary_for(last));
			tracing::debug!(page, raw = entries.len(), "page loaded");
		}
	}

	fn apply_event(&mut self, page: usize, event: &SourceEvent, out: &mut Outbox<R>) {
		let Some(entry) = event_entry(event) else {
			return;
		};
		match event {
			SourceEvent::Added(_) => self.merge(page, entry, out),
			SourceEvent::Changed(_) => {
				if self.claim(page, entry) {
					self.state.apply_changed(entry, out);
				}
			}
			SourceEvent::Removed(_) => {
				if self.release(page, entry.key.as_str()) {
					self.state.apply_removed(entry.key.as_str(), out);
				}
			}
			SourceEvent::Moved(_) => {
				self.claim(page, entry);
				self.state.apply_moved(entry, out);
			}
			SourceEvent::Initial(_) | SourceEvent::Cancelled(_) => {}
		}
	}
}

/// Live collection that observes its query one page at a time.
///
/// The first page opens on [`subscribe`](Self::subscribe). Further pages open
/// on explicit [`load_next_page`](Self::load_next_page) calls, typically when
/// the consumer reaches [`last_entry_of_current_page`](Self::last_entry_of_current_page).
///
/// Dropping the collection releases the subscriptions of every page.
pub struct PaginatedLiveCollection<R: Record> {
	core: Arc<PagedCore<R>>,
}

impl<R: Record> PaginatedLiveCollection<R> {
	/// # Errors
	///
	/// [`CollectionError::ZeroPageSize`] when `page_size` is 0.
	pub fn new(page_size: usize, options: CollectionOptions<R>) -> Result<Self> {
		if page_size == 0 {
			return Err(CollectionError::ZeroPageSize);
		}
		Ok(Self {
			core: Arc::new(Core::new(PagedEngine {
				state: CollectionState::new(options),
				link: SourceLink::default(),
				query: None,
				page_size,
				pages: Vec::new(),
				next_start: None,
				in_flight: None,
				fully_loaded: false,
				last_entry: None,
				owners: FxHashMap::default(),
			})),
		})
	}

	/// Registers the delegate. Only a weak reference is kept.
	pub fn set_delegate<D: CollectionDelegate<R> + 'static>(&self, delegate: &Arc<D>) {
		let delegate: Arc<dyn CollectionDelegate<R>> = delegate.clone();
		self.core.set_delegate(Arc::downgrade(&delegate));
	}

	pub fn clear_delegate(&self) {
		self.core.clear_delegate();
	}

	/// Starts observing `query` on `source` and opens the first page.
	///
	/// Limits already set on `query` are replaced by page limits.
	///
	/// # Errors
	///
	/// [`CollectionError::AlreadySubscribed`] when called again without
	/// unsubscribing first.
	pub fn subscribe(&self, source: Arc<dyn RecordSource>, query: Query) -> Result<()> {
		let pending = self.core.update(|engine, _| {
			engine.link.attach(Arc::clone(&source))?;
			engine.reset();
			engine.query = Some(query.clone());
			Ok::<_, CollectionError>(engine.open_page(&query, None))
		})?;
		self.open(source, pending);
		Ok(())
	}

	/// Opens the next page.
	///
	/// Does nothing while a page snapshot is pending, once the last page has
	/// been seen, or when unsubscribed; the returned [`PageLoad`] says which.
	pub fn load_next_page(&self) -> PageLoad {
		let (source, pending) = match self.core.update(|engine, _| engine.next_page()) {
			Ok(next) => next,
			Err(load) => {
				tracing::trace!(?load, "next page not opened");
				return load;
			}
		};
		let page = pending.page;
		self.open(source, pending);
		PageLoad::Opened(page)
	}

	fn open(&self, source: Arc<dyn RecordSource>, pending: PendingPage) {
		let PendingPage { page, generation, query } = pending;
		tracing::debug!(page, generation, path = query.path(), "opening page");
		let ids = open_listeners(&*source, &query, &listener(&self.core, generation, page));
		self.core.update(|engine, _| engine.link.adopt(generation, source, ids)).run();
	}

	/// Releases the subscriptions of every page. Records stay readable.
	pub fn unsubscribe(&self) {
		self.core.unsubscribe();
	}

	pub fn is_subscribed(&self) -> bool {
		self.core.is_subscribed()
	}

	/// Returns true once the first page has been ingested.
	pub fn is_initialized(&self) -> bool {
		self.core.is_initialized()
	}

	pub fn query(&self) -> Option<Query> {
		self.core.read(|engine| engine.query.clone())
	}

	pub fn page_size(&self) -> usize {
		self.core.read(|engine| engine.page_size)
	}

	/// Index of the most recently opened page.
	pub fn current_page(&self) -> Option<usize> {
		self.core.read(|engine| engine.pages.len().checked_sub(1))
	}

	/// Returns true while a page snapshot is pending.
	pub fn is_loading(&self) -> bool {
		self.core.read(|engine| engine.in_flight.is_some())
	}

	pub fn is_fully_loaded(&self) -> bool {
		self.core.read(|engine| engine.fully_loaded)
	}

	/// Last visible record of the most recently loaded page.
	///
	/// Falls back to the last visible record overall when the filter hides
	/// every record of that page.
	pub fn last_entry_of_current_page(&self) -> Option<Arc<R>> {
		self.core.read(|engine| engine.last_entry.clone())
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

	pub fn contains_key(&self, key: &str) -> bool {
		self.core.contains_key(key)
	}

	pub fn snapshot(&self) -> Vec<Arc<R>> {
		self.core.snapshot()
	}

	pub fn set_filter(&self, filter: Option<Filter<R>>) {
		self.core.set_filter(filter);
	}

	pub fn set_order(&self, order: SortOrder<R>) {
		self.core.set_order(order);
	}
}

impl<R: Record> Drop for PaginatedLiveCollection<R> {
	fn drop(&mut self) {
		self.core.unsubscribe();
	}
}

fn listener<R: Record>(core: &Arc<PagedCore<R>>, generation: u64, page: usize) -> Listener {
	let core = Arc::downgrade(core);
	Arc::new(move |event| {
		if let Some(core) = core.upgrade() {
			handle_event(&core, generation, page, event);
		}
	})
}

fn handle_event<R: Record>(core: &PagedCore<R>, generation: u64, page: usize, event: SourceEvent) {
	if let SourceEvent::Cancelled(error) = event {
		core.cancel(generation, error);
		return;
	}
	core.update(|engine, out| {
		if !engine.link.is_current(generation) {
			tracing::trace!(generation, page, "dropping event from released page");
			return;
		}
		match &event {
			SourceEvent::Initial(entries) => engine.ingest_page(page, entries, out),
			incremental => engine.apply_event(page, incremental, out),
		}
	});
}

use std::sync::Arc;

use livelist_primitives::Boundary;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::json;

use super::*;

/// Collects `(kind, key)` pairs; snapshots record every key in order.
#[derive(Default)]
struct Log {
	seen: Mutex<Vec<String>>,
}

impl Log {
	fn listener(self: &Arc<Self>) -> Listener {
		let log = Arc::clone(self);
		Arc::new(move |event| {
			let line = match event {
				SourceEvent::Initial(entries) => {
					let keys: Vec<&str> = entries.iter().map(|entry| entry.key.as_str()).collect();
					format!("initial {}", keys.join(","))
				}
				SourceEvent::Added(entry) => format!("added {}", entry.key),
				SourceEvent::Changed(entry) => format!("changed {}", entry.key),
				SourceEvent::Removed(entry) => format!("removed {}", entry.key),
				SourceEvent::Moved(entry) => format!("moved {}", entry.key),
				SourceEvent::Cancelled(error) => format!("cancelled {error}"),
			};
			log.seen.lock().push(line);
		})
	}

	fn take(&self) -> Vec<String> {
		std::mem::take(&mut *self.seen.lock())
	}
}

fn seeded() -> MemorySource {
	let source = MemorySource::new();
	source.set("items", "b", json!({ "n": 2 }));
	source.set("items", "a", json!({ "n": 1 }));
	source.set("items", "c", json!({ "n": 3 }));
	source
}

#[test]
fn initial_fires_once_then_releases() {
	let source = seeded();
	let log = Arc::new(Log::default());
	source.subscribe(&Query::new("items"), ListenerKind::Initial, log.listener());
	assert_eq!(source.listener_count(), 1);
	assert_eq!(source.flush(), 1);
	assert_eq!(log.take(), ["initial a,b,c"]);
	assert_eq!(source.listener_count(), 0);

	source.set("items", "d", json!({ "n": 4 }));
	assert_eq!(source.flush(), 0);
}

#[test]
fn added_listener_replays_existing_children() {
	let source = seeded();
	let log = Arc::new(Log::default());
	source.subscribe(&Query::new("items"), ListenerKind::Added, log.listener());
	source.flush();
	assert_eq!(log.take(), ["added a", "added b", "added c"]);

	source.set("items", "d", json!({ "n": 4 }));
	source.flush();
	assert_eq!(log.take(), ["added d"]);
}

#[test]
fn identical_write_emits_nothing() {
	let source = seeded();
	let log = Arc::new(Log::default());
	source.subscribe(&Query::new("items"), ListenerKind::Changed, log.listener());
	source.set("items", "a", json!({ "n": 1 }));
	assert_eq!(source.flush(), 0);
	source.set("items", "a", json!({ "n": 9 }));
	source.flush();
	assert_eq!(log.take(), ["changed a"]);
}

#[test]
fn limited_window_slides() {
	let source = seeded();
	let log = Arc::new(Log::default());
	let query = Query::new("items").limit_to_first(2);
	source.subscribe(&query, ListenerKind::Added, log.listener());
	source.subscribe(&query, ListenerKind::Removed, log.listener());
	source.flush();
	log.take();

	source.set("items", "0", json!({ "n": 0 }));
	source.flush();
	assert_eq!(log.take(), ["added 0", "removed b"]);

	source.remove("items", "a");
	source.flush();
	assert_eq!(log.take(), ["added b", "removed a"]);
}

#[test]
fn moved_fires_for_reordered_child_only() {
	let source = seeded();
	let log = Arc::new(Log::default());
	let query = Query::new("items").order_by_child("n");
	source.subscribe(&query, ListenerKind::Moved, log.listener());
	source.set("items", "a", json!({ "n": 10 }));
	source.set("items", "b", json!({ "n": 2.5 }));
	source.flush();
	assert_eq!(log.take(), ["moved a"]);
}

#[test]
fn start_at_window_is_inclusive() {
	let source = seeded();
	let log = Arc::new(Log::default());
	let start = Boundary::at(json!("b"));
	source.subscribe(&Query::new("items").start_at(start), ListenerKind::Initial, log.listener());
	source.flush();
	assert_eq!(log.take(), ["initial b,c"]);
}

#[test]
fn unsubscribe_drops_queued_events() {
	let source = seeded();
	let log = Arc::new(Log::default());
	let id = source.subscribe(&Query::new("items"), ListenerKind::Added, log.listener());
	assert_eq!(source.pending(), 3);
	source.unsubscribe(id);
	assert_eq!(source.pending(), 0);
	assert_eq!(source.listener_count(), 0);
	source.unsubscribe(id);
}

#[test]
fn listener_may_unsubscribe_during_delivery() {
	let source = Arc::new(seeded());
	let seen = Arc::new(Mutex::new(Vec::new()));
	let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::default();
	let listener: Listener = {
		let source = Arc::clone(&source);
		let seen = Arc::clone(&seen);
		let slot = Arc::clone(&slot);
		Arc::new(move |event| {
			if let SourceEvent::Added(entry) = event {
				seen.lock().push(entry.key.to_string());
			}
			if let Some(id) = *slot.lock() {
				source.unsubscribe(id);
			}
		})
	};
	let id = source.subscribe(&Query::new("items"), ListenerKind::Added, listener);
	*slot.lock() = Some(id);
	source.flush();
	assert_eq!(*seen.lock(), ["a"]);
}

#[test]
fn denied_path_cancels_new_subscriptions() {
	let source = seeded();
	source.deny("items");
	let log = Arc::new(Log::default());
	source.subscribe(&Query::new("items"), ListenerKind::Initial, log.listener());
	source.flush();
	assert_eq!(log.take(), ["cancelled permission denied for `items`"]);
	assert_eq!(source.listener_count(), 0);

	source.allow("items");
	source.subscribe(&Query::new("items"), ListenerKind::Initial, log.listener());
	source.flush();
	assert_eq!(log.take(), ["initial a,b,c"]);
}

#[test]
fn sever_replaces_queue_with_cancellation() {
	let source = seeded();
	let log = Arc::new(Log::default());
	source.subscribe(&Query::new("items"), ListenerKind::Added, log.listener());
	source.subscribe(&Query::new("other"), ListenerKind::Added, log.listener());
	assert_eq!(source.sever("items", SourceError::Disconnected("reset".into())), 1);
	source.flush();
	assert_eq!(log.take(), ["cancelled disconnected: reset"]);
	assert_eq!(source.listener_count(), 1);
}

#[test]
fn remove_missing_key_is_silent() {
	let source = seeded();
	assert_eq!(source.remove("items", "zzz"), None);
	assert_eq!(source.remove("nowhere", "a"), None);
	assert_eq!(source.len("items"), 3);
	assert_eq!(source.get("items", "a"), Some(Entry::new("a", json!({ "n": 1 }))));
}

//! Shared fixtures for collection tests.

use std::borrow::Cow;
use std::sync::Arc;

use livelist_primitives::{Entry, Value};
use livelist_source::SourceError;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;

use crate::delegate::{CollectionDelegate, Notification};
use crate::record::{DecodeError, Record, decode_value};
use crate::sort::SortOrder;

/// Minimal domain record: a number and an optional tag.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Item {
	#[serde(skip)]
	pub key: String,
	pub num: i64,
	#[serde(default)]
	pub tag: Option<String>,
}

impl Record for Item {
	fn decode(entry: &Entry) -> Result<Self, DecodeError> {
		let mut item: Self = decode_value(entry)?;
		item.key = entry.key.to_string();
		Ok(item)
	}

	fn key(&self) -> &str {
		&self.key
	}

	fn field(&self, path: &str) -> Option<Cow<'_, Value>> {
		match path {
			"num" => Some(Cow::Owned(Value::from(self.num))),
			"tag" => self.tag.as_deref().map(|tag| Cow::Owned(Value::from(tag))),
			_ => None,
		}
	}
}

pub fn item(key: &str, num: i64) -> Entry {
	Entry::new(key, json!({ "num": num }))
}

pub fn tagged(key: &str, num: i64, tag: &str) -> Entry {
	Entry::new(key, json!({ "num": num, "tag": tag }))
}

/// Entry that fails to decode into an [`Item`].
pub fn malformed(key: &str) -> Entry {
	Entry::new(key, json!({ "title": "no number" }))
}

pub fn by_num() -> SortOrder<Item> {
	SortOrder::by(|a: &Item, b: &Item| a.num.cmp(&b.num))
}

/// Delegate call, reduced to keys and indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seen {
	Initialized(Vec<String>),
	Added(String, usize),
	Changed(String, usize),
	Removed(String, usize),
	Moved(String, usize, usize),
	ReorderedAll(Vec<String>),
	Begin,
	End,
	Cancelled(SourceError),
}

pub fn added(key: &str, index: usize) -> Seen {
	Seen::Added(key.to_owned(), index)
}

pub fn removed(key: &str, index: usize) -> Seen {
	Seen::Removed(key.to_owned(), index)
}

pub fn changed(key: &str, index: usize) -> Seen {
	Seen::Changed(key.to_owned(), index)
}

pub fn moved(key: &str, from: usize, to: usize) -> Seen {
	Seen::Moved(key.to_owned(), from, to)
}

pub fn initialized(keys: &[&str]) -> Seen {
	Seen::Initialized(keys.iter().map(|key| (*key).to_owned()).collect())
}

/// Keys of `records`, in order.
pub fn keys<R: Record>(records: &[Arc<R>]) -> Vec<String> {
	records.iter().map(|record| record.key().to_owned()).collect()
}

/// Delegate that records every call.
#[derive(Default)]
pub struct Recorder {
	seen: Mutex<Vec<Seen>>,
}

impl Recorder {
	pub fn take(&self) -> Vec<Seen> {
		std::mem::take(&mut *self.seen.lock())
	}

	/// Replays an outbox and returns what was delivered.
	pub fn replay<R: Record>(notifications: &[Notification<R>]) -> Vec<Seen> {
		let recorder = Self::default();
		for notification in notifications {
			notification.deliver_to(&recorder);
		}
		recorder.take()
	}

	fn push(&self, seen: Seen) {
		self.seen.lock().push(seen);
	}
}

impl<R: Record> CollectionDelegate<R> for Recorder {
	fn initialized(&self, snapshot: &[Arc<R>]) {
		self.push(Seen::Initialized(keys(snapshot)));
	}

	fn added(&self, record: &Arc<R>, index: usize) {
		self.push(Seen::Added(record.key().to_owned(), index));
	}

	fn changed(&self, record: &Arc<R>, index: usize) {
		self.push(Seen::Changed(record.key().to_owned(), index));
	}

	fn removed(&self, record: &Arc<R>, index: usize) {
		self.push(Seen::Removed(record.key().to_owned(), index));
	}

	fn moved(&self, record: &Arc<R>, from: usize, to: usize) {
		self.push(Seen::Moved(record.key().to_owned(), from, to));
	}

	fn reordered_all(&self, snapshot: &[Arc<R>]) {
		self.push(Seen::ReorderedAll(keys(snapshot)));
	}

	fn begin_updates(&self) {
		self.push(Seen::Begin);
	}

	fn end_updates(&self) {
		self.push(Seen::End);
	}

	fn cancelled(&self, error: &SourceError) {
		self.push(Seen::Cancelled(error.clone()));
	}
}

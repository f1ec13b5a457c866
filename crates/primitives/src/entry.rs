use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stable child key, assigned by the backend or by the caller.
///
/// Cheap to clone; hashes and compares exactly like the underlying `str`, so
/// maps keyed by [`Key`] can be queried with a plain `&str`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(Arc<str>);

impl Key {
	/// Creates a key from any string-like value.
	pub fn new(key: impl Into<Arc<str>>) -> Self {
		Self(key.into())
	}

	/// Returns the key as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl Borrow<str> for Key {
	fn borrow(&self) -> &str {
		&self.0
	}
}

impl AsRef<str> for Key {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for Key {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for Key {
	fn from(key: &str) -> Self {
		Self(Arc::from(key))
	}
}

impl From<String> for Key {
	fn from(key: String) -> Self {
		Self(Arc::from(key))
	}
}

impl PartialEq<str> for Key {
	fn eq(&self, other: &str) -> bool {
		&*self.0 == other
	}
}

impl PartialEq<&str> for Key {
	fn eq(&self, other: &&str) -> bool {
		&*self.0 == *other
	}
}

/// One child of a hierarchical store location, as observed in a single event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
	/// Unique, stable child key.
	pub key: Key,
	/// Opaque payload. Records decode themselves from it.
	#[serde(default)]
	pub value: Value,
	/// Optional sort hint attached by the writer.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub priority: Option<Value>,
}

impl Entry {
	pub fn new(key: impl Into<Key>, value: Value) -> Self {
		Self {
			key: key.into(),
			value,
			priority: None,
		}
	}

	#[must_use]
	pub fn with_priority(mut self, priority: Value) -> Self {
		self.priority = Some(priority);
		self
	}

	/// Looks up a nested child of the payload by `/`-separated path.
	///
	/// An empty path addresses the payload itself. Missing segments and
	/// non-object intermediates yield `None`.
	pub fn child(&self, path: &str) -> Option<&Value> {
		path.split('/')
			.filter(|segment| !segment.is_empty())
			.try_fold(&self.value, |node, segment| node.as_object()?.get(segment))
	}
}

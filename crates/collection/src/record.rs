//! Record contract: domain objects decoded from source entries.

use std::borrow::Cow;

use livelist_primitives::{Entry, Value};
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Why an entry could not be decoded into a record.
///
/// Collections never surface these: an undecodable entry is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
	/// A field the record requires is absent.
	#[error("missing required field `{0}`")]
	MissingField(String),

	/// A field is present but has the wrong shape.
	#[error("invalid field `{field}`: {reason}")]
	InvalidField {
		/// Offending field.
		field: String,
		/// What was wrong with it.
		reason: String,
	},

	/// The payload as a whole is unusable.
	#[error("malformed entry: {0}")]
	Malformed(String),
}

impl From<serde_json::Error> for DecodeError {
	fn from(error: serde_json::Error) -> Self {
		Self::Malformed(error.to_string())
	}
}

/// Domain object that can participate in a live collection.
pub trait Record: Send + Sync + Sized + 'static {
	/// Decodes a record from an entry.
	fn decode(entry: &Entry) -> Result<Self, DecodeError>;

	/// Key of the entry this record was decoded from.
	fn key(&self) -> &str;

	/// Value at a `/`-separated field path, used by configured sort rules.
	///
	/// Records that are only sorted by key or custom comparators can keep the
	/// default, which reports every field as missing.
	fn field(&self, path: &str) -> Option<Cow<'_, Value>> {
		let _ = path;
		None
	}
}

/// Deserializes the payload of `entry` into `T`.
///
/// Helper for records that derive `Deserialize` for their fields.
pub fn decode_value<T: DeserializeOwned>(entry: &Entry) -> Result<T, DecodeError> {
	if entry.value.is_null() {
		return Err(DecodeError::Malformed(format!("entry `{}` has no value", entry.key)));
	}
	Ok(T::deserialize(&entry.value)?)
}

/// Record that keeps the raw entry, for collections without a domain type.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
	entry: Entry,
}

impl RawRecord {
	pub const fn entry(&self) -> &Entry {
		&self.entry
	}

	pub const fn value(&self) -> &Value {
		&self.entry.value
	}

	pub const fn priority(&self) -> Option<&Value> {
		self.entry.priority.as_ref()
	}
}

impl Record for RawRecord {
	fn decode(entry: &Entry) -> Result<Self, DecodeError> {
		Ok(Self { entry: entry.clone() })
	}

	fn key(&self) -> &str {
		self.entry.key.as_str()
	}

	fn field(&self, path: &str) -> Option<Cow<'_, Value>> {
		self.entry.child(path).map(Cow::Borrowed)
	}
}

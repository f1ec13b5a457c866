use thiserror::Error;

/// Reason a subscription was severed by the source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
	/// The caller may not read the location.
	#[error("permission denied for `{path}`")]
	PermissionDenied {
		/// Location the subscription targeted.
		path: String,
	},

	/// The connection to the backend was lost.
	#[error("disconnected: {0}")]
	Disconnected(String),

	/// Any other backend failure.
	#[error("{0}")]
	Other(String),
}

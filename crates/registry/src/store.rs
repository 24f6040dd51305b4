use std::error::Error;

use hearth_primitives::Home;
use thiserror::Error as ThisError;

/// Failure reported by a persistent store during bulk load or bulk save.
#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct StoreError {
	message: String,
	#[source]
	source: Option<Box<dyn Error + Send + Sync>>,
}

impl StoreError {
	/// A store error with just a message.
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
			source: None,
		}
	}

	/// A store error wrapping an underlying cause.
	pub fn with_source(
		message: impl Into<String>,
		source: impl Error + Send + Sync + 'static,
	) -> Self {
		Self {
			message: message.into(),
			source: Some(Box::new(source)),
		}
	}
}

/// Bulk persistence contract consumed by the registry.
///
/// The registry reads the store once at startup and writes it once at
/// shutdown; there is no per-mutation write path. Implementations therefore
/// only need two operations, both all-at-once.
pub trait HomeStore: Send + Sync {
	/// Returns every persisted home, owner populated.
	///
	/// If the implementation guarantees an order, duplicate folded names in
	/// the result resolve deterministically (last one wins at load).
	fn load_all(&self) -> Result<Vec<Home>, StoreError>;

	/// Discards all previously persisted homes and persists exactly `homes`,
	/// effectively within one transaction boundary.
	fn replace_all(&self, homes: &[Home]) -> Result<(), StoreError>;
}

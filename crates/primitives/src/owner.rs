use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Error produced when parsing an [`OwnerId`] from text.
#[derive(Debug, Error)]
#[error("invalid owner id {text:?}: {source}")]
pub struct OwnerIdError {
	text: String,
	#[source]
	source: uuid::Error,
}

/// Opaque, stable identifier of the player that owns a set of homes.
///
/// Wraps a 128-bit UUID. The registry never interprets the value; it only
/// partitions by it and round-trips it through the persistent store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(Uuid);

impl OwnerId {
	/// Wraps an existing UUID.
	pub fn new(id: Uuid) -> Self {
		Self(id)
	}

	/// Generates a fresh random owner id.
	pub fn random() -> Self {
		Self(Uuid::new_v4())
	}

	/// Returns the underlying UUID.
	pub fn as_uuid(&self) -> Uuid {
		self.0
	}
}

impl From<Uuid> for OwnerId {
	fn from(id: Uuid) -> Self {
		Self(id)
	}
}

impl fmt::Display for OwnerId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(&self.0, f)
	}
}

impl FromStr for OwnerId {
	type Err = OwnerIdError;

	fn from_str(text: &str) -> Result<Self, Self::Err> {
		Uuid::parse_str(text).map(Self).map_err(|source| OwnerIdError {
			text: text.to_string(),
			source,
		})
	}
}

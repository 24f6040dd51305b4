use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::owner::OwnerId;
use crate::position::Position;

/// One named position saved by one owner.
///
/// A home is immutable by replacement: updating a home means constructing a
/// new value (with a fresh creation timestamp) and storing it under the same
/// folded name. The display `name` keeps the casing the owner originally
/// supplied; identity within an owner is the folded form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Home {
	pub owner: OwnerId,
	pub name: String,
	pub position: Position,
	/// Wall-clock milliseconds since the Unix epoch at construction time.
	pub created_at_ms: i64,
}

impl Home {
	/// Builds a home at `position`, stamped with the current time.
	pub fn new(owner: OwnerId, name: impl Into<String>, position: Position) -> Self {
		Self {
			owner,
			name: name.into(),
			position,
			created_at_ms: now_ms(),
		}
	}

	/// The case-folded form of this home's name, as used for storage keys.
	pub fn folded_name(&self) -> String {
		fold_name(&self.name)
	}
}

/// Folds a home name into its storage key form.
///
/// Uses Unicode lowercasing, which is locale-independent: the same input
/// always produces the same key, on every platform.
pub fn fold_name(name: &str) -> String {
	name.to_lowercase()
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|elapsed| elapsed.as_millis() as i64)
		.unwrap_or(0)
}

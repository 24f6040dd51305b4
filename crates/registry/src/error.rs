use thiserror::Error;

/// Outcomes a mutation-path operation can fail with.
///
/// These are explicit results for the caller to branch on, not faults: a
/// command or UI layer turns each variant into distinct user feedback. Bulk
/// persistence failures are a separate concern ([`crate::StoreError`]) and
/// never surface through this type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HomeError {
	/// Creating the home would exceed the owner's configured limit.
	#[error("home limit of {limit} reached")]
	CapacityExceeded {
		/// The limit that was hit.
		limit: u32,
	},
	/// No home with that name exists for the owner.
	#[error("no home named {name:?}")]
	NotFound {
		/// The name as supplied by the caller.
		name: String,
	},
	/// A subscriber vetoed the pending mutation.
	#[error("operation cancelled by a subscriber")]
	Cancelled,
	/// The home's world cannot currently be located.
	///
	/// This is soft and non-destructive: the stored home is kept untouched,
	/// and the message must not read as if it were deleted.
	#[error("world {world:?} is not currently available; the home is unchanged")]
	WorldUnresolved {
		/// The world name stored on the home.
		world: String,
	},
}

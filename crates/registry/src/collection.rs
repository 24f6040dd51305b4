use std::collections::HashSet;

use hearth_primitives::{Home, OwnerId, fold_name};
use parking_lot::{Mutex, MutexGuard, RwLock};
use rustc_hash::FxHashMap;

/// One owner's homes, keyed by folded name.
///
/// Thread-safe and case-insensitive: every lookup folds the supplied name
/// first, so `Base`, `base` and `BASE` all address the same entry while the
/// stored [`Home`] keeps its display casing. No operation here blocks on I/O.
#[derive(Debug)]
pub struct OwnerHomes {
	owner: OwnerId,
	homes: RwLock<FxHashMap<String, Home>>,
	/// Serializes this owner's mutation pipelines (check → publish → commit).
	pipeline: Mutex<()>,
}

impl OwnerHomes {
	/// An empty collection for `owner`.
	pub fn new(owner: OwnerId) -> Self {
		Self {
			owner,
			homes: RwLock::new(FxHashMap::default()),
			pipeline: Mutex::new(()),
		}
	}

	/// The owner this collection belongs to.
	pub fn owner(&self) -> OwnerId {
		self.owner
	}

	/// Stores `home` under the folded form of `name`, overwriting any prior
	/// value.
	pub fn set(&self, name: &str, home: Home) {
		self.homes.write().insert(fold_name(name), home);
	}

	/// The home stored under the folded form of `name`, if any.
	pub fn get(&self, name: &str) -> Option<Home> {
		self.homes.read().get(&fold_name(name)).cloned()
	}

	/// Removes the entry for the folded form of `name`; returns whether
	/// something was removed.
	pub fn remove(&self, name: &str) -> bool {
		self.homes.write().remove(&fold_name(name)).is_some()
	}

	/// Whether an entry exists under the folded form of `name`.
	pub fn has(&self, name: &str) -> bool {
		self.homes.read().contains_key(&fold_name(name))
	}

	/// Snapshot of the **display** names of current entries.
	///
	/// The returned set is detached; mutating it does not affect the
	/// collection.
	pub fn names(&self) -> HashSet<String> {
		self.homes.read().values().map(|home| home.name.clone()).collect()
	}

	/// Number of homes currently stored.
	pub fn count(&self) -> usize {
		self.homes.read().len()
	}

	/// Snapshot of all stored homes, in no particular order.
	pub fn homes(&self) -> Vec<Home> {
		self.homes.read().values().cloned().collect()
	}

	/// Takes this owner's pipeline lock.
	///
	/// Held by the registry across an entire mutation pipeline so the
	/// capacity check and the commit are atomic with respect to other
	/// mutations on the same owner. Reads never take it.
	pub(crate) fn lock_pipeline(&self) -> MutexGuard<'_, ()> {
		self.pipeline.lock()
	}
}

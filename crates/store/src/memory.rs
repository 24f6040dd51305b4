use hearth_registry::{Home, HomeStore, StoreError};
use parking_lot::Mutex;

/// [`HomeStore`] that never leaves the process.
///
/// Keeps whatever the last `replace_all` wrote, in order, so load-time
/// collision handling behaves the same as with the SQLite store.
#[derive(Default)]
pub struct MemoryStore {
	homes: Mutex<Vec<Home>>,
}

impl MemoryStore {
	/// An empty store.
	pub fn new() -> Self {
		Self::default()
	}

	/// A store pre-seeded with `homes`, as if they had been saved earlier.
	pub fn with_contents(homes: Vec<Home>) -> Self {
		Self {
			homes: Mutex::new(homes),
		}
	}

	/// Copy of the current contents, for assertions.
	pub fn snapshot(&self) -> Vec<Home> {
		self.homes.lock().clone()
	}
}

impl HomeStore for MemoryStore {
	fn load_all(&self) -> Result<Vec<Home>, StoreError> {
		Ok(self.homes.lock().clone())
	}

	fn replace_all(&self, homes: &[Home]) -> Result<(), StoreError> {
		*self.homes.lock() = homes.to_vec();
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use hearth_registry::{OwnerId, Position};

	use super::*;

	fn home(name: &str) -> Home {
		Home::new(
			OwnerId::random(),
			name,
			Position::new("overworld", 0.0, 64.0, 0.0, 0.0, 0.0),
		)
	}

	#[test]
	fn seeded_contents_load_back() {
		let store = MemoryStore::with_contents(vec![home("Base")]);
		let loaded = store.load_all().unwrap();
		assert_eq!(loaded.len(), 1);
		assert_eq!(loaded[0].name, "Base");
	}

	#[test]
	fn replace_overwrites_wholesale() {
		let store = MemoryStore::with_contents(vec![home("Old"), home("Older")]);
		store.replace_all(&[home("New")]).unwrap();
		let snapshot = store.snapshot();
		assert_eq!(snapshot.len(), 1);
		assert_eq!(snapshot[0].name, "New");
	}
}

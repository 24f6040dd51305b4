use std::collections::HashSet;
use std::sync::Arc;

use hearth_primitives::{Home, OwnerId, Position};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use crate::collection::OwnerHomes;
use crate::error::HomeError;
use crate::events::{EventBus, HomeEvent, HomeNotification};
use crate::limit::{HomeLimit, HomeLimitPolicy};
use crate::store::HomeStore;
use crate::world::{TeleportSink, WorldResolver};

/// Concurrent registry of every owner's homes.
///
/// Construct one instance, call [`init`](Self::init) with the persistent
/// store once at startup, pass the registry by reference to whatever layer
/// needs it, and call [`shutdown`](Self::shutdown) once on the way out.
/// There are no ambient statics.
///
/// Every mutating operation runs the same pipeline in a fixed order: the
/// capacity check first, then the cancelable notification, then the commit.
/// A capacity rejection never fires an event and a cancelled event is never
/// followed by a commit; a rejected or cancelled request leaves prior state
/// completely unchanged.
pub struct HomeRegistry {
	owners: RwLock<FxHashMap<OwnerId, Arc<OwnerHomes>>>,
	bus: Arc<dyn EventBus>,
	policy: Arc<dyn HomeLimitPolicy>,
	/// Held only between `init` and `shutdown`; the registry is the sole
	/// owner and the only caller of the store.
	store: Mutex<Option<Box<dyn HomeStore>>>,
}

impl HomeRegistry {
	/// A registry with an empty cache and no store attached yet.
	pub fn new(bus: Arc<dyn EventBus>, policy: Arc<dyn HomeLimitPolicy>) -> Self {
		Self {
			owners: RwLock::new(FxHashMap::default()),
			bus,
			policy,
			store: Mutex::new(None),
		}
	}

	/// Loads the persisted homes into the cache and retains the store handle
	/// for [`shutdown`](Self::shutdown).
	///
	/// Homes are partitioned into per-owner collections keyed by their own
	/// names; when the store returns several entries with the same folded
	/// name for one owner, the last one in store order wins. A failed load
	/// is logged and the registry starts with an empty cache rather than
	/// refusing to start.
	///
	/// Expected to run once, off the hot path.
	pub fn init(&self, store: Box<dyn HomeStore>) {
		match store.load_all() {
			Ok(homes) => {
				let count = homes.len();
				for home in homes {
					let collection = self.collection(home.owner);
					let name = home.name.clone();
					collection.set(&name, home);
				}
				tracing::info!(count, "homes.load");
			}
			Err(error) => {
				tracing::error!(%error, "homes.load.failed");
			}
		}
		*self.store.lock() = Some(store);
	}

	/// Flattens every collection and writes the result through
	/// [`HomeStore::replace_all`] exactly once, then releases the store
	/// handle.
	///
	/// This is the only write path to the persistent store; mutations
	/// performed after the last successful save are lost if the process
	/// dies before this runs. A failed save is logged and the handle is
	/// released regardless. Calling `shutdown` again without an interposed
	/// [`init`](Self::init) is a no-op.
	pub fn shutdown(&self) {
		let Some(store) = self.store.lock().take() else {
			return;
		};
		let homes = self.flatten();
		let count = homes.len();
		match store.replace_all(&homes) {
			Ok(()) => tracing::info!(count, "homes.save"),
			Err(error) => tracing::error!(%error, "homes.save.failed"),
		}
	}

	/// Creates or replaces the home `name` for `owner` at `position`, using
	/// the injected limit policy for the capacity check.
	pub fn set_home(&self, owner: OwnerId, name: &str, position: Position) -> Result<(), HomeError> {
		self.set_home_with_limit(owner, name, position, self.policy.limit(owner))
	}

	/// Creates or replaces a home under an explicit limit.
	///
	/// Replacing an existing home (same folded name) never counts against
	/// the limit and always builds a whole new value with a fresh creation
	/// timestamp.
	pub fn set_home_with_limit(
		&self,
		owner: OwnerId,
		name: &str,
		position: Position,
		limit: HomeLimit,
	) -> Result<(), HomeError> {
		let collection = self.collection(owner);
		let _pipeline = collection.lock_pipeline();

		let is_update = collection.has(name);
		if !is_update {
			if let HomeLimit::Max(limit) = limit {
				if collection.count() >= limit as usize {
					return Err(HomeError::CapacityExceeded { limit });
				}
			}
		}

		let candidate = Home::new(owner, name, position);
		let mut notification = HomeNotification::new(HomeEvent::Set {
			owner,
			name,
			home: &candidate,
			is_update,
		});
		self.bus.publish(&mut notification);
		if notification.is_cancelled() {
			return Err(HomeError::Cancelled);
		}

		collection.set(name, candidate);
		tracing::debug!(%owner, name, is_update, "home.set");
		Ok(())
	}

	/// The home stored under the folded form of `name`, if any.
	///
	/// Touching a never-seen owner creates their empty collection; that is
	/// not an error.
	pub fn get_home(&self, owner: OwnerId, name: &str) -> Option<Home> {
		self.collection(owner).get(name)
	}

	/// Deletes the home `name` for `owner`.
	///
	/// Fails with [`HomeError::NotFound`] (publishing nothing) when no such
	/// home exists, or [`HomeError::Cancelled`] when a subscriber vetoes.
	pub fn delete_home(&self, owner: OwnerId, name: &str) -> Result<(), HomeError> {
		let collection = self.collection(owner);
		let _pipeline = collection.lock_pipeline();

		let Some(home) = collection.get(name) else {
			return Err(HomeError::NotFound { name: name.to_string() });
		};
		let mut notification = HomeNotification::new(HomeEvent::Delete {
			owner,
			name,
			home: &home,
		});
		self.bus.publish(&mut notification);
		if notification.is_cancelled() {
			return Err(HomeError::Cancelled);
		}

		collection.remove(name);
		tracing::debug!(%owner, name, "home.delete");
		Ok(())
	}

	/// Resolves the home's world and hands the position to `sink`.
	///
	/// A world that fails to resolve is treated as transient: the operation
	/// fails with [`HomeError::WorldUnresolved`] and the stored home is left
	/// untouched. The sink runs only after the cancelable notification went
	/// unvetoed; its outcome is not inspected.
	pub fn resolve_and_teleport<R, S>(
		&self,
		owner: OwnerId,
		name: &str,
		resolver: &R,
		sink: &S,
	) -> Result<(), HomeError>
	where
		R: WorldResolver + ?Sized,
		S: TeleportSink<R::World> + ?Sized,
	{
		let Some(home) = self.collection(owner).get(name) else {
			return Err(HomeError::NotFound { name: name.to_string() });
		};
		let Some(world) = resolver.resolve(&home.position.world) else {
			return Err(HomeError::WorldUnresolved {
				world: home.position.world.clone(),
			});
		};

		let mut notification = HomeNotification::new(HomeEvent::Teleport {
			owner,
			name,
			home: &home,
		});
		self.bus.publish(&mut notification);
		if notification.is_cancelled() {
			return Err(HomeError::Cancelled);
		}

		sink.teleport(owner, &world, &home.position);
		tracing::debug!(%owner, name, world = %home.position.world, "home.teleport");
		Ok(())
	}

	/// Snapshot of `owner`'s display names.
	pub fn list_names(&self, owner: OwnerId) -> HashSet<String> {
		self.collection(owner).names()
	}

	/// Number of homes `owner` currently has.
	pub fn count(&self, owner: OwnerId) -> usize {
		self.collection(owner).count()
	}

	/// Whether `owner` has a home under the folded form of `name`.
	pub fn has_home(&self, owner: OwnerId, name: &str) -> bool {
		self.collection(owner).has(name)
	}

	/// Total number of homes across all loaded owners.
	pub fn total_count(&self) -> usize {
		self.owners.read().values().map(|collection| collection.count()).sum()
	}

	/// Drops `owner`'s collection from the cache.
	///
	/// Called on owner session end to bound memory. Performs no I/O — the
	/// dropped homes still reach the store through the next
	/// [`shutdown`](Self::shutdown) only if they are re-loaded or re-set
	/// before it; eviction itself persists nothing.
	pub fn unload_owner(&self, owner: OwnerId) {
		if self.owners.write().remove(&owner).is_some() {
			tracing::debug!(%owner, "owner.unload");
		}
	}

	/// Get-or-create under the map's write lock, so exactly one collection
	/// instance ever exists per owner.
	fn collection(&self, owner: OwnerId) -> Arc<OwnerHomes> {
		if let Some(collection) = self.owners.read().get(&owner) {
			return collection.clone();
		}
		self.owners
			.write()
			.entry(owner)
			.or_insert_with(|| Arc::new(OwnerHomes::new(owner)))
			.clone()
	}

	fn flatten(&self) -> Vec<Home> {
		let owners = self.owners.read();
		let mut all = Vec::new();
		for collection in owners.values() {
			all.extend(collection.homes());
		}
		all
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use crate::events::SubscriberBus;
	use crate::limit::UnlimitedPolicy;
	use crate::store::StoreError;

	use super::*;

	fn position(x: f64) -> Position {
		Position::new("overworld", x, 64.0, -5.0, 90.0, 0.0)
	}

	fn registry() -> HomeRegistry {
		HomeRegistry::new(Arc::new(SubscriberBus::new()), Arc::new(UnlimitedPolicy))
	}

	fn registry_with_bus(bus: Arc<SubscriberBus>) -> HomeRegistry {
		HomeRegistry::new(bus, Arc::new(UnlimitedPolicy))
	}

	fn cancel_all_bus() -> Arc<SubscriberBus> {
		let bus = Arc::new(SubscriberBus::new());
		bus.subscribe("veto-everything", |notification| notification.cancel());
		bus
	}

	/// Store fake: canned load result, recorded saves, switchable failures.
	#[derive(Default)]
	struct FakeStore {
		contents: Vec<Home>,
		fail_load: bool,
		fail_save: bool,
		saves: Arc<Mutex<Vec<Vec<Home>>>>,
	}

	impl HomeStore for FakeStore {
		fn load_all(&self) -> Result<Vec<Home>, StoreError> {
			if self.fail_load {
				return Err(StoreError::new("load refused"));
			}
			Ok(self.contents.clone())
		}

		fn replace_all(&self, homes: &[Home]) -> Result<(), StoreError> {
			self.saves.lock().push(homes.to_vec());
			if self.fail_save {
				return Err(StoreError::new("save refused"));
			}
			Ok(())
		}
	}

	struct NamedWorlds(&'static str);

	impl WorldResolver for NamedWorlds {
		type World = String;

		fn resolve(&self, world: &str) -> Option<String> {
			(world == self.0).then(|| world.to_string())
		}
	}

	#[derive(Default)]
	struct RecordingSink {
		teleports: Mutex<Vec<(OwnerId, String, Position)>>,
	}

	impl TeleportSink<String> for RecordingSink {
		fn teleport(&self, owner: OwnerId, world: &String, position: &Position) {
			self.teleports.lock().push((owner, world.clone(), position.clone()));
		}
	}

	#[test]
	fn set_then_get_round_trips_every_field() {
		let registry = registry();
		let owner = OwnerId::random();
		let pos = Position::new("overworld", 10.0, 64.0, -5.0, 90.0, 0.0);
		registry.set_home(owner, "Base", pos.clone()).unwrap();

		let home = registry.get_home(owner, "base").unwrap();
		assert_eq!(home.owner, owner);
		assert_eq!(home.name, "Base");
		assert_eq!(home.position, pos);
	}

	#[test]
	fn lookups_are_case_insensitive_with_one_entry() {
		let registry = registry();
		let owner = OwnerId::random();
		registry.set_home(owner, "MyHome", position(1.0)).unwrap();

		assert!(registry.has_home(owner, "myhome"));
		assert!(registry.has_home(owner, "MYHOME"));
		assert_eq!(registry.count(owner), 1);
	}

	#[test]
	fn capacity_boundary_is_exact() {
		let registry = registry();
		let owner = OwnerId::random();
		let limit = HomeLimit::Max(2);

		registry.set_home_with_limit(owner, "a", position(1.0), limit).unwrap();
		registry.set_home_with_limit(owner, "b", position(2.0), limit).unwrap();
		let err = registry
			.set_home_with_limit(owner, "c", position(3.0), limit)
			.unwrap_err();
		assert_eq!(err, HomeError::CapacityExceeded { limit: 2 });
		assert_eq!(registry.count(owner), 2);
	}

	#[test]
	fn updates_never_count_against_the_limit() {
		let registry = registry();
		let owner = OwnerId::random();
		let limit = HomeLimit::Max(1);

		registry.set_home_with_limit(owner, "Base", position(1.0), limit).unwrap();
		registry.set_home_with_limit(owner, "BASE", position(2.0), limit).unwrap();
		assert_eq!(registry.count(owner), 1);
		assert_eq!(registry.get_home(owner, "base").unwrap().position.x, 2.0);
	}

	#[test]
	fn capacity_rejection_fires_no_event() {
		let bus = Arc::new(SubscriberBus::new());
		let published = Arc::new(AtomicUsize::new(0));
		let seen = published.clone();
		bus.subscribe("count", move |_| {
			seen.fetch_add(1, Ordering::SeqCst);
		});
		let registry = registry_with_bus(bus);
		let owner = OwnerId::random();

		let err = registry
			.set_home_with_limit(owner, "a", position(1.0), HomeLimit::Max(0))
			.unwrap_err();
		assert!(matches!(err, HomeError::CapacityExceeded { .. }));
		assert_eq!(published.load(Ordering::SeqCst), 0);
	}

	#[test]
	fn cancelled_set_changes_nothing() {
		let registry = registry_with_bus(cancel_all_bus());
		let owner = OwnerId::random();

		let err = registry.set_home(owner, "Base", position(1.0)).unwrap_err();
		assert_eq!(err, HomeError::Cancelled);
		assert_eq!(registry.count(owner), 0);
		assert!(registry.get_home(owner, "base").is_none());
		assert!(registry.list_names(owner).is_empty());
	}

	#[test]
	fn subscriber_observes_update_flag_and_candidate() {
		let bus = Arc::new(SubscriberBus::new());
		let updates = Arc::new(Mutex::new(Vec::new()));
		let log = updates.clone();
		bus.subscribe("watch", move |notification| {
			if let HomeEvent::Set { is_update, home, .. } = notification.event() {
				log.lock().push((*is_update, home.position.x));
			}
		});
		let registry = registry_with_bus(bus);
		let owner = OwnerId::random();

		registry.set_home(owner, "Base", position(10.0)).unwrap();
		registry.set_home(owner, "Base", position(20.0)).unwrap();
		assert_eq!(*updates.lock(), vec![(false, 10.0), (true, 20.0)]);
		assert_eq!(registry.count(owner), 1);
	}

	#[test]
	fn delete_missing_home_is_not_found_and_silent() {
		let bus = Arc::new(SubscriberBus::new());
		let published = Arc::new(AtomicUsize::new(0));
		let seen = published.clone();
		bus.subscribe("count", move |_| {
			seen.fetch_add(1, Ordering::SeqCst);
		});
		let registry = registry_with_bus(bus);
		let owner = OwnerId::random();

		let err = registry.delete_home(owner, "ghost").unwrap_err();
		assert_eq!(err, HomeError::NotFound { name: "ghost".to_string() });
		assert_eq!(published.load(Ordering::SeqCst), 0);
	}

	#[test]
	fn cancelled_delete_keeps_the_home() {
		let bus = Arc::new(SubscriberBus::new());
		let registry = registry_with_bus(bus.clone());
		let owner = OwnerId::random();
		registry.set_home(owner, "Base", position(1.0)).unwrap();

		bus.subscribe("veto", |notification| notification.cancel());
		let err = registry.delete_home(owner, "base").unwrap_err();
		assert_eq!(err, HomeError::Cancelled);
		assert!(registry.has_home(owner, "Base"));
	}

	#[test]
	fn delete_folds_case() {
		let registry = registry();
		let owner = OwnerId::random();
		registry.set_home(owner, "Base", position(1.0)).unwrap();

		registry.delete_home(owner, "BASE").unwrap();
		assert!(registry.get_home(owner, "base").is_none());
		assert_eq!(registry.count(owner), 0);
	}

	#[test]
	fn unresolved_world_fails_softly() {
		let registry = registry();
		let owner = OwnerId::random();
		registry.set_home(owner, "Base", position(1.0)).unwrap();

		let sink = RecordingSink::default();
		let err = registry
			.resolve_and_teleport(owner, "base", &NamedWorlds("the_end"), &sink)
			.unwrap_err();
		assert_eq!(err, HomeError::WorldUnresolved { world: "overworld".to_string() });
		assert!(sink.teleports.lock().is_empty());
		// The record survives; a missing world is not grounds for deletion.
		assert_eq!(registry.get_home(owner, "base").unwrap().position.x, 1.0);
	}

	#[test]
	fn cancelled_teleport_never_reaches_the_sink() {
		let bus = Arc::new(SubscriberBus::new());
		let registry = registry_with_bus(bus.clone());
		let owner = OwnerId::random();
		registry.set_home(owner, "Base", position(1.0)).unwrap();

		bus.subscribe("veto", |notification| notification.cancel());
		let sink = RecordingSink::default();
		let err = registry
			.resolve_and_teleport(owner, "base", &NamedWorlds("overworld"), &sink)
			.unwrap_err();
		assert_eq!(err, HomeError::Cancelled);
		assert!(sink.teleports.lock().is_empty());
	}

	#[test]
	fn teleport_hands_the_position_to_the_sink() {
		let registry = registry();
		let owner = OwnerId::random();
		registry.set_home(owner, "Base", position(7.5)).unwrap();

		let sink = RecordingSink::default();
		registry
			.resolve_and_teleport(owner, "base", &NamedWorlds("overworld"), &sink)
			.unwrap();
		let teleports = sink.teleports.lock();
		assert_eq!(teleports.len(), 1);
		let (to, world, pos) = &teleports[0];
		assert_eq!(*to, owner);
		assert_eq!(world, "overworld");
		assert_eq!(pos.x, 7.5);
	}

	#[test]
	fn teleport_to_missing_home_is_not_found() {
		let registry = registry();
		let sink = RecordingSink::default();
		let err = registry
			.resolve_and_teleport(OwnerId::random(), "ghost", &NamedWorlds("overworld"), &sink)
			.unwrap_err();
		assert!(matches!(err, HomeError::NotFound { .. }));
	}

	#[test]
	fn init_partitions_owners_and_last_duplicate_wins() {
		let alice = OwnerId::random();
		let bob = OwnerId::random();
		let store = FakeStore {
			contents: vec![
				Home::new(alice, "Base", position(1.0)),
				Home::new(bob, "Base", position(2.0)),
				// Same folded name as Alice's first entry: later row wins.
				Home::new(alice, "BASE", position(3.0)),
			],
			..FakeStore::default()
		};
		let registry = registry();
		registry.init(Box::new(store));

		assert_eq!(registry.count(alice), 1);
		assert_eq!(registry.get_home(alice, "base").unwrap().position.x, 3.0);
		assert_eq!(registry.get_home(bob, "base").unwrap().position.x, 2.0);
		assert_eq!(registry.total_count(), 2);
	}

	#[test]
	fn failed_load_starts_empty_but_still_saves_at_shutdown() {
		let saves = Arc::new(Mutex::new(Vec::new()));
		let store = FakeStore {
			fail_load: true,
			saves: saves.clone(),
			..FakeStore::default()
		};
		let registry = registry();
		registry.init(Box::new(store));
		assert_eq!(registry.total_count(), 0);

		let owner = OwnerId::random();
		registry.set_home(owner, "Base", position(1.0)).unwrap();
		registry.shutdown();

		let saved = saves.lock();
		assert_eq!(saved.len(), 1);
		assert_eq!(saved[0].len(), 1);
		assert_eq!(saved[0][0].name, "Base");
	}

	#[test]
	fn shutdown_saves_once_and_only_once() {
		let saves = Arc::new(Mutex::new(Vec::new()));
		let store = FakeStore {
			saves: saves.clone(),
			..FakeStore::default()
		};
		let registry = registry();
		registry.init(Box::new(store));

		let owner = OwnerId::random();
		registry.set_home(owner, "a", position(1.0)).unwrap();
		registry.set_home(owner, "b", position(2.0)).unwrap();

		registry.shutdown();
		registry.shutdown();
		let saved = saves.lock();
		assert_eq!(saved.len(), 1);
		assert_eq!(saved[0].len(), 2);
	}

	#[test]
	fn failed_save_still_releases_the_store() {
		let saves = Arc::new(Mutex::new(Vec::new()));
		let store = FakeStore {
			fail_save: true,
			saves: saves.clone(),
			..FakeStore::default()
		};
		let registry = registry();
		registry.init(Box::new(store));
		registry.shutdown();
		// Handle is gone: a second shutdown cannot reach the store again.
		registry.shutdown();
		assert_eq!(saves.lock().len(), 1);
	}

	#[test]
	fn unload_owner_drops_the_cache_without_store_calls() {
		let saves = Arc::new(Mutex::new(Vec::new()));
		let store = FakeStore {
			saves: saves.clone(),
			..FakeStore::default()
		};
		let registry = registry();
		registry.init(Box::new(store));

		let owner = OwnerId::random();
		registry.set_home(owner, "Base", position(1.0)).unwrap();
		registry.unload_owner(owner);

		assert!(registry.get_home(owner, "base").is_none());
		assert!(registry.list_names(owner).is_empty());
		assert!(saves.lock().is_empty());
	}

	#[test]
	fn total_count_sums_across_owners() {
		let registry = registry();
		let alice = OwnerId::random();
		let bob = OwnerId::random();
		registry.set_home(alice, "a", position(1.0)).unwrap();
		registry.set_home(alice, "b", position(2.0)).unwrap();
		registry.set_home(bob, "c", position(3.0)).unwrap();
		assert_eq!(registry.total_count(), 3);
	}

	#[test]
	fn policy_is_consulted_for_plain_set_home() {
		let policy = |_: OwnerId| HomeLimit::Max(1);
		let registry = HomeRegistry::new(Arc::new(SubscriberBus::new()), Arc::new(policy));
		let owner = OwnerId::random();

		registry.set_home(owner, "a", position(1.0)).unwrap();
		let err = registry.set_home(owner, "b", position(2.0)).unwrap_err();
		assert_eq!(err, HomeError::CapacityExceeded { limit: 1 });
	}
}

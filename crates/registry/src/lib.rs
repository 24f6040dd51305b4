//! Concurrent, owner-partitioned registry of named homes.
//!
//! The registry caches every owner's homes in memory, runs each mutation
//! through a cancelable notification pipeline, and synchronizes with a
//! persistent store only in bulk: one load at [`HomeRegistry::init`], one
//! replace at [`HomeRegistry::shutdown`]. Everything in between is a bounded
//! in-memory operation.

/// Per-owner, case-insensitive home storage.
pub mod collection;
/// Mutation-path error taxonomy.
pub mod error;
/// Cancelable pre-mutation notifications and the event bus seam.
pub mod events;
/// Per-owner capacity policy seam.
pub mod limit;
/// The registry itself: orchestration, pipeline, lifecycle.
pub mod registry;
/// Bulk persistence contract consumed by the registry.
pub mod store;
/// World resolution and teleport seams.
pub mod world;

pub use collection::OwnerHomes;
pub use error::HomeError;
pub use events::{EventBus, HomeEvent, HomeNotification, SubscriberBus};
pub use hearth_primitives::{Home, OwnerId, Position, fold_name};
pub use limit::{HomeLimit, HomeLimitPolicy, UnlimitedPolicy};
pub use registry::HomeRegistry;
pub use store::{HomeStore, StoreError};
pub use world::{TeleportSink, WorldResolver};

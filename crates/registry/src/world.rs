use hearth_primitives::{OwnerId, Position};

/// Resolves a world name to a live world object.
///
/// Returning `None` means the world is not currently available. The registry
/// treats that as transient: the home pointing at it stays stored.
pub trait WorldResolver {
	/// The live world handle handed to the teleport sink.
	type World;

	/// Looks up the world named `world`, if it is loaded.
	fn resolve(&self, world: &str) -> Option<Self::World>;
}

/// Performs the actual relocation side effect.
///
/// Called by the registry only after the home was found, its world resolved,
/// and no subscriber cancelled the teleport. The registry does not inspect
/// what happens inside.
pub trait TeleportSink<W> {
	/// Moves `owner` to `position` within the resolved `world`.
	fn teleport(&self, owner: OwnerId, world: &W, position: &Position);
}

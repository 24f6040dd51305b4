use serde::{Deserialize, Serialize};

/// A point in a named world, with orientation.
///
/// `world` is the string identifier of the spatial region the coordinates
/// belong to. Resolving it to a live world object is the caller's concern;
/// a position stays valid even while its world is not loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
	pub world: String,
	pub x: f64,
	pub y: f64,
	pub z: f64,
	pub yaw: f32,
	pub pitch: f32,
}

impl Position {
	/// Builds a position in the given world.
	pub fn new(world: impl Into<String>, x: f64, y: f64, z: f64, yaw: f32, pitch: f32) -> Self {
		Self {
			world: world.into(),
			x,
			y,
			z,
			yaw,
			pitch,
		}
	}
}

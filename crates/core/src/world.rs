//! World identifiers and positions.
//!
//! Every location is world-scoped. Distances between locations in different
//! worlds are undefined, so callers get `None` instead of a number.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier for a world (or zone) in the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorldId(pub u32);

impl WorldId {
    /// Default world.
    pub const DEFAULT: Self = Self(0);
}

impl Default for WorldId {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "world#{}", self.0)
    }
}

/// A point in a world.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    /// World the point lives in.
    #[serde(default)]
    pub world: WorldId,
    /// X coordinate.
    pub x: f64,
    /// Y (vertical) coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

impl Location {
    /// Create a location in `world`.
    pub const fn new(world: WorldId, x: f64, y: f64, z: f64) -> Self {
        Self { world, x, y, z }
    }

    /// Copy of this location moved vertically by `dy`.
    pub fn offset_y(self, dy: f64) -> Self {
        Self {
            y: self.y + dy,
            ..self
        }
    }

    /// Squared distance to `other`, or `None` when the worlds differ.
    pub fn distance_squared(&self, other: &Location) -> Option<f64> {
        if self.world != other.world {
            return None;
        }
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        Some(dx * dx + dy * dy + dz * dz)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:.2}, {:.2}, {:.2})", self.world, self.x, self.y, self.z)
    }
}

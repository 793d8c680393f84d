#![warn(missing_docs)]
//! Core primitives shared across the workspace.

pub mod ids;
pub mod proxy;
pub mod text;
pub mod world;

use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use ids::{ObserverId, ProxyId};
pub use proxy::{ProxyBackend, ProxyError, ViewerPool};
pub use text::{normalize_line, translate_color_codes, ALT_COLOR_CHAR, COLOR_CHAR};
pub use world::{Location, WorldId};

/// Fixed tick type driving the periodic update context (20 TPS => 50 ms per tick).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SimTick(pub u64);

impl SimTick {
    /// First tick in any timeline.
    pub const ZERO: Self = Self(0);

    /// Advance by `delta` ticks.
    pub fn advance(self, delta: u64) -> Self {
        Self(self.0 + delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_advances() {
        assert_eq!(SimTick::ZERO.advance(3), SimTick(3));
        assert!(SimTick(2) < SimTick(5));
    }
}

//! Label configuration supplied by the host.

use crate::layout::AnchorPolicy;
use serde::{Deserialize, Serialize};

/// Anchor height above the base for top-anchored stacks.
pub const ANCHOR_OFFSET: f64 = 0.6;

/// Anchor height above the base for bottom-anchored stacks.
pub const ANCHOR_OFFSET_FIXED_BOTTOM: f64 = 0.85;

/// Read-only layout and interaction flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Pin the last line to the base instead of the first.
    pub fixed_bottom: bool,
    /// Create an interaction anchor proxy for every stack.
    pub interaction_enabled: bool,
    /// Radius within which the visibility updater shows a stack to an observer.
    pub view_distance: f64,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            fixed_bottom: false,
            interaction_enabled: false,
            view_distance: 32.0,
        }
    }
}

impl LabelConfig {
    /// Anchoring policy selected by `fixed_bottom`.
    pub fn policy(&self) -> AnchorPolicy {
        AnchorPolicy::from_fixed_bottom(self.fixed_bottom)
    }

    /// Height of the interaction anchor above the base.
    pub fn anchor_offset(&self) -> f64 {
        if self.fixed_bottom {
            ANCHOR_OFFSET_FIXED_BOTTOM
        } else {
            ANCHOR_OFFSET
        }
    }
}

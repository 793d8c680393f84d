//! Vertical layout of label lines.
//!
//! Lines are stacked on fixed rows [`LINE_SPACING`] apart. Which end of the
//! stack stays pinned to the base location is decided by [`AnchorPolicy`].
//! Row 0 is always the visually topmost line.

use holostack_core::Location;

/// Vertical distance between two adjacent lines.
pub const LINE_SPACING: f64 = 0.25;

/// Which end of a stack sits at the base location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnchorPolicy {
    /// Row 0 sits at the base; new rows grow downward.
    #[default]
    TopAnchored,
    /// The last row sits at the base; earlier rows are pushed upward.
    BottomAnchored,
}

impl AnchorPolicy {
    /// Policy for the `fixed_bottom` configuration flag.
    pub fn from_fixed_bottom(fixed_bottom: bool) -> Self {
        if fixed_bottom {
            Self::BottomAnchored
        } else {
            Self::TopAnchored
        }
    }

    /// Location of row `index` in a stack of `len` rows.
    pub fn row_location(self, base: Location, index: usize, len: usize) -> Location {
        debug_assert!(index < len);
        match self {
            Self::TopAnchored => base.offset_y(-LINE_SPACING * index as f64),
            Self::BottomAnchored => base.offset_y(LINE_SPACING * (len - 1 - index) as f64),
        }
    }
}

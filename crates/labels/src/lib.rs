#![warn(missing_docs)]
//! Per-viewer virtual multi-line labels.
//!
//! A [`LabelStack`] is a column of text lines at a base location, each line
//! backed by a proxy entity from the host's [`ProxyBackend`]. Stacks start
//! hidden and are shown or hidden per observer. A [`LabelRegistry`] tracks
//! live stacks so a proxy hit by an interaction can be traced back to its
//! stack.
//!
//! # Example
//!
//! ```rust,no_run
//! use holostack_labels::{LabelContext, LabelStack, ShowOptions};
//! use holostack_core::{Location, ObserverId, WorldId};
//!
//! # fn demo(ctx: LabelContext) {
//! let base = Location::new(WorldId(0), 0.5, 65.0, 0.5);
//! let stack = LabelStack::new(&ctx, base, &["&6Shop", "Buy: 10"]);
//! stack.show_observer(ObserverId(1), ShowOptions::default());
//! stack.set_line(1, Some("Buy: 12"));
//! stack.remove();
//! # }
//! ```
//!
//! [`ProxyBackend`]: holostack_core::ProxyBackend

pub mod config;
pub mod layout;
pub mod registry;
pub mod stack;
pub mod visibility;

// Re-export commonly used types
pub use config::LabelConfig;
pub use layout::{AnchorPolicy, LINE_SPACING};
pub use registry::{LabelRegistry, StackId};
pub use stack::{LabelContext, LabelStack, ShowOptions};
pub use visibility::{RefreshStats, VisibilityUpdater};

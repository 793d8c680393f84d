//! Periodic visibility refresh.
//!
//! Runs in the update context: every tick the host hands over observer
//! positions and each live stack is shown to observers within the view
//! distance of its base and hidden from the rest. Only membership changes
//! reach the proxy backend.

use crate::registry::LabelRegistry;
use crate::stack::ShowOptions;
use holostack_core::{Location, ObserverId};
use tracing::{debug, instrument};

/// Number of show/hide toggles issued by one refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshStats {
    /// Stacks newly shown to an observer.
    pub shown: usize,
    /// Stacks newly hidden from an observer.
    pub hidden: usize,
}

/// Shows and hides stacks by distance.
#[derive(Debug, Clone)]
pub struct VisibilityUpdater {
    view_distance_sq: f64,
}

impl VisibilityUpdater {
    /// Create an updater with the given view distance.
    pub fn new(view_distance: f64) -> Self {
        Self {
            view_distance_sq: view_distance * view_distance,
        }
    }

    /// Whether a stack based at `stack` is in range of an observer at `observer`.
    pub fn in_range(&self, stack: &Location, observer: &Location) -> bool {
        stack
            .distance_squared(observer)
            .is_some_and(|d| d <= self.view_distance_sq)
    }

    /// Reconcile every live stack with the observers' current positions.
    #[instrument(skip_all, fields(observers = observers.len()))]
    pub fn refresh(
        &self,
        registry: &LabelRegistry,
        observers: &[(ObserverId, Location)],
    ) -> RefreshStats {
        let mut stats = RefreshStats::default();
        for stack in registry.stacks() {
            let base = stack.location();
            for (observer, at) in observers {
                if self.in_range(&base, at) {
                    if stack.show_observer(*observer, ShowOptions::default()) {
                        stats.shown += 1;
                    }
                } else if stack.hide_observer(*observer, ShowOptions::default()) {
                    stats.hidden += 1;
                }
            }
        }
        if stats != RefreshStats::default() {
            debug!(shown = stats.shown, hidden = stats.hidden, "Refreshed label visibility");
        }
        stats
    }

    /// Drop `observer` from every stack without hiding (session ended).
    pub fn forget(&self, registry: &LabelRegistry, observer: ObserverId) {
        for stack in registry.stacks() {
            stack.reset_observer(observer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LabelConfig, LabelContext, LabelStack};
    use holostack_core::WorldId;
    use holostack_testkit::{RecordingProxies, StaticViewers};
    use std::sync::Arc;

    fn context() -> (LabelContext, Arc<RecordingProxies>) {
        let proxies = Arc::new(RecordingProxies::new());
        let ctx = LabelContext {
            proxies: proxies.clone(),
            viewers: Arc::new(StaticViewers::new()),
            registry: Arc::new(crate::LabelRegistry::new()),
            config: LabelConfig::default(),
        };
        (ctx, proxies)
    }

    #[test]
    fn shows_in_range_and_hides_when_leaving() {
        let (ctx, _proxies) = context();
        let stack = LabelStack::new(&ctx, Location::new(WorldId(0), 0.0, 64.0, 0.0), &["shop"]);
        let updater = VisibilityUpdater::new(10.0);
        let observer = ObserverId(1);

        let near = [(observer, Location::new(WorldId(0), 3.0, 64.0, 4.0))];
        assert_eq!(updater.refresh(&ctx.registry, &near).shown, 1);
        assert!(stack.is_visible_to(observer));

        // Second pass changes nothing.
        assert_eq!(updater.refresh(&ctx.registry, &near), RefreshStats::default());

        let far = [(observer, Location::new(WorldId(0), 30.0, 64.0, 0.0))];
        assert_eq!(updater.refresh(&ctx.registry, &far).hidden, 1);
        assert!(!stack.is_visible_to(observer));
    }

    #[test]
    fn other_worlds_are_out_of_range() {
        let updater = VisibilityUpdater::new(100.0);
        let here = Location::new(WorldId(0), 0.0, 0.0, 0.0);
        let there = Location::new(WorldId(1), 0.0, 0.0, 0.0);
        assert!(updater.in_range(&here, &here));
        assert!(!updater.in_range(&here, &there));
    }

    #[test]
    fn forget_resets_without_toggling() {
        let (ctx, proxies) = context();
        let stack = LabelStack::new(&ctx, Location::default(), &["shop"]);
        let observer = ObserverId(9);
        let updater = VisibilityUpdater::new(5.0);
        updater.refresh(&ctx.registry, &[(observer, Location::default())]);
        proxies.clear_calls();

        updater.forget(&ctx.registry, observer);
        assert!(!stack.is_visible_to(observer));
        assert!(proxies.calls().is_empty());
    }
}

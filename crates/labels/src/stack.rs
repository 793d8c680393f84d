//! Label stack - a multi-line virtual label shown per observer.
//!
//! Each line is backed by one proxy entity. An optional textless anchor proxy
//! serves as the interaction target. Proxies start hidden; the stack tracks
//! which observers it has been shown to and toggles every proxy for them.
//!
//! Structural changes (lines added, set or removed, teardown) take the layout
//! write lock, so a shift and its insert/remove are never observed half done.
//! Show/hide only take the read lock and may run in parallel with each other.
//! Lock order is layout, then observers, then the registry.

use crate::config::LabelConfig;
use crate::layout::AnchorPolicy;
use crate::registry::{LabelRegistry, StackId};
use holostack_core::{normalize_line, Location, ObserverId, ProxyBackend, ProxyId, ViewerPool};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};
use tracing::{debug, warn};

/// Collaborators and configuration shared by every stack in a host.
#[derive(Clone)]
pub struct LabelContext {
    /// Proxy entity backend.
    pub proxies: Arc<dyn ProxyBackend>,
    /// Observer enumeration used for immediate visibility pushes.
    pub viewers: Arc<dyn ViewerPool>,
    /// Registry the stacks join while alive.
    pub registry: Arc<LabelRegistry>,
    /// Layout and interaction flags.
    pub config: LabelConfig,
}

/// Options for [`LabelStack::show_observer`] and [`LabelStack::hide_observer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShowOptions {
    /// Toggle the proxies even if the observer's tracked state already matches.
    pub force: bool,
}

impl ShowOptions {
    /// Options with `force` set.
    pub const FORCE: Self = Self { force: true };
}

#[derive(Debug, Clone, Copy)]
struct ProxySlot {
    id: ProxyId,
    location: Location,
}

#[derive(Debug, Default)]
struct StackLayout {
    lines: Vec<ProxySlot>,
    anchor: Option<ProxySlot>,
}

impl StackLayout {
    fn proxy_ids(&self) -> Vec<ProxyId> {
        self.lines
            .iter()
            .chain(self.anchor.iter())
            .map(|slot| slot.id)
            .collect()
    }
}

/// A stack of text lines at a fixed base location.
pub struct LabelStack {
    id: StackId,
    location: Location,
    policy: AnchorPolicy,
    proxies: Arc<dyn ProxyBackend>,
    viewers: Arc<dyn ViewerPool>,
    registry: Arc<LabelRegistry>,
    layout: RwLock<StackLayout>,
    observers: Mutex<HashSet<ObserverId>>,
    alive: AtomicBool,
}

impl LabelStack {
    /// Create a stack with `lines` at `location` and register it.
    ///
    /// Empty entries in `lines` are skipped. When interaction is enabled an
    /// anchor proxy is placed above the base.
    pub fn new(ctx: &LabelContext, location: Location, lines: &[&str]) -> Arc<Self> {
        let stack = Arc::new(Self {
            id: ctx.registry.allocate_id(),
            location,
            policy: ctx.config.policy(),
            proxies: Arc::clone(&ctx.proxies),
            viewers: Arc::clone(&ctx.viewers),
            registry: Arc::clone(&ctx.registry),
            layout: RwLock::new(StackLayout::default()),
            observers: Mutex::new(HashSet::new()),
            alive: AtomicBool::new(false),
        });

        {
            let mut layout = stack.write_layout();
            for (index, text) in lines.iter().enumerate() {
                if let Some(text) = normalize_line(Some(text)) {
                    stack.insert_line(&mut layout, index, &text, false);
                }
            }

            if ctx.config.interaction_enabled {
                let anchor_location = location.offset_y(ctx.config.anchor_offset());
                match stack.proxies.create(&anchor_location, None, true) {
                    Ok(id) => {
                        stack.registry.index_proxy(id, stack.id);
                        layout.anchor = Some(ProxySlot {
                            id,
                            location: anchor_location,
                        });
                    }
                    Err(err) => warn!(stack = %stack.id, "Failed to create anchor proxy: {err}"),
                }
            }

            stack.alive.store(true, Ordering::SeqCst);
            stack.registry.register(&stack);
            debug!(
                stack = %stack.id,
                location = %location,
                lines = layout.lines.len(),
                "Created label stack"
            );
        }

        stack
    }

    /// Registry-assigned identity.
    pub fn id(&self) -> StackId {
        self.id
    }

    /// Base location of the stack.
    pub fn location(&self) -> Location {
        self.location
    }

    /// Whether the stack has not been removed.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Number of lines.
    pub fn line_count(&self) -> usize {
        self.read_layout().lines.len()
    }

    /// Current text of every line, top to bottom.
    pub fn lines(&self) -> Vec<String> {
        self.read_layout()
            .lines
            .iter()
            .map(|slot| self.proxies.text(slot.id).unwrap_or_default())
            .collect()
    }

    /// Proxy ids of the lines, top to bottom.
    pub fn line_ids(&self) -> Vec<ProxyId> {
        self.read_layout().lines.iter().map(|slot| slot.id).collect()
    }

    /// Locations of the lines, top to bottom.
    pub fn line_locations(&self) -> Vec<Location> {
        self.read_layout()
            .lines
            .iter()
            .map(|slot| slot.location)
            .collect()
    }

    /// Proxy id of the interaction anchor, if any.
    pub fn anchor_id(&self) -> Option<ProxyId> {
        self.read_layout().anchor.map(|slot| slot.id)
    }

    /// Whether `proxy` is one of this stack's lines or its anchor.
    pub fn contains(&self, proxy: ProxyId) -> bool {
        let layout = self.read_layout();
        layout.lines.iter().any(|slot| slot.id == proxy)
            || layout.anchor.is_some_and(|slot| slot.id == proxy)
    }

    /// Whether the stack is currently shown to `observer`.
    pub fn is_visible_to(&self, observer: ObserverId) -> bool {
        self.lock_observers().contains(&observer)
    }

    /// Observers the stack is currently shown to.
    pub fn observers(&self) -> Vec<ObserverId> {
        self.lock_observers().iter().copied().collect()
    }

    /// Insert a line at `index` (clamped to the end). Empty text is ignored.
    pub fn add_line(&self, index: usize, text: Option<&str>) {
        let Some(text) = normalize_line(text) else {
            return;
        };
        let mut layout = self.write_layout();
        if !self.is_alive() {
            return;
        }
        self.insert_line(&mut layout, index, &text, false);
    }

    /// Replace the text of line `index`.
    ///
    /// Empty text removes the line. An index past the end appends a new line
    /// and shows it right away to observers that already see the stack.
    pub fn set_line(&self, index: usize, text: Option<&str>) {
        let Some(text) = normalize_line(text) else {
            self.remove_line(index);
            return;
        };
        let mut layout = self.write_layout();
        if !self.is_alive() {
            return;
        }
        match layout.lines.get(index).copied() {
            Some(slot) => {
                if let Err(err) = self.proxies.set_text(slot.id, &text) {
                    warn!(stack = %self.id, line = index, "Failed to set line text: {err}");
                }
            }
            None => {
                let end = layout.lines.len();
                self.insert_line(&mut layout, end, &text, true);
            }
        }
    }

    /// Remove line `index`. Out-of-range indices are ignored.
    pub fn remove_line(&self, index: usize) {
        let mut layout = self.write_layout();
        if !self.is_alive() || index >= layout.lines.len() {
            return;
        }

        let slot = layout.lines.remove(index);
        self.relayout(&mut layout);
        if let Err(err) = self.proxies.destroy(slot.id) {
            warn!(stack = %self.id, proxy = %slot.id, "Failed to destroy line proxy: {err}");
        }
        self.registry.unindex_proxy(slot.id);
        debug!(stack = %self.id, line = index, "Removed label line");
    }

    /// Show the stack to `observer`.
    ///
    /// Returns whether the proxies were toggled: only when the observer was
    /// newly added, unless `options.force` is set.
    pub fn show_observer(&self, observer: ObserverId, options: ShowOptions) -> bool {
        let layout = self.read_layout();
        if !self.is_alive() {
            return false;
        }
        let added = self.lock_observers().insert(observer);
        if !(added || options.force) {
            return false;
        }
        self.toggle(&layout, observer, true);
        true
    }

    /// Hide the stack from `observer`. Mirrors [`LabelStack::show_observer`].
    pub fn hide_observer(&self, observer: ObserverId, options: ShowOptions) -> bool {
        let layout = self.read_layout();
        if !self.is_alive() {
            return false;
        }
        let removed = self.lock_observers().remove(&observer);
        if !(removed || options.force) {
            return false;
        }
        self.toggle(&layout, observer, false);
        true
    }

    /// Forget `observer` without hiding anything.
    ///
    /// For observers whose session is already gone.
    pub fn reset_observer(&self, observer: ObserverId) {
        self.lock_observers().remove(&observer);
    }

    /// Destroy every proxy and leave the registry. Later calls do nothing.
    pub fn remove(&self) {
        let mut layout = self.write_layout();
        if !self.alive.swap(false, Ordering::SeqCst) {
            return;
        }
        self.lock_observers().clear();

        let proxies = layout.proxy_ids();
        layout.lines.clear();
        layout.anchor = None;
        for id in &proxies {
            if let Err(err) = self.proxies.destroy(*id) {
                warn!(stack = %self.id, proxy = %id, "Failed to destroy proxy: {err}");
            }
        }

        self.registry.unregister(self.id, &proxies);
        debug!(stack = %self.id, proxies = proxies.len(), "Removed label stack");
    }

    fn insert_line(&self, layout: &mut StackLayout, index: usize, text: &str, force_visible: bool) {
        let len = layout.lines.len();
        let index = index.min(len);
        let location = self.policy.row_location(self.location, index, len + 1);

        // Create before shifting so a failed create leaves the layout untouched.
        let id = match self.proxies.create(&location, Some(text), false) {
            Ok(id) => id,
            Err(err) => {
                warn!(stack = %self.id, line = index, "Failed to create line proxy: {err}");
                return;
            }
        };

        layout.lines.insert(index, ProxySlot { id, location });
        self.relayout(layout);
        self.registry.index_proxy(id, self.id);

        if force_visible {
            let observers = self.lock_observers();
            for observer in self.viewers.viewers(self.location.world) {
                if observers.contains(&observer) {
                    self.set_visible(id, observer, true);
                }
            }
        }
        debug!(stack = %self.id, line = index, proxy = %id, "Added label line");
    }

    /// Move every row to the location derived from its index. Only rows that
    /// actually changed reach the backend.
    fn relayout(&self, layout: &mut StackLayout) {
        let len = layout.lines.len();
        for (index, slot) in layout.lines.iter_mut().enumerate() {
            let location = self.policy.row_location(self.location, index, len);
            if slot.location == location {
                continue;
            }
            slot.location = location;
            if let Err(err) = self.proxies.set_location(slot.id, &location) {
                warn!(stack = %self.id, proxy = %slot.id, "Failed to move line proxy: {err}");
            }
        }
    }

    fn toggle(&self, layout: &StackLayout, observer: ObserverId, visible: bool) {
        for slot in layout.lines.iter().chain(layout.anchor.iter()) {
            self.set_visible(slot.id, observer, visible);
        }
    }

    fn set_visible(&self, id: ProxyId, observer: ObserverId, visible: bool) {
        if let Err(err) = self.proxies.set_visible(id, observer, visible) {
            warn!(
                stack = %self.id,
                proxy = %id,
                observer = %observer,
                "Failed to toggle proxy visibility: {err}"
            );
        }
    }

    fn read_layout(&self) -> RwLockReadGuard<'_, StackLayout> {
        self.layout.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_layout(&self) -> RwLockWriteGuard<'_, StackLayout> {
        self.layout.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_observers(&self) -> MutexGuard<'_, HashSet<ObserverId>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for LabelStack {
    fn drop(&mut self) {
        self.remove();
    }
}

impl std::fmt::Debug for LabelStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabelStack")
            .field("id", &self.id)
            .field("location", &self.location)
            .field("policy", &self.policy)
            .field("alive", &self.is_alive())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use holostack_core::WorldId;
    use holostack_testkit::{ProxyCall, RecordingProxies, StaticViewers};

    struct Host {
        ctx: LabelContext,
        proxies: Arc<RecordingProxies>,
        viewers: Arc<StaticViewers>,
    }

    fn host(config: LabelConfig) -> Host {
        let proxies = Arc::new(RecordingProxies::new());
        let viewers = Arc::new(StaticViewers::new());
        let ctx = LabelContext {
            proxies: proxies.clone(),
            viewers: viewers.clone(),
            registry: Arc::new(LabelRegistry::new()),
            config,
        };
        Host {
            ctx,
            proxies,
            viewers,
        }
    }

    fn base() -> Location {
        Location::new(WorldId(0), 8.5, 65.0, -3.5)
    }

    fn heights(stack: &LabelStack) -> Vec<f64> {
        stack.line_locations().iter().map(|l| l.y - base().y).collect()
    }

    #[test]
    fn construction_translates_and_skips_empty_lines() {
        let host = host(LabelConfig::default());
        let stack = LabelStack::new(&host.ctx, base(), &["&aBuy", "", "Sell"]);
        assert_eq!(stack.lines(), vec!["\u{00A7}aBuy", "Sell"]);
        assert!(stack.is_alive());
        assert_eq!(stack.anchor_id(), None);
    }

    #[test]
    fn anchor_sits_above_base() {
        let host = host(LabelConfig {
            interaction_enabled: true,
            ..LabelConfig::default()
        });
        let stack = LabelStack::new(&host.ctx, base(), &["one"]);
        let anchor = stack.anchor_id().expect("anchor");
        let record = host.proxies.proxy(anchor).expect("anchor record");
        assert!(record.marker);
        assert_eq!(record.text, None);
        assert_eq!(record.location.y, base().y + 0.6);
    }

    #[test]
    fn bottom_fixed_anchor_is_higher() {
        let host = host(LabelConfig {
            interaction_enabled: true,
            fixed_bottom: true,
            ..LabelConfig::default()
        });
        let stack = LabelStack::new(&host.ctx, base(), &["one"]);
        let anchor = stack.anchor_id().expect("anchor");
        assert_eq!(host.proxies.location(anchor).expect("location").y, base().y + 0.85);
    }

    #[test]
    fn add_line_clamps_high_index() {
        let host = host(LabelConfig::default());
        let stack = LabelStack::new(&host.ctx, base(), &["a", "b"]);
        stack.add_line(10, Some("c"));
        assert_eq!(stack.lines(), vec!["a", "b", "c"]);
        assert_eq!(heights(&stack), vec![0.0, -0.25, -0.5]);
    }

    #[test]
    fn add_line_in_middle_pushes_lower_lines_down() {
        let host = host(LabelConfig::default());
        let stack = LabelStack::new(&host.ctx, base(), &["a", "c"]);
        stack.add_line(1, Some("b"));
        assert_eq!(stack.lines(), vec!["a", "b", "c"]);
        assert_eq!(heights(&stack), vec![0.0, -0.25, -0.5]);
        // The backend saw the move too.
        let c = stack.line_ids()[2];
        assert_eq!(host.proxies.location(c).expect("c").y, base().y - 0.5);
    }

    #[test]
    fn empty_text_adds_nothing() {
        let host = host(LabelConfig::default());
        let stack = LabelStack::new(&host.ctx, base(), &["a"]);
        stack.add_line(0, Some(""));
        stack.add_line(0, None);
        assert_eq!(stack.line_count(), 1);
    }

    #[test]
    fn set_line_replaces_text_in_place() {
        let host = host(LabelConfig::default());
        let stack = LabelStack::new(&host.ctx, base(), &["a", "b"]);
        let before = stack.line_locations();
        host.proxies.clear_calls();

        stack.set_line(1, Some("&cB"));
        assert_eq!(stack.lines(), vec!["a", "\u{00A7}cB"]);
        assert_eq!(stack.line_locations(), before);
        assert!(matches!(host.proxies.calls().as_slice(), [ProxyCall::SetText { .. }]));
    }

    #[test]
    fn set_line_past_end_appends_without_gaps() {
        let host = host(LabelConfig::default());
        let stack = LabelStack::new(&host.ctx, base(), &["a", "b"]);
        stack.set_line(5, Some("x"));
        assert_eq!(stack.lines(), vec!["a", "b", "x"]);
        assert_eq!(heights(&stack)[2], -0.5);
    }

    #[test]
    fn set_line_past_end_pushes_to_current_observers_in_world() {
        let host = host(LabelConfig::default());
        let stack = LabelStack::new(&host.ctx, base(), &["a"]);
        let watcher = ObserverId(1);
        let elsewhere = ObserverId(2);
        host.viewers.join(WorldId(0), watcher);
        host.viewers.join(WorldId(0), ObserverId(3));
        host.viewers.join(WorldId(1), elsewhere);
        stack.show_observer(watcher, ShowOptions::default());
        stack.show_observer(elsewhere, ShowOptions::default());

        stack.set_line(1, Some("fresh"));
        let fresh = stack.line_ids()[1];
        assert!(host.proxies.is_visible(fresh, watcher));
        assert!(!host.proxies.is_visible(fresh, elsewhere));
        assert!(!host.proxies.is_visible(fresh, ObserverId(3)));
    }

    #[test]
    fn plain_add_line_does_not_push_visibility() {
        let host = host(LabelConfig::default());
        let stack = LabelStack::new(&host.ctx, base(), &["a"]);
        let watcher = ObserverId(1);
        host.viewers.join(WorldId(0), watcher);
        stack.show_observer(watcher, ShowOptions::default());

        stack.add_line(1, Some("quiet"));
        let quiet = stack.line_ids()[1];
        assert!(!host.proxies.is_visible(quiet, watcher));
    }

    #[test]
    fn set_line_with_empty_text_removes() {
        let host = host(LabelConfig::default());
        let stack = LabelStack::new(&host.ctx, base(), &["a", "b", "c"]);
        stack.set_line(0, None);
        assert_eq!(stack.lines(), vec!["b", "c"]);
        assert_eq!(heights(&stack), vec![0.0, -0.25]);
    }

    #[test]
    fn remove_line_out_of_range_is_ignored() {
        let host = host(LabelConfig::default());
        let stack = LabelStack::new(&host.ctx, base(), &["a"]);
        host.proxies.clear_calls();
        stack.remove_line(3);
        assert_eq!(stack.line_count(), 1);
        assert!(host.proxies.calls().is_empty());
    }

    #[test]
    fn removed_line_proxy_is_destroyed_and_unindexed() {
        let host = host(LabelConfig::default());
        let stack = LabelStack::new(&host.ctx, base(), &["a", "b"]);
        let first = stack.line_ids()[0];
        stack.remove_line(0);
        assert!(host.proxies.proxy(first).is_none());
        assert!(!host.ctx.registry.is_owned(first));
        assert!(!stack.contains(first));
    }

    #[test]
    fn show_twice_toggles_once_unless_forced() {
        let host = host(LabelConfig {
            interaction_enabled: true,
            ..LabelConfig::default()
        });
        let stack = LabelStack::new(&host.ctx, base(), &["a", "b"]);
        let observer = ObserverId(5);
        host.proxies.clear_calls();

        assert!(stack.show_observer(observer, ShowOptions::default()));
        assert!(!stack.show_observer(observer, ShowOptions::default()));
        // Two lines and the anchor.
        assert_eq!(host.proxies.visibility_calls(observer), 3);

        assert!(stack.show_observer(observer, ShowOptions::FORCE));
        assert_eq!(host.proxies.visibility_calls(observer), 6);
    }

    #[test]
    fn hide_is_symmetric() {
        let host = host(LabelConfig::default());
        let stack = LabelStack::new(&host.ctx, base(), &["a"]);
        let observer = ObserverId(5);
        assert!(!stack.hide_observer(observer, ShowOptions::default()));
        assert_eq!(host.proxies.visibility_calls(observer), 0);

        stack.show_observer(observer, ShowOptions::default());
        host.proxies.clear_calls();
        assert!(stack.hide_observer(observer, ShowOptions::default()));
        assert!(!stack.hide_observer(observer, ShowOptions::default()));
        assert_eq!(host.proxies.visibility_calls(observer), 1);
        assert!(!stack.is_visible_to(observer));
        assert!(!host.proxies.is_visible(stack.line_ids()[0], observer));

        assert!(stack.hide_observer(observer, ShowOptions::FORCE));
        assert_eq!(host.proxies.visibility_calls(observer), 2);
        assert!(!stack.is_visible_to(observer));
    }

    #[test]
    fn shifts_only_move_rows_below_the_insert() {
        let host = host(LabelConfig::default());
        let stack = LabelStack::new(&host.ctx, base(), &["a", "b", "c"]);
        let ids = stack.line_ids();
        host.proxies.clear_calls();

        stack.add_line(1, Some("x"));
        let moved: Vec<ProxyId> = host
            .proxies
            .calls()
            .iter()
            .filter_map(|call| match call {
                ProxyCall::SetLocation { id, .. } => Some(*id),
                _ => None,
            })
            .collect();
        assert_eq!(moved, vec![ids[1], ids[2]]);
    }

    #[test]
    fn rows_stay_on_derived_heights_for_inexact_bases() {
        for fixed_bottom in [false, true] {
            let host = host(LabelConfig {
                fixed_bottom,
                ..LabelConfig::default()
            });
            let at = Location::new(WorldId(0), 0.0, 63.0448, 0.0);
            let stack = LabelStack::new(&host.ctx, at, &["a", "b", "c", "d"]);
            let before = stack.line_locations();

            stack.add_line(4, Some("x"));
            stack.remove_line(4);
            stack.add_line(0, Some("y"));
            stack.remove_line(0);

            assert_eq!(stack.line_locations(), before);
            let policy = AnchorPolicy::from_fixed_bottom(fixed_bottom);
            for (index, location) in before.iter().enumerate() {
                assert_eq!(*location, policy.row_location(at, index, 4));
            }
        }
    }

    #[test]
    fn reset_observer_forgets_without_hiding() {
        let host = host(LabelConfig::default());
        let stack = LabelStack::new(&host.ctx, base(), &["a"]);
        let observer = ObserverId(5);
        stack.show_observer(observer, ShowOptions::default());
        host.proxies.clear_calls();

        stack.reset_observer(observer);
        assert!(!stack.is_visible_to(observer));
        assert!(host.proxies.calls().is_empty());
        // A later show toggles again.
        assert!(stack.show_observer(observer, ShowOptions::default()));
    }

    #[test]
    fn remove_is_final_and_idempotent() {
        let host = host(LabelConfig {
            interaction_enabled: true,
            ..LabelConfig::default()
        });
        let stack = LabelStack::new(&host.ctx, base(), &["a", "b"]);
        let mut proxies = stack.line_ids();
        proxies.extend(stack.anchor_id());
        stack.show_observer(ObserverId(1), ShowOptions::default());

        stack.remove();
        assert!(!stack.is_alive());
        assert_eq!(host.proxies.live_count(), 0);
        for proxy in &proxies {
            assert!(!host.ctx.registry.is_owned(*proxy));
        }

        host.proxies.clear_calls();
        stack.remove();
        assert!(!stack.show_observer(ObserverId(1), ShowOptions::FORCE));
        stack.add_line(0, Some("late"));
        stack.set_line(0, Some("late"));
        stack.remove_line(0);
        assert!(host.proxies.calls().is_empty());
        assert_eq!(stack.line_count(), 0);
        assert!(stack.observers().is_empty());
    }

    #[test]
    fn failed_create_leaves_layout_untouched() {
        let host = host(LabelConfig::default());
        let stack = LabelStack::new(&host.ctx, base(), &["a", "b"]);
        let before = stack.line_locations();

        host.proxies.fail_creates(true);
        stack.add_line(0, Some("nope"));
        host.proxies.fail_creates(false);

        assert_eq!(stack.line_count(), 2);
        assert_eq!(stack.line_locations(), before);
    }
}

//! Registry of live label stacks.
//!
//! The registry answers "which stack owns this proxy?" for interaction
//! routing. It holds weak references only; stacks control their own
//! lifecycle and keep the proxy index current as lines come and go.

use crate::stack::LabelStack;
use holostack_core::ProxyId;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use tracing::debug;

/// Identity of a label stack within its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StackId(pub u64);

impl fmt::Display for StackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stack#{}", self.0)
    }
}

#[derive(Default)]
struct RegistryState {
    /// BTreeMap keeps snapshots in creation order.
    stacks: BTreeMap<StackId, Weak<LabelStack>>,
    owners: HashMap<ProxyId, StackId>,
}

/// Process-scoped set of live label stacks with proxy reverse lookup.
pub struct LabelRegistry {
    state: RwLock<RegistryState>,
    next_id: AtomicU64,
}

impl Default for LabelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LabelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Stack owning `proxy`, if that stack is still alive.
    pub fn find_owner(&self, proxy: ProxyId) -> Option<Arc<LabelStack>> {
        let candidate = {
            let state = self.read();
            let found = state
                .owners
                .get(&proxy)
                .and_then(|id| state.stacks.get(id))
                .and_then(Weak::upgrade);
            found
        };
        candidate.filter(|stack| stack.is_alive() && stack.contains(proxy))
    }

    /// Whether `proxy` belongs to a live stack.
    pub fn is_owned(&self, proxy: ProxyId) -> bool {
        self.find_owner(proxy).is_some()
    }

    /// Number of registered stacks.
    pub fn len(&self) -> usize {
        self.read().stacks.len()
    }

    /// Whether no stacks are registered.
    pub fn is_empty(&self) -> bool {
        self.read().stacks.is_empty()
    }

    /// Snapshot of live stacks in creation order.
    pub fn stacks(&self) -> Vec<Arc<LabelStack>> {
        let snapshot: Vec<_> = self
            .read()
            .stacks
            .values()
            .filter_map(Weak::upgrade)
            .collect();
        snapshot.into_iter().filter(|s| s.is_alive()).collect()
    }

    /// Remove every live stack, destroying its proxies.
    pub fn clear(&self) {
        let stacks = self.stacks();
        debug!(count = stacks.len(), "Clearing label registry");
        for stack in stacks {
            stack.remove();
        }
        // Entries whose stacks were dropped without teardown.
        let mut state = self.write();
        state.stacks.clear();
        state.owners.clear();
    }

    pub(crate) fn allocate_id(&self) -> StackId {
        StackId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn register(&self, stack: &Arc<LabelStack>) {
        self.write().stacks.insert(stack.id(), Arc::downgrade(stack));
        debug!(stack = %stack.id(), "Registered label stack");
    }

    pub(crate) fn unregister(&self, id: StackId, proxies: &[ProxyId]) {
        let mut state = self.write();
        state.stacks.remove(&id);
        for proxy in proxies {
            if state.owners.get(proxy) == Some(&id) {
                state.owners.remove(proxy);
            }
        }
        debug!(stack = %id, "Unregistered label stack");
    }

    pub(crate) fn index_proxy(&self, proxy: ProxyId, owner: StackId) {
        self.write().owners.insert(proxy, owner);
    }

    pub(crate) fn unindex_proxy(&self, proxy: ProxyId) {
        self.write().owners.remove(&proxy);
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

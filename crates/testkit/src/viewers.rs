//! Viewer pool backed by an explicit membership table.

use holostack_core::{ObserverId, ViewerPool, WorldId};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock};

/// Observers per world, edited by hand.
#[derive(Debug, Default)]
pub struct StaticViewers {
    worlds: RwLock<BTreeMap<WorldId, BTreeSet<ObserverId>>>,
}

impl StaticViewers {
    /// Empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `observer` in `world`, leaving any other world.
    pub fn join(&self, world: WorldId, observer: ObserverId) {
        let mut worlds = self.worlds.write().unwrap_or_else(PoisonError::into_inner);
        for members in worlds.values_mut() {
            members.remove(&observer);
        }
        worlds.entry(world).or_default().insert(observer);
    }

    /// Take `observer` out of every world.
    pub fn leave(&self, observer: ObserverId) {
        let mut worlds = self.worlds.write().unwrap_or_else(PoisonError::into_inner);
        for members in worlds.values_mut() {
            members.remove(&observer);
        }
    }
}

impl ViewerPool for StaticViewers {
    fn viewers(&self, world: WorldId) -> Vec<ObserverId> {
        self.worlds
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&world)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }
}

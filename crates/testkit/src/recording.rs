//! In-memory proxy backend that records every successful call.

use holostack_core::{Location, ObserverId, ProxyBackend, ProxyError, ProxyId};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::trace;

/// One call made against the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ProxyCall {
    /// A proxy was allocated.
    Create {
        /// New proxy.
        id: ProxyId,
        /// Where it was placed.
        location: Location,
        /// Display text, absent for markers.
        text: Option<String>,
        /// Interaction-only marker flag.
        marker: bool,
    },
    /// A proxy moved.
    SetLocation {
        /// Moved proxy.
        id: ProxyId,
        /// New location.
        location: Location,
    },
    /// A proxy's text changed.
    SetText {
        /// Retitled proxy.
        id: ProxyId,
        /// New text.
        text: String,
    },
    /// A proxy was shown to or hidden from an observer.
    SetVisible {
        /// Toggled proxy.
        id: ProxyId,
        /// Observer affected.
        observer: ObserverId,
        /// New visibility.
        visible: bool,
    },
    /// A proxy was destroyed.
    Destroy {
        /// Destroyed proxy.
        id: ProxyId,
    },
}

/// Current state of a live proxy.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyRecord {
    /// Current location.
    pub location: Location,
    /// Current text.
    pub text: Option<String>,
    /// Interaction-only marker flag.
    pub marker: bool,
    /// Observers the proxy is visible to.
    pub visible_to: BTreeSet<ObserverId>,
}

#[derive(Debug)]
struct RecordingState {
    next_id: u64,
    proxies: BTreeMap<ProxyId, ProxyRecord>,
    calls: Vec<ProxyCall>,
    fail_creates: bool,
}

/// Proxy backend keeping proxies in memory.
#[derive(Debug)]
pub struct RecordingProxies {
    state: Mutex<RecordingState>,
}

impl Default for RecordingProxies {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingProxies {
    /// Empty backend; ids start at 1.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RecordingState {
                next_id: 1,
                proxies: BTreeMap::new(),
                calls: Vec::new(),
                fail_creates: false,
            }),
        }
    }

    /// Make every following `create` fail (or succeed again).
    pub fn fail_creates(&self, fail: bool) {
        self.lock().fail_creates = fail;
    }

    /// State of a live proxy.
    pub fn proxy(&self, id: ProxyId) -> Option<ProxyRecord> {
        self.lock().proxies.get(&id).cloned()
    }

    /// Location of a live proxy.
    pub fn location(&self, id: ProxyId) -> Option<Location> {
        self.lock().proxies.get(&id).map(|record| record.location)
    }

    /// Whether a live proxy is visible to `observer`.
    pub fn is_visible(&self, id: ProxyId, observer: ObserverId) -> bool {
        self.lock()
            .proxies
            .get(&id)
            .is_some_and(|record| record.visible_to.contains(&observer))
    }

    /// Number of proxies not yet destroyed.
    pub fn live_count(&self) -> usize {
        self.lock().proxies.len()
    }

    /// Calls recorded so far.
    pub fn calls(&self) -> Vec<ProxyCall> {
        self.lock().calls.clone()
    }

    /// Drain the recorded calls.
    pub fn take_calls(&self) -> Vec<ProxyCall> {
        std::mem::take(&mut self.lock().calls)
    }

    /// Forget the recorded calls.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Number of visibility toggles issued for `observer`.
    pub fn visibility_calls(&self, observer: ObserverId) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| {
                matches!(call, ProxyCall::SetVisible { observer: o, .. } if *o == observer)
            })
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, RecordingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RecordingState {
    fn record(&mut self, call: ProxyCall) {
        trace!(?call, "Proxy call");
        self.calls.push(call);
    }

    fn proxy_mut(&mut self, id: ProxyId) -> Result<&mut ProxyRecord, ProxyError> {
        self.proxies.get_mut(&id).ok_or(ProxyError::UnknownProxy(id))
    }
}

impl ProxyBackend for RecordingProxies {
    fn create(
        &self,
        location: &Location,
        text: Option<&str>,
        marker: bool,
    ) -> Result<ProxyId, ProxyError> {
        let mut state = self.lock();
        if state.fail_creates {
            return Err(ProxyError::Backend("create refused".into()));
        }
        let id = ProxyId(state.next_id);
        state.next_id += 1;
        state.proxies.insert(
            id,
            ProxyRecord {
                location: *location,
                text: text.map(str::to_owned),
                marker,
                visible_to: BTreeSet::new(),
            },
        );
        state.record(ProxyCall::Create {
            id,
            location: *location,
            text: text.map(str::to_owned),
            marker,
        });
        Ok(id)
    }

    fn set_location(&self, id: ProxyId, location: &Location) -> Result<(), ProxyError> {
        let mut state = self.lock();
        state.proxy_mut(id)?.location = *location;
        state.record(ProxyCall::SetLocation {
            id,
            location: *location,
        });
        Ok(())
    }

    fn set_text(&self, id: ProxyId, text: &str) -> Result<(), ProxyError> {
        let mut state = self.lock();
        let record = state.proxy_mut(id)?;
        if record.marker {
            return Err(ProxyError::NotTextual(id));
        }
        record.text = Some(text.to_owned());
        state.record(ProxyCall::SetText {
            id,
            text: text.to_owned(),
        });
        Ok(())
    }

    fn text(&self, id: ProxyId) -> Option<String> {
        self.lock()
            .proxies
            .get(&id)
            .and_then(|record| record.text.clone())
    }

    fn set_visible(
        &self,
        id: ProxyId,
        observer: ObserverId,
        visible: bool,
    ) -> Result<(), ProxyError> {
        let mut state = self.lock();
        let record = state.proxy_mut(id)?;
        if visible {
            record.visible_to.insert(observer);
        } else {
            record.visible_to.remove(&observer);
        }
        state.record(ProxyCall::SetVisible {
            id,
            observer,
            visible,
        });
        Ok(())
    }

    fn destroy(&self, id: ProxyId) -> Result<(), ProxyError> {
        let mut state = self.lock();
        state
            .proxies
            .remove(&id)
            .ok_or(ProxyError::UnknownProxy(id))?;
        state.record(ProxyCall::Destroy { id });
        Ok(())
    }
}

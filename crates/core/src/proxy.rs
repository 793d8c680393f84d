//! Capabilities a host must provide for label stacks.
//!
//! Proxies are lightweight virtual entities (one per label line, plus an
//! optional interaction anchor). Their packet-level lifecycle belongs to the
//! host; label stacks only drive it through [`ProxyBackend`].

use crate::{Location, ObserverId, ProxyId, WorldId};
use thiserror::Error;

/// Failure reported by a proxy backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProxyError {
    /// The id does not name a live proxy.
    #[error("unknown proxy {0}")]
    UnknownProxy(ProxyId),
    /// Text was set on an interaction-only marker.
    #[error("proxy {0} does not carry text")]
    NotTextual(ProxyId),
    /// Host-specific failure.
    #[error("proxy backend failure: {0}")]
    Backend(String),
}

/// Create, move, retitle, toggle and destroy proxy entities.
///
/// Newly created proxies are hidden from every observer.
pub trait ProxyBackend: Send + Sync {
    /// Allocate a proxy at `location`. `marker` flags a textless interaction target.
    fn create(
        &self,
        location: &Location,
        text: Option<&str>,
        marker: bool,
    ) -> Result<ProxyId, ProxyError>;

    /// Move a proxy.
    fn set_location(&self, id: ProxyId, location: &Location) -> Result<(), ProxyError>;

    /// Replace a text-bearing proxy's text.
    fn set_text(&self, id: ProxyId, text: &str) -> Result<(), ProxyError>;

    /// Current text of a proxy, if it has any.
    fn text(&self, id: ProxyId) -> Option<String>;

    /// Show or hide a proxy for one observer.
    fn set_visible(&self, id: ProxyId, observer: ObserverId, visible: bool)
        -> Result<(), ProxyError>;

    /// Destroy a proxy.
    fn destroy(&self, id: ProxyId) -> Result<(), ProxyError>;
}

/// Enumerates the observers currently present in a world.
pub trait ViewerPool: Send + Sync {
    /// Observers in `world`, in no particular order.
    fn viewers(&self, world: WorldId) -> Vec<ObserverId>;
}

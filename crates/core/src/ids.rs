//! Identities for proxy entities and observers.
//!
//! Both are opaque numeric handles. Equality and hashing are stable for the
//! lifetime of the process, which is what reverse lookup relies on.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a backing proxy entity (one per label line, plus the anchor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProxyId(pub u64);

/// Identity of a viewer whose visibility is tracked per label stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObserverId(pub u64);

impl fmt::Display for ProxyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "proxy#{}", self.0)
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer#{}", self.0)
    }
}

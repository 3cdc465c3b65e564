//! Registry events
//!
//! Every mutating registry call emits exactly one event, delivered
//! synchronously to every subscriber, so presentation layers can bind
//! without polling.

use ulid::Ulid;

/// Unique listener identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub Ulid);

impl ListenerId {
    /// Generate new listener ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

/// One registry mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    /// Artifact inserted or overwritten
    Registered {
        /// Artifact id
        id: String,
    },
    /// Loading flag changed
    LoadingChanged {
        /// Artifact id
        id: String,
        /// New flag value
        loading: bool,
    },
    /// Error recorded
    Errored {
        /// Artifact id
        id: String,
        /// Error message
        error: String,
    },
    /// Compiled form stored
    Compiled {
        /// Artifact id
        id: String,
    },
    /// Artifact removed
    Unregistered {
        /// Artifact id
        id: String,
    },
    /// Registry emptied; one event carries every removed id so subscribers
    /// can batch their updates
    Cleared {
        /// All removed ids
        ids: Vec<String>,
    },
}

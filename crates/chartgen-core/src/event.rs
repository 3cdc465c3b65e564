//! Orchestration lifecycle events
//!
//! Delivered synchronously to subscribers at every phase transition and
//! around each backend call. A panicking listener is isolated per listener
//! in the notify loop; it never aborts orchestration or starves other
//! subscribers.

use crate::backend::BackendKind;
use crate::phase::GenerationPhase;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};
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

/// One orchestration lifecycle event
///
/// Serializes with an `event` tag so presentation layers can forward the
/// stream over the wire unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GenerationEvent {
    /// The state machine entered a new phase
    PhaseChange {
        /// New phase
        phase: GenerationPhase,
        /// Overall progress, 0–100
        progress: u8,
        /// Human-readable status line
        message: String,
    },
    /// A backend call is starting
    AgentStart {
        /// Which backend
        agent: BackendKind,
    },
    /// A backend call finished successfully
    AgentComplete {
        /// Which backend
        agent: BackendKind,
    },
    /// The pass failed
    Error {
        /// Phase that failed
        phase: GenerationPhase,
        /// Failure description
        message: String,
    },
}

type Listener = Arc<dyn Fn(&GenerationEvent) + Send + Sync>;
type ListenerTable = RwLock<Vec<(ListenerId, Listener)>>;

/// Subscription handle returned by the orchestrator
///
/// Dropping the handle keeps the subscription alive; call
/// [`ListenerHandle::unsubscribe`] to remove it.
#[derive(Debug)]
pub struct ListenerHandle {
    id: ListenerId,
    table: Weak<ListenerTable>,
}

impl ListenerHandle {
    /// Remove the listener
    pub fn unsubscribe(self) {
        if let Some(table) = self.table.upgrade() {
            table.write().retain(|(id, _)| *id != self.id);
        }
    }
}

/// Synchronous broadcast set with per-listener panic isolation
#[derive(Clone, Default)]
pub(crate) struct ListenerSet {
    table: Arc<ListenerTable>,
}

impl ListenerSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(
        &self,
        listener: impl Fn(&GenerationEvent) + Send + Sync + 'static,
    ) -> ListenerHandle {
        let id = ListenerId::new();
        self.table.write().push((id, Arc::new(listener)));
        ListenerHandle {
            id,
            table: Arc::downgrade(&self.table),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.table.read().len()
    }

    pub(crate) fn notify(&self, event: &GenerationEvent) {
        let listeners: Vec<Listener> = self
            .table
            .read()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                tracing::warn!(?event, "generation listener panicked; ignoring");
            }
        }
    }
}

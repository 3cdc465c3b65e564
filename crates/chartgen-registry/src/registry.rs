//! Reactive artifact registry
//!
//! Tracks the compile/error/loading lifecycle of every generated artifact.
//! Exactly one entry per id; every mutating call triggers exactly one
//! listener notification. A panicking listener is isolated per listener in
//! the notify loop and never disturbs the caller or other subscribers.

use crate::artifact::{ArtifactEntry, RegistryStats};
use crate::error::RegistryError;
use crate::event::{ListenerId, RegistryEvent};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

type Listener = Arc<dyn Fn(&RegistryEvent) + Send + Sync>;

/// Reactive registry of generated artifacts
///
/// Cheap to clone; clones share the same table and listener set.
#[derive(Clone)]
pub struct ArtifactRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    entries: DashMap<String, ArtifactEntry>,
    listeners: RwLock<Vec<(ListenerId, Listener)>>,
}

/// Subscription handle returned by [`ArtifactRegistry::add_listener`]
///
/// Dropping the handle keeps the subscription alive; call
/// [`ListenerHandle::unsubscribe`] to remove it.
#[derive(Debug)]
pub struct ListenerHandle {
    id: ListenerId,
    inner: Weak<RegistryInner>,
}

impl ListenerHandle {
    /// Remove the listener from the registry
    pub fn unsubscribe(self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.listeners.write().retain(|(id, _)| *id != self.id);
        }
    }
}

impl ArtifactRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                entries: DashMap::new(),
                listeners: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Insert or overwrite an artifact
    ///
    /// The entry starts with fresh flags: any prior error, loading state,
    /// or compiled form for the id is discarded.
    pub fn register(&self, id: impl Into<String>, code: impl Into<String>, metadata: Value) {
        let id = id.into();
        let entry = ArtifactEntry::new(id.clone(), code, metadata);
        self.inner.entries.insert(id.clone(), entry);
        tracing::debug!(artifact = %id, "artifact registered");
        self.notify(&RegistryEvent::Registered { id });
    }

    /// Set or clear the loading flag
    ///
    /// # Errors
    /// Returns [`RegistryError::NotFound`] for an unknown id.
    pub fn set_loading(&self, id: &str, loading: bool) -> Result<(), RegistryError> {
        {
            let mut entry = self
                .inner
                .entries
                .get_mut(id)
                .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
            entry.loading = loading;
        }
        self.notify(&RegistryEvent::LoadingChanged {
            id: id.to_string(),
            loading,
        });
        Ok(())
    }

    /// Record an error; always clears the loading flag
    ///
    /// Allowed from any status, including after a successful compile.
    ///
    /// # Errors
    /// Returns [`RegistryError::NotFound`] for an unknown id.
    pub fn set_error(&self, id: &str, error: impl Into<String>) -> Result<(), RegistryError> {
        let error = error.into();
        {
            let mut entry = self
                .inner
                .entries
                .get_mut(id)
                .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
            entry.error = Some(error.clone());
            entry.loading = false;
        }
        self.notify(&RegistryEvent::Errored {
            id: id.to_string(),
            error,
        });
        Ok(())
    }

    /// Store the compiled form; clears loading and any prior error
    ///
    /// An artifact only reaches the compiled state through loading.
    ///
    /// # Errors
    /// - [`RegistryError::NotFound`] for an unknown id
    /// - [`RegistryError::NotLoading`] when no compile was in progress
    pub fn set_compiled(&self, id: &str, compiled: Value) -> Result<(), RegistryError> {
        {
            let mut entry = self
                .inner
                .entries
                .get_mut(id)
                .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
            if !entry.loading {
                return Err(RegistryError::NotLoading(id.to_string()));
            }
            entry.compiled = Some(compiled);
            entry.loading = false;
            entry.error = None;
        }
        self.notify(&RegistryEvent::Compiled { id: id.to_string() });
        Ok(())
    }

    /// Get a snapshot of one entry
    #[inline]
    #[must_use]
    pub fn get(&self, id: &str) -> Option<ArtifactEntry> {
        self.inner.entries.get(id).map(|e| e.clone())
    }

    /// Check whether an id is tracked
    #[inline]
    #[must_use]
    pub fn has(&self, id: &str) -> bool {
        self.inner.entries.contains_key(id)
    }

    /// Snapshot of every entry
    #[must_use]
    pub fn get_all(&self) -> Vec<ArtifactEntry> {
        self.inner.entries.iter().map(|e| e.clone()).collect()
    }

    /// Lifecycle counters
    ///
    /// `ready` is `compiled` minus `errors`, saturating at zero: an
    /// artifact that compiled and later errored keeps its compiled form but
    /// is excluded from the ready count.
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        let mut stats = RegistryStats::default();
        for entry in self.inner.entries.iter() {
            stats.total += 1;
            if entry.loading {
                stats.loading += 1;
            }
            if entry.error.is_some() {
                stats.errors += 1;
            }
            if entry.compiled.is_some() {
                stats.compiled += 1;
            }
        }
        stats.ready = stats.compiled.saturating_sub(stats.errors);
        stats
    }

    /// Remove one artifact
    ///
    /// Returns whether an entry was removed; no event fires for unknown ids.
    pub fn unregister(&self, id: &str) -> bool {
        let removed = self.inner.entries.remove(id).is_some();
        if removed {
            self.notify(&RegistryEvent::Unregistered { id: id.to_string() });
        }
        removed
    }

    /// Remove every artifact
    ///
    /// Emits a single `Cleared` event carrying all removed ids so
    /// subscribers can batch their updates. An already-empty registry emits
    /// nothing.
    pub fn clear(&self) {
        let ids: Vec<String> = self
            .inner
            .entries
            .iter()
            .map(|e| e.key().clone())
            .collect();
        self.inner.entries.clear();
        if !ids.is_empty() {
            self.notify(&RegistryEvent::Cleared { ids });
        }
    }

    /// Subscribe to registry events
    pub fn add_listener(
        &self,
        listener: impl Fn(&RegistryEvent) + Send + Sync + 'static,
    ) -> ListenerHandle {
        let id = ListenerId::new();
        self.inner.listeners.write().push((id, Arc::new(listener)));
        ListenerHandle {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Number of active listeners
    #[inline]
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.read().len()
    }

    fn notify(&self, event: &RegistryEvent) {
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .read()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            // a panicking subscriber must not disturb the others
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                tracing::warn!(?event, "registry listener panicked; ignoring");
            }
        }
    }
}

impl Default for ArtifactRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ArtifactStatus;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn recording_registry() -> (ArtifactRegistry, Arc<Mutex<Vec<RegistryEvent>>>) {
        let registry = ArtifactRegistry::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let _handle = registry.add_listener(move |event| sink.lock().push(event.clone()));
        (registry, events)
    }

    #[test]
    fn register_then_compile_lifecycle() {
        let registry = ArtifactRegistry::new();
        registry.register("c1", "export const C1 = ...", Value::Null);
        assert_eq!(registry.get("c1").unwrap().status(), ArtifactStatus::Registered);

        registry.set_loading("c1", true).unwrap();
        assert_eq!(registry.get("c1").unwrap().status(), ArtifactStatus::Loading);

        registry.set_compiled("c1", json!({ "module": "c1" })).unwrap();
        let entry = registry.get("c1").unwrap();
        assert_eq!(entry.status(), ArtifactStatus::Compiled);
        assert!(!entry.loading);

        let stats = registry.stats();
        assert_eq!(stats.compiled, 1);
        assert_eq!(stats.errors, 0);
        assert_eq!(stats.ready, 1);
    }

    #[test]
    fn compile_without_loading_is_rejected() {
        let registry = ArtifactRegistry::new();
        registry.register("c1", "code", Value::Null);

        let err = registry.set_compiled("c1", json!({})).unwrap_err();
        assert!(matches!(err, RegistryError::NotLoading(_)));
        assert_eq!(registry.get("c1").unwrap().status(), ArtifactStatus::Registered);
    }

    #[test]
    fn error_without_compile_keeps_ready_at_zero() {
        let registry = ArtifactRegistry::new();
        registry.register("c1", "code", Value::Null);
        registry.set_error("c1", "boom").unwrap();

        let stats = registry.stats();
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.compiled, 0);
        assert_eq!(stats.ready, 0);
    }

    #[test]
    fn error_after_compile_excludes_id_from_ready() {
        let registry = ArtifactRegistry::new();
        registry.register("c1", "code", Value::Null);
        registry.set_loading("c1", true).unwrap();
        registry.set_compiled("c1", json!({})).unwrap();
        registry.set_error("c1", "stale").unwrap();

        let entry = registry.get("c1").unwrap();
        assert_eq!(entry.status(), ArtifactStatus::Errored);
        assert!(entry.compiled.is_some());

        let stats = registry.stats();
        assert_eq!(stats.compiled, 1);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.ready, 0);
    }

    #[test]
    fn reregister_clears_prior_error() {
        let registry = ArtifactRegistry::new();
        registry.register("c1", "v1", Value::Null);
        registry.set_error("c1", "boom").unwrap();

        registry.register("c1", "v2", Value::Null);
        let entry = registry.get("c1").unwrap();
        assert_eq!(entry.status(), ArtifactStatus::Registered);
        assert_eq!(entry.code, "v2");
        assert!(entry.error.is_none());
    }

    #[test]
    fn every_mutation_emits_exactly_one_event() {
        let (registry, events) = recording_registry();

        registry.register("c1", "code", Value::Null);
        registry.set_loading("c1", true).unwrap();
        registry.set_compiled("c1", json!({})).unwrap();
        registry.unregister("c1");

        let events = events.lock();
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], RegistryEvent::Registered { .. }));
        assert!(matches!(events[3], RegistryEvent::Unregistered { .. }));
    }

    #[test]
    fn clear_emits_one_batched_event() {
        let (registry, events) = recording_registry();
        registry.register("c1", "a", Value::Null);
        registry.register("c2", "b", Value::Null);
        events.lock().clear();

        registry.clear();

        let events = events.lock();
        assert_eq!(events.len(), 1);
        match &events[0] {
            RegistryEvent::Cleared { ids } => {
                let mut ids = ids.clone();
                ids.sort();
                assert_eq!(ids, vec!["c1".to_string(), "c2".to_string()]);
            }
            other => panic!("expected Cleared, got {other:?}"),
        }
        assert!(!registry.has("c1"));
    }

    #[test]
    fn panicking_listener_does_not_disturb_others() {
        let registry = ArtifactRegistry::new();
        let seen = Arc::new(Mutex::new(0usize));

        let _bad = registry.add_listener(|_| panic!("subscriber bug"));
        let sink = Arc::clone(&seen);
        let _good = registry.add_listener(move |_| *sink.lock() += 1);

        registry.register("c1", "code", Value::Null);
        assert_eq!(*seen.lock(), 1);
        assert!(registry.has("c1"));
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let registry = ArtifactRegistry::new();
        let seen = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&seen);
        let handle = registry.add_listener(move |_| *sink.lock() += 1);

        registry.register("c1", "code", Value::Null);
        handle.unsubscribe();
        registry.register("c2", "code", Value::Null);

        assert_eq!(*seen.lock(), 1);
        assert_eq!(registry.listener_count(), 0);
    }

    #[test]
    fn unknown_ids_are_reported() {
        let registry = ArtifactRegistry::new();
        assert!(matches!(
            registry.set_loading("ghost", true),
            Err(RegistryError::NotFound(_))
        ));
        assert!(!registry.unregister("ghost"));
    }
}

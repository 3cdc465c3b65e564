//! Testing utilities for the chartgen workspace
//!
//! Scripted backend implementations, a scripted data source, and shared
//! fixtures used by integration tests across the workspace.

#![allow(missing_docs)]

use async_trait::async_trait;
use chartgen_core::{
    BackendError, CodegenBackend, FeedbackAnalysis, GeneratedArtifact, GeneratedArtifacts,
    NluBackend, RequestAnalysis, RequestContext,
};
use chartgen_fetch::{DataSource, SearchResponse, SourceError};
use chartgen_spec::{
    ComponentNode, DataSourceSpec, FeedbackChange, UiSpecification,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Scripted data source backed by per-entity canned records.
///
/// Counts calls, optionally delays each search to widen coalescing windows,
/// and fails named entity types on demand.
#[derive(Default)]
pub struct MockDataSource {
    records: Mutex<BTreeMap<String, Vec<Value>>>,
    failing: Mutex<BTreeMap<String, String>>,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

impl MockDataSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_records(self, entity_type: &str, records: Vec<Value>) -> Self {
        self.records.lock().insert(entity_type.to_string(), records);
        self
    }

    /// Make every search for `entity_type` fail with an unreachable error
    #[must_use]
    pub fn with_failure(self, entity_type: &str, message: &str) -> Self {
        self.failing
            .lock()
            .insert(entity_type.to_string(), message.to_string());
        self
    }

    /// Delay every search, widening the window for coalescing tests
    #[must_use]
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock() = Some(delay);
        self
    }

    /// Number of searches performed so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataSource for MockDataSource {
    async fn search(
        &self,
        entity_type: &str,
        _params: &BTreeMap<String, String>,
    ) -> Result<SearchResponse, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = self.failing.lock().get(entity_type) {
            return Err(SourceError::Unreachable(message.clone()));
        }
        let records = self
            .records
            .lock()
            .get(entity_type)
            .cloned()
            .unwrap_or_default();
        Ok(SearchResponse::Records(records))
    }
}

/// Scripted NLU backend returning canned analyses.
pub struct ScriptedNlu {
    specification: Mutex<UiSpecification>,
    session_id: Mutex<Option<String>>,
    changes: Mutex<Vec<FeedbackChange>>,
    delay: Mutex<Option<Duration>>,
    fail_requests: AtomicBool,
    fail_feedback: AtomicBool,
    request_calls: AtomicUsize,
    feedback_calls: AtomicUsize,
}

impl ScriptedNlu {
    #[must_use]
    pub fn new(specification: UiSpecification) -> Self {
        Self {
            specification: Mutex::new(specification),
            session_id: Mutex::new(Some("session-1".to_string())),
            changes: Mutex::new(Vec::new()),
            delay: Mutex::new(None),
            fail_requests: AtomicBool::new(false),
            fail_feedback: AtomicBool::new(false),
            request_calls: AtomicUsize::new(0),
            feedback_calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn with_session_id(self, session_id: Option<&str>) -> Self {
        *self.session_id.lock() = session_id.map(str::to_string);
        self
    }

    /// Script the changes returned by the next feedback analyses
    #[must_use]
    pub fn with_changes(self, changes: Vec<FeedbackChange>) -> Self {
        *self.changes.lock() = changes;
        self
    }

    /// Delay every analysis, widening the window for concurrency tests
    #[must_use]
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock() = Some(delay);
        self
    }

    pub fn fail_requests(&self, fail: bool) {
        self.fail_requests.store(fail, Ordering::SeqCst);
    }

    pub fn fail_feedback(&self, fail: bool) {
        self.fail_feedback.store(fail, Ordering::SeqCst);
    }

    pub fn request_calls(&self) -> usize {
        self.request_calls.load(Ordering::SeqCst)
    }

    pub fn feedback_calls(&self) -> usize {
        self.feedback_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NluBackend for ScriptedNlu {
    async fn analyze_request(
        &self,
        _text: &str,
        _context: &RequestContext,
    ) -> Result<RequestAnalysis, BackendError> {
        self.request_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_requests.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("scripted nlu failure".to_string()));
        }
        Ok(RequestAnalysis {
            specification: self.specification.lock().clone(),
            session_id: self.session_id.lock().clone(),
            reasoning: None,
        })
    }

    async fn analyze_feedback(
        &self,
        _feedback: &str,
        _specification: &UiSpecification,
        _context: &RequestContext,
    ) -> Result<FeedbackAnalysis, BackendError> {
        self.feedback_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_feedback.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("scripted nlu failure".to_string()));
        }
        Ok(FeedbackAnalysis {
            changes: self.changes.lock().clone(),
            reasoning: None,
        })
    }
}

/// Scripted codegen backend producing one artifact per top-level component.
#[derive(Default)]
pub struct ScriptedCodegen {
    fail: AtomicBool,
    calls: AtomicUsize,
}

impl ScriptedCodegen {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CodegenBackend for ScriptedCodegen {
    async fn generate_artifacts(
        &self,
        specification: &UiSpecification,
    ) -> Result<GeneratedArtifacts, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(BackendError::Rejected("scripted codegen failure".to_string()));
        }
        let mut artifacts = GeneratedArtifacts::new();
        for component in &specification.components {
            let code = format!(
                "export const {} = () => render({:?});",
                component.id.replace('-', "_"),
                component.component_type
            );
            artifacts.insert(
                component.id.clone(),
                GeneratedArtifact::new(code)
                    .with_metadata(json!({ "componentType": component.component_type })),
            );
        }
        Ok(artifacts)
    }
}

/// A small two-component vitals dashboard specification
#[must_use]
pub fn vitals_specification() -> UiSpecification {
    UiSpecification::new("Vitals overview")
        .with_component(
            ComponentNode::new("vitals-chart", "line-chart")
                .with_property("metric", json!("heart-rate"))
                .with_data_source("vitals"),
        )
        .with_component(
            ComponentNode::new("vitals-table", "data-table").with_data_source("vitals"),
        )
        .with_data_source(
            DataSourceSpec::new("vitals", "Observation")
                .with_param("category", "vital-signs")
                .with_param("_count", "50"),
        )
}

/// Canned observation records matching the vitals fixture
#[must_use]
pub fn observation_records() -> Vec<Value> {
    vec![
        json!({ "id": "o1", "code": "heart-rate", "value": 72, "unit": "bpm" }),
        json!({ "id": "o2", "code": "heart-rate", "value": 75, "unit": "bpm" }),
        json!({ "id": "o3", "code": "resp-rate", "value": 16, "unit": "/min" }),
    ]
}

//! Generation orchestrator
//!
//! Drives a free-text request through analysis → generation → registration,
//! exposes the refinement loop for revising an existing specification from
//! feedback, and emits lifecycle events to subscribers at every step.
//!
//! One orchestrator runs one pass at a time: a single-flight guard rejects
//! overlapping calls instead of letting them interleave session state.
//! Retry is the caller's responsibility; regeneration is costly and is
//! never attempted automatically.

use crate::backend::{
    BackendKind, CodegenBackend, GeneratedArtifacts, NluBackend, RequestContext,
};
use crate::error::OrchestratorError;
use crate::event::{GenerationEvent, ListenerHandle, ListenerSet};
use crate::phase::{validate_transition, GenerationPhase};
use crate::session::{ConversationEntry, EntryKind, GenerationSession, SessionId};
use chartgen_registry::{ArtifactEntry, ArtifactRegistry};
use chartgen_spec::{apply_changes, UiSpecification};
use parking_lot::RwLock;
use std::sync::Arc;

/// Orchestrator configuration
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    /// Validate specifications before handing them to codegen
    pub validate_specifications: bool,
    /// Conversation history cap; oldest entries are trimmed past it
    pub max_history_entries: usize,
}

impl OrchestratorConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With specification validation toggled
    #[inline]
    #[must_use]
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate_specifications = validate;
        self
    }

    /// With a history cap
    #[inline]
    #[must_use]
    pub fn with_max_history(mut self, max: usize) -> Self {
        self.max_history_entries = max;
        self
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            validate_specifications: true,
            max_history_entries: 256,
        }
    }
}

/// Externally observable orchestrator state
#[derive(Debug, Clone, serde::Serialize)]
pub struct OrchestratorStatus {
    /// Session identifier
    pub session_id: SessionId,
    /// Backend conversation id, once the NLU backend has assigned one
    pub backend_session: Option<String>,
    /// Current phase
    pub phase: GenerationPhase,
    /// Overall progress, 0–100
    pub progress: u8,
    /// Human-readable status line
    pub message: String,
}

/// Result of a successful generation pass
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    /// Specification the pass produced
    pub specification: UiSpecification,
    /// Registry snapshot after registration
    pub artifacts: Vec<ArtifactEntry>,
    /// Session the pass ran under
    pub session_id: SessionId,
}

/// Result of a successful refinement pass
#[derive(Debug, Clone)]
pub struct RefinementOutcome {
    /// Refined specification (the caller's input is never mutated)
    pub specification: UiSpecification,
    /// Registry snapshot after the pass
    pub artifacts: Vec<ArtifactEntry>,
    /// Number of feedback changes applied
    pub changes_applied: usize,
    /// Whether artifacts were regenerated
    pub rebuilt: bool,
}

/// The generation orchestrator
///
/// Owns the session state; writes generated artifacts into the injected
/// [`ArtifactRegistry`].
pub struct GenerationOrchestrator {
    nlu: Arc<dyn NluBackend>,
    codegen: Arc<dyn CodegenBackend>,
    registry: ArtifactRegistry,
    config: OrchestratorConfig,
    session: RwLock<GenerationSession>,
    listeners: ListenerSet,
    flight: tokio::sync::Mutex<()>,
}

impl GenerationOrchestrator {
    /// Create new orchestrator with injected collaborators
    #[must_use]
    pub fn new(
        nlu: Arc<dyn NluBackend>,
        codegen: Arc<dyn CodegenBackend>,
        registry: ArtifactRegistry,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            nlu,
            codegen,
            registry,
            config,
            session: RwLock::new(GenerationSession::new()),
            listeners: ListenerSet::new(),
            flight: tokio::sync::Mutex::new(()),
        }
    }

    /// Run a full generation pass from a free-text request
    ///
    /// Phases advance analyzing → generating → registering → complete; any
    /// stage failure forces the error phase and comes back as a typed
    /// error naming the failing phase. The registry is cleared before
    /// registration so a pass never mixes artifacts from two requests.
    ///
    /// # Errors
    /// - [`OrchestratorError::Busy`] when another pass is in progress
    /// - [`OrchestratorError::Backend`] when a collaborator call fails
    /// - [`OrchestratorError::Validation`] when the specification is invalid
    pub async fn process_request(
        &self,
        text: &str,
        context: &RequestContext,
    ) -> Result<GenerationOutcome, OrchestratorError> {
        let _flight = self
            .flight
            .try_lock()
            .map_err(|_| OrchestratorError::Busy)?;

        tracing::info!(request = text, "processing generation request");
        self.push_history(EntryKind::UserRequest, text);

        self.set_phase(GenerationPhase::Analyzing, 10, "Analyzing request")?;
        self.listeners.notify(&GenerationEvent::AgentStart {
            agent: BackendKind::Nlu,
        });
        let analysis = match self.nlu.analyze_request(text, context).await {
            Ok(analysis) => analysis,
            Err(e) => {
                return Err(self.fail_pass(
                    GenerationPhase::Analyzing,
                    OrchestratorError::Backend {
                        phase: GenerationPhase::Analyzing,
                        source: e,
                    },
                ))
            }
        };
        self.listeners.notify(&GenerationEvent::AgentComplete {
            agent: BackendKind::Nlu,
        });

        let specification = analysis.specification;
        if self.config.validate_specifications {
            if let Err(e) = specification.validate() {
                return Err(
                    self.fail_pass(GenerationPhase::Analyzing, OrchestratorError::Validation(e))
                );
            }
        }
        {
            let mut session = self.session.write();
            session.backend_session = analysis.session_id.clone();
            session.specification = Some(specification.clone());
        }
        self.push_history(
            EntryKind::AgentEvent,
            format!("specification derived: {}", specification.title),
        );

        let artifacts = self.generate_and_register(&specification).await?;

        self.set_phase(GenerationPhase::Complete, 100, "Generation complete")?;
        let session_id = self.session.read().id;
        tracing::info!(%session_id, artifacts = artifacts.len(), "generation pass complete");

        Ok(GenerationOutcome {
            specification,
            artifacts,
            session_id,
        })
    }

    /// Revise an existing specification from free-text feedback
    ///
    /// Changes are applied to a clone; the caller's specification is never
    /// mutated. An empty change set short-circuits straight to complete
    /// without invoking the codegen backend; a non-empty set re-enters
    /// generating → registering → complete to rebuild artifacts.
    ///
    /// # Errors
    /// - [`OrchestratorError::Busy`] when another pass is in progress
    /// - [`OrchestratorError::Backend`] when a collaborator call fails
    /// - [`OrchestratorError::Feedback`] when a change targets an unknown node
    pub async fn refine_specification(
        &self,
        specification: &UiSpecification,
        feedback: &str,
        context: &RequestContext,
    ) -> Result<RefinementOutcome, OrchestratorError> {
        let _flight = self
            .flight
            .try_lock()
            .map_err(|_| OrchestratorError::Busy)?;

        tracing::info!(feedback, "refining specification");
        self.push_history(EntryKind::UserRequest, feedback);

        self.set_phase(GenerationPhase::Refining, 20, "Analyzing feedback")?;
        self.listeners.notify(&GenerationEvent::AgentStart {
            agent: BackendKind::Nlu,
        });
        let analysis = match self
            .nlu
            .analyze_feedback(feedback, specification, context)
            .await
        {
            Ok(analysis) => analysis,
            Err(e) => {
                return Err(self.fail_pass(
                    GenerationPhase::Refining,
                    OrchestratorError::Backend {
                        phase: GenerationPhase::Refining,
                        source: e,
                    },
                ))
            }
        };
        self.listeners.notify(&GenerationEvent::AgentComplete {
            agent: BackendKind::Nlu,
        });

        if analysis.changes.is_empty() {
            // nothing to rebuild; skip the regeneration cost entirely
            tracing::debug!("feedback produced no changes");
            self.set_phase(GenerationPhase::Complete, 100, "No changes required")?;
            return Ok(RefinementOutcome {
                specification: specification.clone(),
                artifacts: self.registry.get_all(),
                changes_applied: 0,
                rebuilt: false,
            });
        }

        let mut refined = specification.clone();
        let changes_applied = match apply_changes(&mut refined, &analysis.changes) {
            Ok(applied) => applied,
            Err(e) => {
                return Err(
                    self.fail_pass(GenerationPhase::Refining, OrchestratorError::Feedback(e))
                )
            }
        };
        if self.config.validate_specifications {
            if let Err(e) = refined.validate() {
                return Err(
                    self.fail_pass(GenerationPhase::Refining, OrchestratorError::Validation(e))
                );
            }
        }
        self.push_history(
            EntryKind::AgentEvent,
            format!("applied {changes_applied} feedback changes"),
        );
        self.session.write().specification = Some(refined.clone());

        let artifacts = self.generate_and_register(&refined).await?;

        self.set_phase(GenerationPhase::Complete, 100, "Refinement complete")?;
        Ok(RefinementOutcome {
            specification: refined,
            artifacts,
            changes_applied,
            rebuilt: true,
        })
    }

    /// Current externally observable state
    #[must_use]
    pub fn status(&self) -> OrchestratorStatus {
        let session = self.session.read();
        OrchestratorStatus {
            session_id: session.id,
            backend_session: session.backend_session.clone(),
            phase: session.phase,
            progress: session.progress,
            message: session.message.clone(),
        }
    }

    /// Conversation history snapshot, oldest first
    #[must_use]
    pub fn conversation_history(&self) -> Vec<ConversationEntry> {
        self.session.read().conversation_history.clone()
    }

    /// Session id, stable across passes and refinements
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session.read().id
    }

    /// Backend conversation id retained for refinement correlation
    #[must_use]
    pub fn backend_session(&self) -> Option<String> {
        self.session.read().backend_session.clone()
    }

    /// Subscribe to lifecycle events
    pub fn add_listener(
        &self,
        listener: impl Fn(&GenerationEvent) + Send + Sync + 'static,
    ) -> ListenerHandle {
        self.listeners.add(listener)
    }

    /// Number of active listeners
    #[inline]
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// The injected artifact registry
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &ArtifactRegistry {
        &self.registry
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Shared generating → registering tail of both passes
    async fn generate_and_register(
        &self,
        specification: &UiSpecification,
    ) -> Result<Vec<ArtifactEntry>, OrchestratorError> {
        self.set_phase(GenerationPhase::Generating, 40, "Generating artifacts")?;
        self.listeners.notify(&GenerationEvent::AgentStart {
            agent: BackendKind::Codegen,
        });
        let generated: GeneratedArtifacts =
            match self.codegen.generate_artifacts(specification).await {
                Ok(artifacts) => artifacts,
                Err(e) => {
                    return Err(self.fail_pass(
                        GenerationPhase::Generating,
                        OrchestratorError::Backend {
                            phase: GenerationPhase::Generating,
                            source: e,
                        },
                    ))
                }
            };
        self.listeners.notify(&GenerationEvent::AgentComplete {
            agent: BackendKind::Codegen,
        });
        self.push_history(
            EntryKind::AgentEvent,
            format!("generated {} artifacts", generated.len()),
        );

        self.set_phase(GenerationPhase::Registering, 80, "Registering artifacts")?;
        // a pass never mixes artifacts from two different requests
        self.registry.clear();
        for (id, artifact) in &generated {
            self.registry
                .register(id.clone(), artifact.code.clone(), artifact.metadata.clone());
        }

        Ok(self.registry.get_all())
    }

    /// Record a terminal failure for this pass and hand the error back
    fn fail_pass(
        &self,
        phase: GenerationPhase,
        error: OrchestratorError,
    ) -> OrchestratorError {
        let message = error.to_string();
        tracing::error!(%phase, %message, "generation pass failed");
        {
            let mut session = self.session.write();
            session.phase = GenerationPhase::Error;
            session.message = message.clone();
            session.push_entry(
                ConversationEntry::new(EntryKind::Failure, message.clone()),
                self.config.max_history_entries,
            );
        }
        self.listeners.notify(&GenerationEvent::PhaseChange {
            phase: GenerationPhase::Error,
            progress: 0,
            message: message.clone(),
        });
        self.listeners
            .notify(&GenerationEvent::Error { phase, message });
        error
    }

    fn set_phase(
        &self,
        phase: GenerationPhase,
        progress: u8,
        message: &str,
    ) -> Result<(), OrchestratorError> {
        {
            let mut session = self.session.write();
            validate_transition(session.phase, phase)?;
            session.phase = phase;
            session.progress = progress;
            session.message = message.to_string();
        }
        tracing::debug!(%phase, progress, "phase change");
        self.listeners.notify(&GenerationEvent::PhaseChange {
            phase,
            progress,
            message: message.to_string(),
        });
        Ok(())
    }

    fn push_history(&self, kind: EntryKind, text: impl Into<String>) {
        self.session
            .write()
            .push_entry(ConversationEntry::new(kind, text), self.config.max_history_entries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, FeedbackAnalysis, RequestAnalysis};
    use async_trait::async_trait;

    /// Backend that fails every call
    struct DownBackend;

    #[async_trait]
    impl NluBackend for DownBackend {
        async fn analyze_request(
            &self,
            _text: &str,
            _context: &RequestContext,
        ) -> Result<RequestAnalysis, BackendError> {
            Err(BackendError::Unavailable("nlu offline".to_string()))
        }

        async fn analyze_feedback(
            &self,
            _feedback: &str,
            _specification: &UiSpecification,
            _context: &RequestContext,
        ) -> Result<FeedbackAnalysis, BackendError> {
            Err(BackendError::Unavailable("nlu offline".to_string()))
        }
    }

    #[async_trait]
    impl CodegenBackend for DownBackend {
        async fn generate_artifacts(
            &self,
            _specification: &UiSpecification,
        ) -> Result<GeneratedArtifacts, BackendError> {
            Err(BackendError::Unavailable("codegen offline".to_string()))
        }
    }

    fn down_orchestrator() -> GenerationOrchestrator {
        GenerationOrchestrator::new(
            Arc::new(DownBackend),
            Arc::new(DownBackend),
            ArtifactRegistry::new(),
            OrchestratorConfig::new(),
        )
    }

    #[test]
    fn new_orchestrator_is_idle() {
        let orchestrator = down_orchestrator();
        let status = orchestrator.status();
        assert_eq!(status.phase, GenerationPhase::Idle);
        assert_eq!(status.progress, 0);
        assert!(status.backend_session.is_none());
    }

    #[test]
    fn status_serializes_for_presentation() {
        let orchestrator = down_orchestrator();
        let json = serde_json::to_value(orchestrator.status()).unwrap();
        assert_eq!(json["phase"], serde_json::json!("idle"));
        assert_eq!(json["progress"], serde_json::json!(0));
        assert!(json["session_id"].is_string());
    }

    #[test]
    fn config_defaults() {
        let config = OrchestratorConfig::new();
        assert!(config.validate_specifications);
        assert_eq!(config.max_history_entries, 256);
    }

    #[tokio::test]
    async fn nlu_failure_lands_in_error_phase() {
        let orchestrator = down_orchestrator();
        let err = orchestrator
            .process_request("Show vitals trend", &RequestContext::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrchestratorError::Backend {
                phase: GenerationPhase::Analyzing,
                ..
            }
        ));
        assert_eq!(orchestrator.status().phase, GenerationPhase::Error);
        assert!(orchestrator
            .conversation_history()
            .iter()
            .any(|e| e.kind == EntryKind::Failure));
    }

    #[tokio::test]
    async fn failed_pass_can_be_retried_by_caller() {
        let orchestrator = down_orchestrator();
        let _ = orchestrator
            .process_request("first", &RequestContext::new())
            .await;
        // the error phase is terminal for the pass, not the orchestrator
        let err = orchestrator
            .process_request("second", &RequestContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Backend { .. }));
    }
}

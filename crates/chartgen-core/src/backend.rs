//! Backend collaborator contracts
//!
//! The NLU and codegen backends are opaque services behind trait seams,
//! resolved once at orchestrator construction. Implementations convert
//! every transport failure into a [`BackendError`]; the orchestrator never
//! sees a panic from these seams.

use async_trait::async_trait;
use chartgen_spec::{FeedbackChange, UiSpecification};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

/// Which backend a lifecycle event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Natural-language understanding backend
    Nlu,
    /// Artifact generation backend
    Codegen,
}

impl Display for BackendKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Nlu => "nlu",
            Self::Codegen => "codegen",
        })
    }
}

/// Errors returned by backend collaborators
#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    /// Backend could not be reached
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Backend rejected the request
    #[error("backend rejected request: {0}")]
    Rejected(String),

    /// Backend response could not be interpreted
    #[error("malformed backend response: {0}")]
    Malformed(String),
}

/// Caller-provided context forwarded to the NLU backend
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Scope identifiers (e.g. the patient in view)
    pub scope_ids: BTreeMap<String, String>,
    /// Free-form hints for the backend
    pub hints: Vec<String>,
}

impl RequestContext {
    /// Create empty context
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a scope id
    #[inline]
    #[must_use]
    pub fn with_scope(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.scope_ids.insert(key.into(), value.into());
        self
    }

    /// With a hint
    #[inline]
    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }
}

/// Result of analyzing a free-text request
#[derive(Debug, Clone)]
pub struct RequestAnalysis {
    /// Specification derived from the request
    pub specification: UiSpecification,
    /// Backend conversation id, retained for refinement correlation
    pub session_id: Option<String>,
    /// Backend reasoning, if it provides one
    pub reasoning: Option<String>,
}

/// Result of analyzing free-text feedback against a specification
#[derive(Debug, Clone, Default)]
pub struct FeedbackAnalysis {
    /// Structural changes to apply; empty means nothing to do
    pub changes: Vec<FeedbackChange>,
    /// Backend reasoning, if it provides one
    pub reasoning: Option<String>,
}

/// One generated artifact
#[derive(Debug, Clone)]
pub struct GeneratedArtifact {
    /// Generated payload (code or opaque output)
    pub code: String,
    /// Metadata attached by the backend
    pub metadata: Value,
}

impl GeneratedArtifact {
    /// Create artifact with null metadata
    #[inline]
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            metadata: Value::Null,
        }
    }

    /// With metadata
    #[inline]
    #[must_use]
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Generated artifacts keyed by id, in generation order
pub type GeneratedArtifacts = IndexMap<String, GeneratedArtifact>;

/// Natural-language understanding backend contract
#[async_trait]
pub trait NluBackend: Send + Sync {
    /// Turn a free-text request into a specification
    ///
    /// # Errors
    /// Returns [`BackendError`] on transport failure or malformed output.
    async fn analyze_request(
        &self,
        text: &str,
        context: &RequestContext,
    ) -> Result<RequestAnalysis, BackendError>;

    /// Turn free-text feedback into structural changes
    ///
    /// # Errors
    /// Returns [`BackendError`] on transport failure or malformed output.
    async fn analyze_feedback(
        &self,
        feedback: &str,
        specification: &UiSpecification,
        context: &RequestContext,
    ) -> Result<FeedbackAnalysis, BackendError>;
}

/// Artifact generation backend contract
#[async_trait]
pub trait CodegenBackend: Send + Sync {
    /// Produce artifacts for a specification
    ///
    /// # Errors
    /// Returns [`BackendError`] on transport failure or malformed output.
    async fn generate_artifacts(
        &self,
        specification: &UiSpecification,
    ) -> Result<GeneratedArtifacts, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_kind_display() {
        assert_eq!(BackendKind::Nlu.to_string(), "nlu");
        assert_eq!(BackendKind::Codegen.to_string(), "codegen");
    }

    #[test]
    fn request_context_builder() {
        let ctx = RequestContext::new()
            .with_scope("patientId", "p1")
            .with_hint("prefer charts");
        assert_eq!(ctx.scope_ids.get("patientId").map(String::as_str), Some("p1"));
        assert_eq!(ctx.hints.len(), 1);
    }
}

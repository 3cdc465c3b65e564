//! # chartgen-core
//!
//! Generation orchestrator for natural-language dashboard requests.
//!
//! A [`GenerationOrchestrator`] drives one request at a time through a
//! phase state machine: the NLU backend turns free text into a
//! [`UiSpecification`](chartgen_spec::UiSpecification), the codegen
//! backend turns the specification into artifacts, and the artifacts land
//! in an injected [`ArtifactRegistry`](chartgen_registry::ArtifactRegistry).
//! Feedback re-enters the loop through [`GenerationOrchestrator::refine_specification`],
//! which skips regeneration entirely when the feedback changes nothing.
//!
//! Backends are trait seams ([`NluBackend`], [`CodegenBackend`]) resolved
//! once at construction; subscribers observe progress through
//! [`GenerationEvent`]s.
//!
//! ## Example
//!
//! ```no_run
//! use chartgen_core::{
//!     GenerationOrchestrator, OrchestratorConfig, RequestContext,
//! };
//! use chartgen_registry::ArtifactRegistry;
//! use std::sync::Arc;
//!
//! # async fn run(
//! #     nlu: Arc<dyn chartgen_core::NluBackend>,
//! #     codegen: Arc<dyn chartgen_core::CodegenBackend>,
//! # ) -> Result<(), chartgen_core::OrchestratorError> {
//! let orchestrator = GenerationOrchestrator::new(
//!     nlu,
//!     codegen,
//!     ArtifactRegistry::new(),
//!     OrchestratorConfig::new(),
//! );
//!
//! let context = RequestContext::new().with_scope("patientId", "p-1");
//! let outcome = orchestrator
//!     .process_request("Show a vitals trend for the last week", &context)
//!     .await?;
//! println!("{} artifacts", outcome.artifacts.len());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod backend;
pub mod error;
pub mod event;
pub mod orchestrator;
pub mod phase;
pub mod session;

pub use backend::{
    BackendError, BackendKind, CodegenBackend, FeedbackAnalysis, GeneratedArtifact,
    GeneratedArtifacts, NluBackend, RequestAnalysis, RequestContext,
};
pub use error::OrchestratorError;
pub use event::{GenerationEvent, ListenerHandle, ListenerId};
pub use orchestrator::{
    GenerationOrchestrator, GenerationOutcome, OrchestratorConfig, OrchestratorStatus,
    RefinementOutcome,
};
pub use phase::{allowed_transitions, validate_transition, GenerationPhase, TransitionError};
pub use session::{ConversationEntry, EntryKind, GenerationSession, SessionId};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

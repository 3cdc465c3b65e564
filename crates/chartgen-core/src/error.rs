//! Error types for the generation orchestrator
//!
//! Every backend and validation failure is caught at the boundary and
//! carried back as a typed value with the phase that failed; nothing in
//! this crate panics past a public operation.

use crate::backend::BackendError;
use crate::phase::{GenerationPhase, TransitionError};
use chartgen_spec::{SpecError, ValidationError};

/// Main orchestrator error type
#[derive(Debug, Clone, thiserror::Error)]
pub enum OrchestratorError {
    /// Another pass holds the single-flight guard
    #[error("another generation pass is in progress")]
    Busy,

    /// A backend call failed during the named phase
    #[error("{phase} failed: {source}")]
    Backend {
        /// Phase that failed
        phase: GenerationPhase,
        /// Underlying backend error
        source: BackendError,
    },

    /// The returned specification failed structural validation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A feedback change could not be applied
    #[error("feedback application failed: {0}")]
    Feedback(#[from] SpecError),

    /// Internal phase bookkeeping attempted an illegal step
    #[error(transparent)]
    Phase(#[from] TransitionError),
}

impl OrchestratorError {
    /// Phase during which the pass failed, if the error names one
    #[inline]
    #[must_use]
    pub fn failing_phase(&self) -> Option<GenerationPhase> {
        match self {
            Self::Backend { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// Whether the caller may retry immediately
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Busy | Self::Backend { source: BackendError::Unavailable(_), .. }
        )
    }
}

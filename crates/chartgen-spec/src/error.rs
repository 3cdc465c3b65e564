//! Error types for specification handling
//!
//! Covers feedback application failures and structural validation.

/// Errors raised while applying feedback changes to a specification
#[derive(Debug, Clone, thiserror::Error)]
pub enum SpecError {
    /// Change targets a node that does not exist
    #[error("target node not found: {0}")]
    TargetNotFound(String),

    /// Change payload could not be interpreted as a component node
    #[error("invalid node payload for '{target}': {reason}")]
    InvalidNodePayload {
        /// Target id of the offending change
        target: String,
        /// Why the payload was rejected
        reason: String,
    },

    /// Change payload must be a JSON object when no property is named
    #[error("expected object payload for '{0}'")]
    ExpectedObjectPayload(String),
}

/// Structural validation failure with enumerated reasons
///
/// A specification that fails validation is rejected whole; no part of it
/// is consumed by downstream phases.
#[derive(Debug, Clone, thiserror::Error)]
#[error("specification validation failed: {}", reasons.join("; "))]
pub struct ValidationError {
    /// Every rule the specification violated
    pub reasons: Vec<String>,
}

impl ValidationError {
    /// Create from collected reasons
    #[inline]
    #[must_use]
    pub fn new(reasons: Vec<String>) -> Self {
        Self { reasons }
    }
}

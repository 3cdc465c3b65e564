//! Generation phase state machine
//!
//! Phases advance monotonically within one pass
//! (analyzing → generating → registering → complete) with one sanctioned
//! re-entry: refinement, which leaves `complete` and returns either through
//! `generating` or directly back to `complete`. Any stage failure forces
//! the `error` phase, terminal for that pass; a new pass may start from it.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Externally observable stage of the generation state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationPhase {
    /// No pass has run yet
    Idle,
    /// NLU backend is interpreting the request
    Analyzing,
    /// Codegen backend is producing artifacts
    Generating,
    /// Artifacts are being written into the registry
    Registering,
    /// Feedback is being analyzed against an existing specification
    Refining,
    /// Pass finished successfully
    Complete,
    /// Pass failed; terminal for that pass
    Error,
}

impl GenerationPhase {
    /// Lowercase phase name, as reported in status and events
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Analyzing => "analyzing",
            Self::Generating => "generating",
            Self::Registering => "registering",
            Self::Refining => "refining",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }

    /// Whether a new pass may start from this phase
    #[inline]
    #[must_use]
    pub fn is_restartable(&self) -> bool {
        matches!(self, Self::Idle | Self::Complete | Self::Error)
    }
}

impl Display for GenerationPhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attempted phase transition outside the allowed set
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("illegal phase transition: {from} -> {to}")]
pub struct TransitionError {
    /// Phase the machine was in
    pub from: GenerationPhase,
    /// Phase that was requested
    pub to: GenerationPhase,
}

/// Phases reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: GenerationPhase) -> Vec<GenerationPhase> {
    use GenerationPhase::{
        Analyzing, Complete, Error, Generating, Idle, Refining, Registering,
    };
    match from {
        Idle => vec![Analyzing, Refining],
        Analyzing => vec![Generating, Error],
        Generating => vec![Registering, Error],
        Registering => vec![Complete, Error],
        Refining => vec![Generating, Complete, Error],
        Complete => vec![Analyzing, Refining],
        Error => vec![Analyzing, Refining],
    }
}

/// Validate a phase transition
///
/// # Errors
/// Returns [`TransitionError`] when the step is outside the allowed set.
pub fn validate_transition(
    from: GenerationPhase,
    to: GenerationPhase,
) -> Result<(), TransitionError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(TransitionError { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_is_allowed() {
        use GenerationPhase::{Analyzing, Complete, Generating, Idle, Registering};
        for (from, to) in [
            (Idle, Analyzing),
            (Analyzing, Generating),
            (Generating, Registering),
            (Registering, Complete),
        ] {
            assert!(validate_transition(from, to).is_ok());
        }
    }

    #[test]
    fn refinement_reentry_is_allowed() {
        use GenerationPhase::{Complete, Generating, Refining};
        assert!(validate_transition(Complete, Refining).is_ok());
        assert!(validate_transition(Refining, Generating).is_ok());
        assert!(validate_transition(Refining, Complete).is_ok());
    }

    #[test]
    fn every_working_phase_can_fail() {
        use GenerationPhase::{Analyzing, Error, Generating, Refining, Registering};
        for from in [Analyzing, Generating, Registering, Refining] {
            assert!(validate_transition(from, Error).is_ok());
        }
    }

    #[test]
    fn backward_steps_are_rejected() {
        use GenerationPhase::{Analyzing, Complete, Generating, Registering};
        assert!(validate_transition(Generating, Analyzing).is_err());
        assert!(validate_transition(Complete, Registering).is_err());
        assert!(validate_transition(Registering, Generating).is_err());
    }

    #[test]
    fn error_is_terminal_for_the_pass_but_restartable() {
        use GenerationPhase::{Analyzing, Complete, Error};
        assert!(validate_transition(Error, Complete).is_err());
        assert!(validate_transition(Error, Analyzing).is_ok());
        assert!(Error.is_restartable());
    }

    #[test]
    fn phase_names_are_lowercase() {
        assert_eq!(GenerationPhase::Analyzing.to_string(), "analyzing");
        assert_eq!(GenerationPhase::Error.as_str(), "error");
    }

    #[test]
    fn phase_serializes_as_its_name() {
        let json = serde_json::to_value(GenerationPhase::Registering).unwrap();
        assert_eq!(json, serde_json::json!("registering"));
        let phase: GenerationPhase = serde_json::from_value(json).unwrap();
        assert_eq!(phase, GenerationPhase::Registering);
    }
}

//! Generation session state
//!
//! One session tracks the orchestrator's externally observable state: the
//! current phase, progress, the active specification, and an append-only
//! conversation history of user requests, agent events, and failures.

use crate::phase::GenerationPhase;
use chartgen_spec::UiSpecification;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique session identifier (ULID for sortability)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SessionId(pub Ulid);

impl SessionId {
    /// Generate new session ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of conversation history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Free-text request or feedback from the user
    UserRequest,
    /// Progress note from the orchestration itself
    AgentEvent,
    /// A pass failure
    Failure,
}

/// One conversation history entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationEntry {
    /// Entry kind
    pub kind: EntryKind,
    /// Entry text
    pub text: String,
    /// When the entry was appended
    pub at: DateTime<Utc>,
}

impl ConversationEntry {
    /// Create entry stamped now
    #[inline]
    #[must_use]
    pub fn new(kind: EntryKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            at: Utc::now(),
        }
    }
}

/// Orchestrator session state
#[derive(Debug, Clone)]
pub struct GenerationSession {
    /// Session identifier
    pub id: SessionId,
    /// Current phase
    pub phase: GenerationPhase,
    /// Overall progress, 0–100
    pub progress: u8,
    /// Human-readable status line
    pub message: String,
    /// Backend conversation id from the NLU collaborator
    pub backend_session: Option<String>,
    /// Specification produced by the most recent pass
    pub specification: Option<UiSpecification>,
    /// Append-only conversation history, oldest first
    pub conversation_history: Vec<ConversationEntry>,
}

impl GenerationSession {
    /// Create idle session
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: SessionId::new(),
            phase: GenerationPhase::Idle,
            progress: 0,
            message: "idle".to_string(),
            backend_session: None,
            specification: None,
            conversation_history: Vec::new(),
        }
    }

    /// Append an entry, trimming the oldest past `max_entries`
    pub fn push_entry(&mut self, entry: ConversationEntry, max_entries: usize) {
        self.conversation_history.push(entry);
        if self.conversation_history.len() > max_entries {
            let excess = self.conversation_history.len() - max_entries;
            self.conversation_history.drain(..excess);
        }
    }
}

impl Default for GenerationSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn new_session_is_idle() {
        let session = GenerationSession::new();
        assert_eq!(session.phase, GenerationPhase::Idle);
        assert_eq!(session.progress, 0);
        assert!(session.conversation_history.is_empty());
    }

    #[test]
    fn history_trims_oldest_past_cap() {
        let mut session = GenerationSession::new();
        for i in 0..5 {
            session.push_entry(
                ConversationEntry::new(EntryKind::UserRequest, format!("request {i}")),
                3,
            );
        }
        assert_eq!(session.conversation_history.len(), 3);
        assert_eq!(session.conversation_history[0].text, "request 2");
    }
}

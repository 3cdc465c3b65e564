//! Artifact entries and lifecycle status

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Observable lifecycle status of an artifact
///
/// Derived from the entry's flags: an error dominates, then a compiled
/// form, then the loading flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    /// Registered, not yet compiled
    Registered,
    /// Compilation in progress
    Loading,
    /// Compiled form available
    Compiled,
    /// Last operation on the artifact failed
    Errored,
}

/// One tracked artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactEntry {
    /// Artifact identifier
    pub id: String,
    /// Generated payload (code or opaque output)
    pub code: String,
    /// Free-form metadata attached at registration
    pub metadata: Value,
    /// Whether a compile is in progress
    pub loading: bool,
    /// Last error, if any
    pub error: Option<String>,
    /// Compiled form, present only after a successful compile
    pub compiled: Option<Value>,
    /// When the artifact was (last) registered
    pub registered_at: DateTime<Utc>,
}

impl ArtifactEntry {
    /// Create a freshly registered entry
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, code: impl Into<String>, metadata: Value) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
            metadata,
            loading: false,
            error: None,
            compiled: None,
            registered_at: Utc::now(),
        }
    }

    /// Derived lifecycle status
    #[inline]
    #[must_use]
    pub fn status(&self) -> ArtifactStatus {
        if self.error.is_some() {
            ArtifactStatus::Errored
        } else if self.compiled.is_some() {
            ArtifactStatus::Compiled
        } else if self.loading {
            ArtifactStatus::Loading
        } else {
            ArtifactStatus::Registered
        }
    }
}

/// Registry counters for observability
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Tracked artifacts
    pub total: usize,
    /// Artifacts with a compile in progress
    pub loading: usize,
    /// Artifacts carrying an error
    pub errors: usize,
    /// Artifacts with a compiled form
    pub compiled: usize,
    /// Compiled artifacts not carrying an error; never negative
    pub ready: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fresh_entry_is_registered() {
        let entry = ArtifactEntry::new("c1", "export const C1 = ...", Value::Null);
        assert_eq!(entry.status(), ArtifactStatus::Registered);
    }

    #[test]
    fn error_dominates_compiled() {
        let mut entry = ArtifactEntry::new("c1", "code", Value::Null);
        entry.compiled = Some(json!({ "module": "c1" }));
        assert_eq!(entry.status(), ArtifactStatus::Compiled);

        entry.error = Some("boom".to_string());
        assert_eq!(entry.status(), ArtifactStatus::Errored);
    }

    #[test]
    fn loading_flag_reflected() {
        let mut entry = ArtifactEntry::new("c1", "code", Value::Null);
        entry.loading = true;
        assert_eq!(entry.status(), ArtifactStatus::Loading);
    }
}

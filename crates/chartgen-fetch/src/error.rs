//! Error types for data fetching
//!
//! Every failure crossing the cache boundary is a value, never a panic:
//! coalesced callers and multi-source aggregation both rely on cloneable,
//! structured errors.

/// Errors returned by the data source collaborator
#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceError {
    /// Source could not be reached
    #[error("source unreachable: {0}")]
    Unreachable(String),

    /// Source rejected the query
    #[error("query rejected: {0}")]
    Rejected(String),

    /// Source returned a response the adapter could not interpret
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Errors produced by the fetch cache
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// The underlying source call failed
    #[error("source failure for '{entity_type}': {message}")]
    Source {
        /// Entity type of the failing fetch
        entity_type: String,
        /// Collaborator error message
        message: String,
    },

    /// The transform pipeline rejected the records
    #[error("transform failed: {0}")]
    Transform(#[from] TransformError),

    /// The fetch task itself failed (panicked or was aborted)
    #[error("fetch task failed: {0}")]
    Internal(String),
}

/// Errors raised by the transform executor
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransformError {
    /// An array-shaped operation received a non-array value
    #[error("'{op}' expects an array of records")]
    ExpectedArray {
        /// Operation name
        op: &'static str,
    },

    /// An aggregate function other than count was declared without a field
    #[error("aggregate '{function}' requires a field")]
    MissingAggregateField {
        /// Aggregate function name
        function: &'static str,
    },

    /// A caller-supplied transform rejected the value
    #[error("custom transform failed: {0}")]
    Custom(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_display() {
        let err = FetchError::Source {
            entity_type: "Observation".to_string(),
            message: "timeout".to_string(),
        };
        assert!(err.to_string().contains("Observation"));
    }

    #[test]
    fn transform_error_converts() {
        let err: FetchError = TransformError::ExpectedArray { op: "filter" }.into();
        assert!(matches!(err, FetchError::Transform(_)));
    }
}

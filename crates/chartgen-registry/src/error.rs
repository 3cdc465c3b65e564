//! Error types for the artifact registry

/// Errors raised by registry status transitions
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    /// No artifact with the given id
    #[error("artifact not found: {0}")]
    NotFound(String),

    /// Compile recorded without a compile in progress
    #[error("artifact '{0}' is not loading; compiled requires loading first")]
    NotLoading(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_error_display() {
        let err = RegistryError::NotFound("c9".to_string());
        assert!(err.to_string().contains("c9"));
    }
}

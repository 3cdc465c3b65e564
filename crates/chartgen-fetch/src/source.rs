//! Data source collaborator
//!
//! The transport client performing actual network calls lives outside this
//! core; it is injected at construction behind the [`DataSource`] trait.

use crate::error::SourceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Domain data source contract
///
/// Implementations must convert every transport-level failure into a
/// [`SourceError`]; the cache never sees a panic from this seam.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Search for records of one entity type
    ///
    /// # Errors
    /// Returns [`SourceError`] when the source is unreachable, rejects the
    /// query, or responds with something the adapter cannot interpret.
    async fn search(
        &self,
        entity_type: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<SearchResponse, SourceError>;
}

/// Response shape from the domain data source
///
/// Sources reply either with a bundle (`{"entries": [...]}`) or a bare
/// record array; both normalize to a record list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SearchResponse {
    /// Bundle envelope with an `entries` list
    Bundle {
        /// Raw records
        entries: Vec<Value>,
    },
    /// Bare record array
    Records(Vec<Value>),
}

impl SearchResponse {
    /// Normalize to the raw record list
    #[inline]
    #[must_use]
    pub fn into_records(self) -> Vec<Value> {
        match self {
            Self::Bundle { entries } => entries,
            Self::Records(records) => records,
        }
    }

    /// Number of records in the response
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Bundle { entries } => entries.len(),
            Self::Records(records) => records.len(),
        }
    }

    /// Whether the response holds no records
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bundle_shape_deserializes() {
        let response: SearchResponse =
            serde_json::from_value(json!({ "entries": [{ "id": "o1" }] })).unwrap();
        assert_eq!(response.len(), 1);
        assert_eq!(response.into_records()[0]["id"], json!("o1"));
    }

    #[test]
    fn bare_array_shape_deserializes() {
        let response: SearchResponse =
            serde_json::from_value(json!([{ "id": "o1" }, { "id": "o2" }])).unwrap();
        assert_eq!(response.into_records().len(), 2);
    }
}

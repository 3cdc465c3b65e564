//! Multi-source aggregation
//!
//! Fans out over every declared data source in parallel and records each
//! outcome independently. One failing source never blanks a composed view:
//! the aggregate itself always succeeds, with failures visible per source.

use crate::cache::{FetchCache, FetchResult};
use crate::fingerprint::FetchContext;
use chartgen_spec::DataSourceSpec;
use futures::future::join_all;
use std::collections::HashMap;

/// Per-source outcomes of one aggregation pass
///
/// There is no top-level failure mode; inspect individual sources.
#[derive(Debug, Clone, Default)]
pub struct AggregateResult {
    /// Outcome per source id
    pub sources: HashMap<String, FetchResult>,
}

impl AggregateResult {
    /// Outcome for one source id
    #[inline]
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&FetchResult> {
        self.sources.get(id)
    }

    /// Ids of sources that resolved successfully
    #[must_use]
    pub fn succeeded_ids(&self) -> Vec<&str> {
        self.sources
            .iter()
            .filter(|(_, r)| r.is_ok())
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Ids of sources that failed
    #[must_use]
    pub fn failed_ids(&self) -> Vec<&str> {
        self.sources
            .iter()
            .filter(|(_, r)| r.is_err())
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Whether every source resolved successfully
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.sources.values().all(Result::is_ok)
    }
}

impl FetchCache {
    /// Materialize every source in parallel with per-source failure isolation
    pub async fn aggregate_data(
        &self,
        sources: &[DataSourceSpec],
        context: &FetchContext,
    ) -> AggregateResult {
        let fetches = sources.iter().map(|spec| async move {
            let result = self.fetch_data(spec, context).await;
            if let Err(e) = &result {
                tracing::warn!(source = %spec.id, error = %e, "source failed during aggregation");
            }
            (spec.id.clone(), result)
        });

        AggregateResult {
            sources: join_all(fetches).await.into_iter().collect(),
        }
    }
}

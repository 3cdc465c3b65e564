//! Deduplicating fetch cache
//!
//! Two tables, owned exclusively by this component:
//! - `entries`: fingerprint → cached payload with TTL, expired lazily on
//!   lookup
//! - `pending`: fingerprint → in-flight shared future, guaranteeing at most
//!   one underlying source call per key at any instant (request coalescing)
//!
//! Fetches run on spawned tasks, so a caller that drops its future still
//! lets the fetch complete and populate the cache. The pending slot is
//! released on success and failure alike; no key is ever permanently stuck
//! in flight.

use crate::error::FetchError;
use crate::fingerprint::{CacheKey, FetchContext};
use crate::source::DataSource;
use crate::transform;
use chartgen_spec::DataSourceSpec;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Result of one fetch; cloneable so coalesced callers share it
pub type FetchResult = Result<FetchSuccess, FetchError>;

/// Successful fetch payload
#[derive(Debug, Clone)]
pub struct FetchSuccess {
    /// Transformed payload (shared, not copied, across coalesced callers)
    pub data: Arc<Value>,
    /// Fetch provenance
    pub metadata: FetchMetadata,
}

/// Provenance for a fetch result
#[derive(Debug, Clone)]
pub struct FetchMetadata {
    /// Entity type that was fetched
    pub entity_type: String,
    /// Raw record count before transforms
    pub record_count: usize,
    /// When the underlying source call resolved
    pub fetched_at: DateTime<Utc>,
    /// Whether this result was served from a live cache entry
    pub from_cache: bool,
}

/// Fetch cache configuration
#[derive(Debug, Clone, Copy)]
pub struct FetchCacheConfig {
    /// TTL applied when a source declares no override
    pub default_ttl: Duration,
}

impl FetchCacheConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With default TTL
    #[inline]
    #[must_use]
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }
}

impl Default for FetchCacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(300),
        }
    }
}

/// Cache observability snapshot
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Live entries
    pub entries: usize,
    /// In-flight fetches
    pub pending: usize,
    /// Hex fingerprints of live entries
    pub keys: Vec<String>,
}

struct CacheEntry {
    payload: Arc<Value>,
    stored_at: Instant,
    ttl: Duration,
    entity_type: String,
    record_count: usize,
    fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.stored_at.elapsed() >= self.ttl
    }

    fn to_success(&self, from_cache: bool) -> FetchSuccess {
        FetchSuccess {
            data: Arc::clone(&self.payload),
            metadata: FetchMetadata {
                entity_type: self.entity_type.clone(),
                record_count: self.record_count,
                fetched_at: self.fetched_at,
                from_cache,
            },
        }
    }
}

type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

/// Deduplicating, coalescing fetch cache
///
/// Cheap to clone; clones share the same tables.
#[derive(Clone)]
pub struct FetchCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    source: Arc<dyn DataSource>,
    config: FetchCacheConfig,
    entries: DashMap<CacheKey, CacheEntry>,
    pending: Mutex<HashMap<CacheKey, SharedFetch>>,
}

impl FetchCache {
    /// Create new cache over a data source
    #[inline]
    #[must_use]
    pub fn new(source: Arc<dyn DataSource>, config: FetchCacheConfig) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                source,
                config,
                entries: DashMap::new(),
                pending: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Fetch one data source, deduplicated and cached
    ///
    /// Lookup order: live cache entry, then an in-flight fetch for the same
    /// fingerprint (awaited, not duplicated), then a fresh source call.
    /// Failures come back as values; this boundary never panics outward.
    pub async fn fetch_data(&self, spec: &DataSourceSpec, context: &FetchContext) -> FetchResult {
        let key = CacheKey::fingerprint(&spec.entity_type, &spec.query, context);

        if let Some(entry) = self.inner.entries.get(&key) {
            if !entry.is_expired() {
                tracing::debug!(key = %key.short(), entity_type = %spec.entity_type, "cache hit");
                return Ok(entry.to_success(true));
            }
        }
        // expired entries are evicted on access, not proactively swept
        self.inner.entries.remove_if(&key, |_, entry| entry.is_expired());

        let shared = {
            let mut pending = self.inner.pending.lock();
            if let Some(in_flight) = pending.get(&key) {
                tracing::debug!(key = %key.short(), "coalescing onto in-flight fetch");
                in_flight.clone()
            } else {
                let fut = spawn_fetch(Arc::clone(&self.inner), key, spec.clone());
                pending.insert(key, fut.clone());
                fut
            }
        };

        shared.await
    }

    /// Empty both tables
    pub fn clear(&self) {
        self.inner.entries.clear();
        self.inner.pending.lock().clear();
    }

    /// Explicit sweep of expired entries
    ///
    /// Returns the number of entries evicted. Callable periodically by the
    /// owner; lazy per-access eviction does not depend on it.
    pub fn clear_expired(&self) -> usize {
        let before = self.inner.entries.len();
        self.inner.entries.retain(|_, entry| !entry.is_expired());
        before - self.inner.entries.len()
    }

    /// Observability snapshot
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.inner.entries.len(),
            pending: self.inner.pending.lock().len(),
            keys: self
                .inner
                .entries
                .iter()
                .map(|entry| entry.key().to_string())
                .collect(),
        }
    }
}

/// Spawn the underlying fetch and wrap it for coalesced sharing
///
/// The task releases the pending slot before its result becomes visible to
/// awaiters, so a completed key can never be re-observed as in-flight.
fn spawn_fetch(inner: Arc<CacheInner>, key: CacheKey, spec: DataSourceSpec) -> SharedFetch {
    let handle = tokio::spawn(async move {
        let result = perform_fetch(&inner, key, &spec).await;
        inner.pending.lock().remove(&key);
        result
    });

    handle
        .map(|joined| match joined {
            Ok(result) => result,
            Err(e) => Err(FetchError::Internal(e.to_string())),
        })
        .boxed()
        .shared()
}

async fn perform_fetch(inner: &CacheInner, key: CacheKey, spec: &DataSourceSpec) -> FetchResult {
    tracing::debug!(key = %key.short(), entity_type = %spec.entity_type, "fetching from source");

    let response = inner
        .source
        .search(&spec.entity_type, &spec.query)
        .await
        .map_err(|e| FetchError::Source {
            entity_type: spec.entity_type.clone(),
            message: e.to_string(),
        })?;

    let records = response.into_records();
    let record_count = records.len();

    let data = match &spec.transform {
        Some(pipeline) => transform::apply_pipeline(pipeline, records)?,
        None => Value::Array(records),
    };

    let payload = Arc::new(data);
    let fetched_at = Utc::now();
    let ttl = spec.ttl_override.unwrap_or(inner.config.default_ttl);

    inner.entries.insert(
        key,
        CacheEntry {
            payload: Arc::clone(&payload),
            stored_at: Instant::now(),
            ttl,
            entity_type: spec.entity_type.clone(),
            record_count,
            fetched_at,
        },
    );

    Ok(FetchSuccess {
        data: payload,
        metadata: FetchMetadata {
            entity_type: spec.entity_type.clone(),
            record_count,
            fetched_at,
            from_cache: false,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::source::SearchResponse;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        delay: Duration,
        fail: bool,
    }

    impl CountingSource {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay: Duration::from_millis(0),
                fail: false,
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn failing(mut self) -> Self {
            self.fail = true;
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DataSource for CountingSource {
        async fn search(
            &self,
            entity_type: &str,
            _params: &BTreeMap<String, String>,
        ) -> Result<SearchResponse, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(SourceError::Unreachable("connection refused".to_string()));
            }
            Ok(SearchResponse::Records(vec![
                json!({ "id": format!("{entity_type}-1"), "value": 72 }),
            ]))
        }
    }

    fn cache_over(source: Arc<CountingSource>, ttl: Duration) -> FetchCache {
        FetchCache::new(source, FetchCacheConfig::new().with_default_ttl(ttl))
    }

    fn vitals_spec() -> DataSourceSpec {
        DataSourceSpec::new("obs-vitals", "Observation").with_param("category", "vital-signs")
    }

    fn patient_ctx() -> FetchContext {
        FetchContext::new().with_scope("patientId", "p1")
    }

    #[tokio::test]
    async fn second_call_within_ttl_hits_cache() {
        let source = Arc::new(CountingSource::new());
        let cache = cache_over(Arc::clone(&source), Duration::from_secs(300));

        let first = cache.fetch_data(&vitals_spec(), &patient_ctx()).await.unwrap();
        let second = cache.fetch_data(&vitals_spec(), &patient_ctx()).await.unwrap();

        assert_eq!(source.calls(), 1);
        assert!(!first.metadata.from_cache);
        assert!(second.metadata.from_cache);
        assert!(Arc::ptr_eq(&first.data, &second.data));
    }

    #[tokio::test]
    async fn expired_entry_triggers_refetch() {
        let source = Arc::new(CountingSource::new());
        let cache = cache_over(Arc::clone(&source), Duration::from_millis(20));

        cache.fetch_data(&vitals_spec(), &patient_ctx()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        let second = cache.fetch_data(&vitals_spec(), &patient_ctx()).await.unwrap();

        assert_eq!(source.calls(), 2);
        assert!(!second.metadata.from_cache);
    }

    #[tokio::test]
    async fn concurrent_fetches_coalesce_to_one_call() {
        let source = Arc::new(CountingSource::new().with_delay(Duration::from_millis(30)));
        let cache = cache_over(Arc::clone(&source), Duration::from_secs(300));

        let spec = vitals_spec();
        let ctx = patient_ctx();
        let futures: Vec<_> = (0..8).map(|_| cache.fetch_data(&spec, &ctx)).collect();
        let results = futures::future::join_all(futures).await;

        assert_eq!(source.calls(), 1);
        let first = results[0].as_ref().unwrap();
        for result in &results {
            let success = result.as_ref().unwrap();
            assert!(Arc::ptr_eq(&first.data, &success.data));
        }
        assert_eq!(cache.stats().pending, 0);
    }

    #[tokio::test]
    async fn failure_is_returned_as_value_and_releases_pending() {
        let source = Arc::new(CountingSource::new().failing());
        let cache = cache_over(Arc::clone(&source), Duration::from_secs(300));

        let result = cache.fetch_data(&vitals_spec(), &patient_ctx()).await;
        assert!(matches!(result, Err(FetchError::Source { .. })));
        assert_eq!(cache.stats().pending, 0);

        // failures are not cached; the next call retries the source
        let _ = cache.fetch_data(&vitals_spec(), &patient_ctx()).await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn different_scopes_do_not_share_entries() {
        let source = Arc::new(CountingSource::new());
        let cache = cache_over(Arc::clone(&source), Duration::from_secs(300));

        let spec = vitals_spec();
        cache
            .fetch_data(&spec, &FetchContext::new().with_scope("patientId", "p1"))
            .await
            .unwrap();
        cache
            .fetch_data(&spec, &FetchContext::new().with_scope("patientId", "p2"))
            .await
            .unwrap();

        assert_eq!(source.calls(), 2);
        assert_eq!(cache.stats().entries, 2);
    }

    #[tokio::test]
    async fn abandoned_caller_still_populates_cache() {
        let source = Arc::new(CountingSource::new().with_delay(Duration::from_millis(20)));
        let cache = cache_over(Arc::clone(&source), Duration::from_secs(300));

        let spec = vitals_spec();
        let ctx = patient_ctx();
        let caller = tokio::spawn({
            let cache = cache.clone();
            let spec = spec.clone();
            let ctx = ctx.clone();
            async move { cache.fetch_data(&spec, &ctx).await }
        });
        tokio::time::sleep(Duration::from_millis(5)).await;
        caller.abort();
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(cache.stats().entries, 1);
        let result = cache.fetch_data(&spec, &ctx).await.unwrap();
        assert!(result.metadata.from_cache);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn clear_and_sweep_maintenance() {
        let source = Arc::new(CountingSource::new());
        let cache = cache_over(Arc::clone(&source), Duration::from_millis(20));

        cache.fetch_data(&vitals_spec(), &patient_ctx()).await.unwrap();
        assert_eq!(cache.stats().entries, 1);
        assert_eq!(cache.stats().keys.len(), 1);

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.clear_expired(), 1);
        assert_eq!(cache.stats().entries, 0);

        cache.fetch_data(&vitals_spec(), &patient_ctx()).await.unwrap();
        cache.clear();
        assert_eq!(cache.stats().entries, 0);
    }

    #[tokio::test]
    async fn transform_error_surfaces_as_fetch_error() {
        use chartgen_spec::{AggregateFn, TransformOp, TransformPipeline};

        let source = Arc::new(CountingSource::new());
        let cache = cache_over(source, Duration::from_secs(300));

        let spec = vitals_spec().with_transform(TransformPipeline::new().then(
            TransformOp::Aggregate {
                function: AggregateFn::Sum,
                field: None,
            },
        ));

        let result = cache.fetch_data(&spec, &patient_ctx()).await;
        assert!(matches!(result, Err(FetchError::Transform(_))));
    }
}

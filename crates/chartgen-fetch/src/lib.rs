//! chartgen-fetch - Data Fetch Cache
//!
//! Deduplicates and caches fetches of domain-entity collections:
//! - Blake3 fingerprints over entity type, query, and scoping context
//! - Request coalescing (at most one in-flight fetch per fingerprint)
//! - Lazy TTL expiry with an optional explicit sweep
//! - Declarative transform pipelines applied before caching
//! - Multi-source aggregation with per-source failure isolation
//!
//! # Example
//!
//! ```rust,ignore
//! use chartgen_fetch::{FetchCache, FetchCacheConfig, FetchContext};
//! use chartgen_spec::DataSourceSpec;
//!
//! # async fn example(source: std::sync::Arc<dyn chartgen_fetch::DataSource>) {
//! let cache = FetchCache::new(source, FetchCacheConfig::new());
//! let spec = DataSourceSpec::new("obs-vitals", "Observation")
//!     .with_param("category", "vital-signs");
//! let ctx = FetchContext::new().with_scope("patientId", "p1");
//!
//! let result = cache.fetch_data(&spec, &ctx).await;
//! # let _ = result;
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod aggregate;
pub mod cache;
pub mod error;
pub mod fingerprint;
pub mod source;
pub mod transform;

// Re-exports for convenience
pub use aggregate::AggregateResult;
pub use cache::{CacheStats, FetchCache, FetchCacheConfig, FetchMetadata, FetchResult, FetchSuccess};
pub use error::{FetchError, SourceError, TransformError};
pub use fingerprint::{CacheKey, FetchContext};
pub use source::{DataSource, SearchResponse};
pub use transform::apply_pipeline;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

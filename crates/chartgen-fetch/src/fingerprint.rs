//! Cache key fingerprinting
//!
//! Provides [`CacheKey`], a strongly-typed 32-byte Blake3 fingerprint of an
//! entity type, its query parameters, and the scoping context. Two fetches
//! with the same fingerprint are the same fetch: the key drives both cache
//! lookup and request coalescing.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

/// Scoping context for a fetch (e.g. the patient or encounter in view)
///
/// Scope ids participate in the fingerprint so that identical queries for
/// different patients never share a cache entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchContext {
    /// Scope identifiers, ordered deterministically
    pub scope_ids: BTreeMap<String, String>,
}

impl FetchContext {
    /// Create empty context
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a scope id
    #[inline]
    #[must_use]
    pub fn with_scope(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.scope_ids.insert(key.into(), value.into());
        self
    }
}

/// A 32-byte fetch fingerprint (Blake3)
///
/// Immutable and cheap to clone (Copy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    /// Create key from raw bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get reference to the underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Compute the fingerprint for a fetch
    ///
    /// Encoding is canonical: both maps iterate in key order, and fields
    /// are length-delimited so adjacent values cannot collide.
    #[must_use]
    pub fn fingerprint(
        entity_type: &str,
        query: &BTreeMap<String, String>,
        context: &FetchContext,
    ) -> Self {
        let mut hasher = blake3::Hasher::new();
        hash_field(&mut hasher, entity_type);
        for (key, value) in query {
            hash_field(&mut hasher, key);
            hash_field(&mut hasher, value);
        }
        hasher.update(b"|scope|");
        for (key, value) in &context.scope_ids {
            hash_field(&mut hasher, key);
            hash_field(&mut hasher, value);
        }
        Self::new(*hasher.finalize().as_bytes())
    }

    /// Short string representation (first 16 hex chars)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

fn hash_field(hasher: &mut blake3::Hasher, field: &str) {
    hasher.update(&(field.len() as u64).to_le_bytes());
    hasher.update(field.as_bytes());
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

//! Data-source declarations
//!
//! A specification names the domain-entity collections its components bind
//! to. Each [`DataSourceSpec`] describes one fetch: an entity type, query
//! parameters, and an optional declarative transform pipeline applied to the
//! raw records before they are cached.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Declaration of one data-backed fetch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceSpec {
    /// Source id referenced by component bindings and aggregate results
    pub id: String,
    /// Domain entity type (e.g. "Observation", "Condition")
    pub entity_type: String,
    /// Query parameters, ordered deterministically for fingerprinting
    #[serde(default)]
    pub query: BTreeMap<String, String>,
    /// Transform pipeline applied to raw records, in declared order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<TransformPipeline>,
    /// Per-source TTL override for the fetch cache
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_override: Option<Duration>,
}

impl DataSourceSpec {
    /// Create new data-source declaration
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entity_type: entity_type.into(),
            query: BTreeMap::new(),
            transform: None,
            ttl_override: None,
        }
    }

    /// With a query parameter
    #[inline]
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// With a transform pipeline
    #[inline]
    #[must_use]
    pub fn with_transform(mut self, pipeline: TransformPipeline) -> Self {
        self.transform = Some(pipeline);
        self
    }

    /// With a TTL override
    #[inline]
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_override = Some(ttl);
        self
    }
}

/// Ordered list of transform operations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformPipeline {
    /// Operations, applied in declared order
    pub ops: Vec<TransformOp>,
}

impl TransformPipeline {
    /// Create empty pipeline
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operation
    #[inline]
    #[must_use]
    pub fn then(mut self, op: TransformOp) -> Self {
        self.ops.push(op);
        self
    }

    /// Whether the pipeline has no operations
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// One declarative transform operation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TransformOp {
    /// Project each record to a normalized shape: output field → dot-path
    Extract {
        /// Output field name mapped to a dot-path into the raw record
        fields: BTreeMap<String, String>,
    },
    /// Summarize records into a single value
    Aggregate {
        /// Summary function
        function: AggregateFn,
        /// Field the function reads (ignored by `Count`)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field: Option<String>,
    },
    /// Keep records matching every predicate (AND-combined)
    Filter {
        /// Predicate list
        predicates: Vec<FilterPredicate>,
    },
    /// Bucket records by a field value
    GroupBy {
        /// Grouping field (dot-path)
        field: String,
    },
    /// Order records by a field value
    Sort {
        /// Sort field (dot-path)
        field: String,
        /// Sort direction
        #[serde(default)]
        direction: SortDirection,
    },
    /// Truncate to the first `count` records
    Limit {
        /// Maximum number of records kept
        count: usize,
    },
    /// Caller-supplied escape hatch; not wire-representable
    #[serde(skip)]
    Custom(CustomTransform),
}

/// Summary functions for [`TransformOp::Aggregate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateFn {
    /// Number of records
    Count,
    /// Sum of a numeric field
    Sum,
    /// Mean of a numeric field
    Avg,
    /// Minimum of a numeric field
    Min,
    /// Maximum of a numeric field
    Max,
}

/// Sort order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Smallest first
    #[default]
    Ascending,
    /// Largest first
    Descending,
}

/// One filter predicate over a record field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterPredicate {
    /// Field to test (dot-path)
    pub field: String,
    /// Comparison operator
    pub op: FilterOp,
    /// Comparison operand (ignored by `Exists`/`NotExists`)
    #[serde(default)]
    pub value: Value,
}

impl FilterPredicate {
    /// Create new predicate
    #[inline]
    #[must_use]
    pub fn new(field: impl Into<String>, op: FilterOp, value: Value) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }
}

/// Filter comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    /// Field equals value
    Eq,
    /// Field does not equal value
    NotEq,
    /// String field contains substring (or array contains element)
    Contains,
    /// Numeric field strictly greater than value
    Gt,
    /// Numeric field greater than or equal to value
    Gte,
    /// Numeric field strictly less than value
    Lt,
    /// Numeric field less than or equal to value
    Lte,
    /// Field is one of the listed values
    In,
    /// Field is none of the listed values
    NotIn,
    /// Field is present and non-null
    Exists,
    /// Field is absent or null
    NotExists,
}

/// Caller-supplied transform function
///
/// Receives the pipeline's intermediate value and returns the replacement,
/// or a message describing why the records could not be transformed.
#[derive(Clone)]
pub struct CustomTransform(Arc<dyn Fn(Value) -> Result<Value, String> + Send + Sync>);

impl CustomTransform {
    /// Wrap a transform function
    #[inline]
    #[must_use]
    pub fn new(f: impl Fn(Value) -> Result<Value, String> + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Apply the function
    ///
    /// # Errors
    /// Propagates the function's message on failure.
    #[inline]
    pub fn apply(&self, value: Value) -> Result<Value, String> {
        (self.0)(value)
    }
}

impl fmt::Debug for CustomTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomTransform(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn source_builder() {
        let spec = DataSourceSpec::new("obs-vitals", "Observation")
            .with_param("category", "vital-signs")
            .with_ttl(Duration::from_secs(300));

        assert_eq!(spec.entity_type, "Observation");
        assert_eq!(spec.query.get("category").map(String::as_str), Some("vital-signs"));
        assert_eq!(spec.ttl_override, Some(Duration::from_secs(300)));
    }

    #[test]
    fn pipeline_preserves_declared_order() {
        let pipeline = TransformPipeline::new()
            .then(TransformOp::Sort {
                field: "effective".to_string(),
                direction: SortDirection::Descending,
            })
            .then(TransformOp::Limit { count: 10 });

        assert_eq!(pipeline.ops.len(), 2);
        assert!(matches!(pipeline.ops[0], TransformOp::Sort { .. }));
        assert!(matches!(pipeline.ops[1], TransformOp::Limit { .. }));
    }

    #[test]
    fn declarative_ops_roundtrip_through_json() {
        let pipeline = TransformPipeline::new()
            .then(TransformOp::Filter {
                predicates: vec![FilterPredicate::new("status", FilterOp::Eq, json!("final"))],
            })
            .then(TransformOp::Aggregate {
                function: AggregateFn::Count,
                field: None,
            });

        let value = serde_json::to_value(&pipeline).unwrap();
        let back: TransformPipeline = serde_json::from_value(value).unwrap();
        assert_eq!(back.ops.len(), 2);
    }

    #[test]
    fn custom_transform_applies() {
        let t = CustomTransform::new(|v| Ok(json!({ "wrapped": v })));
        let out = t.apply(json!([1, 2])).unwrap();
        assert_eq!(out["wrapped"], json!([1, 2]));
    }
}

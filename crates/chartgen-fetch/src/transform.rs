//! Transform pipeline executor
//!
//! Applies a declarative [`TransformPipeline`] to raw records, in declared
//! order. Operations that reshape record lists (filter, sort, group, limit,
//! extract, aggregate) require the intermediate value to still be an array;
//! a pipeline that groups and then sorts is a declaration error surfaced as
//! [`TransformError::ExpectedArray`].

use crate::error::TransformError;
use chartgen_spec::{
    AggregateFn, FilterOp, FilterPredicate, SortDirection, TransformOp, TransformPipeline,
};
use serde_json::{json, Map, Value};
use std::cmp::Ordering;

/// Apply a pipeline to raw records
///
/// # Errors
/// Returns [`TransformError`] when an operation receives a value of the
/// wrong shape or a custom transform rejects it.
pub fn apply_pipeline(
    pipeline: &TransformPipeline,
    records: Vec<Value>,
) -> Result<Value, TransformError> {
    let mut value = Value::Array(records);
    for op in &pipeline.ops {
        value = apply_op(op, value)?;
    }
    Ok(value)
}

fn apply_op(op: &TransformOp, value: Value) -> Result<Value, TransformError> {
    match op {
        TransformOp::Extract { fields } => {
            let records = as_records(value, "extract")?;
            let projected = records
                .into_iter()
                .map(|record| {
                    let mut out = Map::new();
                    for (name, path) in fields {
                        let v = lookup_path(&record, path).cloned().unwrap_or(Value::Null);
                        out.insert(name.clone(), v);
                    }
                    Value::Object(out)
                })
                .collect();
            Ok(Value::Array(projected))
        }
        TransformOp::Aggregate { function, field } => {
            let records = as_records(value, "aggregate")?;
            aggregate(*function, field.as_deref(), &records)
        }
        TransformOp::Filter { predicates } => {
            let records = as_records(value, "filter")?;
            let kept = records
                .into_iter()
                .filter(|record| predicates.iter().all(|p| matches(record, p)))
                .collect();
            Ok(Value::Array(kept))
        }
        TransformOp::GroupBy { field } => {
            let records = as_records(value, "group_by")?;
            let mut buckets: Map<String, Value> = Map::new();
            for record in records {
                let key = lookup_path(&record, field)
                    .map_or_else(|| "null".to_string(), bucket_key);
                match buckets.get_mut(&key) {
                    Some(Value::Array(bucket)) => bucket.push(record),
                    _ => {
                        buckets.insert(key, Value::Array(vec![record]));
                    }
                }
            }
            Ok(Value::Object(buckets))
        }
        TransformOp::Sort { field, direction } => {
            let mut records = as_records(value, "sort")?;
            records.sort_by(|a, b| {
                let ord = cmp_values(
                    lookup_path(a, field).unwrap_or(&Value::Null),
                    lookup_path(b, field).unwrap_or(&Value::Null),
                );
                match direction {
                    SortDirection::Ascending => ord,
                    SortDirection::Descending => ord.reverse(),
                }
            });
            Ok(Value::Array(records))
        }
        TransformOp::Limit { count } => {
            let mut records = as_records(value, "limit")?;
            records.truncate(*count);
            Ok(Value::Array(records))
        }
        TransformOp::Custom(custom) => custom.apply(value).map_err(TransformError::Custom),
    }
}

fn as_records(value: Value, op: &'static str) -> Result<Vec<Value>, TransformError> {
    match value {
        Value::Array(records) => Ok(records),
        _ => Err(TransformError::ExpectedArray { op }),
    }
}

/// Resolve a dot-separated path into a record
fn lookup_path<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = record;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

fn aggregate(
    function: AggregateFn,
    field: Option<&str>,
    records: &[Value],
) -> Result<Value, TransformError> {
    if function == AggregateFn::Count {
        return Ok(json!({ "function": "count", "value": records.len() }));
    }

    let (name, field) = match function {
        AggregateFn::Sum => ("sum", field),
        AggregateFn::Avg => ("avg", field),
        AggregateFn::Min => ("min", field),
        AggregateFn::Max => ("max", field),
        AggregateFn::Count => unreachable!(),
    };
    let field = field.ok_or(TransformError::MissingAggregateField { function: name })?;

    let numbers: Vec<f64> = records
        .iter()
        .filter_map(|r| lookup_path(r, field).and_then(Value::as_f64))
        .collect();

    let value = if numbers.is_empty() {
        Value::Null
    } else {
        let v = match function {
            AggregateFn::Sum => numbers.iter().sum(),
            AggregateFn::Avg => numbers.iter().sum::<f64>() / numbers.len() as f64,
            AggregateFn::Min => numbers.iter().copied().fold(f64::INFINITY, f64::min),
            AggregateFn::Max => numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            AggregateFn::Count => unreachable!(),
        };
        json!(v)
    };

    Ok(json!({ "function": name, "field": field, "value": value }))
}

fn matches(record: &Value, predicate: &FilterPredicate) -> bool {
    let field = lookup_path(record, &predicate.field);
    match predicate.op {
        FilterOp::Exists => field.is_some_and(|v| !v.is_null()),
        FilterOp::NotExists => !field.is_some_and(|v| !v.is_null()),
        FilterOp::Eq => field == Some(&predicate.value),
        FilterOp::NotEq => field != Some(&predicate.value),
        FilterOp::Contains => field.is_some_and(|v| contains(v, &predicate.value)),
        FilterOp::Gt => numeric_cmp(field, &predicate.value).is_some_and(Ordering::is_gt),
        FilterOp::Gte => numeric_cmp(field, &predicate.value).is_some_and(Ordering::is_ge),
        FilterOp::Lt => numeric_cmp(field, &predicate.value).is_some_and(Ordering::is_lt),
        FilterOp::Lte => numeric_cmp(field, &predicate.value).is_some_and(Ordering::is_le),
        FilterOp::In => in_list(field, &predicate.value),
        FilterOp::NotIn => !in_list(field, &predicate.value),
    }
}

fn contains(field: &Value, needle: &Value) -> bool {
    match field {
        Value::String(s) => needle.as_str().is_some_and(|n| s.contains(n)),
        Value::Array(items) => items.contains(needle),
        _ => false,
    }
}

fn in_list(field: Option<&Value>, list: &Value) -> bool {
    match (field, list) {
        (Some(v), Value::Array(items)) => items.contains(v),
        _ => false,
    }
}

fn numeric_cmp(field: Option<&Value>, operand: &Value) -> Option<Ordering> {
    let lhs = field.and_then(Value::as_f64)?;
    let rhs = operand.as_f64()?;
    lhs.partial_cmp(&rhs)
}

fn cmp_values(a: &Value, b: &Value) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => match (a.as_str(), b.as_str()) {
            (Some(x), Some(y)) => x.cmp(y),
            _ => a.to_string().cmp(&b.to_string()),
        },
    }
}

fn bucket_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

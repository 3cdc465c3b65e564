//! Feedback changes
//!
//! The NLU backend turns free-text feedback into a list of structural
//! changes. Each change targets one node; [`apply_changes`] applies them in
//! order with one handler per change kind.

use crate::error::SpecError;
use crate::node::ComponentNode;
use crate::spec::UiSpecification;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Change kinds emitted by feedback analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Merge a property value onto the target node
    Update,
    /// Append a new node under the named parent
    Add,
    /// Delete the node and prune it from every subtree
    Remove,
    /// Structural alias of `Update` for broader modifications
    Modify,
}

/// One revision to a specification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackChange {
    /// What kind of change to apply
    pub kind: ChangeKind,
    /// Target node id (parent id for `Add`; empty or "root" targets the top level)
    pub target_id: String,
    /// Property name for single-property updates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    /// Change payload: property value, property object, or serialized node
    #[serde(default)]
    pub value: Value,
}

impl FeedbackChange {
    /// Create new change
    #[inline]
    #[must_use]
    pub fn new(kind: ChangeKind, target_id: impl Into<String>) -> Self {
        Self {
            kind,
            target_id: target_id.into(),
            property: None,
            value: Value::Null,
        }
    }

    /// With a single property payload
    #[inline]
    #[must_use]
    pub fn with_property(mut self, property: impl Into<String>, value: Value) -> Self {
        self.property = Some(property.into());
        self.value = value;
        self
    }

    /// With a raw payload
    #[inline]
    #[must_use]
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = value;
        self
    }
}

/// Apply a list of changes to a specification, in order
///
/// Returns the number of changes applied. Callers revising a live
/// specification should pass a clone; an error aborts the remaining
/// changes.
///
/// # Errors
/// - [`SpecError::TargetNotFound`] when a change names an unknown node
/// - [`SpecError::InvalidNodePayload`] when an `Add` payload is not a node
/// - [`SpecError::ExpectedObjectPayload`] when a property-less update
///   carries a non-object payload
pub fn apply_changes(
    spec: &mut UiSpecification,
    changes: &[FeedbackChange],
) -> Result<usize, SpecError> {
    for change in changes {
        match change.kind {
            ChangeKind::Update | ChangeKind::Modify => apply_update(spec, change)?,
            ChangeKind::Add => apply_add(spec, change)?,
            ChangeKind::Remove => apply_remove(spec, change)?,
        }
    }
    Ok(changes.len())
}

fn apply_update(spec: &mut UiSpecification, change: &FeedbackChange) -> Result<(), SpecError> {
    let node = spec
        .find_node_mut(&change.target_id)
        .ok_or_else(|| SpecError::TargetNotFound(change.target_id.clone()))?;

    if let Some(property) = &change.property {
        node.properties.insert(property.clone(), change.value.clone());
        return Ok(());
    }

    match change.value.as_object() {
        Some(props) => {
            node.merge_properties(props);
            Ok(())
        }
        None => Err(SpecError::ExpectedObjectPayload(change.target_id.clone())),
    }
}

fn apply_add(spec: &mut UiSpecification, change: &FeedbackChange) -> Result<(), SpecError> {
    let node: ComponentNode = serde_json::from_value(change.value.clone()).map_err(|e| {
        SpecError::InvalidNodePayload {
            target: change.target_id.clone(),
            reason: e.to_string(),
        }
    })?;

    if change.target_id.is_empty() || change.target_id == "root" {
        spec.components.push(node);
        return Ok(());
    }

    let parent = spec
        .find_node_mut(&change.target_id)
        .ok_or_else(|| SpecError::TargetNotFound(change.target_id.clone()))?;
    parent.children.push(node);
    Ok(())
}

fn apply_remove(spec: &mut UiSpecification, change: &FeedbackChange) -> Result<(), SpecError> {
    if spec.remove_node(&change.target_id) == 0 {
        return Err(SpecError::TargetNotFound(change.target_id.clone()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_spec() -> UiSpecification {
        UiSpecification::new("Vitals").with_component(
            ComponentNode::new("root", "panel")
                .with_child(ComponentNode::new("chart", "vitals-chart")),
        )
    }

    #[test]
    fn update_sets_named_property() {
        let mut spec = sample_spec();
        let change = FeedbackChange::new(ChangeKind::Update, "chart")
            .with_property("title", json!("Blood Pressure"));

        apply_changes(&mut spec, &[change]).unwrap();
        assert_eq!(
            spec.find_node("chart").unwrap().properties["title"],
            json!("Blood Pressure")
        );
    }

    #[test]
    fn update_merges_object_payload() {
        let mut spec = sample_spec();
        let change = FeedbackChange::new(ChangeKind::Modify, "chart")
            .with_value(json!({ "height": 300, "unit": "mmHg" }));

        apply_changes(&mut spec, &[change]).unwrap();
        let node = spec.find_node("chart").unwrap();
        assert_eq!(node.properties["height"], json!(300));
        assert_eq!(node.properties["unit"], json!("mmHg"));
    }

    #[test]
    fn update_rejects_scalar_payload_without_property() {
        let mut spec = sample_spec();
        let change = FeedbackChange::new(ChangeKind::Update, "chart").with_value(json!(42));

        let err = apply_changes(&mut spec, &[change]).unwrap_err();
        assert!(matches!(err, SpecError::ExpectedObjectPayload(_)));
    }

    #[test]
    fn add_appends_under_parent() {
        let mut spec = sample_spec();
        let change = FeedbackChange::new(ChangeKind::Add, "root")
            .with_value(json!({ "id": "table", "component_type": "results-table" }));

        apply_changes(&mut spec, &[change]).unwrap();
        assert!(spec.find_node("table").is_some());
    }

    #[test]
    fn add_rejects_malformed_node() {
        let mut spec = sample_spec();
        let change =
            FeedbackChange::new(ChangeKind::Add, "root").with_value(json!({ "id": "x" }));

        let err = apply_changes(&mut spec, &[change]).unwrap_err();
        assert!(matches!(err, SpecError::InvalidNodePayload { .. }));
    }

    #[test]
    fn remove_prunes_node() {
        let mut spec = sample_spec();
        let change = FeedbackChange::new(ChangeKind::Remove, "chart");

        apply_changes(&mut spec, &[change]).unwrap();
        assert!(spec.find_node("chart").is_none());
    }

    #[test]
    fn unknown_target_fails() {
        let mut spec = sample_spec();
        let change = FeedbackChange::new(ChangeKind::Remove, "ghost");

        let err = apply_changes(&mut spec, &[change]).unwrap_err();
        assert!(matches!(err, SpecError::TargetNotFound(_)));
    }

    #[test]
    fn changes_apply_in_order() {
        let mut spec = sample_spec();
        let changes = vec![
            FeedbackChange::new(ChangeKind::Add, "root")
                .with_value(json!({ "id": "table", "component_type": "results-table" })),
            FeedbackChange::new(ChangeKind::Update, "table")
                .with_property("rows", json!(25)),
        ];

        let applied = apply_changes(&mut spec, &changes).unwrap();
        assert_eq!(applied, 2);
        assert_eq!(spec.find_node("table").unwrap().properties["rows"], json!(25));
    }
}

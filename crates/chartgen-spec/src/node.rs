//! Component tree nodes
//!
//! A specification describes a generated UI as a tree of [`ComponentNode`]s.
//! Nodes carry free-form JSON properties and an optional binding to a
//! declared data source.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One node in the generated component tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentNode {
    /// Unique node identifier within the specification
    pub id: String,
    /// Component kind rendered by the presentation layer (e.g. "vitals-chart")
    pub component_type: String,
    /// Free-form presentation properties
    #[serde(default)]
    pub properties: Map<String, Value>,
    /// Binding to a declared data-source id, if the component is data-backed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source: Option<String>,
    /// Child components
    #[serde(default)]
    pub children: Vec<ComponentNode>,
}

impl ComponentNode {
    /// Create new node
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, component_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            component_type: component_type.into(),
            properties: Map::new(),
            data_source: None,
            children: Vec::new(),
        }
    }

    /// With a property set
    #[inline]
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// With a data-source binding
    #[inline]
    #[must_use]
    pub fn with_data_source(mut self, source_id: impl Into<String>) -> Self {
        self.data_source = Some(source_id.into());
        self
    }

    /// With a child appended
    #[inline]
    #[must_use]
    pub fn with_child(mut self, child: ComponentNode) -> Self {
        self.children.push(child);
        self
    }

    /// Find a node by id in this subtree
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&ComponentNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    /// Find a node by id in this subtree, mutably
    pub fn find_mut(&mut self, id: &str) -> Option<&mut ComponentNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }

    /// Check whether the subtree contains a node with the given id
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    /// Remove every node with the given id from this subtree
    ///
    /// Returns the number of nodes removed. The receiver itself is never
    /// removed; callers prune top-level nodes from their owning list.
    pub fn remove_descendants(&mut self, id: &str) -> usize {
        let before = self.children.len();
        self.children.retain(|c| c.id != id);
        let mut removed = before - self.children.len();
        for child in &mut self.children {
            removed += child.remove_descendants(id);
        }
        removed
    }

    /// Merge properties from a JSON object onto this node
    ///
    /// Existing keys are overwritten; other keys are untouched.
    pub fn merge_properties(&mut self, props: &Map<String, Value>) {
        for (key, value) in props {
            self.properties.insert(key.clone(), value.clone());
        }
    }

    /// Total number of nodes in this subtree (including self)
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(ComponentNode::node_count).sum::<usize>()
    }

    /// Collect every node id in this subtree into `out`
    pub fn collect_ids(&self, out: &mut Vec<String>) {
        out.push(self.id.clone());
        for child in &self.children {
            child.collect_ids(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_tree() -> ComponentNode {
        ComponentNode::new("root", "panel")
            .with_child(
                ComponentNode::new("chart", "vitals-chart")
                    .with_data_source("obs-vitals")
                    .with_child(ComponentNode::new("legend", "chart-legend")),
            )
            .with_child(ComponentNode::new("table", "results-table"))
    }

    #[test]
    fn find_locates_nested_node() {
        let tree = sample_tree();
        assert!(tree.find("legend").is_some());
        assert!(tree.find("missing").is_none());
    }

    #[test]
    fn find_mut_allows_edit() {
        let mut tree = sample_tree();
        let node = tree.find_mut("table").unwrap();
        node.properties.insert("rows".to_string(), json!(20));
        assert_eq!(tree.find("table").unwrap().properties["rows"], json!(20));
    }

    #[test]
    fn remove_descendants_prunes_recursively() {
        let mut tree = sample_tree();
        let removed = tree.remove_descendants("legend");
        assert_eq!(removed, 1);
        assert!(!tree.contains("legend"));
        assert!(tree.contains("chart"));
    }

    #[test]
    fn merge_properties_overwrites_existing() {
        let mut node = ComponentNode::new("n", "panel").with_property("title", json!("Old"));
        let mut props = Map::new();
        props.insert("title".to_string(), json!("New"));
        props.insert("height".to_string(), json!(240));
        node.merge_properties(&props);
        assert_eq!(node.properties["title"], json!("New"));
        assert_eq!(node.properties["height"], json!(240));
    }

    #[test]
    fn node_count_counts_subtree() {
        assert_eq!(sample_tree().node_count(), 4);
    }

    #[test]
    fn node_roundtrips_through_json() {
        let tree = sample_tree();
        let value = serde_json::to_value(&tree).unwrap();
        let back: ComponentNode = serde_json::from_value(value).unwrap();
        assert_eq!(back, tree);
    }
}

//! UI specification
//!
//! The structured, revisable description of a generated UI: a component
//! tree plus the data sources its components bind to. Produced by the NLU
//! backend, consumed by the codegen backend, revised through feedback.

use crate::error::ValidationError;
use crate::node::ComponentNode;
use crate::source::DataSourceSpec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A complete, revisable UI specification
///
/// `Clone` is structural and is the sanctioned deep-copy mechanism:
/// refinement always operates on a clone so the caller's tree is never
/// mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiSpecification {
    /// Human-readable title for the generated view
    pub title: String,
    /// Top-level component nodes
    #[serde(default)]
    pub components: Vec<ComponentNode>,
    /// Data sources referenced by component bindings
    #[serde(default)]
    pub data_sources: Vec<DataSourceSpec>,
}

impl UiSpecification {
    /// Create empty specification
    #[inline]
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            components: Vec::new(),
            data_sources: Vec::new(),
        }
    }

    /// With a top-level component
    #[inline]
    #[must_use]
    pub fn with_component(mut self, node: ComponentNode) -> Self {
        self.components.push(node);
        self
    }

    /// With a data source
    #[inline]
    #[must_use]
    pub fn with_data_source(mut self, source: DataSourceSpec) -> Self {
        self.data_sources.push(source);
        self
    }

    /// Find a node anywhere in the tree
    #[must_use]
    pub fn find_node(&self, id: &str) -> Option<&ComponentNode> {
        self.components.iter().find_map(|c| c.find(id))
    }

    /// Find a node anywhere in the tree, mutably
    pub fn find_node_mut(&mut self, id: &str) -> Option<&mut ComponentNode> {
        self.components.iter_mut().find_map(|c| c.find_mut(id))
    }

    /// Remove every node with the given id, pruning all subtrees
    ///
    /// Returns the number of nodes removed.
    pub fn remove_node(&mut self, id: &str) -> usize {
        let before = self.components.len();
        self.components.retain(|c| c.id != id);
        let mut removed = before - self.components.len();
        for component in &mut self.components {
            removed += component.remove_descendants(id);
        }
        removed
    }

    /// Every node id in the tree, depth-first
    #[must_use]
    pub fn all_node_ids(&self) -> Vec<String> {
        let mut ids = Vec::new();
        for component in &self.components {
            component.collect_ids(&mut ids);
        }
        ids
    }

    /// Total node count across all top-level components
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.components.iter().map(ComponentNode::node_count).sum()
    }

    /// Look up a declared data source by id
    #[must_use]
    pub fn data_source(&self, id: &str) -> Option<&DataSourceSpec> {
        self.data_sources.iter().find(|s| s.id == id)
    }

    /// Validate structure before use
    ///
    /// Collects every violated rule; a failing specification is rejected
    /// whole and never partially applied.
    ///
    /// # Errors
    /// Returns [`ValidationError`] with one reason per violation.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut reasons = Vec::new();

        let mut seen_ids = HashSet::new();
        for id in self.all_node_ids() {
            if !seen_ids.insert(id.clone()) {
                reasons.push(format!("duplicate node id '{id}'"));
            }
        }

        let source_ids: HashSet<&str> =
            self.data_sources.iter().map(|s| s.id.as_str()).collect();
        if source_ids.len() != self.data_sources.len() {
            reasons.push("duplicate data source ids".to_string());
        }

        for source in &self.data_sources {
            if source.entity_type.is_empty() {
                reasons.push(format!("data source '{}' has empty entity type", source.id));
            }
        }

        let mut stack: Vec<&ComponentNode> = self.components.iter().collect();
        while let Some(node) = stack.pop() {
            if node.component_type.is_empty() {
                reasons.push(format!("node '{}' has empty component type", node.id));
            }
            if let Some(binding) = &node.data_source {
                if !source_ids.contains(binding.as_str()) {
                    reasons.push(format!(
                        "node '{}' binds undeclared data source '{binding}'",
                        node.id
                    ));
                }
            }
            stack.extend(node.children.iter());
        }

        if reasons.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(reasons))
        }
    }
}

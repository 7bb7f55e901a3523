pub mod dimension;
pub mod field;
pub mod measure;

pub use dimension::{Dimension, Hierarchy, Level};
pub use field::{AvailableField, AvailableFieldCollection};
pub use measure::{Measure, MeasuresCollection};

use crate::schema::ColumnId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a dimension, hierarchy or level, unique within one
/// [`MainModelNode`]. Children refer to their parent through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Link from a level or measure to the column it is built on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnBinding {
    Resolved(ColumnId),
    /// No available field matched `label`, or its column left the schema.
    Unresolved { label: String },
}

impl ColumnBinding {
    pub fn column_id(&self) -> Option<&ColumnId> {
        match self {
            ColumnBinding::Resolved(id) => Some(id),
            ColumnBinding::Unresolved { .. } => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ColumnBinding::Resolved(_))
    }
}

/// Result of the last `validate()` call on a node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationState {
    valid: bool,
    messages: Vec<String>,
}

impl ValidationState {
    pub fn reset(&mut self) {
        self.valid = true;
        self.messages.clear();
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.valid = false;
        self.messages.push(message.into());
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

/// Local validation of a single model node.
///
/// `validate` checks only the node's own invariant; it does not descend
/// into children. Nodes that were never validated report invalid.
pub trait Validate {
    fn validate(&mut self);
    fn validation(&self) -> &ValidationState;

    fn is_valid(&self) -> bool {
        self.validation().is_valid()
    }

    fn validation_messages(&self) -> &[String] {
        self.validation().messages()
    }
}

/// Root of the model tree: the dimensions in display order and the measure
/// collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MainModelNode {
    pub dimensions: Vec<Dimension>,
    pub measures: MeasuresCollection,
    next_id: u64,
}

impl MainModelNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate_id(&mut self) -> NodeId {
        self.next_id += 1;
        NodeId(self.next_id)
    }

    pub fn clear(&mut self) {
        self.dimensions.clear();
        self.measures.clear();
    }

    pub fn find_dimension(&self, id: NodeId) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.id == id)
    }

    pub fn find_dimension_mut(&mut self, id: NodeId) -> Option<&mut Dimension> {
        self.dimensions.iter_mut().find(|d| d.id == id)
    }

    pub fn find_hierarchy(&self, id: NodeId) -> Option<&Hierarchy> {
        self.dimensions
            .iter()
            .flat_map(|d| d.hierarchies.iter())
            .find(|h| h.id == id)
    }

    pub fn find_hierarchy_mut(&mut self, id: NodeId) -> Option<&mut Hierarchy> {
        self.dimensions
            .iter_mut()
            .flat_map(|d| d.hierarchies.iter_mut())
            .find(|h| h.id == id)
    }

    pub fn find_level(&self, id: NodeId) -> Option<&Level> {
        self.levels().find(|l| l.id == id)
    }

    /// Every level of every hierarchy, in display order.
    pub fn levels(&self) -> impl Iterator<Item = &Level> {
        self.dimensions
            .iter()
            .flat_map(|d| d.hierarchies.iter())
            .flat_map(|h| h.levels.iter())
    }

    pub fn number_of_levels(&self) -> usize {
        self.levels().count()
    }

    /// Removes every level for which `keep` returns false and returns how
    /// many were removed. Emptied hierarchies and dimensions stay in place.
    pub fn retain_levels<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&Level) -> bool,
    {
        let mut removed = 0;
        for hierarchy in self
            .dimensions
            .iter_mut()
            .flat_map(|d| d.hierarchies.iter_mut())
        {
            let before = hierarchy.levels.len();
            hierarchy.levels.retain(|level| keep(level));
            removed += before - hierarchy.levels.len();
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[fixture]
    fn model() -> MainModelNode {
        let mut model = MainModelNode::new();
        let dim_id = model.allocate_id();
        let hier_id = model.allocate_id();
        let mut dimension = Dimension::new(dim_id, "Region");
        let mut hierarchy = Hierarchy::new(hier_id, dim_id, "Region");
        for (name, column) in [("Country", "LC_COUNTRY"), ("City", "LC_CITY")] {
            let level_id = model.allocate_id();
            hierarchy.levels.push(Level::new(
                level_id,
                hier_id,
                name,
                ColumnBinding::Resolved(ColumnId::new(column)),
            ));
        }
        dimension.hierarchies.push(hierarchy);
        model.dimensions.push(dimension);
        model
    }

    #[rstest]
    fn test_ids_are_unique(mut model: MainModelNode) {
        let next = model.allocate_id();
        assert_eq!(next, NodeId(5));
        assert!(model.find_level(NodeId(3)).is_some());
        assert!(model.find_level(next).is_none());
    }

    #[rstest]
    fn test_lookup_follows_parent_links(model: MainModelNode) {
        let level = model.find_level(NodeId(4)).unwrap();
        let hierarchy = model.find_hierarchy(level.parent).unwrap();
        let dimension = model.find_dimension(hierarchy.parent).unwrap();
        assert_eq!(level.name, "City");
        assert_eq!(dimension.name, "Region");
    }

    #[rstest]
    fn test_retain_levels_keeps_empty_parents(mut model: MainModelNode) {
        let removed = model.retain_levels(|_| false);
        assert_eq!(removed, 2);
        assert_eq!(model.number_of_levels(), 0);
        assert_eq!(model.dimensions.len(), 1);
        assert_eq!(model.dimensions[0].hierarchies.len(), 1);
    }

    #[test]
    fn test_validation_state() {
        let mut state = ValidationState::default();
        assert!(!state.is_valid());
        state.reset();
        assert!(state.is_valid());
        state.fail("broken");
        assert!(!state.is_valid());
        assert_eq!(state.messages(), ["broken".to_string()]);
    }
}

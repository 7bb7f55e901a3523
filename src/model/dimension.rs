use super::{ColumnBinding, NodeId, Validate, ValidationState};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub id: NodeId,
    pub name: String,
    pub hierarchies: Vec<Hierarchy>,
    #[serde(skip)]
    validation: ValidationState,
}

impl Dimension {
    pub fn new(id: NodeId, name: &str) -> Self {
        Dimension {
            id,
            name: name.to_string(),
            hierarchies: Vec::new(),
            validation: ValidationState::default(),
        }
    }
}

impl Validate for Dimension {
    fn validate(&mut self) {
        self.validation.reset();
        if self.hierarchies.is_empty() {
            self.validation
                .fail(format!("Dimension {} requires at least one Hierarchy", self.name));
        }
    }

    fn validation(&self) -> &ValidationState {
        &self.validation
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hierarchy {
    pub id: NodeId,
    /// Owning dimension.
    pub parent: NodeId,
    pub name: String,
    pub levels: Vec<Level>,
    #[serde(skip)]
    validation: ValidationState,
}

impl Hierarchy {
    pub fn new(id: NodeId, parent: NodeId, name: &str) -> Self {
        Hierarchy {
            id,
            parent,
            name: name.to_string(),
            levels: Vec::new(),
            validation: ValidationState::default(),
        }
    }
}

impl Validate for Hierarchy {
    fn validate(&mut self) {
        self.validation.reset();
        if self.levels.is_empty() {
            self.validation
                .fail(format!("Hierarchy {} requires at least one Level", self.name));
        }
    }

    fn validation(&self) -> &ValidationState {
        &self.validation
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub id: NodeId,
    /// Owning hierarchy.
    pub parent: NodeId,
    pub name: String,
    pub column: ColumnBinding,
    #[serde(skip)]
    validation: ValidationState,
}

impl Level {
    pub fn new(id: NodeId, parent: NodeId, name: &str, column: ColumnBinding) -> Self {
        Level {
            id,
            parent,
            name: name.to_string(),
            column,
            validation: ValidationState::default(),
        }
    }
}

impl Validate for Level {
    fn validate(&mut self) {
        self.validation.reset();
        if let ColumnBinding::Unresolved { label } = &self.column {
            self.validation.fail(format!(
                "Level {} has no column, no field named {} is available",
                self.name, label
            ));
        }
    }

    fn validation(&self) -> &ValidationState {
        &self.validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnId;

    #[test]
    fn test_empty_hierarchy_is_invalid() {
        let mut hierarchy = Hierarchy::new(NodeId(2), NodeId(1), "Time");
        hierarchy.validate();
        assert!(!hierarchy.is_valid());
        assert_eq!(hierarchy.validation_messages().len(), 1);

        hierarchy.levels.push(Level::new(
            NodeId(3),
            NodeId(2),
            "Year",
            ColumnBinding::Resolved(ColumnId::new("LC_YEAR")),
        ));
        hierarchy.validate();
        assert!(hierarchy.is_valid());
        assert!(hierarchy.validation_messages().is_empty());
    }

    #[test]
    fn test_dimension_validation_is_local() {
        let mut dimension = Dimension::new(NodeId(1), "Time");
        dimension
            .hierarchies
            .push(Hierarchy::new(NodeId(2), NodeId(1), "Time"));
        dimension.validate();
        // the empty hierarchy below is not this node's concern
        assert!(dimension.is_valid());
    }

    #[test]
    fn test_unresolved_level_is_invalid() {
        let mut level = Level::new(
            NodeId(3),
            NodeId(2),
            "Year",
            ColumnBinding::Unresolved {
                label: "Year".to_string(),
            },
        );
        level.validate();
        assert!(!level.is_valid());
        assert!(level.validation_messages()[0].contains("Year"));
    }
}

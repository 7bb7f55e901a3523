use super::ModelerWorkspace;
use crate::error::ModelerError;
use crate::events::{EventSink, Property, PropertyValue};
use crate::model::{AvailableFieldCollection, MainModelNode};
use crate::schema::SchemaSnapshot;
use log::debug;
use serde::{Deserialize, Serialize};

/// Everything a host needs to persist a workspace. The byte format is up to
/// the host; the type only commits to serde.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceState {
    pub model_name: Option<String>,
    pub file_name: Option<String>,
    pub source_name: Option<String>,
    pub schema_name: Option<String>,
    pub selected_server: Option<String>,
    pub selected_visualization: Option<String>,
    pub domain: Option<SchemaSnapshot>,
    pub available_fields: AvailableFieldCollection,
    pub model: MainModelNode,
}

impl<E: EventSink> ModelerWorkspace<E> {
    pub fn state(&self) -> WorkspaceState {
        WorkspaceState {
            model_name: self.model_name.clone(),
            file_name: self.file_name.clone(),
            source_name: self.source_name.clone(),
            schema_name: self.schema_name.clone(),
            selected_server: self.selected_server.clone(),
            selected_visualization: self.selected_visualization.clone(),
            domain: self.domain.clone(),
            available_fields: self.available_fields.clone(),
            model: self.model.clone(),
        }
    }

    /// Restores a saved workspace: loads the saved snapshot as
    /// [`ModelerWorkspace::set_domain`] would, then replaces the model with
    /// the saved tree. Without a saved snapshot the saved registry is used
    /// as is.
    ///
    /// The workspace stays dirty until the host calls `mark_saved`.
    pub fn load_state(&mut self, state: WorkspaceState) -> Result<(), ModelerError> {
        match state.domain {
            Some(domain) => self.set_domain(domain)?,
            None => {
                self.domain = None;
                self.available_fields = state.available_fields;
                self.available_fields.sort();
                self.fire(
                    Property::AvailableFields,
                    None,
                    PropertyValue::Count(self.available_fields.len()),
                );
            }
        }

        debug!(
            "Restoring model with {} dimensions and {} measures",
            state.model.dimensions.len(),
            state.model.measures.len()
        );
        self.model = state.model;
        self.source_name = state.source_name;
        self.schema_name = state.schema_name;
        self.selected_server = state.selected_server;
        self.selected_visualization = state.selected_visualization;
        self.set_file_name(state.file_name.as_deref());
        self.set_model_name(state.model_name.as_deref());
        self.fire_dimensions_changed();
        Ok(())
    }
}

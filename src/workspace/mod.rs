mod state;

pub use state::WorkspaceState;

use crate::config::ModelerConfig;
use crate::error::ModelerError;
use crate::events::{ChangeEvent, ChangeQueue, EventSink, Property, PropertyValue};
use crate::model::{
    AvailableField, AvailableFieldCollection, ColumnBinding, Dimension, Hierarchy, Level,
    MainModelNode, Measure, NodeId, Validate,
};
use crate::schema::{AggregationType, ColumnId, SchemaSnapshot, SchemaSource};
use log::{debug, info, warn};
use std::collections::HashSet;

/// The tree node the host currently has selected, used by
/// [`ModelerWorkspace::add_to_hierarchy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Level(NodeId),
    Hierarchy(NodeId),
    Dimension(NodeId),
    None,
}

/// What a [`ModelerWorkspace::refresh`] changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub pruned_levels: usize,
    pub unbound_measures: usize,
}

impl RefreshReport {
    pub fn has_changes(&self) -> bool {
        self.added + self.updated + self.removed + self.pruned_levels + self.unbound_measures > 0
    }
}

/// Modeling workspace: the field registry, the model tree built from it, and
/// the schema source both are reconciled against.
///
/// Every mutation of an observable property is reported to the sink `E`
/// before the mutating call returns.
pub struct ModelerWorkspace<E = ChangeQueue> {
    available_fields: AvailableFieldCollection,
    model: MainModelNode,
    domain: Option<SchemaSnapshot>,
    source: Option<Box<dyn SchemaSource>>,
    locale: String,
    source_name: Option<String>,
    model_name: Option<String>,
    schema_name: Option<String>,
    file_name: Option<String>,
    selected_server: Option<String>,
    selected_visualization: Option<String>,
    dirty: bool,
    sink: E,
}

impl<E: EventSink> ModelerWorkspace<E> {
    pub fn new(config: &ModelerConfig, sink: E) -> Self {
        ModelerWorkspace {
            available_fields: AvailableFieldCollection::new(),
            model: MainModelNode::new(),
            domain: None,
            source: None,
            locale: config.locale.clone(),
            source_name: None,
            model_name: None,
            schema_name: None,
            file_name: None,
            selected_server: config.server_names().into_iter().next(),
            selected_visualization: None,
            dirty: false,
            sink,
        }
    }

    pub fn model(&self) -> &MainModelNode {
        &self.model
    }

    pub fn available_fields(&self) -> &AvailableFieldCollection {
        &self.available_fields
    }

    /// The snapshot the workspace was last populated or refreshed from.
    pub fn domain(&self) -> Option<&SchemaSnapshot> {
        self.domain.as_ref()
    }

    pub fn sink(&self) -> &E {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut E {
        &mut self.sink
    }

    pub fn set_model_source<S>(&mut self, source: S)
    where
        S: SchemaSource + 'static,
    {
        self.source = Some(Box::new(source));
    }

    pub fn model_source(&self) -> Option<&dyn SchemaSource> {
        self.source.as_deref()
    }

    pub fn database_name(&self) -> Option<String> {
        self.source.as_ref().and_then(|s| s.database_name())
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn set_file_name(&mut self, file_name: Option<&str>) {
        let prev = self.file_name.clone();
        let prev_short = self.short_file_name();
        self.file_name = file_name.map(str::to_string);
        self.fire_if_changed(
            Property::FileName,
            PropertyValue::Text(prev),
            PropertyValue::Text(self.file_name.clone()),
        );
        self.fire_if_changed(
            Property::ShortFileName,
            PropertyValue::Text(prev_short),
            PropertyValue::Text(self.short_file_name()),
        );
    }

    /// File name without directories and without its last extension.
    pub fn short_file_name(&self) -> Option<String> {
        let normalized = self.file_name.as_ref()?.replace('\\', "/");
        let start = normalized.rfind('/').map(|pos| pos + 1).unwrap_or(0);
        let base = &normalized[start..];
        let stem = match base.rfind('.') {
            Some(pos) => &base[..pos],
            None => base,
        };
        Some(stem.to_string())
    }

    pub fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }

    pub fn set_source_name(&mut self, source_name: Option<&str>) {
        self.source_name = source_name.map(str::to_string);
    }

    pub fn schema_name(&self) -> Option<&str> {
        self.schema_name.as_deref()
    }

    pub fn set_schema_name(&mut self, schema_name: Option<&str>) {
        self.schema_name = schema_name.map(str::to_string);
    }

    pub fn model_name(&self) -> Option<&str> {
        self.model_name.as_deref()
    }

    pub fn set_model_name(&mut self, model_name: Option<&str>) {
        let prev = self.model_name.clone();
        self.model_name = model_name.map(str::to_string);
        self.set_dirty(true);
        self.fire_if_changed(
            Property::ModelName,
            PropertyValue::Text(prev),
            PropertyValue::Text(self.model_name.clone()),
        );
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Save acknowledgment from the host. The only way to clear the dirty
    /// flag.
    pub fn mark_saved(&mut self) {
        self.set_dirty(false);
    }

    fn set_dirty(&mut self, dirty: bool) {
        let prev = self.dirty;
        self.dirty = dirty;
        self.fire_if_changed(
            Property::Dirty,
            PropertyValue::Flag(prev),
            PropertyValue::Flag(dirty),
        );
    }

    pub fn selected_server(&self) -> Option<&str> {
        self.selected_server.as_deref()
    }

    pub fn set_selected_server(&mut self, server: Option<&str>) {
        self.selected_server = server.map(str::to_string);
    }

    pub fn selected_visualization(&self) -> Option<&str> {
        self.selected_visualization.as_deref()
    }

    pub fn set_selected_visualization(&mut self, visualization: Option<&str>) {
        self.selected_visualization = visualization.map(str::to_string);
    }

    pub fn number_of_levels(&self) -> usize {
        self.model.number_of_levels()
    }

    pub fn find_dimension(&self, id: NodeId) -> Option<&Dimension> {
        self.model.find_dimension(id)
    }

    pub fn find_hierarchy(&self, id: NodeId) -> Option<&Hierarchy> {
        self.model.find_hierarchy(id)
    }

    pub fn find_level(&self, id: NodeId) -> Option<&Level> {
        self.model.find_level(id)
    }

    /// Matches `label` against the display names of the available fields.
    /// The first match wins and its column id is what gets bound.
    fn resolve(&self, label: &str) -> Option<&AvailableField> {
        let field = self.available_fields.find_by_display_name(label);
        if field.is_none() {
            warn!("No available field named {}, leaving it unresolved", label);
        }
        field
    }

    fn bind(&self, label: &str) -> ColumnBinding {
        match self.resolve(label) {
            Some(field) => ColumnBinding::Resolved(field.column_id().clone()),
            None => ColumnBinding::Unresolved {
                label: label.to_string(),
            },
        }
    }

    fn bind_imported(&self, id: &ColumnId, label: &str) -> ColumnBinding {
        if self.available_fields.contains_column(id) {
            ColumnBinding::Resolved(id.clone())
        } else {
            warn!("Column {} of {} is not in the primary table, leaving it unresolved", id, label);
            ColumnBinding::Unresolved {
                label: label.to_string(),
            }
        }
    }

    /// Builds a detached level under `parent`.
    pub fn create_level(&mut self, parent: NodeId, label: &str) -> Level {
        let column = self.bind(label);
        Level::new(self.model.allocate_id(), parent, label, column)
    }

    /// Builds a detached hierarchy under `parent` holding one level.
    pub fn create_hierarchy(&mut self, parent: NodeId, label: &str) -> Hierarchy {
        let mut hierarchy = Hierarchy::new(self.model.allocate_id(), parent, label);
        let level = self.create_level(hierarchy.id, label);
        hierarchy.levels.push(level);
        hierarchy
    }

    /// Builds a detached dimension with one hierarchy and one level, all
    /// named `label`.
    pub fn create_dimension(&mut self, label: &str) -> Dimension {
        let mut dimension = Dimension::new(self.model.allocate_id(), label);
        let hierarchy = self.create_hierarchy(dimension.id, label);
        dimension.hierarchies.push(hierarchy);
        dimension
    }

    pub fn add_dimension(&mut self, dimension: Dimension) -> NodeId {
        let id = dimension.id;
        debug!("Adding dimension {} {}", id, dimension.name);
        self.model.dimensions.push(dimension);
        self.fire_dimensions_changed();
        id
    }

    pub fn add_dimension_for(&mut self, label: &str) -> NodeId {
        let dimension = self.create_dimension(label);
        self.add_dimension(dimension)
    }

    /// Adds `label` to the tree next to the selected node.
    ///
    /// A selected level gets a sibling, a selected hierarchy a new last
    /// level, and a selected dimension a new level in its first hierarchy
    /// (created if missing). Without a selection `label` seeds a new
    /// dimension. Returns the id of the created level or dimension.
    pub fn add_to_hierarchy(
        &mut self,
        selection: Selection,
        label: &str,
    ) -> Result<NodeId, ModelerError> {
        match selection {
            Selection::Level(id) => {
                let parent = self
                    .model
                    .find_level(id)
                    .ok_or(ModelerError::NodeNotFound(id))?
                    .parent;
                self.append_level(parent, label)
            }
            Selection::Hierarchy(id) => self.append_level(id, label),
            Selection::Dimension(id) => {
                let first = self
                    .model
                    .find_dimension(id)
                    .ok_or(ModelerError::NodeNotFound(id))?
                    .hierarchies
                    .first()
                    .map(|h| h.id);
                let hierarchy_id = match first {
                    Some(hierarchy_id) => hierarchy_id,
                    None => {
                        let hierarchy = Hierarchy::new(self.model.allocate_id(), id, label);
                        let hierarchy_id = hierarchy.id;
                        self.model
                            .find_dimension_mut(id)
                            .ok_or(ModelerError::NodeNotFound(id))?
                            .hierarchies
                            .push(hierarchy);
                        hierarchy_id
                    }
                };
                self.append_level(hierarchy_id, label)
            }
            Selection::None => Ok(self.add_dimension_for(label)),
        }
    }

    fn append_level(&mut self, hierarchy_id: NodeId, label: &str) -> Result<NodeId, ModelerError> {
        if self.model.find_hierarchy(hierarchy_id).is_none() {
            return Err(ModelerError::NodeNotFound(hierarchy_id));
        }
        let level = self.create_level(hierarchy_id, label);
        let id = level.id;
        debug!("Adding level {} {} to hierarchy {}", id, label, hierarchy_id);
        self.model
            .find_hierarchy_mut(hierarchy_id)
            .ok_or(ModelerError::NodeNotFound(hierarchy_id))?
            .levels
            .push(level);
        self.fire_dimensions_changed();
        Ok(id)
    }

    pub fn create_measure(&self, label: &str) -> Measure {
        match self.resolve(label) {
            Some(field) => Measure::new(
                &field.name,
                field.display_name.as_deref().unwrap_or(label),
                &field.aggregation,
                ColumnBinding::Resolved(field.column_id().clone()),
            ),
            None => Measure::new(
                label,
                label,
                &AggregationType::None.to_string(),
                ColumnBinding::Unresolved {
                    label: label.to_string(),
                },
            ),
        }
    }

    /// Creates a measure for `label` and appends it to the model.
    pub fn add_field_into_play(&mut self, label: &str) -> &Measure {
        let measure = self.create_measure(label);
        debug!("Adding measure {}", measure.name);
        self.model.measures.push(measure);
        self.fire_model_changed();
        &self.model.measures.measures[self.model.measures.len() - 1]
    }

    pub fn fields(&self) -> &[Measure] {
        &self.model.measures.measures
    }

    pub fn set_fields(&mut self, measures: Vec<Measure>) {
        self.model.measures.measures = measures;
        self.fire_model_changed();
    }

    /// Replaces the registry and the model with the contents of `snapshot`.
    ///
    /// Fails without touching any state when the snapshot has no logical
    /// table.
    pub fn set_domain(&mut self, snapshot: SchemaSnapshot) -> Result<(), ModelerError> {
        let table = snapshot
            .primary_table()
            .ok_or(ModelerError::MissingPrimaryTable)?;

        self.model.clear();
        self.available_fields.clear();

        for column in &table.columns {
            let field = AvailableField::from_column(column.clone(), &self.locale);
            if let Err(e) = self.available_fields.add(field) {
                warn!("Skipping column of table {}: {}", table.id, e);
            }
        }
        self.available_fields.sort();
        self.fire_fields_changed();

        if let Some(category) = snapshot.categories.first() {
            self.set_model_name(Some(&category.id));
        }

        for olap_dimension in &snapshot.olap_dimensions {
            let mut dimension = Dimension::new(self.model.allocate_id(), &olap_dimension.name);
            for olap_hierarchy in &olap_dimension.hierarchies {
                let mut hierarchy =
                    Hierarchy::new(self.model.allocate_id(), dimension.id, &olap_hierarchy.name);
                for olap_level in &olap_hierarchy.levels {
                    let column =
                        self.bind_imported(&olap_level.reference_column.id, &olap_level.name);
                    hierarchy.levels.push(Level::new(
                        self.model.allocate_id(),
                        hierarchy.id,
                        &olap_level.name,
                        column,
                    ));
                }
                dimension.hierarchies.push(hierarchy);
            }
            self.model.dimensions.push(dimension);
        }

        for olap_measure in snapshot.olap_cubes.iter().flat_map(|c| c.measures.iter()) {
            let column = &olap_measure.column;
            let display_name = column.display_name(&self.locale).unwrap_or(&olap_measure.name);
            let binding = self.bind_imported(&column.id, display_name);
            self.model.measures.push(Measure::new(
                &column.physical_name,
                display_name,
                &column.aggregation.to_string(),
                binding,
            ));
        }

        info!(
            "Loaded snapshot {}: {} fields, {} dimensions, {} measures",
            snapshot.id,
            self.available_fields.len(),
            self.model.dimensions.len(),
            self.model.measures.len()
        );
        self.domain = Some(snapshot);
        self.fire_model_changed();
        Ok(())
    }

    /// Fetches a snapshot from the bound source and loads it with
    /// [`ModelerWorkspace::set_domain`].
    pub async fn populate(&mut self) -> Result<(), ModelerError> {
        let source = self.source.as_ref().ok_or(ModelerError::NoSource)?;
        let snapshot = source.generate_domain().await?;
        self.set_domain(snapshot)
    }

    /// Reconciles the registry and the model with a fresh snapshot from the
    /// bound source.
    ///
    /// New columns become fields, known columns update their field in place,
    /// fields of vanished columns are removed, and every level bound to a
    /// removed column is dropped from its hierarchy. Hierarchies and
    /// dimensions left empty are kept. Measures bound to a removed column
    /// become unresolved under their display name. Nothing is modified unless the source
    /// delivers a snapshot with a logical table.
    pub async fn refresh(&mut self) -> Result<RefreshReport, ModelerError> {
        let source = self.source.as_ref().ok_or(ModelerError::NoSource)?;
        let snapshot = source.generate_domain().await?;
        if snapshot.primary_table().is_none() {
            return Err(ModelerError::MissingPrimaryTable);
        }

        let mut report = RefreshReport::default();
        let mut updated = HashSet::new();

        for column in snapshot.columns() {
            match self.available_fields.find_by_column_mut(&column.id) {
                Some(field) => {
                    if field.column != *column {
                        field.update_column(column.clone(), &self.locale);
                        updated.insert(column.id.clone());
                    }
                }
                None => {
                    let field = AvailableField::from_column(column.clone(), &self.locale);
                    self.available_fields.add(field)?;
                    report.added += 1;
                }
            }
        }
        report.updated = updated.len();

        let stale: Vec<ColumnId> = self
            .available_fields
            .iter()
            .filter(|f| !snapshot.columns().iter().any(|c| c.id == *f.column_id()))
            .map(|f| f.column_id().clone())
            .collect();
        report.removed = self.available_fields.remove_all(&stale);
        self.available_fields.sort();

        let fields = &self.available_fields;
        report.pruned_levels = self.model.retain_levels(|level| match level.column.column_id() {
            Some(id) => fields.contains_column(id),
            None => true,
        });
        report.unbound_measures = self
            .model
            .measures
            .unbind_columns(|id| fields.contains_column(id));

        info!(
            "Refreshed from snapshot {}: {} added, {} updated, {} removed, {} levels pruned, {} measures unbound",
            snapshot.id,
            report.added,
            report.updated,
            report.removed,
            report.pruned_levels,
            report.unbound_measures
        );
        self.domain = Some(snapshot);

        self.fire_fields_changed();
        if report.pruned_levels > 0 {
            self.fire_dimensions_changed();
        } else {
            self.fire(Property::Model, None, PropertyValue::Count(self.model.dimensions.len()));
        }
        if report.has_changes() {
            self.set_dirty(true);
        }
        Ok(report)
    }

    /// Validates every node of the model and returns whether all of them
    /// are valid.
    pub fn validate_model(&mut self) -> bool {
        let mut valid = true;
        for dimension in &mut self.model.dimensions {
            dimension.validate();
            valid &= dimension.is_valid();
            for hierarchy in &mut dimension.hierarchies {
                hierarchy.validate();
                valid &= hierarchy.is_valid();
                for level in &mut hierarchy.levels {
                    level.validate();
                    valid &= level.is_valid();
                }
            }
        }
        self.model.measures.validate();
        valid &= self.model.measures.is_valid();
        for measure in &mut self.model.measures.measures {
            measure.validate();
            valid &= measure.is_valid();
        }
        valid
    }

    /// Messages collected by the last [`ModelerWorkspace::validate_model`].
    pub fn validation_messages(&self) -> Vec<String> {
        let mut messages = Vec::new();
        for dimension in &self.model.dimensions {
            messages.extend_from_slice(dimension.validation_messages());
            for hierarchy in &dimension.hierarchies {
                messages.extend_from_slice(hierarchy.validation_messages());
                for level in &hierarchy.levels {
                    messages.extend_from_slice(level.validation_messages());
                }
            }
        }
        messages.extend_from_slice(self.model.measures.validation_messages());
        for measure in self.model.measures.iter() {
            messages.extend_from_slice(measure.validation_messages());
        }
        messages
    }

    fn fire(&mut self, property: Property, old: Option<PropertyValue>, new: PropertyValue) {
        self.sink.property_changed(ChangeEvent { property, old, new });
    }

    fn fire_if_changed(&mut self, property: Property, old: PropertyValue, new: PropertyValue) {
        if old != new {
            self.fire(property, Some(old), new);
        }
    }

    fn fire_fields_changed(&mut self) {
        self.fire(
            Property::AvailableFields,
            None,
            PropertyValue::Count(self.available_fields.len()),
        );
    }

    fn fire_model_changed(&mut self) {
        self.fire(Property::Model, None, PropertyValue::Count(self.model.dimensions.len()));
        self.set_dirty(true);
    }

    fn fire_dimensions_changed(&mut self) {
        self.fire(
            Property::Dimensions,
            None,
            PropertyValue::Count(self.model.dimensions.len()),
        );
        self.fire_model_changed();
    }
}

use log::debug;
use std::fmt;

/// Observable workspace properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    FileName,
    ShortFileName,
    ModelName,
    Dirty,
    AvailableFields,
    Model,
    Dimensions,
}

impl Property {
    pub fn name(&self) -> &'static str {
        match self {
            Property::FileName => "fileName",
            Property::ShortFileName => "shortFileName",
            Property::ModelName => "modelName",
            Property::Dirty => "dirty",
            Property::AvailableFields => "availableFields",
            Property::Model => "model",
            Property::Dimensions => "dimensions",
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Text(Option<String>),
    Flag(bool),
    /// Size of a collection after the change.
    Count(usize),
}

/// A property change. `old` is `None` when it was not worth recomputing,
/// which is always the case for collection properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub property: Property,
    pub old: Option<PropertyValue>,
    pub new: PropertyValue,
}

/// Receives change events synchronously, in the call stack of the mutation
/// that caused them. Handlers must return quickly.
pub trait EventSink {
    fn property_changed(&mut self, event: ChangeEvent);
}

/// Buffers events until the host drains them.
#[derive(Debug, Default)]
pub struct ChangeQueue {
    events: Vec<ChangeEvent>,
}

impl ChangeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&mut self) -> Vec<ChangeEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[ChangeEvent] {
        &self.events
    }

    pub fn properties(&self) -> Vec<Property> {
        self.events.iter().map(|e| e.property).collect()
    }
}

impl EventSink for ChangeQueue {
    fn property_changed(&mut self, event: ChangeEvent) {
        self.events.push(event);
    }
}

/// Writes every event to the debug log and drops it.
#[derive(Debug, Default)]
pub struct LoggingSink;

impl EventSink for LoggingSink {
    fn property_changed(&mut self, event: ChangeEvent) {
        debug!(
            "Property {} changed: {:?} -> {:?}",
            event.property, event.old, event.new
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_drains_in_order() {
        let mut queue = ChangeQueue::new();
        queue.property_changed(ChangeEvent {
            property: Property::ModelName,
            old: Some(PropertyValue::Text(None)),
            new: PropertyValue::Text(Some("Sales".to_string())),
        });
        queue.property_changed(ChangeEvent {
            property: Property::Dirty,
            old: Some(PropertyValue::Flag(false)),
            new: PropertyValue::Flag(true),
        });

        assert_eq!(queue.properties(), vec![Property::ModelName, Property::Dirty]);
        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert!(queue.events().is_empty());
    }

    #[test]
    fn test_property_names() {
        assert_eq!(Property::AvailableFields.to_string(), "availableFields");
        assert_eq!(Property::ShortFileName.name(), "shortFileName");
    }
}

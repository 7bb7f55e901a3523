use super::{ColumnBinding, Validate, ValidationState};
use crate::schema::ColumnId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    pub name: String,
    pub display_name: String,
    pub aggregation: String,
    pub column: ColumnBinding,
    #[serde(skip)]
    validation: ValidationState,
}

impl Measure {
    pub fn new(name: &str, display_name: &str, aggregation: &str, column: ColumnBinding) -> Self {
        Measure {
            name: name.to_string(),
            display_name: display_name.to_string(),
            aggregation: aggregation.to_string(),
            column,
            validation: ValidationState::default(),
        }
    }
}

impl Validate for Measure {
    fn validate(&mut self) {
        self.validation.reset();
        if !self.column.is_resolved() {
            self.validation
                .fail(format!("Measure {} has no column", self.name));
        }
    }

    fn validation(&self) -> &ValidationState {
        &self.validation
    }
}

/// The measures of the model, in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasuresCollection {
    pub name: String,
    pub measures: Vec<Measure>,
    #[serde(skip)]
    validation: ValidationState,
}

impl Default for MeasuresCollection {
    fn default() -> Self {
        MeasuresCollection {
            name: "Measures".to_string(),
            measures: Vec::new(),
            validation: ValidationState::default(),
        }
    }
}

impl MeasuresCollection {
    pub fn push(&mut self, measure: Measure) {
        self.measures.push(measure);
    }

    pub fn clear(&mut self) {
        self.measures.clear();
    }

    pub fn len(&self) -> usize {
        self.measures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measures.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Measure> {
        self.measures.iter()
    }

    /// Rebinds every measure whose column fails `keep` to an unresolved
    /// binding labelled with its display name. Returns how many changed.
    pub fn unbind_columns<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&ColumnId) -> bool,
    {
        let mut unbound = 0;
        for measure in &mut self.measures {
            let stale = match measure.column.column_id() {
                Some(id) => !keep(id),
                None => false,
            };
            if stale {
                measure.column = ColumnBinding::Unresolved {
                    label: measure.display_name.clone(),
                };
                unbound += 1;
            }
        }
        unbound
    }
}

impl Validate for MeasuresCollection {
    fn validate(&mut self) {
        self.validation.reset();
        if self.measures.is_empty() {
            self.validation.fail("Model requires at least one Measure");
        }
    }

    fn validation(&self) -> &ValidationState {
        &self.validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_collection_reports_one_message() {
        let mut measures = MeasuresCollection::default();
        measures.validate();
        assert!(!measures.is_valid());
        assert_eq!(
            measures.validation_messages(),
            ["Model requires at least one Measure".to_string()]
        );

        // revalidating must not accumulate messages
        measures.validate();
        assert_eq!(measures.validation_messages().len(), 1);
    }

    #[test]
    fn test_collection_with_measure_is_valid() {
        let mut measures = MeasuresCollection::default();
        measures.push(Measure::new(
            "amount",
            "Amount",
            "SUM",
            ColumnBinding::Resolved(ColumnId::new("LC_AMOUNT")),
        ));
        measures.validate();
        assert!(measures.is_valid());
        assert_eq!(measures.name, "Measures");
    }

    #[test]
    fn test_unresolved_measure_is_invalid() {
        let mut measure = Measure::new(
            "Profit",
            "Profit",
            "NONE",
            ColumnBinding::Unresolved {
                label: "Profit".to_string(),
            },
        );
        measure.validate();
        assert!(!measure.is_valid());
    }

    #[test]
    fn test_unbind_columns_keeps_label() {
        let mut measures = MeasuresCollection::default();
        measures.push(Measure::new(
            "amount",
            "Amount",
            "SUM",
            ColumnBinding::Resolved(ColumnId::new("LC_AMOUNT")),
        ));
        measures.push(Measure::new(
            "qty",
            "Quantity",
            "SUM",
            ColumnBinding::Resolved(ColumnId::new("LC_QTY")),
        ));

        let unbound = measures.unbind_columns(|id| id == &ColumnId::new("LC_QTY"));

        assert_eq!(unbound, 1);
        assert_eq!(
            measures.measures[0].column,
            ColumnBinding::Unresolved {
                label: "Amount".to_string()
            }
        );
        assert!(measures.measures[1].column.is_resolved());
        // already unresolved measures are left alone
        assert_eq!(measures.unbind_columns(|_| false), 1);
    }
}

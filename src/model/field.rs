use crate::error::ModelerError;
use crate::schema::{ColumnId, LogicalColumn};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A column of the current data source, offered as building material for
/// levels and measures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableField {
    pub name: String,
    pub display_name: Option<String>,
    pub aggregation: String,
    pub column: LogicalColumn,
}

impl AvailableField {
    pub fn from_column(column: LogicalColumn, locale: &str) -> Self {
        AvailableField {
            name: column.physical_name.clone(),
            display_name: column.display_name(locale).map(str::to_string),
            aggregation: column.aggregation.to_string(),
            column,
        }
    }

    pub fn column_id(&self) -> &ColumnId {
        &self.column.id
    }

    /// Points the field at updated column metadata. The field keeps its
    /// identity; display name and aggregation follow the column.
    pub fn update_column(&mut self, column: LogicalColumn, locale: &str) {
        self.display_name = column.display_name(locale).map(str::to_string);
        self.aggregation = column.aggregation.to_string();
        self.column = column;
    }
}

/// Case-insensitive ordering of display names. Absent names sort first.
pub fn compare_display_names(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a
            .chars()
            .flat_map(char::to_lowercase)
            .cmp(b.chars().flat_map(char::to_lowercase)),
    }
}

/// The field registry. Holds at most one field per column id and keeps
/// fields sorted by display name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AvailableFieldCollection {
    fields: Vec<AvailableField>,
}

impl AvailableFieldCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: AvailableField) -> Result<(), ModelerError> {
        if self.contains_column(field.column_id()) {
            return Err(ModelerError::DuplicateColumn(field.column_id().clone()));
        }
        self.fields.push(field);
        self.sort();
        Ok(())
    }

    /// Removes the fields bound to `ids`. Unknown ids are ignored.
    pub fn remove_all(&mut self, ids: &[ColumnId]) -> usize {
        let before = self.fields.len();
        self.fields.retain(|f| !ids.contains(f.column_id()));
        before - self.fields.len()
    }

    /// Stable, so fields with equal names keep their relative order.
    pub fn sort(&mut self) {
        self.fields.sort_by(|a, b| {
            compare_display_names(a.display_name.as_deref(), b.display_name.as_deref())
        });
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    pub fn contains_column(&self, id: &ColumnId) -> bool {
        self.find_by_column(id).is_some()
    }

    pub fn find_by_column(&self, id: &ColumnId) -> Option<&AvailableField> {
        self.fields.iter().find(|f| f.column_id() == id)
    }

    pub fn find_by_column_mut(&mut self, id: &ColumnId) -> Option<&mut AvailableField> {
        self.fields.iter_mut().find(|f| f.column_id() == id)
    }

    /// First field whose display name equals `label`.
    pub fn find_by_display_name(&self, label: &str) -> Option<&AvailableField> {
        self.fields
            .iter()
            .find(|f| f.display_name.as_deref() == Some(label))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AvailableField> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn is_sorted(&self) -> bool {
        self.fields.windows(2).all(|pair| {
            compare_display_names(
                pair[0].display_name.as_deref(),
                pair[1].display_name.as_deref(),
            ) != Ordering::Greater
        })
    }
}

impl<'a> IntoIterator for &'a AvailableFieldCollection {
    type Item = &'a AvailableField;
    type IntoIter = std::slice::Iter<'a, AvailableField>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AggregationType, DEFAULT_LOCALE};
    use rstest::*;

    fn field(id: &str, display: &str) -> AvailableField {
        AvailableField::from_column(
            LogicalColumn::new(id, display, &display.to_lowercase()),
            DEFAULT_LOCALE,
        )
    }

    #[fixture]
    fn registry() -> AvailableFieldCollection {
        let mut registry = AvailableFieldCollection::new();
        registry.add(field("LC_C", "city")).unwrap();
        registry.add(field("LC_A", "Amount")).unwrap();
        registry.add(field("LC_B", "Brand")).unwrap();
        registry
    }

    #[rstest]
    #[case::both_absent(None, None, Ordering::Equal)]
    #[case::absent_first(None, Some("a"), Ordering::Less)]
    #[case::absent_last(Some("a"), None, Ordering::Greater)]
    #[case::ignores_case(Some("apple"), Some("APPLE"), Ordering::Equal)]
    #[case::mixed_case(Some("banana"), Some("Apple"), Ordering::Greater)]
    #[case::prefix(Some("Rev"), Some("revenue"), Ordering::Less)]
    fn test_compare_display_names(
        #[case] a: Option<&str>,
        #[case] b: Option<&str>,
        #[case] expected: Ordering,
    ) {
        assert_eq!(compare_display_names(a, b), expected);
    }

    #[rstest]
    fn test_add_keeps_sort_order(registry: AvailableFieldCollection) {
        let names: Vec<_> = registry.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["amount", "brand", "city"]);
        assert!(registry.is_sorted());
    }

    #[rstest]
    fn test_add_rejects_duplicate_column(mut registry: AvailableFieldCollection) {
        let result = registry.add(field("LC_A", "Another Amount"));
        assert!(matches!(result, Err(ModelerError::DuplicateColumn(_))));
        assert_eq!(registry.len(), 3);
    }

    #[rstest]
    fn test_remove_all_ignores_unknown(mut registry: AvailableFieldCollection) {
        let removed = registry.remove_all(&[ColumnId::new("LC_A"), ColumnId::new("LC_X")]);
        assert_eq!(removed, 1);
        assert!(!registry.contains_column(&ColumnId::new("LC_A")));
        assert_eq!(registry.len(), 2);
    }

    #[rstest]
    fn test_unnamed_fields_sort_first(mut registry: AvailableFieldCollection) {
        let mut unnamed = field("LC_N", "ignored");
        unnamed.display_name = None;
        registry.add(unnamed).unwrap();
        assert_eq!(registry.iter().next().unwrap().column_id().as_str(), "LC_N");
    }

    #[rstest]
    fn test_find_by_display_name_is_first_match(mut registry: AvailableFieldCollection) {
        registry.add(field("LC_B2", "Brand")).unwrap();
        let found = registry.find_by_display_name("Brand").unwrap();
        assert_eq!(found.column_id().as_str(), "LC_B");
        assert!(registry.find_by_display_name("brand").is_none());
    }

    #[test]
    fn test_update_column_follows_metadata() {
        let mut f = field("LC_A", "Amount");
        let renamed = LogicalColumn::new("LC_A", "Net Amount", "amount")
            .with_aggregation(AggregationType::Sum);
        f.update_column(renamed, DEFAULT_LOCALE);
        assert_eq!(f.display_name.as_deref(), Some("Net Amount"));
        assert_eq!(f.aggregation, "SUM");
        assert_eq!(f.name, "amount");
    }
}

pub mod source;

pub use source::{JsonFileSchemaSource, SchemaSource, SourceError, StaticSchemaSource};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Locale used when a name has no entry for the requested locale.
pub const DEFAULT_LOCALE: &str = "en_US";

/// Stable identity of a column in the external schema.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnId(pub String);

impl ColumnId {
    pub fn new(id: impl Into<String>) -> Self {
        ColumnId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A name keyed by locale, e.g. `{"en_US": "Revenue", "de_DE": "Umsatz"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalizedString(pub BTreeMap<String, String>);

impl LocalizedString {
    pub fn new(locale: &str, value: impl Into<String>) -> Self {
        let mut values = BTreeMap::new();
        values.insert(locale.to_string(), value.into());
        LocalizedString(values)
    }

    /// Looks up `locale`, then [`DEFAULT_LOCALE`], then any entry.
    pub fn get(&self, locale: &str) -> Option<&str> {
        self.0
            .get(locale)
            .or_else(|| self.0.get(DEFAULT_LOCALE))
            .or_else(|| self.0.values().next())
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationType {
    #[default]
    None,
    Sum,
    Average,
    Count,
    CountDistinct,
    Minimum,
    Maximum,
}

impl fmt::Display for AggregationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let desc = match self {
            AggregationType::None => "NONE",
            AggregationType::Sum => "SUM",
            AggregationType::Average => "AVERAGE",
            AggregationType::Count => "COUNT",
            AggregationType::CountDistinct => "COUNT_DISTINCT",
            AggregationType::Minimum => "MINIMUM",
            AggregationType::Maximum => "MAXIMUM",
        };
        f.write_str(desc)
    }
}

/// A column of a logical table. This is the column reference the workspace
/// reconciles against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalColumn {
    pub id: ColumnId,
    pub name: LocalizedString,
    pub physical_name: String,
    #[serde(default)]
    pub aggregation: AggregationType,
}

impl LogicalColumn {
    pub fn new(id: &str, display_name: &str, physical_name: &str) -> Self {
        LogicalColumn {
            id: ColumnId::new(id),
            name: LocalizedString::new(DEFAULT_LOCALE, display_name),
            physical_name: physical_name.to_string(),
            aggregation: AggregationType::None,
        }
    }

    pub fn with_aggregation(mut self, aggregation: AggregationType) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn display_name(&self, locale: &str) -> Option<&str> {
        self.name.get(locale)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalTable {
    pub id: String,
    pub columns: Vec<LogicalColumn>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OlapLevel {
    pub name: String,
    pub reference_column: LogicalColumn,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OlapHierarchy {
    pub name: String,
    pub levels: Vec<OlapLevel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OlapDimension {
    pub name: String,
    pub hierarchies: Vec<OlapHierarchy>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OlapMeasure {
    pub name: String,
    pub column: LogicalColumn,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OlapCube {
    pub name: String,
    pub measures: Vec<OlapMeasure>,
}

/// Point-in-time description of the external schema.
///
/// Only the first logical table is modeled. `olap_dimensions` and
/// `olap_cubes` are present when the snapshot was saved from an authored
/// OLAP model and are imported verbatim by `set_domain`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    pub id: String,
    pub tables: Vec<LogicalTable>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub olap_dimensions: Vec<OlapDimension>,
    #[serde(default)]
    pub olap_cubes: Vec<OlapCube>,
}

impl SchemaSnapshot {
    /// Snapshot with a single table holding `columns` and nothing else.
    pub fn from_columns(id: &str, columns: Vec<LogicalColumn>) -> Self {
        SchemaSnapshot {
            id: id.to_string(),
            tables: vec![LogicalTable {
                id: format!("{}_table", id),
                columns,
            }],
            categories: Vec::new(),
            olap_dimensions: Vec::new(),
            olap_cubes: Vec::new(),
        }
    }

    pub fn primary_table(&self) -> Option<&LogicalTable> {
        self.tables.first()
    }

    pub fn columns(&self) -> &[LogicalColumn] {
        self.primary_table()
            .map(|table| table.columns.as_slice())
            .unwrap_or_default()
    }
}

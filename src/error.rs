use crate::model::NodeId;
use crate::schema::{ColumnId, SourceError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelerError {
    #[error("Schema source error: {0}")]
    Source(#[from] SourceError),

    #[error("No schema source bound to the workspace")]
    NoSource,

    #[error("Snapshot declares no logical table")]
    MissingPrimaryTable,

    #[error("A field for column {0} is already registered")]
    DuplicateColumn(ColumnId),

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),
}

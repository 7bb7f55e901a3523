use crate::schema::SchemaSnapshot;
use async_trait::async_trait;
use log::debug;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Produces schema snapshots for a workspace.
///
/// The workspace calls [`SchemaSource::generate_domain`] exactly once per
/// populate or refresh cycle.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    async fn generate_domain(&self) -> Result<SchemaSnapshot, SourceError>;
    fn database_name(&self) -> Option<String>;
    fn schema_name(&self) -> Option<String>;
    fn table_name(&self) -> String;
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Malformed schema: {0}")]
    MalformedSchema(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON format: {0}")]
    Json(#[from] serde_json::Error),
}

struct StaticState {
    snapshot: SchemaSnapshot,
    failure: Option<String>,
}

/// In-memory source. Clones share the same snapshot, so a host can keep a
/// handle and swap the snapshot after binding it to a workspace.
#[derive(Clone)]
pub struct StaticSchemaSource {
    database: Option<String>,
    table: String,
    state: Arc<Mutex<StaticState>>,
}

impl StaticSchemaSource {
    pub fn new(table: &str, snapshot: SchemaSnapshot) -> Self {
        StaticSchemaSource {
            database: None,
            table: table.to_string(),
            state: Arc::new(Mutex::new(StaticState {
                snapshot,
                failure: None,
            })),
        }
    }

    pub fn with_database(mut self, database: &str) -> Self {
        self.database = Some(database.to_string());
        self
    }

    pub fn set_snapshot(&self, snapshot: SchemaSnapshot) {
        self.lock().snapshot = snapshot;
    }

    /// Makes every following `generate_domain` call fail with a connection
    /// error until cleared with `None`.
    pub fn set_failure(&self, reason: Option<&str>) {
        self.lock().failure = reason.map(str::to_string);
    }

    fn lock(&self) -> MutexGuard<'_, StaticState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl SchemaSource for StaticSchemaSource {
    async fn generate_domain(&self) -> Result<SchemaSnapshot, SourceError> {
        let state = self.lock();
        match &state.failure {
            Some(reason) => Err(SourceError::Connection(reason.clone())),
            None => Ok(state.snapshot.clone()),
        }
    }

    fn database_name(&self) -> Option<String> {
        self.database.clone()
    }

    fn schema_name(&self) -> Option<String> {
        None
    }

    fn table_name(&self) -> String {
        self.table.clone()
    }
}

/// Reads the snapshot from a JSON file on every call, so edits to the file
/// show up on the next refresh.
pub struct JsonFileSchemaSource {
    path: PathBuf,
}

impl JsonFileSchemaSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileSchemaSource { path: path.into() }
    }
}

#[async_trait]
impl SchemaSource for JsonFileSchemaSource {
    async fn generate_domain(&self) -> Result<SchemaSnapshot, SourceError> {
        debug!("Reading schema snapshot from {}", self.path.display());
        let content = tokio::fs::read_to_string(&self.path).await?;
        let snapshot: SchemaSnapshot = serde_json::from_str(&content)?;
        if snapshot.tables.is_empty() {
            return Err(SourceError::MalformedSchema(format!(
                "{} declares no logical table",
                self.path.display()
            )));
        }
        Ok(snapshot)
    }

    fn database_name(&self) -> Option<String> {
        None
    }

    fn schema_name(&self) -> Option<String> {
        None
    }

    fn table_name(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::LogicalColumn;

    fn snapshot(id: &str) -> SchemaSnapshot {
        SchemaSnapshot::from_columns(id, vec![LogicalColumn::new("LC_A", "A", "a")])
    }

    #[tokio::test]
    async fn test_static_source_shares_state_between_clones() {
        let source = StaticSchemaSource::new("orders", snapshot("v1")).with_database("sales");
        let handle = source.clone();
        handle.set_snapshot(snapshot("v2"));

        let result = source.generate_domain().await.unwrap();
        assert_eq!(result.id, "v2");
        assert_eq!(source.database_name().as_deref(), Some("sales"));
        assert_eq!(source.table_name(), "orders");
    }

    #[tokio::test]
    async fn test_static_source_failure_toggle() {
        let source = StaticSchemaSource::new("orders", snapshot("v1"));
        source.set_failure(Some("database offline"));
        assert!(matches!(
            source.generate_domain().await,
            Err(SourceError::Connection(_))
        ));

        source.set_failure(None);
        assert!(source.generate_domain().await.is_ok());
    }

    #[tokio::test]
    async fn test_json_file_source_missing_file() {
        let source = JsonFileSchemaSource::new("/nonexistent/snapshot.json");
        assert!(matches!(
            source.generate_domain().await,
            Err(SourceError::Io(_))
        ));
        assert_eq!(source.table_name(), "snapshot");
    }

    #[tokio::test]
    async fn test_json_file_source_reads_snapshot() {
        let path = std::env::temp_dir().join(format!(
            "olap_modeler_source_{}.json",
            std::process::id()
        ));
        let json = serde_json::to_string(&snapshot("from_file")).unwrap();
        tokio::fs::write(&path, json).await.unwrap();

        let source = JsonFileSchemaSource::new(&path);
        let result = source.generate_domain().await.unwrap();
        assert_eq!(result.id, "from_file");
        assert_eq!(result.columns().len(), 1);

        tokio::fs::remove_file(&path).await.unwrap();
    }
}

use log::{error, info, warn};
use olap_modeler::config::ModelerConfig;
use olap_modeler::events::LoggingSink;
use olap_modeler::schema::{JsonFileSchemaSource, SchemaSource};
use olap_modeler::ModelerWorkspace;
use std::process;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = ModelerConfig::new().map_err(|e| {
        error!("Failed to initialize config: {}", e);
        e
    })?;

    let source = JsonFileSchemaSource::new(&config.snapshot_path);
    info!(
        "Modeling table {} from {}",
        source.table_name(),
        config.snapshot_path
    );

    let mut workspace = ModelerWorkspace::new(&config, LoggingSink);
    workspace.set_model_source(source);
    workspace.set_file_name(Some(&config.snapshot_path));

    if let Err(e) = workspace.populate().await {
        error!("Failed to load snapshot: {}", e);
        process::exit(1);
    }

    if config.refresh {
        let report = workspace.refresh().await.map_err(|e| {
            error!("Failed to refresh workspace: {}", e);
            e
        })?;
        info!("Refresh result: {:?}", report);
    }

    if !workspace.validate_model() {
        for message in workspace.validation_messages() {
            warn!("{}", message);
        }
    }

    println!("{}", serde_json::to_string_pretty(&workspace.state())?);
    Ok(())
}

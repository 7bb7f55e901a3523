pub mod config;
pub mod error;
pub mod events;
pub mod model;
pub mod schema;
pub mod workspace;

pub use error::ModelerError;
pub use workspace::{ModelerWorkspace, RefreshReport, Selection, WorkspaceState};

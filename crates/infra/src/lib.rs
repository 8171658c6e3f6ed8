//! Infrastructure layer: persistence, manifest IO, config, and the
//! reconciliation pipeline that ties them to the domain.

pub mod config;
pub mod manifest_source;
pub mod reconciler;
pub mod store;


pub use config::{ConfigError, QuartermasterConfig};
pub use manifest_source::{JsonFileManifest, ManifestSource};
pub use reconciler::{ReconcileError, ReconciliationOutcome, Reconciler};
pub use store::{InMemoryStore, InventoryStore, SqliteStore, StoreError};

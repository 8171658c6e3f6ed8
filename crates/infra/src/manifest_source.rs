//! Manifest sources: where the desired state comes from.

use std::path::PathBuf;

use tracing::debug;

use quartermaster_inventory::{Manifest, ManifestError};

/// Produces a manifest, read once per reconciliation pass.
pub trait ManifestSource {
    fn load(&self) -> Result<Manifest, ManifestError>;
}

/// A JSON array of `{item, quantity, description}` records on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonFileManifest {
    path: PathBuf,
}

impl JsonFileManifest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ManifestSource for JsonFileManifest {
    fn load(&self) -> Result<Manifest, ManifestError> {
        let text = std::fs::read_to_string(&self.path)
            .map_err(|e| ManifestError::unreadable(format!("{}: {e}", self.path.display())))?;
        let manifest = Manifest::from_json(&text).map_err(|e| match e {
            ManifestError::Unreadable(msg) => {
                ManifestError::unreadable(format!("{}: {msg}", self.path.display()))
            }
            other => other,
        })?;
        debug!(path = %self.path.display(), entries = manifest.len(), "manifest loaded");
        Ok(manifest)
    }
}

//! Configuration loading and representation.
//!
//! Values come from the environment; unset values fall back to the defaults
//! the quartermaster has always used (`wagon.db`, `inventory.json`).

use std::path::PathBuf;

use thiserror::Error;
use tracing::warn;

use quartermaster_inventory::DuplicatePolicy;

pub const ENV_DB: &str = "QUARTERMASTER_DB";
pub const ENV_MANIFEST: &str = "QUARTERMASTER_MANIFEST";
pub const ENV_DUPLICATES: &str = "QUARTERMASTER_DUPLICATES";

pub const DEFAULT_DB: &str = "wagon.db";
pub const DEFAULT_MANIFEST: &str = "inventory.json";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Resolved runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuartermasterConfig {
    pub db_path: PathBuf,
    pub manifest_path: PathBuf,
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for QuartermasterConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB),
            manifest_path: PathBuf::from(DEFAULT_MANIFEST),
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

impl QuartermasterConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` to resolve variables.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let db_path = lookup(ENV_DB).map(PathBuf::from).unwrap_or_else(|| {
            warn!("{ENV_DB} not set; using ./{DEFAULT_DB}");
            defaults.db_path
        });

        let manifest_path = lookup(ENV_MANIFEST)
            .map(PathBuf::from)
            .unwrap_or(defaults.manifest_path);

        let duplicate_policy = match lookup(ENV_DUPLICATES) {
            Some(raw) => raw
                .trim()
                .parse::<DuplicatePolicy>()
                .map_err(|reason| ConfigError::Invalid {
                    var: ENV_DUPLICATES,
                    reason,
                })?,
            None => defaults.duplicate_policy,
        };

        Ok(Self {
            db_path,
            manifest_path,
            duplicate_policy,
        })
    }
}

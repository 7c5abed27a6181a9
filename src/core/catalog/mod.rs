use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::core::config::CatalogConfig;

const ANSIBLE_REFERENCE_JSON: &str = include_str!("ansible_reference.json");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("malformed argument catalog: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("cannot read argument catalog {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgType {
    String,
    Int,
    Bool,
    /// Inventory path or comma separated host list.
    Inventory,
}

/// One named argument a job type accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub arg_type: ArgType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// Source of valid argument names per job type. Consulted only while schemas
/// are being built; lookups must be deterministic for one catalog snapshot.
pub trait ReferenceCatalog: Send + Sync {
    fn lookup(&self, job_type: &str) -> Option<Vec<ArgumentSpec>>;
}

/// Catalog document keyed by job type, arguments in declared order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BundledCatalog {
    job_types: BTreeMap<String, Vec<ArgumentSpec>>,
}

impl BundledCatalog {
    /// The argument reference compiled into the binary.
    pub fn load() -> Result<Self, CatalogError> {
        Self::parse(ANSIBLE_REFERENCE_JSON)
    }

    pub fn parse(document: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(document)?)
    }

    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| CatalogError::Unreadable {
                    path: path.display().to_string(),
                    source,
                })?;
        let catalog = Self::parse(&content)?;
        info!(
            "Loaded argument catalog from {} (job types: {})",
            path.display(),
            catalog.job_types().collect::<Vec<_>>().join(", ")
        );
        Ok(catalog)
    }

    /// The `[catalog] path` file when set, otherwise the bundled reference.
    pub async fn configured(config: &CatalogConfig) -> Result<Self, CatalogError> {
        match &config.path {
            Some(path) => Self::from_path(path).await,
            None => Self::load(),
        }
    }

    pub fn job_types(&self) -> impl Iterator<Item = &str> {
        self.job_types.keys().map(String::as_str)
    }
}

impl ReferenceCatalog for BundledCatalog {
    fn lookup(&self, job_type: &str) -> Option<Vec<ArgumentSpec>> {
        self.job_types.get(job_type).cloned()
    }
}

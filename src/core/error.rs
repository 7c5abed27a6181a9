use thiserror::Error;

use crate::core::acl::AclError;
use crate::core::catalog::CatalogError;
use crate::core::schema::{DefinitionError, ValidationErrors};
use crate::core::settings::SettingsError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("invalid input: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Acl(#[from] AclError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("job runner failed: {0}")]
    Runner(String),
}

impl EngineError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        EngineError::NotFound { entity, id }
    }

    /// Field errors, when this is a validation failure.
    pub fn validation(&self) -> Option<&ValidationErrors> {
        match self {
            EngineError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

mod no_default;
mod periodic_payloads;

use std::sync::Arc;

use serde_json::Value;

use super::SchemaRegistry;
use crate::core::catalog::BundledCatalog;
use crate::core::config::RedactionConfig;
use crate::core::schema::{RedactionFilter, Record};

fn registry() -> SchemaRegistry {
    let catalog = BundledCatalog::load().unwrap();
    let filter = Arc::new(RedactionFilter::from_config(&RedactionConfig::default()));
    SchemaRegistry::build(&catalog, filter).unwrap()
}

fn obj(value: Value) -> Record {
    value.as_object().cloned().unwrap()
}

use std::sync::Arc;

use anyhow::{Result, bail};

use super::{GlobalArgs, load_config, print_json};
use crate::core::catalog::BundledCatalog;
use crate::core::jobs::SchemaRegistry;
use crate::core::schema::RedactionFilter;
use crate::core::terminal::print_error;

/// `schema <name>`: field descriptions without touching the database.
pub async fn run_schema_command(global: &GlobalArgs) -> Result<()> {
    let name = global.command.get(1).map(String::as_str).unwrap_or("");
    let config = load_config(global).await?;
    let catalog = BundledCatalog::configured(&config.catalog).await?;
    let redaction = Arc::new(RedactionFilter::from_config(&config.redaction));
    let registry = SchemaRegistry::build(&catalog, redaction)?;

    match registry.by_name(name) {
        Some(schema) => print_json(&schema.describe()),
        None => {
            print_error(&format!(
                "Unknown or missing schema. Expected: {}",
                SchemaRegistry::NAMES.join(", ")
            ));
            bail!("unknown schema '{}'", name)
        }
    }
}

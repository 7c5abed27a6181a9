use std::sync::Arc;

use crate::core::catalog::{ArgType, ArgumentSpec, ReferenceCatalog};

use super::errors::DefinitionError;
use super::field::ScalarSpec;
use super::redaction::RedactionFilter;
use super::{Schema, SchemaBuilder};

/// A job type's argument payload: which catalog entry it comes from and
/// which names are supplied elsewhere in the enclosing schema.
#[derive(Debug, Clone, Copy)]
pub struct ArgumentSet {
    pub name: &'static str,
    pub job_type: &'static str,
    pub exclude: &'static [&'static str],
}

/// Scalar fields for every catalog argument of `job_type` not in `exclude`,
/// in catalog order. With `no_default` the catalog defaults are dropped so the
/// payload only ever carries what the caller submitted.
pub fn generate_fields(
    catalog: &dyn ReferenceCatalog,
    job_type: &str,
    exclude: &[&str],
    no_default: bool,
) -> Result<Vec<(String, ScalarSpec)>, DefinitionError> {
    let arguments = catalog
        .lookup(job_type)
        .ok_or_else(|| DefinitionError::UnknownJobType(job_type.to_string()))?;
    Ok(arguments
        .into_iter()
        .filter(|arg| !exclude.contains(&arg.name.as_str()))
        .map(|arg| {
            let spec = field_for(&arg, no_default);
            (arg.name, spec)
        })
        .collect())
}

fn field_for(arg: &ArgumentSpec, no_default: bool) -> ScalarSpec {
    let mut spec = match arg.arg_type {
        ArgType::String => ScalarSpec::string().allow_blank(),
        ArgType::Int => ScalarSpec::integer(),
        ArgType::Bool => ScalarSpec::boolean(),
        ArgType::Inventory => ScalarSpec::reference("Inventory").allow_blank(),
    };
    if let Some(format) = &arg.format {
        spec = spec.with_format(format.clone());
    }
    if !no_default {
        if let Some(default) = &arg.default {
            spec = spec.with_default(default.clone());
        }
    }
    spec
}

/// Redacted argument schema for one job type.
pub fn arguments_schema(
    catalog: &dyn ReferenceCatalog,
    set: &ArgumentSet,
    no_default: bool,
    redaction: Arc<RedactionFilter>,
) -> Result<Schema, DefinitionError> {
    let mut builder = SchemaBuilder::new(set.name).redact_with(redaction);
    for (name, spec) in generate_fields(catalog, set.job_type, set.exclude, no_default)? {
        builder = builder.scalar(name, spec);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::BundledCatalog;
    use serde_json::json;

    fn catalog() -> BundledCatalog {
        BundledCatalog::parse(
            r#"{
                "playbook": [
                    { "name": "become", "type": "bool" },
                    { "name": "forks", "type": "int", "default": 5 },
                    { "name": "inventory", "type": "inventory", "format": "inventory" },
                    { "name": "private_key", "type": "string", "format": "secretfile" }
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn excluded_names_are_skipped_in_order() {
        let fields = generate_fields(&catalog(), "playbook", &["inventory"], true).unwrap();
        let names: Vec<&str> = fields.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["become", "forks", "private_key"]);
    }

    #[test]
    fn defaults_follow_the_no_default_flag() {
        let with = generate_fields(&catalog(), "playbook", &[], false).unwrap();
        let without = generate_fields(&catalog(), "playbook", &[], true).unwrap();
        assert_eq!(with[1].1.default, Some(json!(5)));
        assert!(without.iter().all(|(_, spec)| spec.default.is_none()));
    }

    #[test]
    fn formats_are_carried_over() {
        let fields = generate_fields(&catalog(), "playbook", &[], true).unwrap();
        assert_eq!(fields[2].1.format.as_deref(), Some("inventory"));
        assert_eq!(fields[3].1.format.as_deref(), Some("secretfile"));
    }

    #[test]
    fn unknown_job_type_fails_definition() {
        let err = generate_fields(&catalog(), "shell", &[], true).unwrap_err();
        assert_eq!(err, DefinitionError::UnknownJobType("shell".to_string()));
    }

    #[test]
    fn argument_schema_redacts_on_output() {
        let set = ArgumentSet {
            name: "PlaybookArguments",
            job_type: "playbook",
            exclude: &["inventory"],
        };
        let filter = Arc::new(RedactionFilter::new(["private_key"], "[~~ENCRYPTED~~]"));
        let schema = arguments_schema(&catalog(), &set, true, filter).unwrap();

        let stored = schema
            .validate_create(&json!({ "private_key": "/keys/id_rsa", "forks": "8" }))
            .unwrap();
        assert_eq!(stored["forks"], 8);
        assert!(!stored.contains_key("become"));

        let rep = schema.represent(&stored);
        assert_eq!(rep["private_key"], "[~~ENCRYPTED~~]");
        assert_eq!(rep["forks"], 8);
    }
}

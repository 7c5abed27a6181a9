use std::sync::Arc;

use crate::core::schema::{
    DefinitionError, DiscriminatedField, Field, ScalarSpec, Schema, SchemaBuilder,
};

use super::TemplateKind;

/// `data` under `kind = Task`.
pub fn task_parameters_schema(playbook_args: Arc<Schema>) -> Result<Schema, DefinitionError> {
    SchemaBuilder::new("TaskTemplateParameters")
        .scalar("playbook", ScalarSpec::reference("Playbook").required())
        .field("vars", Field::optional_nested(playbook_args))
        .build()
}

/// `data` under `kind = Module`.
pub fn module_parameters_schema(module_args: Arc<Schema>) -> Result<Schema, DefinitionError> {
    SchemaBuilder::new("ModuleTemplateParameters")
        .scalar("group", ScalarSpec::string().with_default("all"))
        .scalar("module", ScalarSpec::reference("Module").required())
        .scalar("args", ScalarSpec::string().allow_blank().with_default(""))
        .field("vars", Field::optional_nested(module_args))
        .build()
}

/// ExecutionTemplate. The update variant keeps `kind` read-only so the
/// payload shape chosen at creation never changes.
pub fn template_schema(
    task_params: Arc<Schema>,
    module_params: Arc<Schema>,
    for_update: bool,
) -> Result<Schema, DefinitionError> {
    let kind = ScalarSpec::choice(TemplateKind::ALL.map(TemplateKind::as_str))
        .with_default(TemplateKind::Task.as_str());
    let builder = SchemaBuilder::new(if for_update {
        "OneExecutionTemplate"
    } else {
        "CreateExecutionTemplate"
    })
    .read_only("id", Field::Scalar(ScalarSpec::integer()))
    .scalar("name", ScalarSpec::string().required());

    let builder = if for_update {
        builder.read_only("kind", Field::Scalar(kind))
    } else {
        builder.scalar("kind", kind)
    };

    builder
        .scalar("notes", ScalarSpec::text().with_default(""))
        .scalar(
            "inventory",
            ScalarSpec::reference("Inventory")
                .with_format("inventory")
                .allow_blank(),
        )
        .discriminated(
            "data",
            DiscriminatedField::on("kind")
                .nested(TemplateKind::Task.as_str(), task_params)
                .nested(TemplateKind::Module.as_str(), module_params)
                .required(),
        )
        .build()
}

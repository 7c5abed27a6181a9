use crate::core::schema::{
    Branch, DefinitionError, DiscriminatedField, Field, ScalarSpec, Schema, SchemaBuilder,
};

use super::{PeriodicKind, ScheduleType};

pub const DEFAULT_CRONTAB: &str = "* * * * *";

/// PeriodicTask. `template_opt` is discriminated by the value of `template`,
/// which is itself discriminated by `kind`.
pub fn periodic_task_schema() -> Result<Schema, DefinitionError> {
    let playbook = PeriodicKind::Playbook.as_str();
    let module = PeriodicKind::Module.as_str();
    let template = PeriodicKind::Template.as_str();

    SchemaBuilder::new("OnePeriodictask")
        .read_only("id", Field::Scalar(ScalarSpec::integer()))
        .scalar("name", ScalarSpec::string().required())
        .scalar(
            "kind",
            ScalarSpec::choice(PeriodicKind::ALL.map(PeriodicKind::as_str)).with_default(playbook),
        )
        .discriminated(
            "mode",
            DiscriminatedField::on("kind")
                .scalar(playbook, ScalarSpec::reference("Playbook").allow_blank())
                .scalar(module, ScalarSpec::reference("Module").allow_blank())
                .hidden(template),
        )
        .scalar(
            "inventory",
            ScalarSpec::reference("Inventory")
                .with_format("inventory")
                .allow_blank(),
        )
        .scalar("save_result", ScalarSpec::boolean().with_default(true))
        .discriminated(
            "template",
            DiscriminatedField::on("kind")
                .hidden(playbook)
                .hidden(module)
                .scalar(
                    template,
                    ScalarSpec::foreign_key("ExecutionTemplate")
                        .allow_blank()
                        .allow_null(),
                ),
        )
        .discriminated(
            "template_opt",
            DiscriminatedField::on("template").otherwise(Branch::Scalar(
                ScalarSpec::string().allow_blank().allow_null(),
            )),
        )
        .scalar("enabled", ScalarSpec::boolean().with_default(true))
        .scalar(
            "type",
            ScalarSpec::choice(ScheduleType::ALL.map(ScheduleType::as_str))
                .with_default(ScheduleType::Crontab.as_str()),
        )
        .discriminated(
            "schedule",
            DiscriminatedField::on("type")
                .scalar(
                    ScheduleType::Crontab.as_str(),
                    ScalarSpec::crontab().allow_blank().with_default(DEFAULT_CRONTAB),
                )
                .scalar(
                    ScheduleType::Interval.as_str(),
                    ScalarSpec::uptime().with_default(0),
                )
                .required(),
        )
        .scalar("notes", ScalarSpec::text().with_default(""))
        .build()
}

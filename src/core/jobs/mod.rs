//! Entity schemas for execution templates and periodic tasks, built once from
//! the argument catalog at startup.

mod periodic;
mod templates;

use std::sync::Arc;

use tracing::info;

use crate::core::catalog::ReferenceCatalog;
use crate::core::schema::{
    ArgumentSet, DefinitionError, RedactionFilter, Schema, arguments_schema,
};

pub use periodic::periodic_task_schema;
pub use templates::{module_parameters_schema, task_parameters_schema, template_schema};

pub const PLAYBOOK_ARGUMENTS: ArgumentSet = ArgumentSet {
    name: "PlaybookArguments",
    job_type: "playbook",
    exclude: &["inventory"],
};

pub const MODULE_ARGUMENTS: ArgumentSet = ArgumentSet {
    name: "ModuleArguments",
    job_type: "module",
    exclude: &["args", "group", "inventory"],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    Task,
    Module,
}

impl TemplateKind {
    pub const ALL: [TemplateKind; 2] = [TemplateKind::Task, TemplateKind::Module];

    pub fn as_str(self) -> &'static str {
        match self {
            TemplateKind::Task => "Task",
            TemplateKind::Module => "Module",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodicKind {
    Playbook,
    Module,
    Template,
}

impl PeriodicKind {
    pub const ALL: [PeriodicKind; 3] = [
        PeriodicKind::Playbook,
        PeriodicKind::Module,
        PeriodicKind::Template,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PeriodicKind::Playbook => "PLAYBOOK",
            PeriodicKind::Module => "MODULE",
            PeriodicKind::Template => "TEMPLATE",
        }
    }

    pub fn parse(kind: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleType {
    Crontab,
    Interval,
}

impl ScheduleType {
    pub const ALL: [ScheduleType; 2] = [ScheduleType::Crontab, ScheduleType::Interval];

    pub fn as_str(self) -> &'static str {
        match self {
            ScheduleType::Crontab => "CRONTAB",
            ScheduleType::Interval => "INTERVAL",
        }
    }
}

/// Every schema the engine validates against, keyed by a stable name.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    pub playbook_args: Arc<Schema>,
    pub module_args: Arc<Schema>,
    pub template_create: Arc<Schema>,
    pub template_update: Arc<Schema>,
    pub periodic_task: Arc<Schema>,
}

impl SchemaRegistry {
    pub const NAMES: [&'static str; 5] = [
        "template",
        "template-update",
        "periodic-task",
        "playbook-args",
        "module-args",
    ];

    /// Fails when the catalog lacks one of the argument job types.
    pub fn build(
        catalog: &dyn ReferenceCatalog,
        redaction: Arc<RedactionFilter>,
    ) -> Result<Self, DefinitionError> {
        let playbook_args = Arc::new(arguments_schema(
            catalog,
            &PLAYBOOK_ARGUMENTS,
            true,
            redaction.clone(),
        )?);
        let module_args = Arc::new(arguments_schema(
            catalog,
            &MODULE_ARGUMENTS,
            true,
            redaction,
        )?);

        let task_params = Arc::new(task_parameters_schema(playbook_args.clone())?);
        let module_params = Arc::new(module_parameters_schema(module_args.clone())?);
        let template_create = Arc::new(template_schema(
            task_params.clone(),
            module_params.clone(),
            false,
        )?);
        let template_update = Arc::new(template_schema(task_params, module_params, true)?);
        let periodic_task = Arc::new(periodic_task_schema()?);

        info!(
            "Schema registry built: {} playbook arguments, {} module arguments",
            playbook_args.fields().len(),
            module_args.fields().len()
        );

        Ok(Self {
            playbook_args,
            module_args,
            template_create,
            template_update,
            periodic_task,
        })
    }

    pub fn by_name(&self, name: &str) -> Option<&Arc<Schema>> {
        match name {
            "template" => Some(&self.template_create),
            "template-update" => Some(&self.template_update),
            "periodic-task" => Some(&self.periodic_task),
            "playbook-args" => Some(&self.playbook_args),
            "module-args" => Some(&self.module_args),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests;

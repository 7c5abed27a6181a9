//! Operations over templates, periodic tasks, permissions and settings:
//! validate, normalize, persist, represent.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::core::acl::{AclPermission, AclRole, AclTarget, Member};
use crate::core::catalog::BundledCatalog;
use crate::core::config::EngineConfig;
use crate::core::consistency::{ConsistencyEnforcer, WriteOp};
use crate::core::error::EngineError;
use crate::core::jobs::SchemaRegistry;
use crate::core::runner::{ExecuteResponse, HistoryRunner, JobReference, JobRunner};
use crate::core::schema::{RedactionFilter, Record, Schema, ValidationErrors};
use crate::core::store::{EntityKind, IdentityStore, Persistence, Store};

pub struct JobEngine {
    store: Store,
    schemas: SchemaRegistry,
    enforcer: ConsistencyEnforcer,
    runner: Arc<dyn JobRunner>,
}

impl JobEngine {
    pub fn new(
        store: Store,
        schemas: SchemaRegistry,
        enforcer: ConsistencyEnforcer,
        runner: Arc<dyn JobRunner>,
    ) -> Self {
        Self {
            store,
            schemas,
            enforcer,
            runner,
        }
    }

    /// Catalog, schemas, store and runner as configured.
    pub async fn from_config(config: &EngineConfig, database: &Path) -> Result<Self, EngineError> {
        let catalog = BundledCatalog::configured(&config.catalog).await?;
        let redaction = Arc::new(RedactionFilter::from_config(&config.redaction));
        let schemas = SchemaRegistry::build(&catalog, redaction)?;
        let store = Store::open(database).await?;
        let runner = Arc::new(HistoryRunner::new(store.clone()));
        Ok(Self::new(store, schemas, ConsistencyEnforcer::standard(), runner))
    }

    /// Engine over an in-memory store.
    #[cfg(test)]
    pub fn in_memory(
        catalog: &dyn crate::core::catalog::ReferenceCatalog,
        config: &EngineConfig,
    ) -> Result<Self, EngineError> {
        let redaction = Arc::new(RedactionFilter::from_config(&config.redaction));
        let schemas = SchemaRegistry::build(catalog, redaction)?;
        let store = Store::open_in_memory()?;
        let runner = Arc::new(HistoryRunner::new(store.clone()));
        Ok(Self::new(store, schemas, ConsistencyEnforcer::standard(), runner))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    // Execution templates

    pub async fn create_template(&self, input: &Value) -> Result<Record, EngineError> {
        let data = self.schemas.template_create.validate_create(input)?;
        let id = self
            .enforcer
            .commit(&self.store, EntityKind::ExecutionTemplate, WriteOp::Create, data)
            .await?;
        info!("Created execution template {}", id);
        self.get_template(id).await
    }

    pub async fn update_template(&self, id: i64, input: &Value) -> Result<Record, EngineError> {
        let schema = self.schemas.template_update.clone();
        self.update_entity(&schema, EntityKind::ExecutionTemplate, id, input)
            .await?;
        self.get_template(id).await
    }

    pub async fn get_template(&self, id: i64) -> Result<Record, EngineError> {
        let stored = self.load(EntityKind::ExecutionTemplate, id).await?;
        Ok(self.schemas.template_update.represent(&stored))
    }

    pub async fn list_templates(&self) -> Result<Vec<Record>, EngineError> {
        let records = self.store.list_records(EntityKind::ExecutionTemplate).await?;
        Ok(records
            .iter()
            .map(|r| self.schemas.template_update.represent(r))
            .collect())
    }

    pub async fn delete_template(&self, id: i64) -> Result<(), EngineError> {
        self.delete(EntityKind::ExecutionTemplate, id).await
    }

    // Periodic tasks

    pub async fn create_periodic_task(&self, input: &Value) -> Result<Record, EngineError> {
        let data = self.schemas.periodic_task.validate_create(input)?;
        let id = self
            .enforcer
            .commit_with(&self.store, EntityKind::PeriodicTask, WriteOp::Create, |tx, _| {
                check_template_reference(tx, &data)?;
                Ok(data)
            })
            .await?;
        info!("Created periodic task {}", id);
        self.get_periodic_task(id).await
    }

    pub async fn update_periodic_task(&self, id: i64, input: &Value) -> Result<Record, EngineError> {
        let schema = self.schemas.periodic_task.clone();
        self.update_entity(&schema, EntityKind::PeriodicTask, id, input)
            .await?;
        self.get_periodic_task(id).await
    }

    pub async fn get_periodic_task(&self, id: i64) -> Result<Record, EngineError> {
        let stored = self.load(EntityKind::PeriodicTask, id).await?;
        Ok(self.schemas.periodic_task.represent(&stored))
    }

    pub async fn list_periodic_tasks(&self) -> Result<Vec<Record>, EngineError> {
        let records = self.store.list_records(EntityKind::PeriodicTask).await?;
        Ok(records
            .iter()
            .map(|r| self.schemas.periodic_task.represent(r))
            .collect())
    }

    pub async fn delete_periodic_task(&self, id: i64) -> Result<(), EngineError> {
        self.delete(EntityKind::PeriodicTask, id).await
    }

    /// Start a stored periodic task without waiting for it.
    pub async fn execute_periodic_task(&self, id: i64) -> Result<ExecuteResponse, EngineError> {
        let stored = self.load(EntityKind::PeriodicTask, id).await?;
        let job = JobReference::from_periodic_task(id, &stored)?;
        let history_id = self.runner.execute(&job, false).await?;
        let inventory = stored
            .get("inventory")
            .and_then(Value::as_str)
            .unwrap_or_default();
        Ok(ExecuteResponse::started(inventory, history_id))
    }

    // Permissions

    pub async fn grant(
        &self,
        target: AclTarget,
        member: Member,
        role: AclRole,
    ) -> Result<AclPermission, EngineError> {
        self.load(target.entity, target.id).await?;
        let known = match member {
            Member::User(id) => self.store.user_exists(id).await?,
            Member::Group(id) => self.store.group_exists(id).await?,
        };
        if !known {
            let entity = match member {
                Member::User(_) => "User",
                Member::Group(_) => "UserGroup",
            };
            return Err(EngineError::not_found(entity, member.id()));
        }
        let permission = self.store.insert_permission(target, member, role).await?;
        info!(
            "Granted {} on {} {} to {} {}",
            role.as_str(),
            target.entity.label(),
            target.id,
            member.member_type().as_str(),
            member.id()
        );
        Ok(permission)
    }

    pub async fn revoke(&self, permission_id: i64) -> Result<(), EngineError> {
        if self.store.delete_permission(permission_id).await? {
            Ok(())
        } else {
            Err(EngineError::not_found("ACLPermission", permission_id))
        }
    }

    pub async fn permissions(&self, target: AclTarget) -> Result<Vec<AclPermission>, EngineError> {
        self.load(target.entity, target.id).await?;
        self.store.permissions_for(target).await
    }

    // User settings

    pub async fn user_settings(&self, user_id: i64) -> Result<Value, EngineError> {
        self.require_user(user_id).await?;
        let settings = self.store.load_user_settings(user_id).await?;
        Ok(settings.settings_copy()?)
    }

    pub async fn set_user_settings(&self, user_id: i64, value: &Value) -> Result<Value, EngineError> {
        self.require_user(user_id).await?;
        let mut settings = self.store.load_user_settings(user_id).await?;
        settings.set_data_as(value)?;
        self.store.save_user_settings(&settings).await?;
        Ok(settings.data()?)
    }

    pub async fn reset_user_settings(&self, user_id: i64) -> Result<Value, EngineError> {
        self.require_user(user_id).await?;
        let mut settings = self.store.load_user_settings(user_id).await?;
        settings.clear_data();
        self.store.save_user_settings(&settings).await?;
        Ok(settings.data()?)
    }

    // Shared steps

    /// Validate, prune and normalize against the record as read inside the
    /// write transaction.
    async fn update_entity(
        &self,
        schema: &Schema,
        entity: EntityKind,
        id: i64,
        input: &Value,
    ) -> Result<(), EngineError> {
        self.enforcer
            .commit_with(&self.store, entity, WriteOp::Update(id), |tx, existing| {
                let existing = existing.ok_or_else(|| EngineError::not_found(entity.label(), id))?;
                let mut patch = schema.validate_update(input, existing)?;
                if entity == EntityKind::PeriodicTask {
                    check_template_reference(tx, &patch)?;
                }

                let mut merged = existing.clone();
                merged.extend(patch.clone());
                for stale in schema.prune(&merged) {
                    patch.insert(stale, Value::Null);
                }
                Ok(patch)
            })
            .await?;
        info!("Updated {} {}", entity.label(), id);
        Ok(())
    }

    async fn require_user(&self, user_id: i64) -> Result<(), EngineError> {
        if self.store.user_exists(user_id).await? {
            Ok(())
        } else {
            Err(EngineError::not_found("User", user_id))
        }
    }

    async fn load(&self, entity: EntityKind, id: i64) -> Result<Record, EngineError> {
        self.store
            .load_record(entity, id)
            .await?
            .ok_or_else(|| EngineError::not_found(entity.label(), id))
    }

    async fn delete(&self, entity: EntityKind, id: i64) -> Result<(), EngineError> {
        if self.store.delete_record(entity, id).await? {
            info!("Deleted {} {}", entity.label(), id);
            Ok(())
        } else {
            Err(EngineError::not_found(entity.label(), id))
        }
    }
}

/// A selected template must exist; reported against the `template` field.
fn check_template_reference(tx: &dyn Persistence, data: &Record) -> Result<(), EngineError> {
    let Some(template_id) = data.get("template").and_then(Value::as_i64) else {
        return Ok(());
    };
    if tx.load(EntityKind::ExecutionTemplate, template_id)?.is_some() {
        return Ok(());
    }
    Err(ValidationErrors::single(
        "template",
        format!("Invalid pk \"{}\" - object does not exist.", template_id),
    )
    .into())
}

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::core::error::EngineError;
use crate::core::jobs::PeriodicKind;
use crate::core::schema::Record;
use crate::core::store::Store;
use crate::core::store::types::NewHistory;

/// What a periodic task asks the runner to start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "UPPERCASE")]
pub enum JobReference {
    Playbook {
        task_id: i64,
        playbook: String,
        inventory: String,
    },
    Module {
        task_id: i64,
        module: String,
        inventory: String,
    },
    Template {
        task_id: i64,
        template: i64,
        option: Option<String>,
    },
}

impl JobReference {
    pub fn from_periodic_task(task_id: i64, record: &Record) -> Result<Self, EngineError> {
        let text = |key: &str| {
            record
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let kind = record.get("kind").and_then(Value::as_str).unwrap_or_default();
        match PeriodicKind::parse(kind) {
            Some(PeriodicKind::Playbook) => Ok(JobReference::Playbook {
                task_id,
                playbook: text("mode"),
                inventory: text("inventory"),
            }),
            Some(PeriodicKind::Module) => Ok(JobReference::Module {
                task_id,
                module: text("mode"),
                inventory: text("inventory"),
            }),
            Some(PeriodicKind::Template) => {
                let template = record
                    .get("template")
                    .and_then(Value::as_i64)
                    .ok_or_else(|| {
                        EngineError::Runner(format!(
                            "periodic task {} has no template selected",
                            task_id
                        ))
                    })?;
                let option = record
                    .get("template_opt")
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string);
                Ok(JobReference::Template {
                    task_id,
                    template,
                    option,
                })
            }
            None => Err(EngineError::Runner(format!(
                "periodic task {} has unknown kind '{}'",
                task_id, kind
            ))),
        }
    }

    pub fn task_id(&self) -> i64 {
        match self {
            JobReference::Playbook { task_id, .. }
            | JobReference::Module { task_id, .. }
            | JobReference::Template { task_id, .. } => *task_id,
        }
    }

    pub fn kind(&self) -> PeriodicKind {
        match self {
            JobReference::Playbook { .. } => PeriodicKind::Playbook,
            JobReference::Module { .. } => PeriodicKind::Module,
            JobReference::Template { .. } => PeriodicKind::Template,
        }
    }
}

/// Starts jobs. Returns the identifier of the recorded run.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn execute(&self, job: &JobReference, sync: bool) -> Result<i64, EngineError>;
}

/// Records each run request in the history table without executing it.
pub struct HistoryRunner {
    store: Store,
}

impl HistoryRunner {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl JobRunner for HistoryRunner {
    async fn execute(&self, job: &JobReference, sync: bool) -> Result<i64, EngineError> {
        let status = if sync { "RUN" } else { "DELAY" };
        let entry = match job {
            JobReference::Playbook {
                task_id,
                playbook,
                inventory,
            } => NewHistory {
                kind: job.kind().as_str().to_string(),
                mode: playbook.clone(),
                inventory: inventory.clone(),
                status: status.to_string(),
                periodic_task_id: Some(*task_id),
                template_id: None,
                template_option: None,
            },
            JobReference::Module {
                task_id,
                module,
                inventory,
            } => NewHistory {
                kind: job.kind().as_str().to_string(),
                mode: module.clone(),
                inventory: inventory.clone(),
                status: status.to_string(),
                periodic_task_id: Some(*task_id),
                template_id: None,
                template_option: None,
            },
            JobReference::Template {
                task_id,
                template,
                option,
            } => NewHistory {
                kind: job.kind().as_str().to_string(),
                mode: String::new(),
                inventory: String::new(),
                status: status.to_string(),
                periodic_task_id: Some(*task_id),
                template_id: Some(*template),
                template_option: option.clone(),
            },
        };
        let history_id = self.store.insert_history(&entry).await?;
        info!(
            "Recorded {} run for periodic task {} as history {} ({})",
            entry.kind,
            job.task_id(),
            history_id,
            status
        );
        Ok(history_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecuteResponse {
    pub detail: String,
    pub history_id: i64,
}

impl ExecuteResponse {
    pub fn started(inventory: &str, history_id: i64) -> Self {
        Self {
            detail: format!("Started at inventory {}.", inventory),
            history_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn playbook_task_maps_mode_to_playbook() {
        let job = JobReference::from_periodic_task(
            3,
            &obj(json!({ "kind": "PLAYBOOK", "mode": "site.yml", "inventory": "hosts" })),
        )
        .unwrap();
        assert_eq!(
            job,
            JobReference::Playbook {
                task_id: 3,
                playbook: "site.yml".to_string(),
                inventory: "hosts".to_string()
            }
        );
    }

    #[test]
    fn template_task_requires_a_template() {
        let err = JobReference::from_periodic_task(
            4,
            &obj(json!({ "kind": "TEMPLATE", "inventory": "", "mode": "" })),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Runner(_)));

        let job = JobReference::from_periodic_task(
            4,
            &obj(json!({ "kind": "TEMPLATE", "template": 2, "template_opt": "" })),
        )
        .unwrap();
        assert_eq!(
            job,
            JobReference::Template {
                task_id: 4,
                template: 2,
                option: None
            }
        );
    }

    #[test]
    fn response_uses_fixed_message() {
        let response = ExecuteResponse::started("hosts.ini", 12);
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({ "detail": "Started at inventory hosts.ini.", "history_id": 12 })
        );
    }

    #[tokio::test]
    async fn history_runner_records_delayed_runs() {
        let store = Store::open_in_memory().unwrap();
        let runner = HistoryRunner::new(store.clone());
        let job = JobReference::Module {
            task_id: 1,
            module: "ping".to_string(),
            inventory: "hosts".to_string(),
        };
        let id = runner.execute(&job, false).await.unwrap();
        let history = store.get_history(id).await.unwrap().unwrap();
        assert_eq!(history.status, "DELAY");
        assert_eq!(history.kind, "MODULE");
        assert_eq!(history.mode, "ping");

        let sync_id = runner.execute(&job, true).await.unwrap();
        assert_eq!(store.get_history(sync_id).await.unwrap().unwrap().status, "RUN");
    }
}

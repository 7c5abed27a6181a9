//! Normalization rules applied to validated payloads inside the same
//! transaction as the write that persists them.

use serde_json::{Map, Value};
use tracing::debug;

use crate::core::error::EngineError;
use crate::core::jobs::PeriodicKind;
use crate::core::schema::Record;
use crate::core::store::{EntityKind, Persistence, Store};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Create,
    Update(i64),
}

/// A rewrite of already-validated data. Rules cannot fail.
pub trait NormalizationRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn applies_to(&self, entity: EntityKind, op: WriteOp) -> bool;
    fn apply(&self, data: &mut Record, existing: Option<&Record>);
}

/// Periodic tasks that run a template carry no inventory or mode of their own.
pub struct TemplateKindClearsTargets;

impl NormalizationRule for TemplateKindClearsTargets {
    fn name(&self) -> &'static str {
        "template-kind-clears-targets"
    }

    fn applies_to(&self, entity: EntityKind, _op: WriteOp) -> bool {
        entity == EntityKind::PeriodicTask
    }

    fn apply(&self, data: &mut Record, existing: Option<&Record>) {
        let kind = data
            .get("kind")
            .or_else(|| existing.and_then(|e| e.get("kind")))
            .and_then(Value::as_str);
        if kind != Some(PeriodicKind::Template.as_str()) {
            return;
        }
        data.insert("inventory".to_string(), Value::from(""));
        data.insert("mode".to_string(), Value::from(""));
    }
}

/// New templates inherit the top-level inventory into their payload and
/// always carry a `vars` mapping.
pub struct TemplateCreateDefaults;

impl NormalizationRule for TemplateCreateDefaults {
    fn name(&self) -> &'static str {
        "template-create-defaults"
    }

    fn applies_to(&self, entity: EntityKind, op: WriteOp) -> bool {
        entity == EntityKind::ExecutionTemplate && op == WriteOp::Create
    }

    fn apply(&self, data: &mut Record, _existing: Option<&Record>) {
        let inventory = data
            .get("inventory")
            .filter(|v| !is_blank(Some(*v)))
            .cloned();
        let Some(Value::Object(payload)) = data.get_mut("data") else {
            return;
        };
        if let Some(inventory) = inventory {
            if is_blank(payload.get("inventory")) {
                payload.insert("inventory".to_string(), inventory);
            }
        }
        if is_blank(payload.get("vars")) {
            payload.insert("vars".to_string(), Value::Object(Map::new()));
        }
    }
}

/// Absent, null, or an empty string, list or mapping.
fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(a)) => a.is_empty(),
        Some(Value::Object(o)) => o.is_empty(),
        Some(_) => false,
    }
}

pub struct ConsistencyEnforcer {
    rules: Vec<Box<dyn NormalizationRule>>,
}

impl ConsistencyEnforcer {
    pub fn new(rules: Vec<Box<dyn NormalizationRule>>) -> Self {
        Self { rules }
    }

    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(TemplateKindClearsTargets),
            Box::new(TemplateCreateDefaults),
        ])
    }

    pub fn normalize(
        &self,
        entity: EntityKind,
        op: WriteOp,
        data: &mut Record,
        existing: Option<&Record>,
    ) {
        for rule in self.rules.iter().filter(|r| r.applies_to(entity, op)) {
            debug!(rule = rule.name(), entity = entity.label(), "applying normalization");
            rule.apply(data, existing);
        }
    }

    /// Normalize and write as one atomic unit; returns the record id.
    pub async fn commit(
        &self,
        store: &Store,
        entity: EntityKind,
        op: WriteOp,
        data: Record,
    ) -> Result<i64, EngineError> {
        self.commit_with(store, entity, op, move |_, _| Ok(data)).await
    }

    /// Like `commit`, but `prepare` builds the payload inside the
    /// transaction from the record as it stands there. Updates read the
    /// stored record under the same lock that writes it.
    pub async fn commit_with<F>(
        &self,
        store: &Store,
        entity: EntityKind,
        op: WriteOp,
        prepare: F,
    ) -> Result<i64, EngineError>
    where
        F: FnOnce(&dyn Persistence, Option<&Record>) -> Result<Record, EngineError>,
    {
        store
            .transaction(move |tx| {
                let existing = match op {
                    WriteOp::Create => None,
                    WriteOp::Update(id) => Some(
                        tx.load(entity, id)?
                            .ok_or_else(|| EngineError::not_found(entity.label(), id))?,
                    ),
                };
                let mut data = prepare(&*tx, existing.as_ref())?;
                self.normalize(entity, op, &mut data, existing.as_ref());
                match op {
                    WriteOp::Create => tx.create(entity, &data),
                    WriteOp::Update(id) => {
                        tx.update(entity, id, &data)?;
                        Ok(id)
                    }
                }
            })
            .await
    }
}

mod acl;
mod history;
mod identity;
mod settings;
pub mod types;

pub use identity::IdentityStore;

use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::core::error::EngineError;
use crate::core::schema::Record;

/// Top-level entities persisted as JSON payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    ExecutionTemplate,
    PeriodicTask,
}

impl EntityKind {
    pub fn table(self) -> &'static str {
        match self {
            EntityKind::ExecutionTemplate => "execution_templates",
            EntityKind::PeriodicTask => "periodic_tasks",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EntityKind::ExecutionTemplate => "ExecutionTemplate",
            EntityKind::PeriodicTask => "PeriodicTask",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "ExecutionTemplate" => Some(EntityKind::ExecutionTemplate),
            "PeriodicTask" => Some(EntityKind::PeriodicTask),
            _ => None,
        }
    }
}

/// Write primitives available inside one atomic unit.
pub trait Persistence {
    fn create(&mut self, entity: EntityKind, data: &Record) -> Result<i64, EngineError>;

    /// Overlay `fields` onto the stored payload; a JSON null removes the key.
    fn update(&mut self, entity: EntityKind, id: i64, fields: &Record) -> Result<(), EngineError>;

    fn load(&self, entity: EntityKind, id: i64) -> Result<Option<Record>, EngineError>;

    fn delete(&mut self, entity: EntityKind, id: i64) -> Result<bool, EngineError>;
}

/// `Persistence` over a live SQLite transaction.
pub struct TxPersistence<'a> {
    conn: &'a Connection,
}

impl Persistence for TxPersistence<'_> {
    fn create(&mut self, entity: EntityKind, data: &Record) -> Result<i64, EngineError> {
        let mut payload = data.clone();
        payload.remove("id");
        payload.retain(|_, v| !v.is_null());
        let name = record_name(&payload);
        self.conn.execute(
            &format!(
                "INSERT INTO {} (name, payload_json) VALUES (?1, ?2)",
                entity.table()
            ),
            params![name, serde_json::to_string(&payload)?],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update(&mut self, entity: EntityKind, id: i64, fields: &Record) -> Result<(), EngineError> {
        let mut payload = self
            .load(entity, id)?
            .ok_or_else(|| EngineError::not_found(entity.label(), id))?;
        payload.remove("id");
        for (key, value) in fields {
            if key == "id" {
                continue;
            }
            if value.is_null() {
                payload.remove(key);
            } else {
                payload.insert(key.clone(), value.clone());
            }
        }
        let name = record_name(&payload);
        self.conn.execute(
            &format!(
                "UPDATE {} SET name = ?1, payload_json = ?2, updated_at = CURRENT_TIMESTAMP WHERE id = ?3",
                entity.table()
            ),
            params![name, serde_json::to_string(&payload)?, id],
        )?;
        Ok(())
    }

    fn load(&self, entity: EntityKind, id: i64) -> Result<Option<Record>, EngineError> {
        load_payload(self.conn, entity, id)
    }

    fn delete(&mut self, entity: EntityKind, id: i64) -> Result<bool, EngineError> {
        let removed = self.conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", entity.table()),
            params![id],
        )?;
        self.conn.execute(
            "DELETE FROM acl_permissions WHERE object_type = ?1 AND object_id = ?2",
            params![entity.label(), id],
        )?;
        Ok(removed > 0)
    }
}

fn record_name(payload: &Record) -> String {
    payload
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn load_payload(
    conn: &Connection,
    entity: EntityKind,
    id: i64,
) -> Result<Option<Record>, EngineError> {
    let payload: Option<String> = conn
        .query_row(
            &format!("SELECT payload_json FROM {} WHERE id = ?1", entity.table()),
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    let Some(payload) = payload else {
        return Ok(None);
    };
    let mut record: Record = serde_json::from_str(&payload)?;
    record.insert("id".to_string(), Value::from(id));
    Ok(Some(record))
}

#[derive(Clone)]
pub struct Store {
    db: Arc<Mutex<Connection>>,
}

impl Store {
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let conn = Connection::open(path)?;
        info!("Opened job store at {}", path.display());
        Self::from_connection(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, EngineError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, EngineError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS execution_templates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                payload_json TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS periodic_tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                payload_json TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS user_groups (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS user_group_members (
                group_id INTEGER NOT NULL REFERENCES user_groups(id) ON DELETE CASCADE,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                PRIMARY KEY (group_id, user_id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS acl_permissions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                object_type TEXT NOT NULL,
                object_id INTEGER NOT NULL,
                role TEXT NOT NULL,
                user_id INTEGER REFERENCES users(id) ON DELETE CASCADE,
                group_id INTEGER REFERENCES user_groups(id) ON DELETE CASCADE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                CHECK ((user_id IS NULL) <> (group_id IS NULL))
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS user_settings (
                user_id INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                settings TEXT NOT NULL DEFAULT '{}'
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                mode TEXT NOT NULL,
                inventory TEXT NOT NULL,
                status TEXT NOT NULL,
                periodic_task_id INTEGER,
                template_id INTEGER,
                template_option TEXT,
                started_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_acl_permissions_object ON acl_permissions(object_type, object_id)",
            [],
        )?;

        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    #[cfg(test)]
    pub fn get_db(&self) -> Arc<Mutex<Connection>> {
        self.db.clone()
    }

    /// Run `scope` inside one SQLite transaction: committed when it returns
    /// `Ok`, rolled back otherwise.
    pub async fn transaction<T, F>(&self, scope: F) -> Result<T, EngineError>
    where
        F: FnOnce(&mut TxPersistence<'_>) -> Result<T, EngineError>,
    {
        let mut db = self.db.lock().await;
        let tx = db.transaction()?;
        let outcome = scope(&mut TxPersistence { conn: &tx });
        match outcome {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                warn!("Rolling back transaction: {}", e);
                if let Err(rollback) = tx.rollback() {
                    warn!("Rollback failed: {}", rollback);
                }
                Err(e)
            }
        }
    }

    pub async fn load_record(
        &self,
        entity: EntityKind,
        id: i64,
    ) -> Result<Option<Record>, EngineError> {
        let db = self.db.lock().await;
        load_payload(&db, entity, id)
    }

    pub async fn list_records(&self, entity: EntityKind) -> Result<Vec<Record>, EngineError> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT id, payload_json FROM {} ORDER BY id",
            entity.table()
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut results = Vec::new();
        for row in rows {
            let (id, payload) = row?;
            let mut record: Record = serde_json::from_str(&payload)?;
            record.insert("id".to_string(), Value::from(id));
            results.push(record);
        }
        Ok(results)
    }

    pub async fn delete_record(&self, entity: EntityKind, id: i64) -> Result<bool, EngineError> {
        self.transaction(|tx| tx.delete(entity, id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn create_then_load_adds_id() {
        let store = Store::open_in_memory().unwrap();
        let id = store
            .transaction(|tx| {
                tx.create(
                    EntityKind::ExecutionTemplate,
                    &obj(json!({ "name": "deploy", "kind": "Task" })),
                )
            })
            .await
            .unwrap();
        let record = store
            .load_record(EntityKind::ExecutionTemplate, id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record["id"], id);
        assert_eq!(record["name"], "deploy");
    }

    #[tokio::test]
    async fn update_overlays_and_null_removes() {
        let store = Store::open_in_memory().unwrap();
        let id = store
            .transaction(|tx| {
                tx.create(
                    EntityKind::PeriodicTask,
                    &obj(json!({ "name": "nightly", "template": 3, "template_opt": "fast" })),
                )
            })
            .await
            .unwrap();
        store
            .transaction(|tx| {
                tx.update(
                    EntityKind::PeriodicTask,
                    id,
                    &obj(json!({ "template": null, "template_opt": null, "mode": "site.yml" })),
                )
            })
            .await
            .unwrap();
        let record = store
            .load_record(EntityKind::PeriodicTask, id)
            .await
            .unwrap()
            .unwrap();
        assert!(!record.contains_key("template"));
        assert!(!record.contains_key("template_opt"));
        assert_eq!(record["mode"], "site.yml");
        assert_eq!(record["name"], "nightly");
    }

    #[tokio::test]
    async fn failed_scope_rolls_back_every_write() {
        let store = Store::open_in_memory().unwrap();
        let result: Result<i64, EngineError> = store
            .transaction(|tx| {
                tx.create(EntityKind::PeriodicTask, &obj(json!({ "name": "a" })))?;
                tx.update(EntityKind::PeriodicTask, 999, &obj(json!({ "name": "b" })))?;
                Ok(0)
            })
            .await;
        assert!(matches!(result, Err(EngineError::NotFound { .. })));
        let all = store.list_records(EntityKind::PeriodicTask).await.unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn delete_reports_whether_a_row_existed() {
        let store = Store::open_in_memory().unwrap();
        let id = store
            .transaction(|tx| tx.create(EntityKind::ExecutionTemplate, &obj(json!({ "name": "x" }))))
            .await
            .unwrap();
        assert!(store.load_record(EntityKind::ExecutionTemplate, id).await.unwrap().is_some());
        assert!(store.delete_record(EntityKind::ExecutionTemplate, id).await.unwrap());
        assert!(!store.delete_record(EntityKind::ExecutionTemplate, id).await.unwrap());
        assert!(store.load_record(EntityKind::ExecutionTemplate, id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn open_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("runplan.db");
        let store = Store::open(&path).await.unwrap();
        assert!(path.exists());
        assert!(store.list_records(EntityKind::PeriodicTask).await.unwrap().is_empty());
    }
}

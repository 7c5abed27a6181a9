use rusqlite::{OptionalExtension, params};

use super::Store;
use super::types::{HistoryRecord, NewHistory};
use crate::core::error::EngineError;

impl Store {
    pub async fn insert_history(&self, entry: &NewHistory) -> Result<i64, EngineError> {
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO history (kind, mode, inventory, status, periodic_task_id, template_id, template_option)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.kind,
                entry.mode,
                entry.inventory,
                entry.status,
                entry.periodic_task_id,
                entry.template_id,
                entry.template_option
            ],
        )?;
        Ok(db.last_insert_rowid())
    }

    pub async fn get_history(&self, id: i64) -> Result<Option<HistoryRecord>, EngineError> {
        let db = self.db.lock().await;
        let record = db
            .query_row(
                "SELECT id, kind, mode, inventory, status, periodic_task_id, template_id, template_option, started_at
                 FROM history WHERE id = ?1",
                params![id],
                |row| {
                    Ok(HistoryRecord {
                        id: row.get(0)?,
                        kind: row.get(1)?,
                        mode: row.get(2)?,
                        inventory: row.get(3)?,
                        status: row.get(4)?,
                        periodic_task_id: row.get(5)?,
                        template_id: row.get(6)?,
                        template_option: row.get(7)?,
                        started_at: row.get(8)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }
}

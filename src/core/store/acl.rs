use rusqlite::params;

use super::Store;
use crate::core::acl::{AclPermission, AclRole, AclTarget, Member};
use crate::core::error::EngineError;

impl Store {
    pub async fn insert_permission(
        &self,
        target: AclTarget,
        owner: Member,
        role: AclRole,
    ) -> Result<AclPermission, EngineError> {
        let (user_id, group_id) = owner.columns();
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO acl_permissions (object_type, object_id, role, user_id, group_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![target.entity.label(), target.id, role.as_str(), user_id, group_id],
        )?;
        Ok(AclPermission::new(db.last_insert_rowid(), role, owner, target))
    }

    pub async fn delete_permission(&self, id: i64) -> Result<bool, EngineError> {
        let db = self.db.lock().await;
        let removed = db.execute("DELETE FROM acl_permissions WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    pub async fn permissions_for(&self, target: AclTarget) -> Result<Vec<AclPermission>, EngineError> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT id, role, user_id, group_id, object_type, object_id FROM acl_permissions
             WHERE object_type = ?1 AND object_id = ?2 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![target.entity.label(), target.id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<i64>>(2)?,
                row.get::<_, Option<i64>>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, i64>(5)?,
            ))
        })?;

        let mut results = Vec::new();
        for row in rows {
            let (id, role, user_id, group_id, object_type, object_id) = row?;
            results.push(AclPermission::from_columns(
                id,
                &role,
                user_id,
                group_id,
                &object_type,
                object_id,
            )?);
        }
        Ok(results)
    }
}

use async_trait::async_trait;
use rusqlite::{OptionalExtension, params};

use super::Store;
use super::types::{GroupRecord, UserRecord};
use crate::core::error::EngineError;

/// Read side of the user/group relations that permission records point at.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn user_exists(&self, id: i64) -> Result<bool, EngineError>;
    async fn group_exists(&self, id: i64) -> Result<bool, EngineError>;
}

impl Store {
    pub async fn create_user(&self, username: &str) -> Result<i64, EngineError> {
        let db = self.db.lock().await;
        db.execute("INSERT INTO users (username) VALUES (?1)", params![username])?;
        Ok(db.last_insert_rowid())
    }

    pub async fn create_group(&self, name: &str) -> Result<i64, EngineError> {
        let db = self.db.lock().await;
        db.execute("INSERT INTO user_groups (name) VALUES (?1)", params![name])?;
        Ok(db.last_insert_rowid())
    }

    pub async fn add_group_member(&self, group_id: i64, user_id: i64) -> Result<(), EngineError> {
        let db = self.db.lock().await;
        db.execute(
            "INSERT OR IGNORE INTO user_group_members (group_id, user_id) VALUES (?1, ?2)",
            params![group_id, user_id],
        )?;
        Ok(())
    }

    pub async fn get_user(&self, id: i64) -> Result<Option<UserRecord>, EngineError> {
        let db = self.db.lock().await;
        let user = db
            .query_row(
                "SELECT id, username FROM users WHERE id = ?1",
                params![id],
                |row| {
                    Ok(UserRecord {
                        id: row.get(0)?,
                        username: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    pub async fn get_group(&self, id: i64) -> Result<Option<GroupRecord>, EngineError> {
        let db = self.db.lock().await;
        let group = db
            .query_row(
                "SELECT id, name FROM user_groups WHERE id = ?1",
                params![id],
                |row| {
                    Ok(GroupRecord {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(group)
    }

    pub async fn group_members(&self, group_id: i64) -> Result<Vec<UserRecord>, EngineError> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT u.id, u.username FROM users u
             JOIN user_group_members m ON m.user_id = u.id
             WHERE m.group_id = ?1 ORDER BY u.id",
        )?;
        let rows = stmt.query_map(params![group_id], |row| {
            Ok(UserRecord {
                id: row.get(0)?,
                username: row.get(1)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}

#[async_trait]
impl IdentityStore for Store {
    async fn user_exists(&self, id: i64) -> Result<bool, EngineError> {
        Ok(self.get_user(id).await?.is_some())
    }

    async fn group_exists(&self, id: i64) -> Result<bool, EngineError> {
        Ok(self.get_group(id).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn members_are_listed_once() {
        let store = Store::open_in_memory().unwrap();
        let alice = store.create_user("alice").await.unwrap();
        let bob = store.create_user("bob").await.unwrap();
        let ops = store.create_group("ops").await.unwrap();
        store.add_group_member(ops, alice).await.unwrap();
        store.add_group_member(ops, bob).await.unwrap();
        store.add_group_member(ops, alice).await.unwrap();

        let names: Vec<String> = store
            .group_members(ops)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, vec!["alice", "bob"]);
    }

    #[tokio::test]
    async fn identity_lookups() {
        let store = Store::open_in_memory().unwrap();
        let alice = store.create_user("alice").await.unwrap();
        assert!(store.user_exists(alice).await.unwrap());
        assert!(!store.user_exists(alice + 1).await.unwrap());
        assert!(!store.group_exists(1).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_usernames_are_rejected() {
        let store = Store::open_in_memory().unwrap();
        store.create_user("alice").await.unwrap();
        assert!(matches!(
            store.create_user("alice").await,
            Err(EngineError::Storage(_))
        ));
    }
}

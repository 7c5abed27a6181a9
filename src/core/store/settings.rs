use rusqlite::params;

use super::Store;
use crate::core::error::EngineError;
use crate::core::settings::UserSettings;

impl Store {
    /// Settings row for `user_id`, created with the empty blob on first access.
    pub async fn load_user_settings(&self, user_id: i64) -> Result<UserSettings, EngineError> {
        let db = self.db.lock().await;
        db.execute(
            "INSERT OR IGNORE INTO user_settings (user_id) VALUES (?1)",
            params![user_id],
        )?;
        let raw: String = db.query_row(
            "SELECT settings FROM user_settings WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(UserSettings::from_raw(user_id, raw))
    }

    pub async fn save_user_settings(&self, settings: &UserSettings) -> Result<(), EngineError> {
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO user_settings (user_id, settings) VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET settings = excluded.settings",
            params![settings.user_id(), settings.raw()],
        )?;
        Ok(())
    }
}

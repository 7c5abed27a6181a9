use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Canonical stored form of "no settings".
pub const EMPTY_SETTINGS: &str = "{}";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("stored settings for user {user_id} cannot be decoded: {source}")]
    Corrupt {
        user_id: i64,
        #[source]
        source: serde_json::Error,
    },
    #[error("settings cannot be encoded: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Per-user settings kept as one serialized JSON blob.
///
/// The blob is the stored form; callers work with the decoded value through
/// `data` / `set_data_as` / `clear_data`. A blob that no longer decodes is
/// reported as `SettingsError::Corrupt` rather than replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSettings {
    user_id: i64,
    settings: String,
}

impl UserSettings {
    pub fn new(user_id: i64) -> Self {
        Self::from_raw(user_id, EMPTY_SETTINGS)
    }

    pub fn from_raw(user_id: i64, settings: impl Into<String>) -> Self {
        Self {
            user_id,
            settings: settings.into(),
        }
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn raw(&self) -> &str {
        &self.settings
    }

    pub fn data(&self) -> Result<Value, SettingsError> {
        self.data_as()
    }

    /// Decoded copy, detached from the stored blob.
    pub fn settings_copy(&self) -> Result<Value, SettingsError> {
        self.data()
    }

    pub fn clear_data(&mut self) {
        self.settings = EMPTY_SETTINGS.to_string();
    }

    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, SettingsError> {
        serde_json::from_str(&self.settings).map_err(|source| SettingsError::Corrupt {
            user_id: self.user_id,
            source,
        })
    }

    pub fn set_data_as<T: Serialize>(&mut self, value: &T) -> Result<(), SettingsError> {
        self.settings = serde_json::to_string(value).map_err(SettingsError::Encode)?;
        Ok(())
    }
}

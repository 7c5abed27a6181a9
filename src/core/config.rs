use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

pub const CONFIG_FILE: &str = "runplan.toml";
pub const DATABASE_FILE: &str = "runplan.db";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub redaction: RedactionConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedactionConfig {
    /// Argument names whose values never leave the store in clear text.
    #[serde(default = "default_hidden_names")]
    pub hidden_names: Vec<String>,

    #[serde(default = "default_marker")]
    pub marker: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CatalogConfig {
    /// External argument catalog replacing the bundled reference.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub database: Option<PathBuf>,
}

fn default_hidden_names() -> Vec<String> {
    ["key_file", "private_key", "vault_password_file", "new_vault_password_file"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_marker() -> String {
    "[~~ENCRYPTED~~]".to_string()
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            hidden_names: default_hidden_names(),
            marker: default_marker(),
        }
    }
}

/// `~/.runplan`, falling back to the working directory when no home is known.
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".runplan")
}

impl EngineConfig {
    pub async fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            info!("No {} found, using default configuration.", CONFIG_FILE);
            return Ok(Self::default());
        }
        let content = tokio::fs::read_to_string(config_path).await?;
        let mut config: EngineConfig = toml::from_str(&content)?;

        let original_count = config.redaction.hidden_names.len();
        config
            .redaction
            .hidden_names
            .retain(|name| !name.trim().is_empty());
        if config.redaction.hidden_names.len() != original_count {
            info!(
                "Stripped {} blank hidden names from {}",
                original_count - config.redaction.hidden_names.len(),
                config_path.display()
            );
        }

        info!(
            "Loaded config: hidden_names={:?}, catalog={:?}, database={:?}",
            config.redaction.hidden_names, config.catalog.path, config.storage.database
        );
        Ok(config)
    }

    /// Database path: explicit override, then `[storage] database`, then the
    /// data directory default.
    pub fn database_path(&self, override_path: Option<&Path>, data_dir: &Path) -> PathBuf {
        override_path
            .map(Path::to_path_buf)
            .or_else(|| self.storage.database.clone())
            .unwrap_or_else(|| data_dir.join(DATABASE_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_redaction_hides_key_material() {
        let config = RedactionConfig::default();
        assert_eq!(
            config.hidden_names,
            vec![
                "key_file",
                "private_key",
                "vault_password_file",
                "new_vault_password_file"
            ]
        );
        assert_eq!(config.marker, "[~~ENCRYPTED~~]");
    }

    #[tokio::test]
    async fn load_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load(dir.path().join(CONFIG_FILE)).await.unwrap();
        assert!(config.catalog.path.is_none());
        assert_eq!(config.redaction.hidden_names.len(), 4);
    }

    #[tokio::test]
    async fn load_strips_blank_hidden_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let toml_content = r#"
[redaction]
hidden_names = ["password", "  ", ""]
marker = "***"

[storage]
database = "/var/lib/runplan/jobs.db"
"#;
        std::fs::write(&path, toml_content).unwrap();

        let config = EngineConfig::load(&path).await.unwrap();
        assert_eq!(config.redaction.hidden_names, vec!["password"]);
        assert_eq!(config.redaction.marker, "***");
        assert_eq!(
            config.storage.database,
            Some(PathBuf::from("/var/lib/runplan/jobs.db"))
        );
    }

    #[tokio::test]
    async fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[redaction\nhidden_names = 3").unwrap();
        assert!(EngineConfig::load(&path).await.is_err());
    }

    #[test]
    fn database_override_wins() {
        let config = EngineConfig::default();
        let data = Path::new("/data");
        assert_eq!(
            config.database_path(None, data),
            PathBuf::from("/data/runplan.db")
        );
        assert_eq!(
            config.database_path(Some(Path::new("/tmp/x.db")), data),
            PathBuf::from("/tmp/x.db")
        );
    }
}

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::model::UploadOptions;

/// On-disk application configuration, persisted as JSON under
/// `~/.bulkship/config.json`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub default_options: UploadOptions,
    #[serde(default)]
    pub default_bucket: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { default_options: UploadOptions::default(), default_bucket: None }
    }
}

impl AppConfig {
    /// Load the config from its canonical path, creating a default one on
    /// first run.
    pub fn init() -> anyhow::Result<Self> {
        let dir = config_dir()?;
        let path = dir.join("config.json");
        if !path.exists() {
            std::fs::create_dir_all(&dir)?;
            let config = AppConfig::default();
            config.save_to(&path)?;
            return Ok(config);
        }
        Self::read_from(&path)
    }

    pub fn read_from(path: &std::path::Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn save_to(&self, path: &std::path::Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)?;
        Ok(())
    }

    pub fn save_to_storage(&self) -> anyhow::Result<()> {
        let dir = config_dir()?;
        self.save_to(&dir.join("config.json"))
    }
}

/// `~/.bulkship`, created on demand.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot find user's home directory"))?;
    Ok(home.join(".bulkship"))
}

pub fn logs_dir() -> anyhow::Result<PathBuf> {
    Ok(config_dir()?.join("logs"))
}

//! Settings commands
//!
//! Settings live in a JSON object file, read through a `SettingsCache`.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::PathBuf;
use tabled::Tabled;

use forms_settings::{SettingsCache, SettingsError, SettingsStore};

use super::truncate;
use crate::config::Config;
use crate::output::{table, OutputFormat};
use crate::SettingsCommands;

/// Settings persisted as one JSON object on disk
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    async fn read_all(&self) -> forms_settings::Result<Map<String, Value>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => match serde_json::from_str(&content)? {
                Value::Object(map) => Ok(map),
                _ => Err(SettingsError::Store(format!("{} is not a JSON object", self.path.display()))),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(SettingsError::Store(e.to_string())),
        }
    }
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn load(&self, key: &str) -> forms_settings::Result<Option<Value>> {
        Ok(self.read_all().await?.remove(key))
    }

    async fn save(&self, key: &str, value: &Value) -> forms_settings::Result<()> {
        let mut all = self.read_all().await?;
        all.insert(key.to_string(), value.clone());
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SettingsError::Store(e.to_string()))?;
        }
        let content = serde_json::to_string_pretty(&Value::Object(all))?;
        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| SettingsError::Store(e.to_string()))
    }
}

#[derive(Tabled)]
struct SettingRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
}

pub async fn handle(action: SettingsCommands, config: &Config, format: OutputFormat) -> Result<i32> {
    let cache = SettingsCache::new(FileSettingsStore::new(config.settings_path()?));

    match action {
        SettingsCommands::Get { key } => match cache.get(&key).await? {
            Some(value) => format.print(&value, |v| v.to_string())?,
            None => {
                eprintln!("{}: (not set)", key);
                return Ok(1);
            }
        },
        SettingsCommands::Set { key, value } => {
            let value = serde_json::from_str(&value).unwrap_or(Value::String(value));
            cache.set(&key, value).await?;
            println!("Set {} successfully", key);
        }
        SettingsCommands::List => {
            let all = cache.store().read_all().await?;
            format.print(&all, |all| {
                table(all.iter().map(|(key, value)| SettingRow {
                    key: key.clone(),
                    value: truncate(&value.to_string(), 80),
                }))
            })?;
        }
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let path = std::env::temp_dir().join(format!("formctl-settings-{}.json", std::process::id()));
        let store = FileSettingsStore::new(path.clone());
        assert_eq!(store.load("theme").await.unwrap(), None);

        store.save("theme", &json!("dark")).await.unwrap();
        store.save("limits", &json!({ "max_pages": 20 })).await.unwrap();
        assert_eq!(store.load("theme").await.unwrap(), Some(json!("dark")));
        assert_eq!(store.read_all().await.unwrap().len(), 2);

        let _ = std::fs::remove_file(path);
    }
}

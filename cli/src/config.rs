//! CLI Configuration
//!
//! `~/.formctl/config.toml`, or `config.<profile>.toml` with `--profile`.

use anyhow::{anyhow, Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use forms_prefill::PrefillOptions;

use crate::output::OutputFormat;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_format: Option<String>,
    /// JSON file backing `formctl settings`
    pub settings_file: Option<String>,
    pub prefill: PrefillOptions,
}

impl Config {
    pub fn load(profile: Option<&str>) -> Result<Self> {
        let path = Self::config_path(profile)?;
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, profile: Option<&str>) -> Result<PathBuf> {
        let path = Self::config_path(profile)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml::to_string_pretty(self)?)?;
        Ok(path)
    }

    pub fn output_format(&self) -> OutputFormat {
        self.default_format
            .as_deref()
            .and_then(|f| OutputFormat::from_str(f, true).ok())
            .unwrap_or(OutputFormat::Table)
    }

    pub fn settings_path(&self) -> Result<PathBuf> {
        match &self.settings_file {
            Some(path) => Ok(PathBuf::from(path)),
            None => Ok(Self::home()?.join("settings.json")),
        }
    }

    /// Set a dotted key such as `prefill.backoff_base_ms`
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "default_format" => {
                OutputFormat::from_str(value, true).map_err(|e| anyhow!(e))?;
                self.default_format = Some(value.to_string());
            }
            "settings_file" => self.settings_file = Some(value.to_string()),
            "prefill.request_timeout_secs" => self.prefill.request_timeout_secs = value.parse()?,
            "prefill.backoff_base_ms" => self.prefill.backoff_base_ms = value.parse()?,
            "prefill.default_cache_ttl_secs" => self.prefill.default_cache_ttl_secs = value.parse()?,
            _ => return Err(anyhow!("Unknown config key: {}", key)),
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(match key {
            "default_format" => self.default_format.clone(),
            "settings_file" => self.settings_file.clone(),
            "prefill.request_timeout_secs" => Some(self.prefill.request_timeout_secs.to_string()),
            "prefill.backoff_base_ms" => Some(self.prefill.backoff_base_ms.to_string()),
            "prefill.default_cache_ttl_secs" => Some(self.prefill.default_cache_ttl_secs.to_string()),
            _ => return Err(anyhow!("Unknown config key: {}", key)),
        })
    }

    pub const KEYS: [&'static str; 5] = [
        "default_format",
        "settings_file",
        "prefill.request_timeout_secs",
        "prefill.backoff_base_ms",
        "prefill.default_cache_ttl_secs",
    ];

    fn config_path(profile: Option<&str>) -> Result<PathBuf> {
        let filename = match profile {
            Some(p) => format!("config.{}.toml", p),
            None => "config.toml".to_string(),
        };
        Ok(Self::home()?.join(filename))
    }

    fn home() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| anyhow!("Cannot find home directory"))?;
        Ok(home.join(".formctl"))
    }
}

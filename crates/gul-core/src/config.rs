use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULTS: &[(&str, &str)] = &[("token", "your-gitlab-token"), ("url", "https://gitlab.com")];

/// Flat key-value settings, e.g. `user.name` or `ssh.domain`.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ConfigStore {
    #[serde(flatten)]
    values: BTreeMap<String, String>,
}

impl ConfigStore {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::with_defaults());
        }
        let data = fs::read_to_string(path).context("read config")?;
        let mut config: Self = serde_json::from_str(&data).context("parse config")?;
        for (key, value) in DEFAULTS {
            config
                .values
                .entry((*key).to_string())
                .or_insert_with(|| (*value).to_string());
        }
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("create config directory")?;
        }
        let data = serde_json::to_string_pretty(self).context("serialize config")?;
        fs::write(path, data).context("write config")?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        validate_key(key)?;
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn with_defaults() -> Self {
        let values = DEFAULTS
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        Self { values }
    }
}

pub fn validate_key(key: &str) -> anyhow::Result<()> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && !key.ends_with('.')
        && key
            .chars()
            .all(|ch| ch.is_ascii_lowercase() || ch == '.' || ch == '_');
    if !valid {
        anyhow::bail!("key must only contain lower case characters (a-z), '.' and '_'");
    }
    Ok(())
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    let project = ProjectDirs::from("com", "gul", "gul").context("resolve project dirs")?;
    Ok(project.config_dir().join("config.json"))
}

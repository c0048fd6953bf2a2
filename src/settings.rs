use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
};

pub const SPIKES_DIR: &str = ".spikes";
const SETTINGS_FILE: &str = "config.json";
const DATABASE_FILE: &str = "spikes.db";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// Backend base URL, e.g. `https://feedback.example.com`.
    pub endpoint: Option<String>,
    /// Opaque token sent as `?token=` on reads and as a bearer on share calls.
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliSettings {
    /// Default project filter for listing commands.
    #[serde(default)]
    pub project: Option<String>,
    /// Queue location; relative paths resolve against the settings directory.
    #[serde(default)]
    pub database: Option<PathBuf>,
    #[serde(default)]
    pub remote: RemoteSettings,
}

/// `.spikes/config.json`. A missing or unreadable file means defaults.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<CliSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            CliSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Settings file under `root/.spikes/`.
    pub fn in_dir(root: &Path) -> Result<Self> {
        Self::new(root.join(SPIKES_DIR).join(SETTINGS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> CliSettings {
        self.data
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn database_path(&self) -> PathBuf {
        let base = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(SPIKES_DIR));

        match self.settings().database {
            Some(path) if path.is_absolute() => path,
            Some(path) => base.join(path),
            None => base.join(DATABASE_FILE),
        }
    }

    pub fn update_remote(&self, remote: RemoteSettings) -> Result<()> {
        let mut guard = self
            .data
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.remote = remote;
        self.persist(&guard)
    }

    pub fn update_project(&self, project: Option<String>) -> Result<()> {
        let mut guard = self
            .data
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.project = project;
        self.persist(&guard)
    }

    fn persist(&self, data: &CliSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory {}", parent.display())
            })?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults_and_default_database() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::in_dir(dir.path()).unwrap();
        assert_eq!(store.settings(), CliSettings::default());
        assert_eq!(
            store.database_path(),
            dir.path().join(".spikes").join("spikes.db")
        );
    }

    #[test]
    fn updates_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::in_dir(dir.path()).unwrap();
        store
            .update_remote(RemoteSettings {
                endpoint: Some("https://feedback.test".into()),
                token: Some("secret".into()),
            })
            .unwrap();
        store.update_project(Some("acme".into())).unwrap();

        let reopened = SettingsStore::in_dir(dir.path()).unwrap();
        let settings = reopened.settings();
        assert_eq!(settings.project.as_deref(), Some("acme"));
        assert_eq!(settings.remote.token.as_deref(), Some("secret"));
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.settings(), CliSettings::default());
    }
}

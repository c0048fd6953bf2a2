use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::models::ReviewerIdentity;
use crate::utils::new_id;
use crate::{log_info, log_warn};

const ENABLE_LOGS: bool = true;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredIdentity {
    reviewer: Option<ReviewerIdentity>,
}

/// Persists the local reviewer as JSON. One file per browser profile.
pub struct IdentityStore {
    path: PathBuf,
    data: RwLock<StoredIdentity>,
}

impl IdentityStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read identity from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log_warn!(
                    "Ignoring unreadable identity file {}: {}",
                    path.display(),
                    err
                );
                StoredIdentity::default()
            })
        } else {
            StoredIdentity::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, StoredIdentity> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoredIdentity> {
        self.data
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self) -> Option<ReviewerIdentity> {
        self.read().reviewer.clone()
    }

    /// Mint a new identity and make it the active one.
    pub fn create(&self, name: &str) -> Result<ReviewerIdentity> {
        let name = validated_name(name)?;
        let identity = ReviewerIdentity {
            id: new_id(),
            name,
            created_at: Utc::now(),
        };

        {
            let mut guard = self.write();
            guard.reviewer = Some(identity.clone());
            self.persist(&guard)?;
        }

        log_info!("Created reviewer identity {}", identity.id);
        Ok(identity)
    }

    /// Change the display name; the id is kept. Creates an identity when
    /// none exists yet.
    pub fn rename(&self, name: &str) -> Result<ReviewerIdentity> {
        let name = validated_name(name)?;
        let mut guard = self.write();
        if let Some(identity) = guard.reviewer.as_mut() {
            identity.name = name;
            let renamed = identity.clone();
            self.persist(&guard)?;
            return Ok(renamed);
        }
        drop(guard);

        self.create(&name)
    }

    /// Create `name` only when no identity exists (page-configured reviewer).
    pub fn ensure(&self, name: &str) -> Result<ReviewerIdentity> {
        match self.get() {
            Some(identity) => Ok(identity),
            None => self.create(name),
        }
    }

    /// Forget the local identity; later spikes are attributed anonymously.
    pub fn clear(&self) -> Result<()> {
        let mut guard = self.write();
        guard.reviewer = None;
        if self.path.exists() {
            fs::remove_file(&self.path).with_context(|| {
                format!("Failed to remove identity file {}", self.path.display())
            })?;
        }
        Ok(())
    }

    fn persist(&self, data: &StoredIdentity) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write identity to {}", self.path.display()))
    }
}

fn validated_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        bail!("Reviewer name must not be empty");
    }
    Ok(name.to_string())
}

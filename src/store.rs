use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config;
use crate::models::UserId;

const USER_ID_FILE: &str = "user_id";

/// Small on-disk key-value state. Only the Hackatime user id lives here.
pub struct Store {
    state_dir: PathBuf,
}

impl Store {
    /// Opens the store in the configured data directory, creating it if needed.
    pub fn new() -> Result<Self> {
        Self::at(config::data_dir())
    }

    pub fn at(base_dir: impl AsRef<Path>) -> Result<Self> {
        let state_dir = base_dir.as_ref().join("state");
        fs::create_dir_all(&state_dir)
            .with_context(|| format!("Failed to create state directory {}", state_dir.display()))?;
        Ok(Self { state_dir })
    }

    /// Saved user id, or `None` on first run. A corrupt value reads as absent.
    pub fn load_user_id(&self) -> Result<Option<UserId>> {
        let path = self.state_dir.join(USER_ID_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        match UserId::parse(&content) {
            Ok(id) => Ok(Some(id)),
            Err(err) => {
                debug!(error = %err, "ignoring unusable saved user id");
                Ok(None)
            }
        }
    }

    pub fn save_user_id(&self, id: &UserId) -> Result<()> {
        let path = self.state_dir.join(USER_ID_FILE);
        fs::write(&path, id.as_str())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        debug!(path = %path.display(), "saved user id");
        Ok(())
    }

    pub fn forget_user_id(&self) -> Result<()> {
        let path = self.state_dir.join(USER_ID_FILE);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;

//! Progress record kept inside the checkout for detect-and-resume reruns

use super::Stage;
use crate::error::Result;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const STATE_FILE_NAME: &str = "fiber-bootstrap.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapState {
    /// Pinned revision, or `latest` when the run followed the default branch
    pub target: String,
    pub completed: Vec<Stage>,
    pub updated_at: DateTime<Utc>,
}

impl BootstrapState {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            completed: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Lives under `.git/` so it never shows up as an untracked file
    pub fn path(checkout: &Path) -> PathBuf {
        checkout.join(".git").join(STATE_FILE_NAME)
    }

    /// Load the record; an unreadable record counts as absent
    pub fn load(checkout: &Path) -> Option<Self> {
        let path = Self::path(checkout);
        let raw = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!("Ignoring unreadable state file {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn save(&self, checkout: &Path) -> Result<()> {
        let path = Self::path(checkout);
        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            debug!("No .git directory in {}, not recording progress", checkout.display());
            return Ok(());
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn is_complete(&self, stage: Stage) -> bool {
        self.completed.contains(&stage)
    }

    pub fn mark(&mut self, stage: Stage) {
        if !self.is_complete(stage) {
            self.completed.push(stage);
        }
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join(".git")).unwrap();

        let mut state = BootstrapState::new("0f3d2a9");
        state.mark(Stage::Cloned);
        state.mark(Stage::Pinned);
        state.mark(Stage::Pinned);
        state.save(temp_dir.path()).unwrap();

        let loaded = BootstrapState::load(temp_dir.path()).unwrap();
        assert_eq!(loaded.target, "0f3d2a9");
        assert_eq!(loaded.completed, vec![Stage::Cloned, Stage::Pinned]);
        assert!(loaded.is_complete(Stage::Pinned));
        assert!(!loaded.is_complete(Stage::EnvReady));
    }

    #[test]
    fn test_corrupt_state_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join(".git")).unwrap();
        fs::write(BootstrapState::path(temp_dir.path()), "{ not json").unwrap();

        assert!(BootstrapState::load(temp_dir.path()).is_none());
    }

    #[test]
    fn test_save_without_git_dir_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        BootstrapState::new("latest").save(temp_dir.path()).unwrap();
        assert!(!BootstrapState::path(temp_dir.path()).exists());
    }
}

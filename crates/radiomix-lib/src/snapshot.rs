//! Whole-card state snapshot via the mixer's store/restore primitives.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{RadiomixError, Result};
use crate::mixer::Mixer;

pub struct SnapshotStore {
    mixer: Arc<dyn Mixer>,
    card: String,
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(mixer: Arc<dyn Mixer>, card: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            mixer,
            card: card.into(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Save the card state, creating the parent directory if needed.
    pub fn store(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        self.mixer.store_snapshot(&self.card, &self.path)?;
        log::info!("mixer state stored to {}", self.path.display());
        Ok(())
    }

    /// Load the card state. `SnapshotMissing` if nothing was stored yet.
    pub fn restore(&self) -> Result<()> {
        if !self.exists() {
            return Err(RadiomixError::SnapshotMissing(self.path.clone()));
        }
        self.mixer.restore_snapshot(&self.card, &self.path)?;
        log::info!("mixer state restored from {}", self.path.display());
        Ok(())
    }
}

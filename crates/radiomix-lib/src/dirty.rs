//! Dirty tracking: has the mixer diverged from the stored snapshot?

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

/// Saved/dirty indicator derived from snapshot existence and the dirty flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SaveState {
    NeverSaved,
    SavedClean,
    #[serde(rename = "saved-but-diverged")]
    SavedDiverged,
}

impl SaveState {
    pub fn derive(snapshot_exists: bool, dirty: bool) -> Self {
        match (snapshot_exists, dirty) {
            (false, _) => SaveState::NeverSaved,
            (true, false) => SaveState::SavedClean,
            (true, true) => SaveState::SavedDiverged,
        }
    }
}

impl std::fmt::Display for SaveState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SaveState::NeverSaved => "never-saved",
            SaveState::SavedClean => "saved-clean",
            SaveState::SavedDiverged => "saved-but-diverged",
        })
    }
}

/// Token returned by [`DirtyTracker::begin_load`].
#[derive(Debug, Clone, Copy)]
#[must_use]
pub struct LoadTicket(u64);

#[derive(Debug, Default)]
struct Flags {
    dirty: bool,
    generation: u64,
}

/// Volatile dirty flag plus a write generation counter.
///
/// Every tracked write bumps the generation. A fresh control-list load
/// clears the flag only if the generation did not move while it ran. Both
/// live under one lock so the check and the clear cannot straddle a write.
#[derive(Debug, Default)]
pub struct DirtyTracker {
    flags: Mutex<Flags>,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Flags> {
        self.flags.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_dirty(&self) -> bool {
        self.lock().dirty
    }

    /// A tracked control write succeeded.
    pub fn mark_written(&self) {
        let mut flags = self.lock();
        flags.generation = flags.generation.wrapping_add(1);
        flags.dirty = true;
    }

    /// A snapshot store succeeded.
    pub fn clear(&self) {
        self.lock().dirty = false;
    }

    pub fn begin_load(&self) -> LoadTicket {
        LoadTicket(self.lock().generation)
    }

    /// Resynchronize after a load. Returns whether the flag was cleared.
    pub fn finish_load(&self, ticket: LoadTicket) -> bool {
        let mut flags = self.lock();
        if flags.generation == ticket.0 {
            flags.dirty = false;
            true
        } else {
            false
        }
    }

    pub fn state(&self, snapshot_exists: bool) -> SaveState {
        SaveState::derive(snapshot_exists, self.is_dirty())
    }
}

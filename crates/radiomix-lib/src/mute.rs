//! Mute orchestration: software (web) mute vs. the hardware switch watcher.
//!
//! Web mute zeroes the mute targets and keeps their levels in memory only.
//! Hardware mode hands the targets to the external watcher. Every transition
//! between the two restores retained levels before the watcher is touched, so
//! neither mode inherits the other's zeroed controls.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::error::Result;
use crate::registry::ControlRegistry;
use crate::tool;
use crate::watcher::{self, MuteSwitchWatcher};

/// Default controls zeroed by a web mute.
pub const DEFAULT_MUTE_TARGETS: &[&str] = &["Aux", "Aux Volume"];

/// Volatile web-mute state. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MuteState {
    pub muted: bool,
    pub saved_levels: BTreeMap<String, Vec<i64>>,
}

/// Result of [`MuteOrchestrator::web_mute`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MuteReport {
    /// Targets whose levels were captured.
    pub captured: Vec<String>,
    /// Targets that could not be read or zeroed.
    pub failed: Vec<String>,
    /// The call found the state already muted and did nothing.
    pub already_muted: bool,
}

/// Result of [`MuteOrchestrator::web_unmute`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmuteReport {
    pub restored: Vec<String>,
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MuteStatusKind {
    Unmuted,
    WebMuted,
    HardwareMuted,
    HardwareWatcherInactive,
}

impl std::fmt::Display for MuteStatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            MuteStatusKind::Unmuted => "unmuted",
            MuteStatusKind::WebMuted => "web-muted",
            MuteStatusKind::HardwareMuted => "hardware-muted",
            MuteStatusKind::HardwareWatcherInactive => "hardware-watcher-inactive",
        })
    }
}

/// Computed mute status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MuteStatus {
    pub state: MuteStatusKind,
    /// Effective mute as the operator should see it.
    pub muted: bool,
    /// The watcher's view, only when the watcher is running.
    pub hardware_muted: Option<bool>,
    pub has_mute_switch: bool,
    pub watcher_active: bool,
}

pub struct MuteOrchestrator {
    registry: Arc<ControlRegistry>,
    watcher: Arc<dyn MuteSwitchWatcher>,
    targets: Vec<String>,
    record_path: PathBuf,
    state: Mutex<MuteState>,
}

impl MuteOrchestrator {
    pub fn new(
        registry: Arc<ControlRegistry>,
        watcher: Arc<dyn MuteSwitchWatcher>,
        targets: Vec<String>,
        record_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            registry,
            watcher,
            targets,
            record_path: record_path.into(),
            state: Mutex::new(MuteState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MuteState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the in-memory state.
    pub fn state(&self) -> MuteState {
        self.lock().clone()
    }

    /// Capture the targets' levels, then zero every target that was read.
    ///
    /// A second call while muted is a no-op: re-capturing would retain the
    /// zeroed levels.
    pub fn web_mute(&self) -> MuteReport {
        let mut state = self.lock();
        if state.muted {
            log::info!("web mute requested while already muted, ignoring");
            return MuteReport {
                already_muted: true,
                ..MuteReport::default()
            };
        }

        let mut report = MuteReport::default();
        let mut levels = BTreeMap::new();
        for name in &self.targets {
            match self.registry.read_values(name) {
                Ok(values) => {
                    levels.insert(name.clone(), values);
                }
                Err(e) => {
                    log::warn!("mute: cannot read {name}: {e}");
                    report.failed.push(name.clone());
                }
            }
        }

        for name in levels.keys() {
            match self
                .registry
                .write_transient(name, &[0], tool::MIXER_TIMEOUT)
            {
                Ok(()) => report.captured.push(name.clone()),
                Err(e) => {
                    log::error!("mute: cannot zero {name}: {e}");
                    report.failed.push(name.clone());
                }
            }
        }

        state.saved_levels = levels;
        state.muted = true;
        log::info!("web mute on ({} controls)", report.captured.len());
        report
    }

    /// Restore every retained level concurrently, then clear the state.
    ///
    /// The state is cleared even when some writes fail.
    pub fn web_unmute(&self) -> UnmuteReport {
        let mut state = self.lock();
        let levels = std::mem::take(&mut state.saved_levels);

        let results: Vec<(String, Result<()>)> = std::thread::scope(|s| {
            let handles: Vec<_> = levels
                .iter()
                .map(|(name, values)| {
                    let registry = &self.registry;
                    s.spawn(move || {
                        let r = registry.write_transient(name, values, tool::UNMUTE_TIMEOUT);
                        (name.clone(), r)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect()
        });

        let mut report = UnmuteReport::default();
        for (name, result) in results {
            match result {
                Ok(()) => report.restored.push(name),
                Err(e) => {
                    log::error!("unmute: cannot restore {name}: {e}");
                    report.failed.push(name);
                }
            }
        }

        if state.muted {
            log::info!("web mute off");
        }
        state.muted = false;
        report
    }

    /// Switch between web and hardware mode.
    pub fn apply_mute_switch(&self, to_hardware: bool) -> Result<UnmuteReport> {
        let report = self.web_unmute();
        if to_hardware {
            self.watcher.start()?;
        } else {
            self.watcher.stop()?;
        }
        Ok(report)
    }

    /// Process-start initializer: reset state, then align the watcher.
    pub fn apply_on_startup(&self, has_mute_switch: bool) -> Result<()> {
        *self.lock() = MuteState::default();
        if has_mute_switch {
            self.watcher.start()
        } else {
            self.watcher.stop()
        }
    }

    pub fn status(&self, has_mute_switch: bool) -> MuteStatus {
        if !has_mute_switch {
            let muted = self.lock().muted;
            return MuteStatus {
                state: if muted {
                    MuteStatusKind::WebMuted
                } else {
                    MuteStatusKind::Unmuted
                },
                muted,
                hardware_muted: None,
                has_mute_switch: false,
                watcher_active: false,
            };
        }

        let active = self.watcher.is_active();
        if !active {
            return MuteStatus {
                state: MuteStatusKind::HardwareWatcherInactive,
                muted: false,
                hardware_muted: None,
                has_mute_switch: true,
                watcher_active: false,
            };
        }

        let record = watcher::read_record(&self.record_path);
        MuteStatus {
            state: if record.muted {
                MuteStatusKind::HardwareMuted
            } else {
                MuteStatusKind::Unmuted
            },
            muted: record.muted,
            hardware_muted: Some(record.muted),
            has_mute_switch: true,
            watcher_active: true,
        }
    }
}

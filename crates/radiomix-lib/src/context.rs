//! Mixer context: wires configuration to the registry, the snapshot store
//! and the mute orchestrator.
//!
//! Consolidates the construction every CLI command repeats: pick the card,
//! build the backend, share one dirty tracker between writes and stores.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::config::Config;
use crate::control::{Control, ControlValue};
use crate::defaults::{self, DefaultsReport};
use crate::dirty::{DirtyTracker, SaveState};
use crate::error::{RadiomixError, Result};
use crate::mixer::{AlsaMixer, Mixer};
use crate::mute::{MuteOrchestrator, MuteReport, MuteStatus, UnmuteReport};
use crate::registry::ControlRegistry;
use crate::snapshot::SnapshotStore;
use crate::watcher::{MuteSwitchWatcher, SystemdWatcher};

/// What the startup sequence did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartupReport {
    pub has_mute_switch: bool,
    /// Watcher start/stop failure, if any.
    pub watcher_error: Option<String>,
    pub snapshot_found: bool,
    pub restored: bool,
    pub restore_error: Option<String>,
}

pub struct MixerContext {
    config: Config,
    config_path: Option<PathBuf>,
    registry: Arc<ControlRegistry>,
    snapshot: SnapshotStore,
    mute: MuteOrchestrator,
}

impl MixerContext {
    /// Build a context over explicit backends.
    pub fn new(
        config: Config,
        mixer: Arc<dyn Mixer>,
        watcher: Arc<dyn MuteSwitchWatcher>,
    ) -> Self {
        let registry = Arc::new(ControlRegistry::new(
            Arc::clone(&mixer),
            config.card.clone(),
            config.secondary_card.clone(),
            Arc::new(DirtyTracker::new()),
        ));
        let snapshot = SnapshotStore::new(mixer, config.card.clone(), config.snapshot_file());
        let mute = MuteOrchestrator::new(
            Arc::clone(&registry),
            watcher,
            config.mute_targets.clone(),
            config.mute_record_file(),
        );
        Self {
            config,
            config_path: None,
            registry,
            snapshot,
            mute,
        }
    }

    /// Build a context driving `amixer`, `alsactl`, and `systemctl`.
    pub fn system(config: Config) -> Self {
        let mixer = Arc::new(AlsaMixer::new(config.use_sudo));
        let watcher = Arc::new(SystemdWatcher::new(
            config.watcher_service.clone(),
            config.use_sudo,
        ));
        Self::new(config, mixer, watcher)
    }

    /// Persist config changes to `path` instead of the platform default.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &ControlRegistry {
        &self.registry
    }

    pub fn snapshot(&self) -> &SnapshotStore {
        &self.snapshot
    }

    pub fn mute(&self) -> &MuteOrchestrator {
        &self.mute
    }

    // ── Controls ──

    pub fn controls(&self) -> BTreeMap<String, Control> {
        self.registry.get_relevant_controls()
    }

    pub fn get_control(&self, name: &str) -> Result<Control> {
        self.registry.get_control(name)
    }

    pub fn set_control(&self, name: &str, value: &ControlValue) -> Result<()> {
        self.registry.set_control(name, value)
    }

    pub fn apply_defaults(&self) -> DefaultsReport {
        defaults::apply_defaults(&self.registry)
    }

    // ── Snapshot ──

    pub fn store(&self) -> Result<()> {
        self.snapshot.store()?;
        self.registry.dirty().clear();
        Ok(())
    }

    pub fn restore(&self) -> Result<()> {
        self.snapshot.restore()
    }

    pub fn save_state(&self) -> SaveState {
        self.registry.dirty().state(self.snapshot.exists())
    }

    // ── Mute ──

    pub fn web_mute(&self) -> MuteReport {
        self.mute.web_mute()
    }

    pub fn web_unmute(&self) -> UnmuteReport {
        self.mute.web_unmute()
    }

    pub fn mute_status(&self) -> MuteStatus {
        self.mute.status(self.config.has_mute_switch)
    }

    /// Persist the hardware-switch flag, then switch modes.
    ///
    /// Only the flag is written back: the file is re-read so that overrides
    /// this context was built with (`--card`) stay out of it. The flag is
    /// kept even if the watcher then fails to start or stop; the next
    /// startup aligns the watcher with it.
    pub fn set_mute_switch(&mut self, enabled: bool) -> Result<UnmuteReport> {
        self.config.has_mute_switch = enabled;
        self.persist_mute_switch(enabled)?;
        self.mute.apply_mute_switch(enabled)
    }

    fn persist_mute_switch(&self, enabled: bool) -> Result<()> {
        let path = match &self.config_path {
            Some(path) => path.clone(),
            None => Config::path()
                .ok_or_else(|| RadiomixError::Config("no config directory".into()))?,
        };
        let (mut stored, warnings) = Config::load_from(&path);
        for w in &warnings {
            log::warn!("{w}");
        }
        stored.has_mute_switch = enabled;
        stored.save_to(&path)?;
        log::info!("has_mute_switch = {enabled} saved to {}", path.display());
        Ok(())
    }

    /// Process-start sequence: reset mute state and align the watcher, then
    /// restore the stored snapshot if there is one. Failures are reported,
    /// not returned.
    pub fn startup(&self) -> StartupReport {
        let mut report = StartupReport {
            has_mute_switch: self.config.has_mute_switch,
            ..StartupReport::default()
        };

        if let Err(e) = self.mute.apply_on_startup(self.config.has_mute_switch) {
            log::error!("startup: watcher alignment failed: {e}");
            report.watcher_error = Some(e.to_string());
        }

        report.snapshot_found = self.snapshot.exists();
        if report.snapshot_found {
            match self.snapshot.restore() {
                Ok(()) => report.restored = true,
                Err(e) => {
                    log::error!("startup: snapshot restore failed: {e}");
                    report.restore_error = Some(e.to_string());
                }
            }
        }
        report
    }
}

/// Persist a new card selection. `id` must name a listed card (by index or
/// name) unless no cards could be listed at all.
pub fn select_card(config: &mut Config, cards: &[crate::card::Card], id: &str) -> Result<()> {
    let id = id.trim();
    if !cards.is_empty() && !cards.iter().any(|c| c.id == id || c.name == id) {
        let known: Vec<&str> = cards.iter().map(|c| c.id.as_str()).collect();
        return Err(RadiomixError::Config(format!(
            "unknown card \"{id}\" (available: {})",
            known.join(", ")
        )));
    }
    config.card = id.to_string();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::Card;
    use crate::mixer::mock::MockMixer;
    use crate::watcher::mock::MockWatcher;

    struct Rig {
        dir: tempfile::TempDir,
        mixer: Arc<MockMixer>,
        watcher: Arc<MockWatcher>,
        ctx: MixerContext,
    }

    fn rig(has_mute_switch: bool) -> Rig {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            snapshot_path: dir.path().join("asound.state").display().to_string(),
            mute_record_path: dir.path().join("mute-state.json").display().to_string(),
            has_mute_switch,
            ..Config::default()
        };
        let mixer = Arc::new(MockMixer::new());
        mixer.add_volume("0", "Aux", &[80, 80]);
        let watcher = Arc::new(MockWatcher::new());
        let ctx = MixerContext::new(
            config,
            Arc::clone(&mixer) as Arc<dyn Mixer>,
            Arc::clone(&watcher) as Arc<dyn MuteSwitchWatcher>,
        )
        .with_config_path(dir.path().join("config.toml"));
        Rig {
            dir,
            mixer,
            watcher,
            ctx,
        }
    }

    #[test]
    fn save_state_transitions() {
        let r = rig(false);
        assert_eq!(r.ctx.save_state(), SaveState::NeverSaved);
        r.ctx.store().unwrap();
        assert_eq!(r.ctx.save_state(), SaveState::SavedClean);
        r.ctx.set_control("Aux", &ControlValue::Level(3)).unwrap();
        assert_eq!(r.ctx.save_state(), SaveState::SavedDiverged);
        r.ctx.store().unwrap();
        assert_eq!(r.ctx.save_state(), SaveState::SavedClean);
    }

    #[test]
    fn web_mute_does_not_dirty() {
        let r = rig(false);
        r.ctx.store().unwrap();
        r.ctx.web_mute();
        r.ctx.web_unmute();
        assert_eq!(r.ctx.save_state(), SaveState::SavedClean);
    }

    #[test]
    fn startup_restores_existing_snapshot() {
        let r = rig(false);
        r.ctx.store().unwrap();
        r.ctx.set_control("Aux", &ControlValue::Level(3)).unwrap();

        let report = r.ctx.startup();
        assert!(report.snapshot_found);
        assert!(report.restored);
        assert_eq!(r.mixer.values("0", "Aux"), Some(vec![80, 80]));
        assert_eq!(r.watcher.events(), vec!["watcher:stop"]);
    }

    #[test]
    fn startup_without_snapshot_only_aligns_watcher() {
        let r = rig(true);
        let report = r.ctx.startup();
        assert!(!report.snapshot_found);
        assert!(!report.restored);
        assert!(r.watcher.is_active());
    }

    #[test]
    fn startup_reports_watcher_failure_and_continues() {
        let r = rig(true);
        r.watcher
            .fail_start
            .store(true, std::sync::atomic::Ordering::SeqCst);
        r.ctx.store().unwrap();
        let report = r.ctx.startup();
        assert!(report.watcher_error.is_some());
        assert!(report.restored);
    }

    #[test]
    fn set_mute_switch_persists_flag() {
        let mut r = rig(false);
        r.ctx.set_mute_switch(true).unwrap();
        assert!(r.ctx.config().has_mute_switch);
        let (saved, _) = Config::load_from(&r.dir.path().join("config.toml"));
        assert!(saved.has_mute_switch);
        assert!(r.watcher.is_active());
        assert!(r.ctx.mute_status().watcher_active);
    }

    #[test]
    fn set_mute_switch_keeps_overrides_out_of_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "card = \"0\"\nsecondary_card = \"2\"\n").unwrap();

        let (mut config, _) = Config::load_from(&path);
        config.card = "7".into();
        config.snapshot_path = dir.path().join("asound.state").display().to_string();
        let mut ctx = MixerContext::new(
            config,
            Arc::new(MockMixer::new()) as Arc<dyn Mixer>,
            Arc::new(MockWatcher::new()) as Arc<dyn MuteSwitchWatcher>,
        )
        .with_config_path(path.clone());

        ctx.set_mute_switch(true).unwrap();
        assert_eq!(ctx.config().card, "7");

        let (saved, warnings) = Config::load_from(&path);
        assert!(warnings.is_empty());
        assert!(saved.has_mute_switch);
        assert_eq!(saved.card, "0");
        assert_eq!(saved.secondary_card, "2");
        assert!(saved.snapshot_path.is_empty());
    }

    #[test]
    fn set_mute_switch_saves_flag_before_watcher_failure() {
        let r = rig(false);
        r.watcher
            .fail_start
            .store(true, std::sync::atomic::Ordering::SeqCst);
        let mut ctx = r.ctx;
        assert!(ctx.set_mute_switch(true).is_err());
        let (saved, _) = Config::load_from(&r.dir.path().join("config.toml"));
        assert!(saved.has_mute_switch);
    }

    #[test]
    fn select_card_checks_listing() {
        let cards = vec![
            Card {
                id: "0".into(),
                name: "Zero".into(),
            },
            Card {
                id: "1".into(),
                name: "Device".into(),
            },
        ];
        let mut config = Config::default();
        select_card(&mut config, &cards, "1").unwrap();
        assert_eq!(config.card, "1");
        select_card(&mut config, &cards, "Zero").unwrap();
        assert_eq!(config.card, "Zero");
        let err = select_card(&mut config, &cards, "7").unwrap_err();
        assert!(err.to_string().contains("unknown card"));
        assert_eq!(config.card, "Zero");
    }

    #[test]
    fn select_card_without_listing_accepts_anything() {
        let mut config = Config::default();
        select_card(&mut config, &[], "2").unwrap();
        assert_eq!(config.card, "2");
    }
}

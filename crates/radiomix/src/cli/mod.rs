//! CLI subcommands: controls, snapshots, mute, cards.

mod cards;
mod config_cmd;
mod controls;
mod defaults;
mod mute;
mod snapshot;
mod startup;

use std::path::{Path, PathBuf};

use clap::Subcommand;
use serde::Serialize;

pub(super) use crate::RUNNING;
pub(super) use radiomix_lib::MixerContext;
pub(super) use radiomix_lib::card::{Card, CaptureDevice};
pub(super) use radiomix_lib::config::Config;
pub(super) use radiomix_lib::control::{Control, ControlKind, ControlValue};
pub(super) use radiomix_lib::defaults::DefaultsReport;
pub(super) use radiomix_lib::dirty::SaveState;
pub(super) use radiomix_lib::error::{RadiomixError, Result};

const PADDING: usize = 2;

/// Options shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct Globals {
    pub json: bool,
    pub config_path: Option<PathBuf>,
    pub card: Option<String>,
}

/// Compute alignment width for a command's key-value output.
/// Ensures at least PADDING spaces after the longest key in either level,
/// with top-level and indent values aligned to the same column.
pub(super) fn kv_width(top: &[&str], indent: &[&str]) -> usize {
    let top_max = top.iter().map(|k| k.len()).max().unwrap_or(0);
    let indent_max = indent.iter().map(|k| k.len()).max().unwrap_or(0);
    let top_need = if top.is_empty() { 0 } else { top_max + PADDING };
    // Indent keys lose 2 chars of inner width to the "  " prefix
    let indent_need = if indent.is_empty() {
        0
    } else {
        indent_max + PADDING + 2
    };
    top_need.max(indent_need)
}

pub(super) fn format_kv(key: &str, value: impl std::fmt::Display, w: usize) -> String {
    format!("{key:<width$}{value}", width = w)
}

pub(super) fn kv(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("{key:<width$}{value}", width = w);
}

pub(super) fn kv_indent(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("  {key:<width$}{value}", width = w - 2);
}

pub(super) fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Load config from `custom_path` or the platform default, logging parse and
/// validation problems. `--card` overrides the configured card.
pub(super) fn load_config(globals: &Globals) -> Config {
    let (mut config, warnings) = match &globals.config_path {
        Some(p) => Config::load_from(p),
        None => Config::load_with_warnings(),
    };
    for w in &warnings {
        log::warn!("{w}");
    }
    if let Err(errors) = config.validate() {
        for e in &errors {
            log::warn!("[config] {e}");
        }
    }
    if let Some(card) = &globals.card {
        config.card = card.clone();
    }
    config
}

/// Effective config file location.
pub(super) fn config_file(globals: &Globals) -> Option<PathBuf> {
    globals.config_path.clone().or_else(Config::path)
}

/// Build a context over the real tools.
pub(super) fn open_context(globals: &Globals) -> MixerContext {
    let ctx = MixerContext::system(load_config(globals));
    match &globals.config_path {
        Some(p) => ctx.with_config_path(p),
        None => ctx,
    }
}

/// Persist `config` to the effective config file.
pub(super) fn save_config(config: &Config, globals: &Globals) -> Result<PathBuf> {
    let Some(path) = config_file(globals) else {
        return Err(RadiomixError::Config("no config directory".into()));
    };
    config.save_to(&path)?;
    Ok(path)
}

pub(super) fn path_status(path: &Path) -> String {
    let status = if path.exists() { "present" } else { "not found" };
    format!("{} ({status})", path.display())
}

/// One-line human rendering of a control's current value.
pub(super) fn describe(control: &Control) -> String {
    match control.kind {
        ControlKind::Volume => {
            let values: Vec<String> = control.values.iter().map(i64::to_string).collect();
            let mut s = format!(
                "{} ({}..{})",
                values.join(","),
                control.min,
                control.max
            );
            if let Some(db) = &control.decibels {
                let db: Vec<String> = db.iter().map(|d| format!("{d:.2}dB")).collect();
                s.push_str(&format!(" [{}]", db.join(", ")));
            }
            if let Some(on) = control.switch_on {
                s.push_str(if on { " [on]" } else { " [off]" });
            }
            s
        }
        ControlKind::Switch => {
            if control.values.first().copied().unwrap_or(0) != 0 {
                "on".into()
            } else {
                "off".into()
            }
        }
        ControlKind::Enum => {
            let selected = control.selected_item().unwrap_or("?");
            let items = control.items.as_deref().unwrap_or_default().join(" | ");
            format!("{selected} ({items})")
        }
    }
}

// ── JSON output structs ──

/// Commands that write report the save state from the same process, the
/// only place the dirty flag is known.
#[derive(Serialize)]
pub(super) struct SetOutput {
    pub name: String,
    pub value: String,
    pub control: Option<Control>,
    pub state: SaveState,
}

#[derive(Serialize)]
pub(super) struct DefaultsOutput {
    #[serde(flatten)]
    pub report: DefaultsReport,
    pub state: SaveState,
}

/// Whether a snapshot exists. Divergence is not reported here: a fresh
/// process has seen no writes.
#[derive(Serialize)]
pub(super) struct SavedOutput {
    pub saved: bool,
    pub snapshot: String,
}

#[derive(Serialize)]
pub(super) struct ActionOutput {
    pub ok: bool,
    pub snapshot: String,
}

#[derive(Serialize)]
pub(super) struct CardsOutput {
    pub current_card: String,
    pub cards: Vec<Card>,
}

#[derive(Serialize)]
pub(super) struct DevicesOutput {
    pub count: usize,
    pub devices: Vec<CaptureDevice>,
}

#[derive(Serialize)]
pub(super) struct ConfigOutput {
    pub config_file: Option<String>,
    pub config_file_exists: bool,
    pub settings: Config,
    pub files: ConfigFilesJson,
}

#[derive(Serialize)]
pub(super) struct ConfigFilesJson {
    pub snapshot: String,
    pub snapshot_exists: bool,
    pub mute_record: String,
    pub mute_record_exists: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// List relevant mixer controls (falls back to other cards if none)
    Controls {
        /// List every decodable control on the card, not just relevant ones
        #[arg(long)]
        all: bool,
    },

    /// Show one control
    Get {
        /// Control name, e.g. "Aux"
        name: String,
    },

    /// Set one control
    Set {
        /// Control name, e.g. "Aux"
        name: String,
        /// Level (80), per-channel levels (80,75), item index (#1), or an
        /// amixer token / item label (on, mute, 70%, Limiter)
        #[arg(allow_hyphen_values = true)]
        value: ControlValue,
    },

    /// Store the mixer state snapshot
    Store,

    /// Restore the mixer state snapshot
    Restore,

    /// Show whether the mixer matches the stored snapshot
    Saved,

    /// Apply the known-good line-input preset
    Defaults,

    /// Show mute status
    Status,

    /// Mute the mute targets until Ctrl+C, then restore them
    Mute,

    /// Restore levels retained by a web mute in this process
    Unmute,

    /// Enable or disable hardware mute-switch mode
    MuteSwitch {
        #[arg(value_parser = ["on", "off"])]
        mode: String,
    },

    /// List sound cards
    Cards,

    /// Select the sound card and save it to the config
    SelectCard {
        /// Card index or name from `radiomix cards`
        id: String,
    },

    /// List capture devices
    Devices,

    /// Run the startup sequence (align watcher, restore snapshot)
    Startup,

    /// Show current configuration and file paths
    Config,
}

pub fn run(cmd: Command, globals: &Globals) -> Result<()> {
    match cmd {
        Command::Controls { all } => controls::cmd_controls(globals, all),
        Command::Get { name } => controls::cmd_get(globals, &name),
        Command::Set { name, value } => controls::cmd_set(globals, &name, &value),
        Command::Store => snapshot::cmd_store(globals),
        Command::Restore => snapshot::cmd_restore(globals),
        Command::Saved => snapshot::cmd_saved(globals),
        Command::Defaults => defaults::cmd_defaults(globals),
        Command::Status => mute::cmd_status(globals),
        Command::Mute => mute::cmd_mute(globals),
        Command::Unmute => mute::cmd_unmute(globals),
        Command::MuteSwitch { mode } => mute::cmd_mute_switch(globals, mode == "on"),
        Command::Cards => cards::cmd_cards(globals),
        Command::SelectCard { id } => cards::cmd_select_card(globals, &id),
        Command::Devices => cards::cmd_devices(globals),
        Command::Startup => startup::cmd_startup(globals),
        Command::Config => config_cmd::cmd_config(globals),
    }
}




#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn card_override_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "card = \"3\"\n").unwrap();
        let globals = Globals {
            config_path: Some(path.clone()),
            ..Globals::default()
        };
        assert_eq!(load_config(&globals).card, "3");

        let globals = Globals {
            config_path: Some(path),
            card: Some("1".into()),
            ..Globals::default()
        };
        assert_eq!(load_config(&globals).card, "1");
    }

    #[test]
    fn save_config_uses_custom_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");
        let globals = Globals {
            config_path: Some(path.clone()),
            ..Globals::default()
        };
        let written = save_config(&Config::default(), &globals).unwrap();
        assert_eq!(written, path);
        assert!(path.exists());
    }
}

//! Application configuration: TOML file at a platform-aware path.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::mute::DEFAULT_MUTE_TARGETS;
use crate::watcher::DEFAULT_SERVICE;

/// Header comment prepended to saved config files.
const CONFIG_HEADER: &str =
    "# radiomix configuration. Changes made outside radiomix may be overwritten.\n\n";

/// File name of the snapshot inside the data directory.
pub const SNAPSHOT_FILE: &str = "asound.state";

/// File name of the watcher's mute record inside the data directory.
pub const MUTE_RECORD_FILE: &str = "mute-state.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// ALSA card index or id. Default: "0".
    #[serde(default = "default_card")]
    pub card: String,

    /// Card tried when the configured one has no relevant controls. Default: "1".
    #[serde(default = "default_secondary_card")]
    pub secondary_card: String,

    /// Snapshot file. Empty = `asound.state` in the data directory.
    #[serde(default)]
    pub snapshot_path: String,

    /// Controls zeroed by a web mute.
    #[serde(default = "default_mute_targets")]
    pub mute_targets: Vec<String>,

    /// A physical mute switch is fitted; its watcher owns muting.
    #[serde(default)]
    pub has_mute_switch: bool,

    /// systemd unit of the switch watcher.
    #[serde(default = "default_watcher_service")]
    pub watcher_service: String,

    /// Record written by the watcher. Empty = `mute-state.json` in the data directory.
    #[serde(default)]
    pub mute_record_path: String,

    /// Run `alsactl` and `systemctl start|stop` through `sudo -n`.
    #[serde(default = "default_true")]
    pub use_sudo: bool,
}

fn default_card() -> String {
    "0".into()
}
fn default_secondary_card() -> String {
    "1".into()
}
fn default_mute_targets() -> Vec<String> {
    DEFAULT_MUTE_TARGETS.iter().map(|s| s.to_string()).collect()
}
fn default_watcher_service() -> String {
    DEFAULT_SERVICE.into()
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Config {
            card: default_card(),
            secondary_card: default_secondary_card(),
            snapshot_path: String::new(),
            mute_targets: default_mute_targets(),
            has_mute_switch: false,
            watcher_service: default_watcher_service(),
            mute_record_path: String::new(),
            use_sudo: true,
        }
    }
}

/// Validation errors that [`Config::validate`] can return.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A card field is empty or contains whitespace.
    InvalidCard { field: &'static str, value: String },
    /// `mute_targets` is empty.
    NoMuteTargets,
    /// A `mute_targets` entry is blank.
    BlankMuteTarget(usize),
    /// `has_mute_switch` is set but no watcher service is named.
    EmptyWatcherService,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidCard { field, value } => {
                write!(f, "Invalid {field}: \"{value}\"")
            }
            ValidationError::NoMuteTargets => write!(f, "mute_targets cannot be empty"),
            ValidationError::BlankMuteTarget(i) => {
                write!(f, "mute_targets[{i}] is blank")
            }
            ValidationError::EmptyWatcherService => {
                write!(f, "watcher_service cannot be empty when has_mute_switch is set")
            }
        }
    }
}

fn valid_card(card: &str) -> bool {
    !card.is_empty() && !card.contains(char::is_whitespace)
}

impl Config {
    /// Platform-specific config directory.
    pub fn dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("radiomix"))
    }

    /// Full path to config file.
    pub fn path() -> Option<PathBuf> {
        Self::dir().map(|d| d.join("config.toml"))
    }

    /// Platform-specific data directory (snapshot, mute record).
    pub fn data_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|p| p.join("radiomix"))
    }

    fn in_data_dir(configured: &str, file: &str) -> PathBuf {
        let configured = configured.trim();
        if !configured.is_empty() {
            return PathBuf::from(configured);
        }
        match Self::data_dir() {
            Some(dir) => dir.join(file),
            None => PathBuf::from(file),
        }
    }

    /// Effective snapshot file.
    pub fn snapshot_file(&self) -> PathBuf {
        Self::in_data_dir(&self.snapshot_path, SNAPSHOT_FILE)
    }

    /// Effective watcher record file.
    pub fn mute_record_file(&self) -> PathBuf {
        Self::in_data_dir(&self.mute_record_path, MUTE_RECORD_FILE)
    }

    /// Load config from disk, or return defaults if not found.
    pub fn load() -> Self {
        let (config, warnings) = Self::load_with_warnings();
        for w in &warnings {
            log::warn!("{w}");
        }
        config
    }

    /// Save config to an arbitrary path atomically (write to temp file, then rename).
    ///
    /// A header comment is prepended to warn that manual edits may be overwritten.
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let serialized = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        let contents = format!("{CONFIG_HEADER}{serialized}");
        let tmp = path.with_extension("toml.tmp");
        std::fs::write(&tmp, &contents)?;
        match std::fs::rename(&tmp, path) {
            Ok(()) => Ok(()),
            Err(_) => {
                // Rename can fail across filesystems; fall back to direct write + cleanup
                let result = std::fs::write(path, &contents);
                let _ = std::fs::remove_file(&tmp);
                result
            }
        }
    }

    /// Save config to the default platform path.
    pub fn save(&self) -> std::io::Result<()> {
        let Some(path) = Self::path() else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "No config directory",
            ));
        };
        self.save_to(&path)
    }

    /// Load config from an arbitrary path, returning the config and any parse warnings.
    ///
    /// Returns `(defaults, [])` if the file doesn't exist.
    /// Returns `(defaults, [warning])` if the file exists but can't be parsed.
    pub fn load_from(path: &Path) -> (Self, Vec<String>) {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => (config, vec![]),
                Err(e) => {
                    let warning = format!(
                        "config parse error ({}), using defaults: {e}",
                        path.display()
                    );
                    (Self::default(), vec![warning])
                }
            },
            Err(_) => (Self::default(), vec![]),
        }
    }

    /// Load config from the default path, returning the config and any parse warnings.
    pub fn load_with_warnings() -> (Self, Vec<String>) {
        let Some(path) = Self::path() else {
            return (Self::default(), vec![]);
        };
        Self::load_from(&path)
    }

    /// Validate the entire config, collecting all errors.
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if !valid_card(&self.card) {
            errors.push(ValidationError::InvalidCard {
                field: "card",
                value: self.card.clone(),
            });
        }
        if !valid_card(&self.secondary_card) {
            errors.push(ValidationError::InvalidCard {
                field: "secondary_card",
                value: self.secondary_card.clone(),
            });
        }

        if self.mute_targets.is_empty() {
            errors.push(ValidationError::NoMuteTargets);
        }
        for (i, t) in self.mute_targets.iter().enumerate() {
            if t.trim().is_empty() {
                errors.push(ValidationError::BlankMuteTarget(i));
            }
        }

        if self.has_mute_switch && self.watcher_service.trim().is_empty() {
            errors.push(ValidationError::EmptyWatcherService);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

//! Hardware mute-switch watcher: actuator trait and the record it writes.
//!
//! The watcher is an external service that owns the GPIO switch. It zeroes
//! and restores the mute targets itself and publishes its view in a small
//! JSON file, which we only ever read.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::tool;

/// Default systemd unit of the GPIO watcher.
pub const DEFAULT_SERVICE: &str = "mute-gpio.service";

pub trait MuteSwitchWatcher: Send + Sync {
    fn start(&self) -> Result<()>;
    fn stop(&self) -> Result<()>;
    /// Liveness probe. Any probe failure reads as inactive.
    fn is_active(&self) -> bool;
}

/// Drives the watcher through `systemctl`.
#[derive(Debug, Clone)]
pub struct SystemdWatcher {
    pub service: String,
    pub use_sudo: bool,
}

impl SystemdWatcher {
    pub fn new(service: impl Into<String>, use_sudo: bool) -> Self {
        Self {
            service: service.into(),
            use_sudo,
        }
    }

    fn systemctl(&self, action: &str) -> Result<()> {
        if self.use_sudo {
            tool::run(
                "sudo",
                &["-n", "systemctl", action, &self.service],
                tool::SERVICE_TIMEOUT,
            )?;
        } else {
            tool::run("systemctl", &[action, &self.service], tool::SERVICE_TIMEOUT)?;
        }
        log::info!("systemctl {action} {}", self.service);
        Ok(())
    }
}

impl MuteSwitchWatcher for SystemdWatcher {
    fn start(&self) -> Result<()> {
        self.systemctl("start")
    }

    fn stop(&self) -> Result<()> {
        self.systemctl("stop")
    }

    fn is_active(&self) -> bool {
        // `is-active` exits non-zero for every state except active
        tool::run_quiet(
            "systemctl",
            &["is-active", &self.service],
            tool::PROBE_TIMEOUT,
        )
        .map(|out| out.stdout.trim() == "active")
        .unwrap_or(false)
    }
}

/// The watcher's published state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareMuteRecord {
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub levels: BTreeMap<String, Vec<i64>>,
}

/// Read the watcher record. Missing or unreadable reads as unmuted.
pub fn read_record(path: &Path) -> HardwareMuteRecord {
    let Ok(text) = std::fs::read_to_string(path) else {
        return HardwareMuteRecord::default();
    };
    serde_json::from_str(&text).unwrap_or_else(|e| {
        log::warn!("ignoring unreadable mute record {}: {e}", path.display());
        HardwareMuteRecord::default()
    })
}

/// Mock watcher for unit and integration tests.
///
/// Always compiled (zero runtime cost), hidden from public docs.
#[doc(hidden)]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use crate::error::RadiomixError;
    use crate::tool::ToolError;

    /// Records `start`/`stop` into `events`, which tests may share with
    /// other mocks to assert ordering.
    #[derive(Default)]
    pub struct MockWatcher {
        pub active: AtomicBool,
        pub events: Arc<Mutex<Vec<String>>>,
        pub fail_start: AtomicBool,
    }

    impl MockWatcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_events(events: Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                events,
                ..Self::default()
            }
        }

        pub fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl MuteSwitchWatcher for MockWatcher {
        fn start(&self) -> Result<()> {
            self.events.lock().unwrap().push("watcher:start".into());
            if self.fail_start.load(Ordering::SeqCst) {
                return Err(RadiomixError::Tool(ToolError::Exited {
                    command: "systemctl start mute-gpio.service".into(),
                    status: "exited with status 5".into(),
                    stderr: "Unit mute-gpio.service not found.".into(),
                }));
            }
            self.active.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn stop(&self) -> Result<()> {
            self.events.lock().unwrap().push("watcher:stop".into());
            self.active.store(false, Ordering::SeqCst);
            Ok(())
        }

        fn is_active(&self) -> bool {
            self.active.load(Ordering::SeqCst)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_record_reads_unmuted() {
        let dir = tempfile::tempdir().unwrap();
        let rec = read_record(&dir.path().join("mute-state.json"));
        assert_eq!(rec, HardwareMuteRecord::default());
        assert!(!rec.muted);
        assert!(rec.levels.is_empty());
    }

    #[test]
    fn malformed_record_reads_unmuted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mute-state.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(read_record(&path), HardwareMuteRecord::default());
    }

    #[test]
    fn record_with_levels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mute-state.json");
        std::fs::write(&path, r#"{"muted": true, "levels": {"Aux": [80, 80]}}"#).unwrap();
        let rec = read_record(&path);
        assert!(rec.muted);
        assert_eq!(rec.levels["Aux"], vec![80, 80]);
    }

    #[test]
    fn record_missing_fields_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mute-state.json");
        std::fs::write(&path, r#"{"muted": true}"#).unwrap();
        let rec = read_record(&path);
        assert!(rec.muted);
        assert!(rec.levels.is_empty());
    }

    #[test]
    fn mock_watcher_tracks_activity() {
        let w = mock::MockWatcher::new();
        assert!(!w.is_active());
        w.start().unwrap();
        assert!(w.is_active());
        w.stop().unwrap();
        assert!(!w.is_active());
        assert_eq!(w.events(), vec!["watcher:start", "watcher:stop"]);
    }

    #[test]
    fn systemd_watcher_missing_unit_is_inactive() {
        let w = SystemdWatcher::new("radiomix-test-nonexistent.service", false);
        assert!(!w.is_active());
    }
}

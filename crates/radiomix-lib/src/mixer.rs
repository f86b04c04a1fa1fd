//! Mixer backend trait and its `amixer`/`alsactl` implementation.
//!
//! The trait is the only path to the hardware. It deals in raw text and raw
//! arguments; decoding lives in [`crate::control`].

use std::path::Path;
use std::time::Duration;

use crate::tool::{self, ToolError};

pub type Result<T> = std::result::Result<T, ToolError>;

// ── Trait ──

pub trait Mixer: Send + Sync {
    /// Names of all simple controls on `card`.
    fn list_names(&self, card: &str) -> Result<Vec<String>>;
    /// Raw introspection text for one control.
    fn read(&self, card: &str, name: &str) -> Result<String>;
    /// Write a raw `amixer set` argument (`80`, `80,80`, `on`, `70%`, an item label).
    fn write(&self, card: &str, name: &str, arg: &str) -> Result<()>;
    /// Like [`write`](Mixer::write) but bounded by `timeout`.
    fn write_within(&self, card: &str, name: &str, arg: &str, _timeout: Duration) -> Result<()> {
        self.write(card, name, arg)
    }
    /// Save the whole-card state to `path`.
    fn store_snapshot(&self, card: &str, path: &Path) -> Result<()>;
    /// Load the whole-card state from `path`.
    fn restore_snapshot(&self, card: &str, path: &Path) -> Result<()>;
}

// ── ALSA implementation ──

/// Drives the `amixer` and `alsactl` command-line tools.
#[derive(Debug, Clone)]
pub struct AlsaMixer {
    /// Run `alsactl` through `sudo -n` (the state file usually needs root).
    pub use_sudo: bool,
}

impl AlsaMixer {
    pub fn new(use_sudo: bool) -> Self {
        Self { use_sudo }
    }

    fn amixer(card: &str, args: &[&str], timeout: Duration) -> Result<String> {
        let mut argv = vec!["-c", card];
        argv.extend_from_slice(args);
        tool::run("amixer", &argv, timeout).map(|out| out.stdout)
    }

    fn alsactl(&self, action: &str, card: &str, path: &Path) -> Result<()> {
        let path = path.to_string_lossy();
        let argv = ["-f", path.as_ref(), action, card];
        if self.use_sudo {
            let mut sudo = vec!["-n", "alsactl"];
            sudo.extend_from_slice(&argv);
            tool::run("sudo", &sudo, tool::SNAPSHOT_TIMEOUT)?;
        } else {
            tool::run("alsactl", &argv, tool::SNAPSHOT_TIMEOUT)?;
        }
        Ok(())
    }
}

impl Mixer for AlsaMixer {
    fn list_names(&self, card: &str) -> Result<Vec<String>> {
        let out = Self::amixer(card, &["scontrols"], tool::MIXER_TIMEOUT)?;
        Ok(crate::control::parse_scontrols(&out))
    }

    fn read(&self, card: &str, name: &str) -> Result<String> {
        Self::amixer(card, &["get", name], tool::MIXER_TIMEOUT)
    }

    fn write(&self, card: &str, name: &str, arg: &str) -> Result<()> {
        self.write_within(card, name, arg, tool::MIXER_TIMEOUT)
    }

    fn write_within(&self, card: &str, name: &str, arg: &str, timeout: Duration) -> Result<()> {
        Self::amixer(card, &["set", name, arg], timeout).map(|_| ())
    }

    fn store_snapshot(&self, card: &str, path: &Path) -> Result<()> {
        self.alsactl("store", card, path)
    }

    fn restore_snapshot(&self, card: &str, path: &Path) -> Result<()> {
        self.alsactl("restore", card, path)
    }
}

// ── Mock mixer for testing ──

/// Mock mixer for unit and integration tests.
///
/// Always compiled (zero runtime cost), hidden from public docs.
#[doc(hidden)]
pub mod mock {
    use super::*;
    use std::collections::{BTreeMap, HashSet};
    use std::sync::Mutex;

    use crate::control::{Control, ControlKind};

    /// In-memory mixer. Controls are kept per card and rendered as
    /// amixer-shaped text on `read`, so reads go through the real parser.
    /// Writes accept the same argument forms as `amixer set`.
    #[derive(Default)]
    pub struct MockMixer {
        /// card → (name → control). Unparseable entries live in `raw_blocks`.
        pub cards: Mutex<BTreeMap<String, BTreeMap<String, Control>>>,
        /// card → (name → verbatim text) for controls the parser should reject.
        pub raw_blocks: Mutex<BTreeMap<String, BTreeMap<String, String>>>,
        /// Recorded writes: (card, name, arg), in completion order.
        pub writes: Mutex<Vec<(String, String, String)>>,
        /// Control names whose reads fail.
        pub fail_reads: Mutex<HashSet<String>>,
        /// Control names whose writes fail.
        pub fail_writes: Mutex<HashSet<String>>,
        /// Cards whose `list_names` fails.
        pub fail_cards: Mutex<HashSet<String>>,
    }

    fn failure(command: String, stderr: &str) -> ToolError {
        ToolError::Exited {
            command,
            status: "exited with status 1".into(),
            stderr: stderr.into(),
        }
    }

    impl MockMixer {
        pub fn new() -> Self {
            Self::default()
        }

        /// Add (or replace) a control on `card`.
        pub fn insert(&self, card: &str, control: Control) {
            self.cards
                .lock()
                .unwrap()
                .entry(card.to_string())
                .or_default()
                .insert(control.name.clone(), control);
        }

        /// Add a stereo/mono volume control with 0–127 limits.
        pub fn add_volume(&self, card: &str, name: &str, values: &[i64]) {
            self.insert(
                card,
                Control {
                    name: name.into(),
                    kind: ControlKind::Volume,
                    values: values.to_vec(),
                    min: 0,
                    max: 127,
                    decibels: None,
                    has_switch: None,
                    switch_on: None,
                    items: None,
                },
            );
        }

        /// Add an on/off switch control.
        pub fn add_switch(&self, card: &str, name: &str, on: bool) {
            self.insert(
                card,
                Control {
                    name: name.into(),
                    kind: ControlKind::Switch,
                    values: vec![i64::from(on)],
                    min: 0,
                    max: 1,
                    decibels: None,
                    has_switch: None,
                    switch_on: None,
                    items: None,
                },
            );
        }

        /// Add an enumerated control with `selected` as the current index.
        pub fn add_enum(&self, card: &str, name: &str, items: &[&str], selected: usize) {
            self.insert(
                card,
                Control {
                    name: name.into(),
                    kind: ControlKind::Enum,
                    values: vec![selected as i64],
                    min: 0,
                    max: items.len().saturating_sub(1) as i64,
                    decibels: None,
                    has_switch: None,
                    switch_on: None,
                    items: Some(items.iter().map(|s| s.to_string()).collect()),
                },
            );
        }

        /// Add a control whose introspection text the parser will reject.
        pub fn add_raw(&self, card: &str, name: &str, text: &str) {
            self.raw_blocks
                .lock()
                .unwrap()
                .entry(card.to_string())
                .or_default()
                .insert(name.to_string(), text.to_string());
        }

        pub fn fail_read(&self, name: &str) {
            self.fail_reads.lock().unwrap().insert(name.to_string());
        }

        pub fn fail_write(&self, name: &str) {
            self.fail_writes.lock().unwrap().insert(name.to_string());
        }

        pub fn fail_card(&self, card: &str) {
            self.fail_cards.lock().unwrap().insert(card.to_string());
        }

        /// Current values of a control, bypassing the parser.
        pub fn values(&self, card: &str, name: &str) -> Option<Vec<i64>> {
            self.cards
                .lock()
                .unwrap()
                .get(card)
                .and_then(|c| c.get(name))
                .map(|c| c.values.clone())
        }

        /// Recorded write arguments for one control.
        pub fn writes_to(&self, name: &str) -> Vec<String> {
            self.writes
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, n, _)| n == name)
                .map(|(_, _, arg)| arg.clone())
                .collect()
        }
    }

    /// Render a control the way `amixer get` prints it.
    pub fn render(control: &Control) -> String {
        let mut out = format!("Simple mixer control '{}',0\n", control.name);
        match control.kind {
            ControlKind::Enum => {
                out.push_str("  Capabilities: enum\n");
                let items = control.items.clone().unwrap_or_default();
                let quoted: Vec<String> = items.iter().map(|i| format!("'{i}'")).collect();
                out.push_str(&format!("  Items: {}\n", quoted.join(" ")));
                let idx = control.values.first().copied().unwrap_or(0) as usize;
                if let Some(sel) = items.get(idx) {
                    out.push_str(&format!("  Item0: '{sel}'\n"));
                }
            }
            ControlKind::Switch => {
                out.push_str("  Capabilities: pswitch pswitch-joined\n");
                out.push_str("  Playback channels: Mono\n");
                let on = control.values.first().copied().unwrap_or(0) != 0;
                out.push_str(&format!("  Mono: Playback [{}]\n", on_off(on)));
            }
            ControlKind::Volume => {
                if control.has_switch == Some(true) {
                    out.push_str("  Capabilities: volume pswitch\n");
                } else {
                    out.push_str("  Capabilities: volume\n");
                }
                out.push_str(&format!("  Limits: {} - {}\n", control.min, control.max));
                let labels: &[&str] = if control.values.len() == 1 {
                    &["Mono"]
                } else {
                    &["Front Left", "Front Right"]
                };
                for (label, v) in labels.iter().zip(&control.values) {
                    let span = (control.max - control.min).max(1);
                    let pct = (v - control.min) * 100 / span;
                    out.push_str(&format!("  {label}: {v} [{pct}%]"));
                    if let Some(on) = control.switch_on {
                        out.push_str(&format!(" [{}]", on_off(on)));
                    }
                    out.push('\n');
                }
            }
        }
        out
    }

    fn on_off(on: bool) -> &'static str {
        if on { "on" } else { "off" }
    }

    /// Apply an `amixer set` argument to a control. Returns false if the
    /// argument does not fit the control.
    fn apply_arg(control: &mut Control, arg: &str) -> bool {
        let arg = arg.trim();
        let lower = arg.to_ascii_lowercase();
        let switch_word = match lower.as_str() {
            "on" | "unmute" => Some(true),
            "off" | "mute" => Some(false),
            _ => None,
        };

        match control.kind {
            ControlKind::Enum => {
                let items = control.items.as_ref();
                match items.and_then(|items| items.iter().position(|i| i == arg)) {
                    Some(idx) => {
                        control.values = vec![idx as i64];
                        true
                    }
                    None => false,
                }
            }
            ControlKind::Switch => match switch_word {
                Some(on) => {
                    control.values = vec![i64::from(on)];
                    true
                }
                None => match arg.parse::<i64>() {
                    Ok(v @ (0 | 1)) => {
                        control.values = vec![v];
                        true
                    }
                    _ => false,
                },
            },
            ControlKind::Volume => {
                if let Some(on) = switch_word {
                    if control.has_switch == Some(true) {
                        control.switch_on = Some(on);
                        return true;
                    }
                    return false;
                }
                let parsed: Option<Vec<i64>> = arg
                    .split(',')
                    .map(|part| parse_level(part.trim(), control.min, control.max))
                    .collect();
                let Some(levels) = parsed else {
                    return false;
                };
                let channels = control.values.len();
                control.values = match levels.len() {
                    1 => vec![levels[0]; channels],
                    n if n == channels => levels,
                    _ => return false,
                };
                true
            }
        }
    }

    fn parse_level(part: &str, min: i64, max: i64) -> Option<i64> {
        let v = match part.strip_suffix('%') {
            Some(pct) => {
                let pct: i64 = pct.parse().ok()?;
                min + (max - min) * pct / 100
            }
            None => part.parse().ok()?,
        };
        Some(v.clamp(min, max))
    }

    impl Mixer for MockMixer {
        fn list_names(&self, card: &str) -> Result<Vec<String>> {
            if self.fail_cards.lock().unwrap().contains(card) {
                return Err(failure(
                    format!("amixer -c {card} scontrols"),
                    "Invalid card number",
                ));
            }
            let mut names: Vec<String> = self
                .cards
                .lock()
                .unwrap()
                .get(card)
                .map(|c| c.keys().cloned().collect())
                .unwrap_or_default();
            if let Some(raw) = self.raw_blocks.lock().unwrap().get(card) {
                names.extend(raw.keys().cloned());
            }
            Ok(names)
        }

        fn read(&self, card: &str, name: &str) -> Result<String> {
            let command = format!("amixer -c {card} get '{name}'");
            if self.fail_reads.lock().unwrap().contains(name) {
                return Err(failure(command, "mock: read failure injected"));
            }
            if let Some(text) = self
                .raw_blocks
                .lock()
                .unwrap()
                .get(card)
                .and_then(|c| c.get(name))
            {
                return Ok(text.clone());
            }
            self.cards
                .lock()
                .unwrap()
                .get(card)
                .and_then(|c| c.get(name))
                .map(render)
                .ok_or_else(|| {
                    failure(command, &format!("Unable to find simple control '{name}',0"))
                })
        }

        fn write(&self, card: &str, name: &str, arg: &str) -> Result<()> {
            let command = format!("amixer -c {card} set '{name}' {arg}");
            if self.fail_writes.lock().unwrap().contains(name) {
                return Err(failure(command, "mock: write failure injected"));
            }
            {
                let mut cards = self.cards.lock().unwrap();
                let Some(control) = cards.get_mut(card).and_then(|c| c.get_mut(name)) else {
                    return Err(failure(
                        command,
                        &format!("Unable to find simple control '{name}',0"),
                    ));
                };
                if !apply_arg(control, arg) {
                    return Err(failure(command, "Invalid command!"));
                }
            }
            self.writes
                .lock()
                .unwrap()
                .push((card.to_string(), name.to_string(), arg.to_string()));
            Ok(())
        }

        fn store_snapshot(&self, card: &str, path: &Path) -> Result<()> {
            let command = format!("alsactl -f {} store {card}", path.display());
            let state = self
                .cards
                .lock()
                .unwrap()
                .get(card)
                .cloned()
                .unwrap_or_default();
            let text = serde_json::to_string_pretty(&state)
                .map_err(|e| failure(command.clone(), &e.to_string()))?;
            std::fs::write(path, text).map_err(|e| failure(command, &e.to_string()))
        }

        fn restore_snapshot(&self, card: &str, path: &Path) -> Result<()> {
            let command = format!("alsactl -f {} restore {card}", path.display());
            let text =
                std::fs::read_to_string(path).map_err(|e| failure(command.clone(), &e.to_string()))?;
            let state: BTreeMap<String, Control> =
                serde_json::from_str(&text).map_err(|e| failure(command, &e.to_string()))?;
            self.cards.lock().unwrap().insert(card.to_string(), state);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{MockMixer, render};
    use super::*;
    use crate::control::{ControlKind, parse_control};

    #[test]
    fn mock_render_roundtrips_through_parser() {
        let mixer = MockMixer::new();
        mixer.add_volume("0", "Aux", &[80, 80]);
        mixer.add_switch("0", "ALC", true);
        mixer.add_enum("0", "ALC Mode", &["ALC", "Limiter"], 1);

        let aux = parse_control("Aux", &mixer.read("0", "Aux").unwrap()).unwrap();
        assert_eq!(aux.kind, ControlKind::Volume);
        assert_eq!(aux.values, vec![80, 80]);

        let alc = parse_control("ALC", &mixer.read("0", "ALC").unwrap()).unwrap();
        assert_eq!(alc.values, vec![1]);

        let mode = parse_control("ALC Mode", &mixer.read("0", "ALC Mode").unwrap()).unwrap();
        assert_eq!(mode.selected_item(), Some("Limiter"));
    }

    #[test]
    fn mock_write_forms() {
        let mixer = MockMixer::new();
        mixer.add_volume("0", "Aux", &[80, 80]);
        mixer.add_switch("0", "ALC", false);
        mixer.add_enum("0", "ALC Mode", &["ALC", "Limiter"], 0);

        mixer.write("0", "Aux", "0").unwrap();
        assert_eq!(mixer.values("0", "Aux"), Some(vec![0, 0]));
        mixer.write("0", "Aux", "64,32").unwrap();
        assert_eq!(mixer.values("0", "Aux"), Some(vec![64, 32]));
        mixer.write("0", "Aux", "100%").unwrap();
        assert_eq!(mixer.values("0", "Aux"), Some(vec![127, 127]));

        mixer.write("0", "ALC", "on").unwrap();
        assert_eq!(mixer.values("0", "ALC"), Some(vec![1]));

        mixer.write("0", "ALC Mode", "Limiter").unwrap();
        assert_eq!(mixer.values("0", "ALC Mode"), Some(vec![1]));
        assert!(mixer.write("0", "ALC Mode", "Nope").is_err());
    }

    #[test]
    fn mock_missing_control_fails_like_amixer() {
        let mixer = MockMixer::new();
        let err = mixer.read("0", "Nope").unwrap_err();
        assert!(err.diagnostic().contains("Unable to find simple control"));
        assert!(mixer.write("0", "Nope", "1").is_err());
    }

    #[test]
    fn mock_snapshot_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("asound.state");
        let mixer = MockMixer::new();
        mixer.add_volume("0", "Aux", &[80, 80]);

        mixer.store_snapshot("0", &path).unwrap();
        mixer.write("0", "Aux", "10").unwrap();
        mixer.restore_snapshot("0", &path).unwrap();
        assert_eq!(mixer.values("0", "Aux"), Some(vec![80, 80]));
    }

    #[test]
    fn render_volume_with_switch() {
        let mixer = MockMixer::new();
        mixer.add_volume("0", "Headphone", &[40, 40]);
        {
            let mut cards = mixer.cards.lock().unwrap();
            let hp = cards.get_mut("0").unwrap().get_mut("Headphone").unwrap();
            hp.has_switch = Some(true);
            hp.switch_on = Some(true);
        }
        mixer.write("0", "Headphone", "mute").unwrap();
        let text = mixer.read("0", "Headphone").unwrap();
        let c = parse_control("Headphone", &text).unwrap();
        assert_eq!(c.switch_on, Some(false));
        assert!(render(&c).contains("[off]"));
    }
}

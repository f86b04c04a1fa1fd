//! Sound card and capture device discovery.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::tool;

/// Kernel card table.
pub const PROC_CARDS: &str = "/proc/asound/cards";

static CARD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*(\d+)\s+\[([^\]]*)\]").expect("valid regex"));

static CAPTURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"card\s+(\d+):\s*(.+?),\s*device\s+(\d+):").expect("valid regex")
});

static BRACKET_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\[[^\]]*\]\s*$").expect("valid regex"));

/// A sound card as listed by the kernel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    pub id: String,
    pub name: String,
}

/// A capture-capable PCM device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureDevice {
    pub card: String,
    pub device: String,
    /// `hw:C,D`
    pub id: String,
    /// `plughw:C,D`
    pub plughw: String,
    pub label: String,
}

impl CaptureDevice {
    /// The entry offered when nothing could be enumerated.
    pub fn fallback() -> Self {
        Self {
            card: "0".into(),
            device: "0".into(),
            id: "plughw:0,0".into(),
            plughw: "plughw:0,0".into(),
            label: "plughw:0,0".into(),
        }
    }
}

/// Parse the contents of `/proc/asound/cards`. A blank name becomes `Card N`.
pub fn parse_cards(raw: &str) -> Vec<Card> {
    CARD_RE
        .captures_iter(raw)
        .map(|caps| {
            let id = caps[1].to_string();
            let name = caps[2].trim();
            let name = if name.is_empty() {
                format!("Card {id}")
            } else {
                name.to_string()
            };
            Card { id, name }
        })
        .collect()
}

/// List cards from `path` (normally [`PROC_CARDS`]). Unreadable → empty.
pub fn list_cards_from(path: &Path) -> Vec<Card> {
    match std::fs::read_to_string(path) {
        Ok(raw) => parse_cards(&raw),
        Err(e) => {
            log::error!("listing cards from {} failed: {e}", path.display());
            Vec::new()
        }
    }
}

pub fn list_cards() -> Vec<Card> {
    list_cards_from(Path::new(PROC_CARDS))
}

/// Parse `arecord -l` output. The trailing `[..]` of the card name is dropped
/// from labels. Never returns an empty list.
pub fn parse_capture_devices(raw: &str) -> Vec<CaptureDevice> {
    let mut devices: Vec<CaptureDevice> = CAPTURE_RE
        .captures_iter(raw)
        .map(|caps| {
            let card = caps[1].to_string();
            let device = caps[3].to_string();
            let name = BRACKET_SUFFIX_RE.replace(caps[2].trim(), "").trim().to_string();
            let plughw = format!("plughw:{card},{device}");
            let label = if name.is_empty() {
                format!("Card {card}, device {device} ({plughw})")
            } else {
                format!("Card {card}: {name} ({plughw})")
            };
            CaptureDevice {
                id: format!("hw:{card},{device}"),
                card,
                device,
                plughw,
                label,
            }
        })
        .collect();
    if devices.is_empty() {
        devices.push(CaptureDevice::fallback());
    }
    devices
}

/// Enumerate capture devices via `arecord -l`.
pub fn list_capture_devices() -> Vec<CaptureDevice> {
    match tool::run("arecord", &["-l"], tool::PROBE_TIMEOUT) {
        Ok(out) => parse_capture_devices(&out.stdout),
        Err(_) => vec![CaptureDevice::fallback()],
    }
}

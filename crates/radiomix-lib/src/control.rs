//! Control model and `amixer` text parser.
//!
//! `amixer get` prints a loosely structured block per simple control. The
//! parser is a pure function: the capabilities line is classified through an
//! ordered rule table (first match wins), then a per-kind decoder pulls the
//! values out of the block.
//!
//! ```text
//! Simple mixer control 'Aux',0
//!   Capabilities: volume
//!   Playback channels: Front Left - Front Right
//!   Limits: 0 - 127
//!   Front Left: 80 [63%] [-11.75dB]
//!   Front Right: 80 [63%] [-11.75dB]
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Bounds assumed when the tool reports no `Limits:` line.
pub const DEFAULT_MIN: i64 = 0;
pub const DEFAULT_MAX: i64 = 127;

/// Most channels a Volume control carries (mono or stereo).
const MAX_CHANNELS: usize = 2;

static SCONTROL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Simple mixer control '([^']+)',\d+").expect("valid regex"));
static CAPABILITIES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)Capabilities:[ \t]*(.*)$").expect("valid regex"));
static LIMITS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Limits:(?:[ \t]+(?:Playback|Capture))?[ \t]*(-?\d+)[ \t]*-[ \t]*(-?\d+)")
        .expect("valid regex")
});
static CHANNEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r":[ \t]*(?:(?:Playback|Capture)[ \t]+)?(-?\d+)[ \t]*\[").expect("valid regex")
});
static DECIBEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bdB[ \t]+([-+]?\d+\.\d+)|\[([-+]?\d+(?:\.\d+)?)dB\]").expect("valid regex")
});
static ITEMS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)Items:[ \t]*(.*?)[ \t]*(?:Item\d+:|$)").expect("valid regex")
});
static ITEM0_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Item0:[ \t]*'([^']*)'").expect("valid regex"));
static QUOTED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'([^']*)'").expect("valid regex"));

/// Literal token marking an enabled switch.
const ON_TOKEN: &str = "[on]";

// ── Model ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    Volume,
    Switch,
    Enum,
}

impl fmt::Display for ControlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlKind::Volume => write!(f, "volume"),
            ControlKind::Switch => write!(f, "switch"),
            ControlKind::Enum => write!(f, "enum"),
        }
    }
}

/// A single named mixer control, decoded from introspection text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Control {
    pub name: String,
    pub kind: ControlKind,
    /// Per-channel levels (Volume), 0/1 (Switch), or selected item index (Enum).
    pub values: Vec<i64>,
    pub min: i64,
    pub max: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decibels: Option<Vec<f64>>,
    /// Set on Volume controls that also carry an on/off switch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_switch: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub switch_on: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<String>>,
}

impl Control {
    /// Label of the selected item, for Enum controls.
    pub fn selected_item(&self) -> Option<&str> {
        let items = self.items.as_ref()?;
        let idx = usize::try_from(*self.values.first()?).ok()?;
        items.get(idx).map(String::as_str)
    }
}

/// Value accepted by a control write.
///
/// Deserializes from a number, an array of numbers, `{"index": n}`, or a
/// string (an enum item label or a literal amixer token such as `on`,
/// `mute`, `70%`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ControlValue {
    Level(i64),
    Channels(Vec<i64>),
    ItemIndex { index: usize },
    Text(String),
}

impl ControlValue {
    /// The `amixer set` argument for this value.
    ///
    /// Returns `None` for [`ControlValue::ItemIndex`], which has to be resolved
    /// against the control's item list first.
    pub fn to_arg(&self) -> Option<String> {
        match self {
            ControlValue::Level(v) => Some(v.to_string()),
            ControlValue::Channels(vs) => Some(
                vs.iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            ControlValue::ItemIndex { .. } => None,
            ControlValue::Text(s) => Some(s.clone()),
        }
    }
}

impl fmt::Display for ControlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlValue::ItemIndex { index } => write!(f, "#{index}"),
            other => write!(f, "{}", other.to_arg().unwrap_or_default()),
        }
    }
}

impl FromStr for ControlValue {
    type Err = std::convert::Infallible;

    /// `80` → level, `80,75` → channels, `#2` → item index, anything else → text.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(v) = s.parse::<i64>() {
            return Ok(ControlValue::Level(v));
        }
        if s.contains(',') {
            let parsed: Result<Vec<i64>, _> = s.split(',').map(|p| p.trim().parse()).collect();
            if let Ok(vs) = parsed {
                return Ok(ControlValue::Channels(vs));
            }
        }
        if let Some(idx) = s.strip_prefix('#').and_then(|r| r.parse::<usize>().ok()) {
            return Ok(ControlValue::ItemIndex { index: idx });
        }
        Ok(ControlValue::Text(s.to_string()))
    }
}

// ── Grammar ──

/// Markers found on the `Capabilities:` line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Capabilities {
    enumerated: bool,
    volume: bool,
    switch: bool,
}

impl Capabilities {
    fn scan(raw: &str) -> Self {
        let mut caps = Capabilities::default();
        let Some(line) = CAPABILITIES_RE.captures(raw).and_then(|c| c.get(1)) else {
            return caps;
        };
        for token in line.as_str().split_whitespace() {
            // enum / penum / cenum, volume / pvolume-joined, switch / cswitch ...
            if token.ends_with("enum") {
                caps.enumerated = true;
            }
            if token.contains("volume") {
                caps.volume = true;
            }
            if token.contains("switch") {
                caps.switch = true;
            }
        }
        caps
    }
}

struct KindRule {
    kind: ControlKind,
    applies: fn(&Capabilities) -> bool,
}

fn has_enum(c: &Capabilities) -> bool {
    c.enumerated
}
fn has_volume(c: &Capabilities) -> bool {
    c.volume
}
fn has_switch(c: &Capabilities) -> bool {
    c.switch
}

/// Kind precedence: Enum > Volume (+switch) > Switch. No match → unrepresentable.
const KIND_RULES: &[KindRule] = &[
    KindRule {
        kind: ControlKind::Enum,
        applies: has_enum,
    },
    KindRule {
        kind: ControlKind::Volume,
        applies: has_volume,
    },
    KindRule {
        kind: ControlKind::Switch,
        applies: has_switch,
    },
];

fn classify(caps: &Capabilities) -> Option<ControlKind> {
    KIND_RULES
        .iter()
        .find(|rule| (rule.applies)(caps))
        .map(|rule| rule.kind)
}

// ── Parsing ──

/// Extract control names from `amixer scontrols` output.
pub fn parse_scontrols(raw: &str) -> Vec<String> {
    SCONTROL_RE
        .captures_iter(raw)
        .map(|c| c[1].to_string())
        .collect()
}

/// Classify an introspection block without decoding it.
pub fn classify_block(raw: &str) -> Option<ControlKind> {
    classify(&Capabilities::scan(raw))
}

/// Decode one `amixer get` block into a [`Control`].
///
/// Returns `None` when the block cannot be represented (no known
/// capability, or a volume block without channel readings). Listings drop
/// such controls silently.
pub fn parse_control(name: &str, raw: &str) -> Option<Control> {
    let caps = Capabilities::scan(raw);
    match classify(&caps)? {
        ControlKind::Enum => Some(decode_enum(name, raw)),
        ControlKind::Volume => decode_volume(name, raw, caps.switch),
        ControlKind::Switch => Some(decode_switch(name, raw)),
    }
}

fn switch_on(raw: &str) -> bool {
    raw.to_ascii_lowercase().contains(ON_TOKEN)
}

fn decode_enum(name: &str, raw: &str) -> Control {
    let items: Vec<String> = ITEMS_RE
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|line| {
            QUOTED_RE
                .captures_iter(line.as_str())
                .map(|q| q[1].to_string())
                .collect()
        })
        .unwrap_or_default();

    let selected = ITEM0_RE.captures(raw).map(|c| c[1].to_string());
    let index = match selected {
        Some(ref label) => items.iter().position(|i| i == label).unwrap_or_else(|| {
            log::debug!("control '{name}': selected item '{label}' not in items, using 0");
            0
        }),
        None => 0,
    };

    Control {
        name: name.to_string(),
        kind: ControlKind::Enum,
        values: vec![index as i64],
        min: 0,
        max: items.len().saturating_sub(1) as i64,
        decibels: None,
        has_switch: None,
        switch_on: None,
        items: Some(items),
    }
}

fn decode_volume(name: &str, raw: &str, with_switch: bool) -> Option<Control> {
    let mut values: Vec<i64> = CHANNEL_RE
        .captures_iter(raw)
        .filter_map(|c| c[1].parse().ok())
        .collect();
    if values.is_empty() {
        return None;
    }
    if values.len() > MAX_CHANNELS {
        log::debug!(
            "control '{name}': {} channel readings, keeping the first {MAX_CHANNELS}",
            values.len()
        );
        values.truncate(MAX_CHANNELS);
    }

    let (min, max) = LIMITS_RE
        .captures(raw)
        .and_then(|c| Some((c[1].parse().ok()?, c[2].parse().ok()?)))
        .unwrap_or((DEFAULT_MIN, DEFAULT_MAX));

    let decibels: Vec<f64> = DECIBEL_RE
        .captures_iter(raw)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)))
        .filter_map(|m| m.as_str().parse().ok())
        .collect();

    Some(Control {
        name: name.to_string(),
        kind: ControlKind::Volume,
        values,
        min,
        max,
        decibels: (!decibels.is_empty()).then_some(decibels),
        has_switch: with_switch.then_some(true),
        switch_on: with_switch.then(|| switch_on(raw)),
        items: None,
    })
}

fn decode_switch(name: &str, raw: &str) -> Control {
    Control {
        name: name.to_string(),
        kind: ControlKind::Switch,
        values: vec![i64::from(switch_on(raw))],
        min: 0,
        max: 1,
        decibels: None,
        has_switch: None,
        switch_on: None,
        items: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Fixtures (IQaudIO Codec Zero, Raspberry Pi) ──

    const AUX_STEREO: &str = "Simple mixer control 'Aux',0
  Capabilities: volume
  Playback channels: Front Left - Front Right
  Capture channels: Front Left - Front Right
  Limits: 0 - 127
  Front Left: 80 [63%]
  Front Right: 80 [63%]
";

    const ADC_WITH_DB: &str = "Simple mixer control 'ADC',0
  Capabilities: cvolume
  Capture channels: Front Left - Front Right
  Limits: Capture 0 - 255
  Front Left: Capture 217 [85%] [-4.50dB]
  Front Right: Capture 200 [78%] [-9.00dB]
";

    const MIC_VOLUME_SWITCH: &str = "Simple mixer control 'Mic 1',0
  Capabilities: pvolume pvolume-joined pswitch pswitch-joined
  Playback channels: Mono
  Limits: Playback 0 - 7
  Mono: Playback 3 [43%] [12.00dB] [ON]
";

    const HEADPHONE_MUTED: &str = "Simple mixer control 'Headphone',0
  Capabilities: pvolume pswitch
  Playback channels: Front Left - Front Right
  Limits: Playback 0 - 63
  Front Left: Playback 40 [63%] [-23.00dB] [off]
  Front Right: Playback 40 [63%] [-23.00dB] [off]
";

    const ALC_SWITCH: &str = "Simple mixer control 'ALC',0
  Capabilities: pswitch pswitch-joined
  Playback channels: Mono
  Mono: Playback [on]
";

    const ADC_HPF_OFF: &str = "Simple mixer control 'ADC HPF',0
  Capabilities: pswitch pswitch-joined
  Playback channels: Mono
  Mono: Playback [off]
";

    const ALC_MODE_ENUM: &str = "Simple mixer control 'ALC Mode',0
  Capabilities: enum
  Items: 'ALC' 'Limiter'
  Item0: 'Limiter'
";

    const ADC_SOURCE_UNKNOWN_ITEM: &str = "Simple mixer control 'ADC Source',0
  Capabilities: enum
  Items: 'Aux' 'Mic 1' 'Mic 2'
  Item0: 'Line 3'
";

    const NO_LIMITS: &str = "Simple mixer control 'PGA',0
  Capabilities: cvolume
  Capture channels: Mono
  Mono: 12 [40%]
";

    const OPAQUE: &str = "Simple mixer control 'DSP Program',0
  Capabilities:
";

    const VOLUME_WITHOUT_READINGS: &str = "Simple mixer control 'Broken',0
  Capabilities: volume
  Limits: 0 - 127
";

    // ── Concrete scenario ──

    #[test]
    fn aux_stereo_volume() {
        let c = parse_control("Aux", AUX_STEREO).unwrap();
        assert_eq!(c.name, "Aux");
        assert_eq!(c.kind, ControlKind::Volume);
        assert_eq!(c.values, vec![80, 80]);
        assert_eq!(c.min, 0);
        assert_eq!(c.max, 127);
        assert!(c.decibels.is_none());
        assert!(c.has_switch.is_none());
        assert!(c.items.is_none());
    }

    #[test]
    fn aux_single_line_form() {
        let raw = "Simple mixer control 'Aux',0 Capabilities: volume Limits: 0 - 127 \
                   Front Left: 80 [63%] Front Right: 80 [63%]";
        let c = parse_control("Aux", raw).unwrap();
        assert_eq!(c.kind, ControlKind::Volume);
        assert_eq!(c.values, vec![80, 80]);
        assert_eq!((c.min, c.max), (0, 127));
    }

    // ── Volume ──

    #[test]
    fn volume_with_direction_word_and_db() {
        let c = parse_control("ADC", ADC_WITH_DB).unwrap();
        assert_eq!(c.kind, ControlKind::Volume);
        assert_eq!(c.values, vec![217, 200]);
        assert_eq!((c.min, c.max), (0, 255));
        assert_eq!(c.decibels, Some(vec![-4.5, -9.0]));
    }

    #[test]
    fn volume_db_spaced_form() {
        let raw = "Capabilities: volume\n  Mono: 5 [50%] dB -6.50\n";
        let c = parse_control("X", raw).unwrap();
        assert_eq!(c.decibels, Some(vec![-6.5]));
    }

    #[test]
    fn volume_with_switch_on_is_case_insensitive() {
        let c = parse_control("Mic 1", MIC_VOLUME_SWITCH).unwrap();
        assert_eq!(c.kind, ControlKind::Volume);
        assert_eq!(c.values, vec![3]);
        assert_eq!((c.min, c.max), (0, 7));
        assert_eq!(c.has_switch, Some(true));
        assert_eq!(c.switch_on, Some(true));
    }

    #[test]
    fn volume_with_switch_off() {
        let c = parse_control("Headphone", HEADPHONE_MUTED).unwrap();
        assert_eq!(c.values, vec![40, 40]);
        assert_eq!(c.has_switch, Some(true));
        assert_eq!(c.switch_on, Some(false));
    }

    #[test]
    fn volume_without_limits_defaults_to_0_127() {
        let c = parse_control("PGA", NO_LIMITS).unwrap();
        assert_eq!(c.values, vec![12]);
        assert_eq!((c.min, c.max), (DEFAULT_MIN, DEFAULT_MAX));
    }

    #[test]
    fn volume_without_readings_is_unrepresentable() {
        assert!(parse_control("Broken", VOLUME_WITHOUT_READINGS).is_none());
    }

    #[test]
    fn volume_keeps_at_most_two_channels() {
        let raw = "Capabilities: pvolume
  Front Left: Playback 1 [1%]
  Front Right: Playback 2 [2%]
  Rear Left: Playback 3 [3%]
";
        let c = parse_control("Surround", raw).unwrap();
        assert_eq!(c.values, vec![1, 2]);
    }

    // ── Switch ──

    #[test]
    fn switch_on() {
        let c = parse_control("ALC", ALC_SWITCH).unwrap();
        assert_eq!(c.kind, ControlKind::Switch);
        assert_eq!(c.values, vec![1]);
        assert_eq!((c.min, c.max), (0, 1));
    }

    #[test]
    fn switch_off() {
        let c = parse_control("ADC HPF", ADC_HPF_OFF).unwrap();
        assert_eq!(c.kind, ControlKind::Switch);
        assert_eq!(c.values, vec![0]);
    }

    // ── Enum ──

    #[test]
    fn enum_selected_index() {
        let c = parse_control("ALC Mode", ALC_MODE_ENUM).unwrap();
        assert_eq!(c.kind, ControlKind::Enum);
        assert_eq!(
            c.items,
            Some(vec!["ALC".to_string(), "Limiter".to_string()])
        );
        assert_eq!(c.values, vec![1]);
        assert_eq!(c.selected_item(), Some("Limiter"));
        assert_eq!((c.min, c.max), (0, 1));
    }

    #[test]
    fn enum_unknown_selection_clamps_to_zero() {
        let c = parse_control("ADC Source", ADC_SOURCE_UNKNOWN_ITEM).unwrap();
        assert_eq!(c.values, vec![0]);
        assert_eq!(c.items.as_ref().map(Vec::len), Some(3));
    }

    #[test]
    fn enum_single_line_does_not_absorb_item0() {
        let raw = "Capabilities: enum Items: 'A' 'B' Item0: 'B'";
        let c = parse_control("E", raw).unwrap();
        assert_eq!(c.items, Some(vec!["A".to_string(), "B".to_string()]));
        assert_eq!(c.values, vec![1]);
    }

    // ── Classification ──

    #[test]
    fn unrepresentable_control_is_none() {
        assert!(parse_control("DSP Program", OPAQUE).is_none());
        assert!(parse_control("Empty", "").is_none());
    }

    #[test]
    fn classification_is_total_and_ordered() {
        let cases: &[(&str, Option<ControlKind>)] = &[
            (AUX_STEREO, Some(ControlKind::Volume)),
            (ADC_WITH_DB, Some(ControlKind::Volume)),
            (MIC_VOLUME_SWITCH, Some(ControlKind::Volume)),
            (ALC_SWITCH, Some(ControlKind::Switch)),
            (ALC_MODE_ENUM, Some(ControlKind::Enum)),
            (OPAQUE, None),
            // enum wins over everything else on the same line
            ("Capabilities: enum volume switch", Some(ControlKind::Enum)),
            ("Capabilities: cenum", Some(ControlKind::Enum)),
        ];
        for (raw, expected) in cases {
            assert_eq!(classify_block(raw), *expected, "block: {raw}");
            // deterministic
            assert_eq!(classify_block(raw), classify_block(raw));
        }
    }

    // ── scontrols ──

    #[test]
    fn scontrols_names_in_order() {
        let raw = "Simple mixer control 'Aux',0
Simple mixer control 'Aux Gain Ramping',0
Simple mixer control 'ADC',0
Simple mixer control 'Mic 1',0
";
        assert_eq!(
            parse_scontrols(raw),
            vec!["Aux", "Aux Gain Ramping", "ADC", "Mic 1"]
        );
    }

    #[test]
    fn scontrols_empty_output() {
        assert!(parse_scontrols("").is_empty());
    }

    // ── ControlValue ──

    #[test]
    fn control_value_from_str() {
        assert_eq!("80".parse::<ControlValue>().unwrap(), ControlValue::Level(80));
        assert_eq!(
            "80, 75".parse::<ControlValue>().unwrap(),
            ControlValue::Channels(vec![80, 75])
        );
        assert_eq!(
            "#1".parse::<ControlValue>().unwrap(),
            ControlValue::ItemIndex { index: 1 }
        );
        assert_eq!(
            "70%".parse::<ControlValue>().unwrap(),
            ControlValue::Text("70%".into())
        );
        assert_eq!(
            "Limiter".parse::<ControlValue>().unwrap(),
            ControlValue::Text("Limiter".into())
        );
    }

    #[test]
    fn control_value_args() {
        assert_eq!(ControlValue::Level(0).to_arg().as_deref(), Some("0"));
        assert_eq!(
            ControlValue::Channels(vec![80, 80]).to_arg().as_deref(),
            Some("80,80")
        );
        assert_eq!(ControlValue::ItemIndex { index: 2 }.to_arg(), None);
    }

    #[test]
    fn control_value_deserializes_from_json_shapes() {
        let v: ControlValue = serde_json::from_str("64").unwrap();
        assert_eq!(v, ControlValue::Level(64));
        let v: ControlValue = serde_json::from_str("[64, 60]").unwrap();
        assert_eq!(v, ControlValue::Channels(vec![64, 60]));
        let v: ControlValue = serde_json::from_str(r#"{"index": 1}"#).unwrap();
        assert_eq!(v, ControlValue::ItemIndex { index: 1 });
        let v: ControlValue = serde_json::from_str(r#""on""#).unwrap();
        assert_eq!(v, ControlValue::Text("on".into()));
    }

    #[test]
    fn control_serializes_camel_case_and_omits_absent_fields() {
        let c = parse_control("Mic 1", MIC_VOLUME_SWITCH).unwrap();
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["kind"], "volume");
        assert_eq!(json["hasSwitch"], true);
        assert_eq!(json["switchOn"], true);
        assert!(json.get("items").is_none());

        let aux = parse_control("Aux", AUX_STEREO).unwrap();
        let json = serde_json::to_value(&aux).unwrap();
        assert!(json.get("decibels").is_none());
        assert!(json.get("hasSwitch").is_none());
    }
}

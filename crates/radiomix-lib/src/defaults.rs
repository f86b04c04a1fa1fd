//! Known-good preset for the IQaudIO Codec Zero, tuned for line input.

use serde::Serialize;

use crate::control::ControlValue;
use crate::registry::ControlRegistry;

/// One preset entry: control name and the `amixer set` argument to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresetEntry {
    pub name: &'static str,
    pub value: &'static str,
}

const fn entry(name: &'static str, value: &'static str) -> PresetEntry {
    PresetEntry { name, value }
}

/// Applied in order. Aux is the primary input; mics and outputs are muted.
pub const DEFAULT_PRESET: &[PresetEntry] = &[
    entry("Aux", "70%"),
    entry("Aux ZC", "off"),
    entry("Aux Gain Ramping", "on"),
    entry("ADC", "85%"),
    entry("ADC HPF", "on"),
    entry("ADC Gain Ramping", "off"),
    entry("ALC", "on"),
    entry("Mic 1", "mute"),
    entry("Mic 2", "mute"),
    entry("Headphone", "mute"),
    entry("Lineout", "mute"),
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultsReport {
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
}

/// Apply [`DEFAULT_PRESET`]. Each write stands alone; failures are skipped.
pub fn apply_defaults(registry: &ControlRegistry) -> DefaultsReport {
    apply_preset(registry, DEFAULT_PRESET)
}

pub fn apply_preset(registry: &ControlRegistry, preset: &[PresetEntry]) -> DefaultsReport {
    let mut report = DefaultsReport::default();
    for e in preset {
        let value = ControlValue::Text(e.value.to_string());
        match registry.set_control(e.name, &value) {
            Ok(()) => report.applied.push(e.name.to_string()),
            Err(err) => {
                log::warn!("defaults: skipping {}: {err}", e.name);
                report.skipped.push(e.name.to_string());
            }
        }
    }
    log::info!(
        "defaults applied to {} controls ({} skipped)",
        report.applied.len(),
        report.skipped.len()
    );
    report
}

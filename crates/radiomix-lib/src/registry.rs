//! Control registry: reads and writes the controls of one card.
//!
//! Records are rebuilt on every query; nothing here caches mixer state.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::control::{self, Control, ControlValue};
use crate::dirty::DirtyTracker;
use crate::error::{RadiomixError, Result};
use crate::mixer::Mixer;

/// Case-insensitive name prefixes of the controls an operator cares about.
pub const RELEVANT_PREFIXES: &[&str] = &["Aux", "ADC", "ALC", "Input", "Capture", "PGA"];

/// Whether `name` starts with one of [`RELEVANT_PREFIXES`] (ASCII case-insensitive).
pub fn is_relevant(name: &str) -> bool {
    RELEVANT_PREFIXES.iter().any(|prefix| {
        name.len() >= prefix.len()
            && name.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
    })
}

pub struct ControlRegistry {
    mixer: Arc<dyn Mixer>,
    card: String,
    secondary_card: String,
    dirty: Arc<DirtyTracker>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ControlRegistry {
    pub fn new(
        mixer: Arc<dyn Mixer>,
        card: impl Into<String>,
        secondary_card: impl Into<String>,
        dirty: Arc<DirtyTracker>,
    ) -> Self {
        Self {
            mixer,
            card: card.into(),
            secondary_card: secondary_card.into(),
            dirty,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn card(&self) -> &str {
        &self.card
    }

    pub fn mixer(&self) -> &Arc<dyn Mixer> {
        &self.mixer
    }

    pub fn dirty(&self) -> &Arc<DirtyTracker> {
        &self.dirty
    }

    /// All simple control names on the configured card.
    pub fn list_names(&self) -> Result<Vec<String>> {
        Ok(self.mixer.list_names(&self.card)?)
    }

    /// Fetch and decode one control.
    pub fn get_control(&self, name: &str) -> Result<Control> {
        self.fetch(&self.card, name)
            .ok_or_else(|| RadiomixError::NotFound(name.to_string()))
    }

    /// Relevant controls with card fallback.
    ///
    /// Tried in order: relevant controls on the configured card, relevant
    /// controls on the secondary card, then every decodable control on the
    /// configured card. A load that sees no intervening write resynchronizes
    /// the dirty flag.
    pub fn get_relevant_controls(&self) -> BTreeMap<String, Control> {
        let ticket = self.dirty.begin_load();
        let controls = self.relevant_with_fallback();
        self.dirty.finish_load(ticket);
        controls
    }

    fn relevant_with_fallback(&self) -> BTreeMap<String, Control> {
        let out = self.collect(&self.card, is_relevant);
        if !out.is_empty() {
            return out;
        }

        if self.card != self.secondary_card {
            let out = self.collect(&self.secondary_card, is_relevant);
            if !out.is_empty() {
                log::info!(
                    "no relevant controls on card {}, using card {}",
                    self.card,
                    self.secondary_card
                );
                return out;
            }
        }

        let out = self.collect(&self.card, |_| true);
        if !out.is_empty() {
            log::info!(
                "no relevant controls found, showing all {} controls on card {}",
                out.len(),
                self.card
            );
        }
        out
    }

    /// Every decodable control on the configured card.
    pub fn all_controls(&self) -> BTreeMap<String, Control> {
        self.collect(&self.card, |_| true)
    }

    fn collect(&self, card: &str, filter: impl Fn(&str) -> bool) -> BTreeMap<String, Control> {
        let names = match self.mixer.list_names(card) {
            Ok(names) => names,
            Err(e) => {
                log::debug!("listing card {card} failed: {e}");
                return BTreeMap::new();
            }
        };
        names
            .into_iter()
            .filter(|n| filter(n))
            .filter_map(|n| self.fetch(card, &n).map(|c| (n, c)))
            .collect()
    }

    fn fetch(&self, card: &str, name: &str) -> Option<Control> {
        let raw = self.mixer.read(card, name).ok()?;
        let control = control::parse_control(name, &raw);
        if control.is_none() {
            log::debug!("control {name} on card {card} is not representable");
        }
        control.filter(|c| !c.values.is_empty())
    }

    /// Write `value` to a control and mark the mixer dirty.
    pub fn set_control(&self, name: &str, value: &ControlValue) -> Result<()> {
        let arg = match value.to_arg() {
            Some(arg) => arg,
            None => self.resolve_item(name, value)?,
        };
        let lock = self.lock_for(name);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.mixer.write(&self.card, name, &arg)?;
        self.dirty.mark_written();
        log::info!("set {name} = {arg}");
        Ok(())
    }

    fn resolve_item(&self, name: &str, value: &ControlValue) -> Result<String> {
        let ControlValue::ItemIndex { index } = value else {
            return Err(RadiomixError::NotFound(name.to_string()));
        };
        let control = self.get_control(name)?;
        control
            .items
            .as_ref()
            .and_then(|items| items.get(*index))
            .cloned()
            .ok_or_else(|| RadiomixError::NotFound(format!("{name} item #{index}")))
    }

    /// Current values of a control, for mute capture. Not tracked as a write.
    pub fn read_values(&self, name: &str) -> Result<Vec<i64>> {
        Ok(self.get_control(name)?.values)
    }

    /// Write without touching the dirty flag (mute/unmute).
    pub fn write_transient(&self, name: &str, values: &[i64], timeout: Duration) -> Result<()> {
        let arg = ControlValue::Channels(values.to_vec()).to_string();
        let lock = self.lock_for(name);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.mixer
            .write_within(&self.card, name, &arg, timeout)
            .map_err(Into::into)
    }

    fn lock_for(&self, name: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(name.to_string()).or_default())
    }
}

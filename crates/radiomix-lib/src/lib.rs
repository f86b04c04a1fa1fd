//! radiomix: mixer control, snapshot persistence, and mute orchestration for
//! an ALSA-based audio-streaming appliance.

pub mod card;
pub mod config;
pub mod context;
pub mod control;
pub mod defaults;
pub mod dirty;
pub mod error;
pub mod mixer;
pub mod mute;
pub mod registry;
pub mod snapshot;
pub mod tool;
pub mod watcher;

pub use context::MixerContext;
pub use control::{Control, ControlKind, ControlValue};
pub use error::RadiomixError;

//! # MatLib Common Library
//!
//! Shared code for the MatLib material server and client session:
//! - Error taxonomy
//! - Configuration loading and root folder resolution
//! - PBR channel naming convention
//! - Material record and preset data model
//! - Timestamp utilities

pub mod channels;
pub mod config;
pub mod error;
pub mod material;
pub mod preset;
pub mod time;

pub use channels::{Channel, ChannelRole};
pub use error::{Error, Result};
pub use material::{MaterialPatch, MaterialRecord, MaterialStore, PbrSettings, PbrSettingsPatch};
pub use preset::{Preset, PresetBinding, PresetBook};

//! # lumen-settings
//!
//! Runtime configuration: compiled defaults, an optional JSON settings
//! file deep-merged over them, and strict `LUMEN_*` environment overrides
//! on top.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{apply_env_overrides, load_settings, load_settings_from_path, settings_path};
pub use types::{LedgerSettings, LumenSettings, MemorySettings, ModelSettings, SignalSettings};

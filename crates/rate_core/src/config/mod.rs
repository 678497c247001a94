//! Configuration management for osu-rate.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only changed section is modified)
//! - Validation on load with automatic defaults
//!
//! # Example
//!
//! ```no_run
//! use rate_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new(".config/osu-rate.toml");
//! config.load_or_create().unwrap();
//!
//! println!("Audio tool: {}", config.settings().audio.tool);
//!
//! config.settings_mut().packaging.archive = false;
//! config.update_section(ConfigSection::Packaging).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    AudioSettings, ConfigSection, LoggingSettings, PackagingSettings, PathSettings, Settings,
};

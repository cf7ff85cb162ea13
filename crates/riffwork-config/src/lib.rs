//! Persistent JSON configuration for Riffwork.
//!
//! This crate owns the on-disk `config.json` (storage location, audio device
//! preferences, resource budgets, and cached auth) and the platform-specific
//! paths that derive from it (see [`paths`]). It does not implement the
//! collaborator auth flow itself — only the place that flow's result gets
//! persisted.
//!
//! # Example
//!
//! ```rust,no_run
//! use riffwork_config::Config;
//!
//! let mut config = Config::load_default().unwrap();
//! config.audio.sample_rate = Some(48000);
//! config.save_default().unwrap();
//! ```

mod config;
mod error;

/// Platform-specific paths for the config file and the storage root.
pub mod paths;

pub use config::{
    Audio, Auth, Config, Data, Performance, MIN_LIVE_RIFF_INSTANCE_POOL_SIZE,
    MIN_STEM_CACHE_PRUNE_MB,
};
pub use error::ConfigError;

pub type Result<T> = std::result::Result<T, ConfigError>;

//! Platform-specific paths for the config file and the on-disk storage root.
//!
//! # Directory Structure
//!
//! Configuration lives in the platform config directory:
//! - Linux: `~/.config/riffwork/config.json`
//! - macOS: `~/Library/Application Support/riffwork/config.json`
//! - Windows: `%APPDATA%\riffwork\config.json`
//!
//! The storage root (`Data.storage_root`, see [`crate::Data`]) holds cached
//! stems and recorded output, laid out as:
//!
//! - `<storageRoot>/cache/common/stems/<prefix>/<stem_id>` — content-addressed
//!   stem cache, shared across apps/collaborators (the `<prefix>` is the first
//!   two hex characters of `<stem_id>`, sharding the directory).
//! - `<storageRoot>/cache/<app>/` — per-app ephemeral cache (resolved riff
//!   metadata, thumbnails).
//! - `<storageRoot>/output/<app>/` — per-app recorded output (stereo/multitrack
//!   FLAC files from the disk recorder).

use std::path::PathBuf;

/// Application name used for directory paths.
const APP_NAME: &str = "riffwork";

/// Name of the persistent JSON config file within the user config directory.
const CONFIG_FILE_NAME: &str = "config.json";

/// Returns the user-specific configuration directory.
///
/// # Platform Paths
///
/// - Linux: `~/.config/riffwork/`
/// - macOS: `~/Library/Application Support/riffwork/`
/// - Windows: `%APPDATA%\riffwork\`
///
/// Returns a fallback path if the config directory cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Returns the path of the persistent JSON config file.
pub fn config_file_path() -> PathBuf {
    user_config_dir().join(CONFIG_FILE_NAME)
}

/// Ensure the user config directory exists.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_user_config_dir() -> Result<PathBuf, crate::ConfigError> {
    let dir = user_config_dir();
    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| crate::ConfigError::create_dir(&dir, e))?;
    }
    Ok(dir)
}

/// Default storage root if `Data.storage_root` is unset.
///
/// # Platform Paths
///
/// - Linux: `~/.local/share/riffwork/`
/// - macOS: `~/Library/Application Support/riffwork/`
/// - Windows: `%LOCALAPPDATA%\riffwork\`
pub fn default_storage_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Root of the content-addressed stem cache, shared across apps.
///
/// `riffwork_pipeline::DiskCache` shards beneath this root itself (by the
/// stem's fingerprint prefix, not the stem id), so this is the path callers
/// constructing a `DiskCache` should pass in.
pub fn stems_cache_root(storage_root: &std::path::Path) -> PathBuf {
    storage_root.join("cache").join("common").join("stems")
}

/// Per-app ephemeral cache directory (resolved riff metadata, thumbnails).
pub fn app_cache_dir(storage_root: &std::path::Path, app: &str) -> PathBuf {
    storage_root.join("cache").join(app)
}

/// Per-app recorded-output directory.
pub fn app_output_dir(storage_root: &std::path::Path, app: &str) -> PathBuf {
    storage_root.join("output").join(app)
}

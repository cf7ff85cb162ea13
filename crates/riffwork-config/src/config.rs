//! The persistent JSON configuration document (Data / Audio / Performance / Auth).
//!
//! Every field is optional in the on-disk JSON; absent fields fall back to
//! [`Default`]. This lets the config file on disk grow only the keys a user
//! has actually touched, and lets upgrades add new sections without
//! invalidating old files.

use crate::paths;
use crate::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Minimum allowed auto-prune threshold, in megabytes, for the stem cache.
pub const MIN_STEM_CACHE_PRUNE_MB: u64 = 200;

/// Minimum allowed live riff instance pool size.
pub const MIN_LIVE_RIFF_INSTANCE_POOL_SIZE: usize = 1;

/// Where cached stems and recorded output live on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Data {
    /// Root directory for the stem cache and recorded output. See
    /// [`crate::paths`] for the directory layout under this root.
    #[serde(default = "paths::default_storage_root")]
    pub storage_root: PathBuf,
}

impl Default for Data {
    fn default() -> Self {
        Self {
            storage_root: paths::default_storage_root(),
        }
    }
}

/// Audio device and stream preferences.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Audio {
    /// Preferred output sample rate in Hz. `None` lets the backend pick the
    /// device default.
    #[serde(default)]
    pub sample_rate: Option<u32>,

    /// Name of the last-used output device, for reselecting it on restart.
    #[serde(default)]
    pub last_device: Option<String>,

    /// Request the smallest buffer size the backend can sustain, trading
    /// robustness for latency.
    #[serde(default)]
    pub low_latency: bool,

    /// Explicit buffer size in frames. `None` lets the backend pick.
    #[serde(default)]
    pub buffer_size: Option<u32>,
}

/// Resource budgets for the stem cache and mixer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Performance {
    /// Auto-prune the stem cache once it exceeds this many megabytes of
    /// estimated decoded-PCM memory. Clamped to at least
    /// [`MIN_STEM_CACHE_PRUNE_MB`] on load.
    #[serde(default = "default_stem_cache_prune_mb")]
    pub stem_cache_auto_prune_at_memory_usage_mb: u64,

    /// Number of riffs the mixer keeps fully decoded and ready to switch into
    /// instantly (current + next + a small lookahead pool). Clamped to at
    /// least [`MIN_LIVE_RIFF_INSTANCE_POOL_SIZE`] on load.
    #[serde(default = "default_live_riff_instance_pool_size")]
    pub live_riff_instance_pool_size: usize,
}

fn default_stem_cache_prune_mb() -> u64 {
    512
}

fn default_live_riff_instance_pool_size() -> usize {
    2
}

impl Default for Performance {
    fn default() -> Self {
        Self {
            stem_cache_auto_prune_at_memory_usage_mb: default_stem_cache_prune_mb(),
            live_riff_instance_pool_size: default_live_riff_instance_pool_size(),
        }
    }
}

impl Performance {
    /// Clamp fields to their documented minimums, returning whether anything
    /// was adjusted.
    fn clamp(&mut self) -> bool {
        let mut changed = false;
        if self.stem_cache_auto_prune_at_memory_usage_mb < MIN_STEM_CACHE_PRUNE_MB {
            self.stem_cache_auto_prune_at_memory_usage_mb = MIN_STEM_CACHE_PRUNE_MB;
            changed = true;
        }
        if self.live_riff_instance_pool_size < MIN_LIVE_RIFF_INSTANCE_POOL_SIZE {
            self.live_riff_instance_pool_size = MIN_LIVE_RIFF_INSTANCE_POOL_SIZE;
            changed = true;
        }
        changed
    }
}

/// Cached collaborator session credentials.
///
/// Out-of-scope per the collaborator-network non-goals: this struct only
/// stores whatever the (unimplemented) auth flow would hand back, so the rest
/// of the config surface has a stable place to persist it. Fields are opaque
/// strings; riffwork-config does not interpret or validate them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Auth {
    /// Session or API token, if previously authenticated.
    #[serde(default)]
    pub token: Option<String>,

    /// Saved password, if the user opted in to storing it locally.
    #[serde(default)]
    pub password: Option<String>,

    /// Collaborator/account identifier the above credentials belong to.
    #[serde(default)]
    pub user_id: Option<String>,

    /// Unix timestamp (seconds) after which `token` should be treated as
    /// expired and re-authentication attempted.
    #[serde(default)]
    pub expires: Option<u64>,
}

/// Top-level persistent configuration document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub data: Data,
    #[serde(default)]
    pub audio: Audio,
    #[serde(default)]
    pub performance: Performance,
    #[serde(default)]
    pub auth: Auth,
}

impl Config {
    /// Load configuration from the default platform path
    /// ([`paths::config_file_path`]), returning [`Config::default`] if the
    /// file does not exist.
    pub fn load_default() -> Result<Self> {
        Self::load(paths::config_file_path())
    }

    /// Load configuration from an explicit path, returning
    /// [`Config::default`] if the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::read_file(path.to_path_buf(), e))?;

        let mut config: Config = serde_json::from_str(&contents)
            .map_err(|e| ConfigError::JsonParse {
                path: path.to_path_buf(),
                source: e,
            })?;

        if config.performance.clamp() {
            tracing::warn!(
                path = %path.display(),
                "performance config values below minimum, clamped on load"
            );
        }

        Ok(config)
    }

    /// Save configuration to the default platform path, creating parent
    /// directories as needed.
    pub fn save_default(&self) -> Result<()> {
        self.save(paths::config_file_path())
    }

    /// Save configuration to an explicit path, creating parent directories as
    /// needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::create_dir(parent.to_path_buf(), e))?;
        }

        let json = serde_json::to_string_pretty(self).map_err(ConfigError::JsonSerialize)?;

        std::fs::write(path, json).map_err(|e| ConfigError::write_file(path.to_path_buf(), e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_has_sane_values() {
        let config = Config::default();
        assert!(config.audio.sample_rate.is_none());
        assert_eq!(
            config.performance.stem_cache_auto_prune_at_memory_usage_mb,
            512
        );
        assert_eq!(config.performance.live_riff_instance_pool_size, 2);
        assert!(config.auth.token.is_none());
    }

    #[test]
    fn test_missing_file_yields_default() {
        let config = Config::load("/nonexistent/path/12345/config.json").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");

        let mut original = Config::default();
        original.data.storage_root = PathBuf::from("/mnt/riffwork-data");
        original.audio.sample_rate = Some(44100);
        original.audio.last_device = Some("Built-in Output".to_string());
        original.auth.user_id = Some("user-123".to_string());

        original.save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();

        assert_eq!(loaded, original);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, r#"{"audio": {"sampleRate": 48000}}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.audio.sample_rate, Some(48000));
        assert_eq!(config.data, Data::default());
        assert_eq!(config.performance, Performance::default());
    }

    #[test]
    fn test_undersized_performance_values_clamped_on_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"performance": {"stemCacheAutoPruneAtMemoryUsageMb": 10, "liveRiffInstancePoolSize": 0}}"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.performance.stem_cache_auto_prune_at_memory_usage_mb,
            MIN_STEM_CACHE_PRUNE_MB
        );
        assert_eq!(
            config.performance.live_riff_instance_pool_size,
            MIN_LIVE_RIFF_INSTANCE_POOL_SIZE
        );
    }

    #[test]
    fn test_empty_object_yields_all_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, "{}").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("dir").join("config.json");

        Config::default().save(&path).unwrap();
        assert!(path.exists());
    }
}

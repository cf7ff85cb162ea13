//! Integration tests for riffwork-config.

use riffwork_config::{Config, MIN_LIVE_RIFF_INSTANCE_POOL_SIZE, MIN_STEM_CACHE_PRUNE_MB};
use tempfile::TempDir;

#[test]
fn test_fresh_config_file_round_trips_through_disk() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");

    let mut config = Config::default();
    config.data.storage_root = temp_dir.path().join("storage");
    config.audio.sample_rate = Some(44100);
    config.audio.low_latency = true;
    config.performance.stem_cache_auto_prune_at_memory_usage_mb = 1024;
    config.auth.token = Some("abc123".to_string());
    config.auth.expires = Some(1_900_000_000);

    config.save(&path).expect("save should succeed");
    let reloaded = Config::load(&path).expect("load should succeed");

    assert_eq!(reloaded, config);
}

#[test]
fn test_nonexistent_config_file_falls_back_to_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("does-not-exist").join("config.json");

    let config = Config::load(&path).expect("missing file should not error");
    assert_eq!(config, Config::default());
}

#[test]
fn test_legacy_config_missing_new_fields_still_loads() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    std::fs::write(&path, r#"{"data": {"storageRoot": "/mnt/riffs"}}"#).unwrap();

    let config = Config::load(&path).expect("partial document should load");
    assert_eq!(config.data.storage_root.to_str().unwrap(), "/mnt/riffs");
    assert_eq!(config.audio, riffwork_config::Audio::default());
    assert_eq!(config.performance, riffwork_config::Performance::default());
}

#[test]
fn test_performance_minimums_enforced_on_load() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{"performance": {"stemCacheAutoPruneAtMemoryUsageMb": 1, "liveRiffInstancePoolSize": 0}}"#,
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
fn test_storage_layout_paths_are_nested_under_storage_root() {
    let root = std::path::Path::new("/mnt/riffs");
    let stems_root = riffwork_config::paths::stems_cache_root(root);
    let cache_dir = riffwork_config::paths::app_cache_dir(root, "riffwork");
    let output_dir = riffwork_config::paths::app_output_dir(root, "riffwork");

    assert!(stems_root.starts_with(root));
    assert!(cache_dir.starts_with(root));
    assert!(output_dir.starts_with(root));
    assert_ne!(cache_dir, output_dir);
}

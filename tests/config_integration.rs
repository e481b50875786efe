//! Integration tests for configuration management
//!
//! These tests verify how the config directory is located and how the
//! `config` and `sync` files decide whether replication runs.

use serial_test::serial;
use tempfile::TempDir;
use tokio::fs;

use tag::config::{SyncDisabled, SyncState, CONFIG_DIR_ENV, CONFIG_FILE, SYNC_FILE};
use tag::manifest::{parse_manifest, LOCATION_DELIMITER};
use tag::Config;

#[tokio::test]
#[serial]
async fn test_config_loaded_from_environment_dir() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join(CONFIG_FILE), "sync=enabled\nretention=30\n")
        .await
        .unwrap();

    std::env::set_var(CONFIG_DIR_ENV, temp_dir.path());
    let config = Config::load(false).await;
    std::env::remove_var(CONFIG_DIR_ENV);

    assert!(config.sync_enabled());
    assert_eq!(config.option("retention"), Some("30"));
    assert_eq!(config.sync_manifest_path().unwrap(), temp_dir.path().join(SYNC_FILE));
}

#[tokio::test]
#[serial]
async fn test_nosync_wins_over_config() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join(CONFIG_FILE), "sync=enabled\n").await.unwrap();

    std::env::set_var(CONFIG_DIR_ENV, temp_dir.path());
    let config = Config::load(true).await;
    std::env::remove_var(CONFIG_DIR_ENV);

    assert_eq!(config.sync_state(), &SyncState::Disabled(SyncDisabled::Override));
}

#[tokio::test]
async fn test_disabled_value_is_exact() {
    let temp_dir = TempDir::new().unwrap();

    for (value, enabled) in [("disabled", false), ("enabled", true), ("Disabled", true), ("off", true)] {
        fs::write(temp_dir.path().join(CONFIG_FILE), format!("sync={}\n", value))
            .await
            .unwrap();
        let config = Config::from_dir(temp_dir.path(), false).await;
        assert_eq!(config.sync_enabled(), enabled, "sync={}", value);
    }
}

#[tokio::test]
async fn test_sync_manifest_with_one_bad_line() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join(SYNC_FILE);
    fs::write(
        &path,
        "# locations\nbackup,/mnt/backup\narchive,/mnt/archive\nusb /media/usb\nnas,/mnt/nas\n",
    )
    .await
    .unwrap();

    let manifest = parse_manifest(&path, LOCATION_DELIMITER).await.unwrap();

    assert!(manifest.is_malformed());
    assert_eq!(manifest.malformed_lines, vec![4]);
    assert_eq!(manifest.len(), 3);
    assert_eq!(manifest.get("nas"), Some("/mnt/nas"));
}

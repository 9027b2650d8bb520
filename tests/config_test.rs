//! Configuration Loading Tests
//!
//! Layered TOML loading with overlays and overrides, and validation of the
//! scheduler settings.

use prober_core::config::{ConfigManager, ProberConfig, SchedulerConfig};
use prober_core::ProberError;
use proptest::prelude::*;
use std::fs;
use std::path::PathBuf;

const BASE: &str = r#"
[scheduler]
retry_delay_ms = 2000
outcome_buffer = 16

[http]
timeout_ms = 3000

[[targets]]
id = "docs"
url = "http://docs.example"

[[targets]]
url = "http://shop.example"
"#;

fn no_overrides() -> Option<config::Map<String, String>> {
    Some(config::Map::new())
}

#[test]
fn test_base_file_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prober-config.toml");
    fs::write(&path, BASE).unwrap();

    let manager = ConfigManager::load_with_env(Some(&path), "development", no_overrides()).unwrap();
    let config = manager.config();

    assert_eq!(config.scheduler.retry_delay_ms, 2000);
    assert_eq!(config.scheduler.outcome_buffer, 16);
    assert_eq!(config.http.timeout_ms, 3000);
    assert!(!config.http.require_success_status);
    assert_eq!(config.targets.len(), 2);
    assert_eq!(config.targets[0].probe_id(), "docs");
    assert_eq!(config.targets[1].probe_id(), "http://shop.example");
    assert_eq!(manager.config_path(), Some(path.as_path()));
}

#[test]
fn test_environment_overlay_then_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prober-config.toml");
    fs::write(&path, BASE).unwrap();
    fs::write(
        dir.path().join("prober-config.staging.toml"),
        "[scheduler]\nretry_delay_ms = 500\nmax_cycles = 4\n",
    )
    .unwrap();

    let staging = ConfigManager::load_with_env(Some(&path), "staging", no_overrides()).unwrap();
    assert_eq!(staging.config().scheduler.retry_delay_ms, 500);
    assert_eq!(staging.config().scheduler.max_cycles, Some(4));
    assert_eq!(staging.config().scheduler.outcome_buffer, 16);

    let mut overrides = config::Map::new();
    overrides.insert(
        "PROBER__SCHEDULER__RETRY_DELAY_MS".to_string(),
        "75".to_string(),
    );
    let overridden = ConfigManager::load_with_env(Some(&path), "staging", Some(overrides)).unwrap();
    assert_eq!(overridden.config().scheduler.retry_delay_ms, 75);
    assert_eq!(overridden.config().scheduler.max_cycles, Some(4));

    // Other environments ignore the staging overlay
    let dev = ConfigManager::load_with_env(Some(&path), "development", no_overrides()).unwrap();
    assert_eq!(dev.config().scheduler.retry_delay_ms, 2000);
    assert_eq!(dev.config().scheduler.max_cycles, None);
}

#[test]
fn test_negative_delay_in_file_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prober-config.toml");
    fs::write(&path, "[scheduler]\nretry_delay_ms = -1\n").unwrap();

    let err = ConfigManager::load_with_env(Some(&path), "development", no_overrides()).unwrap_err();
    assert!(matches!(err, ProberError::InvalidConfig(_)));
}

#[test]
fn test_duplicate_target_ids_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prober-config.toml");
    fs::write(
        &path,
        "[[targets]]\nurl = \"http://a.example\"\n\n[[targets]]\nid = \"http://a.example\"\nurl = \"http://b.example\"\n",
    )
    .unwrap();

    let result = ConfigManager::load_with_env(Some(&path), "development", no_overrides());
    assert!(result.is_err());
}

#[test]
fn test_malformed_toml_is_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prober-config.toml");
    fs::write(&path, "[scheduler\nretry_delay_ms = ").unwrap();

    let err = ConfigManager::load_with_env(Some(&path), "development", no_overrides()).unwrap_err();
    assert!(matches!(err, ProberError::Configuration(_)));
}

#[test]
fn test_shipped_config_with_test_overlay() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/prober-config.toml");

    let manager = ConfigManager::load_with_env(Some(&path), "test", no_overrides()).unwrap();
    let config = manager.config();

    assert_eq!(config.scheduler.retry_delay_ms, 50);
    assert_eq!(config.scheduler.max_cycles, Some(3));
    assert_eq!(config.http.timeout_ms, 1000);
    assert_eq!(config.logging.level.as_deref(), Some("debug"));
    assert_eq!(config.targets.len(), 5);
}

#[test]
fn test_empty_targets_fall_back_to_default_links() {
    let config = ProberConfig::default();
    let targets = config.effective_targets();
    assert_eq!(targets.len(), 5);
    assert!(targets.iter().any(|t| t.url == "http://www.golang.org"));
}

proptest! {
    #[test]
    fn prop_negative_delays_always_rejected(delay in i64::MIN..0) {
        let config = SchedulerConfig { retry_delay_ms: delay, ..SchedulerConfig::default() };
        prop_assert!(config.validate().is_err());
        prop_assert!(config.retry_delay().is_err());
    }

    #[test]
    fn prop_non_negative_delays_accepted(delay in 0i64..=86_400_000) {
        let config = SchedulerConfig { retry_delay_ms: delay, ..SchedulerConfig::default() };
        prop_assert!(config.validate().is_ok());
        prop_assert_eq!(config.retry_delay().unwrap().as_millis(), delay as u128);
    }
}

//! Unit tests for config module
//!
//! Tests configuration types, defaults, and serialization.

#![allow(clippy::unwrap_used)]

use std::{fs, time::Duration};

use tempfile::TempDir;

use crate::config::{Config, ConfigError, LogLevel, PoolingStrategy};

#[test]
fn defaults_match_documented_values() {
    let config = Config::default();

    assert_eq!(config.general.log_level, LogLevel::Info);
    assert_eq!(config.player.pooling, PoolingStrategy::Recycle);
    assert_eq!(config.player.drift_threshold(), Duration::from_millis(100));
    assert_eq!(config.player.view_type_prefix, "videoPlayer");
}

#[test]
fn partial_toml_keeps_other_defaults() {
    let config = Config::from_toml_str(
        r#"
        [player]
        pooling = "none"
        "#,
    )
    .unwrap();

    assert_eq!(config.player.pooling, PoolingStrategy::None);
    assert_eq!(config.player.drift_threshold_ms, 100);
    assert_eq!(config.general.log_level, LogLevel::Info);
}

#[test]
fn full_toml_is_read() {
    let config = Config::from_toml_str(
        r#"
        [general]
        log_level = "trace"

        [player]
        pooling = "recycle"
        drift_threshold_ms = 40
        view_type_prefix = "mirror"
        event_capacity = 16
        "#,
    )
    .unwrap();

    assert_eq!(config.general.log_level, LogLevel::Trace);
    assert_eq!(config.player.drift_threshold(), Duration::from_millis(40));
    assert_eq!(config.player.view_type_prefix, "mirror");
    assert_eq!(config.player.event_capacity, 16);
}

#[test]
fn unknown_pooling_strategy_is_rejected() {
    let result = Config::from_toml_str(
        r#"
        [player]
        pooling = "hoard"
        "#,
    );

    assert!(matches!(result, Err(ConfigError::TomlParse { location, .. }) if location == "string"));
}

#[test]
fn serialized_defaults_parse_back() {
    let rendered = Config::default().to_toml_string().unwrap();

    assert!(rendered.contains("[player]"));
    assert_eq!(Config::from_toml_str(&rendered).unwrap(), Config::default());
}

#[test]
fn missing_file_yields_defaults() {
    let dir = TempDir::new().unwrap();

    let config = Config::load_or_default(&dir.path().join("absent.toml")).unwrap();

    assert_eq!(config, Config::default());
}

#[test]
fn file_errors_carry_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[player\n").unwrap();

    let result = Config::load(&path);

    assert!(matches!(result, Err(ConfigError::TomlParse { .. })));
}

//! Unit tests for configuration loading and settings resolution
//!
//! Tests:
//! - Missing TOML files fall back to defaults without failing
//! - Priority order CLI → ENV → TOML → compiled default
//! - Validation of poll interval and base URL
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate FORECAST_* variables are marked with #[serial].

use forecast_common::config::{
    load_or_default, load_toml_config, LoggingConfig, SettingsResolver, TomlConfig,
    DEFAULT_API_BASE_URL, ENV_API_BASE_URL, ENV_POLL_INTERVAL_MS,
};
use serial_test::serial;
use std::env;
use std::time::Duration;
use tempfile::TempDir;

fn clear_env() {
    env::remove_var(ENV_API_BASE_URL);
    env::remove_var(ENV_POLL_INTERVAL_MS);
}

#[test]
fn test_load_toml_config_all_fields() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
api_base_url = "http://forecast.internal:9000/"
poll_interval_ms = 250
request_timeout_secs = 5

[logging]
level = "debug"
"#,
    )
    .unwrap();

    let config = load_toml_config(&path).unwrap();
    assert_eq!(config.api_base_url.as_deref(), Some("http://forecast.internal:9000/"));
    assert_eq!(config.poll_interval_ms, Some(250));
    assert_eq!(config.request_timeout_secs, Some(5));
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_load_toml_config_parse_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "poll_interval_ms = \"soon\"").unwrap();

    let err = load_toml_config(&path).unwrap_err();
    assert!(err.to_string().contains("Parse TOML failed"));
}

#[test]
fn test_load_or_default_missing_explicit_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("does-not-exist.toml");

    let config = load_or_default(Some(&path));
    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_load_or_default_invalid_file_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "this is [not toml").unwrap();

    let config = load_or_default(Some(&path));
    assert_eq!(config, TomlConfig::default());
}

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_defaults() {
    clear_env();

    let settings = SettingsResolver::new(TomlConfig::default()).resolve().unwrap();

    assert_eq!(settings.api_base_url, DEFAULT_API_BASE_URL);
    assert_eq!(settings.poll_interval, Duration::from_millis(5000));
    assert_eq!(settings.request_timeout, Duration::from_secs(30));
    assert_eq!(settings.log_level, "info");
}

#[test]
#[serial]
fn test_resolver_toml_used_when_no_env_or_cli() {
    clear_env();

    let toml = TomlConfig {
        api_base_url: Some("http://toml-host:8000".to_string()),
        poll_interval_ms: Some(1000),
        request_timeout_secs: Some(10),
        logging: LoggingConfig {
            level: "warn".to_string(),
        },
    };

    let settings = SettingsResolver::new(toml).resolve().unwrap();
    assert_eq!(settings.api_base_url, "http://toml-host:8000");
    assert_eq!(settings.poll_interval, Duration::from_millis(1000));
    assert_eq!(settings.request_timeout, Duration::from_secs(10));
    assert_eq!(settings.log_level, "warn");
}

#[test]
#[serial]
fn test_resolver_env_overrides_toml() {
    clear_env();
    env::set_var(ENV_API_BASE_URL, "http://env-host:8000/");
    env::set_var(ENV_POLL_INTERVAL_MS, "750");

    let toml = TomlConfig {
        api_base_url: Some("http://toml-host:8000".to_string()),
        poll_interval_ms: Some(1000),
        ..Default::default()
    };

    let settings = SettingsResolver::new(toml).resolve().unwrap();
    assert_eq!(settings.api_base_url, "http://env-host:8000");
    assert_eq!(settings.poll_interval, Duration::from_millis(750));

    clear_env();
}

#[test]
#[serial]
fn test_resolver_cli_overrides_env() {
    clear_env();
    env::set_var(ENV_API_BASE_URL, "http://env-host:8000");
    env::set_var(ENV_POLL_INTERVAL_MS, "750");

    let settings = SettingsResolver::new(TomlConfig::default())
        .with_cli_api_base_url(Some("https://cli-host".to_string()))
        .with_cli_poll_interval_ms(Some(100))
        .resolve()
        .unwrap();

    assert_eq!(settings.api_base_url, "https://cli-host");
    assert_eq!(settings.poll_interval, Duration::from_millis(100));

    clear_env();
}

#[test]
#[serial]
fn test_resolver_rejects_zero_poll_interval() {
    clear_env();

    let result = SettingsResolver::new(TomlConfig::default())
        .with_cli_poll_interval_ms(Some(0))
        .resolve();

    assert!(result.is_err());
}

#[test]
#[serial]
fn test_resolver_rejects_non_numeric_env_interval() {
    clear_env();
    env::set_var(ENV_POLL_INTERVAL_MS, "fast");

    let result = SettingsResolver::new(TomlConfig::default()).resolve();
    assert!(result.is_err());

    clear_env();
}

#[test]
#[serial]
fn test_resolver_rejects_bad_base_url() {
    clear_env();

    let toml = TomlConfig {
        api_base_url: Some("localhost:8000".to_string()),
        ..Default::default()
    };

    assert!(SettingsResolver::new(toml).resolve().is_err());
}

#[test]
#[serial]
fn test_resolver_rejects_malformed_env_base_url() {
    clear_env();
    env::set_var(ENV_API_BASE_URL, "http://exa mple.com");

    let result = SettingsResolver::new(TomlConfig::default()).resolve();
    clear_env();

    let err = result.unwrap_err();
    assert!(err.to_string().contains("Invalid API base URL"));
}

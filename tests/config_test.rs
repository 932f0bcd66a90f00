use std::io::Write;

use actor_singleton::AppConfig;
use actor_singleton::ConfigError;
use actor_singleton::ConfigOverlay;
use actor_singleton::Priority;

#[test]
fn loads_toml_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
log_filter = "debug"

[coordinator]
max_attempts = 6
default_priority = -1
release_on_discard = false
key_prefix = "svc/"
"#
    )
    .unwrap();

    let config = AppConfig::from_toml_file(file.path()).unwrap();
    assert_eq!(config.log_filter, "debug");
    assert_eq!(config.coordinator.max_attempts, 6);
    assert_eq!(config.coordinator.default_priority, Priority::LOW);
    assert!(!config.coordinator.release_on_discard);
    assert_eq!(config.coordinator.key_prefix, "svc/");
    config.validate().unwrap();
}

#[test]
fn missing_file_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let err = AppConfig::from_toml_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFile { .. }));
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn malformed_file_is_a_parse_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[coordinator\nmax_attempts = ").unwrap();

    let err = AppConfig::from_toml_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::ParseToml { .. }));
}

#[test]
fn load_rejects_invalid_file_values() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[coordinator]\ninitial_backoff_ms = 10000\nmax_backoff_ms = 10").unwrap();

    let err = AppConfig::load(Some(file.path())).unwrap_err();
    assert!(matches!(err, ConfigError::Validation { .. }));
}

#[test]
fn rendered_config_loads_back() {
    let mut config = AppConfig::default();
    config.coordinator.max_attempts = 3;
    let rendered = config.to_toml_string().unwrap();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(rendered.as_bytes()).unwrap();
    assert_eq!(AppConfig::from_toml_file(file.path()).unwrap(), config);
}

#[test]
fn file_setting_overrides_env_even_at_default_value() {
    let env = ConfigOverlay::from_lookup(|name| (name == "SINGLETON_MAX_ATTEMPTS").then(|| "4".to_string()));
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[coordinator]\nmax_attempts = 10").unwrap();

    let mut config = AppConfig::default();
    config.merge(env);
    assert_eq!(config.coordinator.max_attempts, 4);

    config.merge(ConfigOverlay::from_toml_file(file.path()).unwrap());
    assert_eq!(config.coordinator.max_attempts, 10);
    config.validate().unwrap();
}

//! Application configuration.
//!
//! Layers, lowest to highest precedence: built-in defaults, environment
//! variables (`SINGLETON_<FIELD>`), a TOML file, command-line flags.
//! Each layer is read as a [`ConfigOverlay`] so that only the fields it
//! actually sets take effect.
//!
//! ```toml
//! log_filter = "info,singleton_coordination=debug"
//!
//! [coordinator]
//! max_attempts = 5
//! default_priority = -1
//! release_on_discard = false
//! ```

use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use singleton_cluster_types::Priority;
use singleton_coordination::SingletonConfig;
use singleton_coordination::SingletonError;
use snafu::ResultExt;
use snafu::Snafu;

/// Default tracing filter when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Top-level configuration for the `actor-singleton` binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// `tracing_subscriber::EnvFilter` directive.
    pub log_filter: String,
    pub coordinator: SingletonConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            coordinator: SingletonConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file, filling unset fields with defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.merge(ConfigOverlay::from_toml_file(path)?);
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        let mut config = Self::default();
        config.merge(ConfigOverlay::from_toml_str(content)?);
        Ok(config)
    }

    /// Load configuration from `SINGLETON_*` environment variables.
    ///
    /// Unset or unparsable variables keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        config.merge(ConfigOverlay::from_lookup(lookup));
        config
    }

    /// Apply a higher-precedence layer. Every field the layer sets wins,
    /// including ones set to their default value.
    pub fn merge(&mut self, overlay: ConfigOverlay) {
        let ours = &mut self.coordinator;
        let theirs = overlay.coordinator;

        if let Some(log_filter) = overlay.log_filter {
            self.log_filter = log_filter;
        }
        if let Some(max_attempts) = theirs.max_attempts {
            ours.max_attempts = max_attempts;
        }
        if let Some(initial_backoff_ms) = theirs.initial_backoff_ms {
            ours.initial_backoff_ms = initial_backoff_ms;
        }
        if let Some(max_backoff_ms) = theirs.max_backoff_ms {
            ours.max_backoff_ms = max_backoff_ms;
        }
        if let Some(max_elapsed_ms) = theirs.max_elapsed_ms {
            ours.max_elapsed_ms = max_elapsed_ms;
        }
        if let Some(attempt_timeout_ms) = theirs.attempt_timeout_ms {
            ours.attempt_timeout_ms = attempt_timeout_ms;
        }
        if let Some(probe_timeout_ms) = theirs.probe_timeout_ms {
            ours.probe_timeout_ms = probe_timeout_ms;
        }
        if let Some(probe_attempts) = theirs.probe_attempts {
            ours.probe_attempts = probe_attempts;
        }
        if let Some(default_priority) = theirs.default_priority {
            ours.default_priority = default_priority;
        }
        if let Some(release_on_discard) = theirs.release_on_discard {
            ours.release_on_discard = release_on_discard;
        }
        if let Some(key_prefix) = theirs.key_prefix {
            ours.key_prefix = key_prefix;
        }
    }

    /// Defaults, then the environment, then the optional TOML file; validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.merge(ConfigOverlay::from_env());
        if let Some(path) = path {
            config.merge(ConfigOverlay::from_toml_file(path)?);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.coordinator.validate().context(ValidationSnafu)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).context(SerializeTomlSnafu)
    }
}

/// One configuration layer. `None` leaves the lower layer's value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConfigOverlay {
    pub log_filter: Option<String>,
    pub coordinator: CoordinatorOverlay,
}

/// Optional counterpart of [`SingletonConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CoordinatorOverlay {
    pub max_attempts: Option<u32>,
    pub initial_backoff_ms: Option<u64>,
    pub max_backoff_ms: Option<u64>,
    pub max_elapsed_ms: Option<u64>,
    pub attempt_timeout_ms: Option<u64>,
    pub probe_timeout_ms: Option<u64>,
    pub probe_attempts: Option<u32>,
    pub default_priority: Option<Priority>,
    pub release_on_discard: Option<bool>,
    pub key_prefix: Option<String>,
}

impl ConfigOverlay {
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).context(ReadFileSnafu { path })?;
        Self::from_toml_str(&content).context(ParseTomlSnafu { path })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Collect the `SINGLETON_*` variables `lookup` knows about.
    ///
    /// Unparsable values are skipped.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        fn parse<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
            lookup(name)?.trim().parse().ok()
        }

        Self {
            log_filter: lookup("SINGLETON_LOG_FILTER"),
            coordinator: CoordinatorOverlay {
                max_attempts: parse(&lookup, "SINGLETON_MAX_ATTEMPTS"),
                initial_backoff_ms: parse(&lookup, "SINGLETON_INITIAL_BACKOFF_MS"),
                max_backoff_ms: parse(&lookup, "SINGLETON_MAX_BACKOFF_MS"),
                max_elapsed_ms: parse(&lookup, "SINGLETON_MAX_ELAPSED_MS"),
                attempt_timeout_ms: parse(&lookup, "SINGLETON_ATTEMPT_TIMEOUT_MS"),
                probe_timeout_ms: parse(&lookup, "SINGLETON_PROBE_TIMEOUT_MS"),
                probe_attempts: parse(&lookup, "SINGLETON_PROBE_ATTEMPTS"),
                default_priority: parse(&lookup, "SINGLETON_DEFAULT_PRIORITY").map(Priority),
                release_on_discard: parse(&lookup, "SINGLETON_RELEASE_ON_DISCARD"),
                key_prefix: lookup("SINGLETON_KEY_PREFIX"),
            },
        }
    }
}

/// Configuration loading and parsing errors.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    #[snafu(display("failed to read config file {}: {source}", path.display()))]
    ReadFile { path: PathBuf, source: std::io::Error },

    #[snafu(display("failed to parse TOML config file {}: {source}", path.display()))]
    ParseToml { path: PathBuf, source: toml::de::Error },

    #[snafu(display("failed to render configuration as TOML: {source}"))]
    SerializeToml { source: toml::ser::Error },

    #[snafu(display("configuration validation failed: {source}"))]
    Validation { source: SingletonError },
}

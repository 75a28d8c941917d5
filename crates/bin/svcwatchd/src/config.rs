//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `svcwatch.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::time::Duration;

use serde::Deserialize;

use svcwatch_adapter_virtual::VirtualConfig;
use svcwatch_domain::error::ValidationError;
use svcwatch_domain::notify::{NotifyMask, StatusChange};
use svcwatch_domain::service::ServiceName;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// What to watch and for how long.
    pub watch: WatchConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// How notifications are printed.
    pub output: OutputConfig,
    /// Which service control manager to talk to.
    pub backend: BackendConfig,
}

/// Watched services and status changes.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Service key names, in subscription order.
    pub services: Vec<String>,
    /// Status-change kind names (`stopped`, `running`, ...).
    pub events: Vec<String>,
    /// Seconds to watch before exiting; `0` waits for Ctrl-C.
    pub duration_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

/// Rendering of printed notifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Backend selection.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,
    /// Settings of the simulated backend.
    #[serde(rename = "virtual")]
    pub virtual_backend: VirtualConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// The Windows service control manager.
    Scm,
    /// The in-process simulator.
    Virtual,
}

impl Config {
    /// Load configuration from `svcwatch.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration does not validate.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("svcwatch.toml")?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(val) = lookup("SVCWATCH_SERVICES") {
            self.watch.services = split_list(&val);
        }
        if let Some(val) = lookup("SVCWATCH_EVENTS") {
            self.watch.events = split_list(&val);
        }
        if let Some(val) = lookup("SVCWATCH_DURATION_SECS") {
            self.watch.duration_secs = val.trim().parse().map_err(|_| {
                ConfigError::Validation(format!("SVCWATCH_DURATION_SECS is not a number: {val}"))
            })?;
        }
        if let Some(val) = lookup("SVCWATCH_BACKEND") {
            self.backend.kind = match val.trim().to_ascii_lowercase().as_str() {
                "scm" => BackendKind::Scm,
                "virtual" => BackendKind::Virtual,
                other => {
                    return Err(ConfigError::Validation(format!(
                        "unknown backend `{other}`"
                    )));
                }
            };
        }
        if let Some(val) = lookup("SVCWATCH_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = lookup("RUST_LOG") {
            self.logging.filter = val;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.watch.services.is_empty() {
            return Err(ConfigError::Validation(
                "at least one service must be watched".to_string(),
            ));
        }
        for service in &self.watch.services {
            ServiceName::new(service)?;
        }
        self.notify_mask()?;
        if self.backend.kind == BackendKind::Scm && !cfg!(windows) {
            return Err(ConfigError::Validation(
                "the scm backend is only available on Windows".to_string(),
            ));
        }
        Ok(())
    }

    /// The mask built from the configured event names.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first unknown event.
    pub fn notify_mask(&self) -> Result<NotifyMask, ConfigError> {
        let mask = self
            .watch
            .events
            .iter()
            .map(|event| event.parse::<StatusChange>())
            .collect::<Result<NotifyMask, _>>()?;
        Ok(mask)
    }

    /// How long to watch, `None` meaning until interrupted.
    #[must_use]
    pub fn duration(&self) -> Option<Duration> {
        (self.watch.duration_secs > 0).then(|| Duration::from_secs(self.watch.duration_secs))
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect()
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            services: vec!["W32Time".to_string(), "WebClient".to_string()],
            events: vec!["stopped".to_string()],
            duration_secs: 300,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "svcwatchd=info,svcwatch=info".to_string(),
        }
    }
}

impl Default for BackendKind {
    fn default() -> Self {
        if cfg!(windows) { Self::Scm } else { Self::Virtual }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// A configured name does not form a valid domain value.
    #[error("invalid configuration")]
    Domain(#[from] ValidationError),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.watch.services, vec!["W32Time", "WebClient"]);
        assert_eq!(config.watch.events, vec!["stopped"]);
        assert_eq!(config.watch.duration_secs, 300);
        assert_eq!(config.output.format, OutputFormat::Text);
        assert_eq!(config.logging.filter, "svcwatchd=info,svcwatch=info");
    }

    #[test]
    fn should_default_backend_to_platform() {
        let expected = if cfg!(windows) {
            BackendKind::Scm
        } else {
            BackendKind::Virtual
        };
        assert_eq!(Config::default().backend.kind, expected);
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.watch.duration_secs, 300);
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = "
            [watch]
            services = ['Alpha', 'Beta']
            events = ['stopped', 'running']
            duration_secs = 0

            [logging]
            filter = 'debug'

            [output]
            format = 'json'

            [backend]
            kind = 'virtual'

            [backend.virtual]
            missing_services = ['Beta']
            simulate_interval_ms = 250
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.watch.services, vec!["Alpha", "Beta"]);
        assert_eq!(config.watch.duration_secs, 0);
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.backend.kind, BackendKind::Virtual);
        assert_eq!(config.backend.virtual_backend.missing_services, vec!["Beta"]);
        assert_eq!(config.backend.virtual_backend.simulate_interval_ms, 250);
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.watch.duration_secs, 300);
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("invalid {{{");
        assert!(result.is_err());
    }

    #[test]
    fn should_build_mask_from_event_names() {
        let mut config = Config::default();
        config.watch.events = vec!["Stopped".to_string(), "running".to_string()];
        let mask = config.notify_mask().unwrap();
        assert_eq!(mask.bits(), 0x9);
    }

    #[test]
    fn should_build_empty_mask_without_events() {
        let mut config = Config::default();
        config.watch.events.clear();
        assert!(config.notify_mask().unwrap().is_empty());
    }

    #[test]
    fn should_reject_unknown_event() {
        let mut config = Config::default();
        config.backend.kind = BackendKind::Virtual;
        config.watch.events = vec!["exploded".to_string()];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Domain(ValidationError::UnknownStatusChange(_)))
        ));
    }

    #[test]
    fn should_reject_empty_service_list() {
        let mut config = Config::default();
        config.backend.kind = BackendKind::Virtual;
        config.watch.services.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn should_reject_invalid_service_name() {
        let mut config = Config::default();
        config.backend.kind = BackendKind::Virtual;
        config.watch.services = vec!["Alpha".to_string(), String::new()];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Domain(ValidationError::EmptyServiceName))
        ));
    }

    #[test]
    fn should_accept_virtual_defaults() {
        let mut config = Config::default();
        config.backend.kind = BackendKind::Virtual;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_map_duration() {
        let mut config = Config::default();
        assert_eq!(config.duration(), Some(Duration::from_secs(300)));
        config.watch.duration_secs = 0;
        assert_eq!(config.duration(), None);
    }

    #[test]
    fn should_apply_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(env(&[
                ("SVCWATCH_SERVICES", "Alpha, Beta,,"),
                ("SVCWATCH_EVENTS", "running"),
                ("SVCWATCH_DURATION_SECS", "5"),
                ("SVCWATCH_BACKEND", "Virtual"),
                ("SVCWATCH_LOG", "trace"),
            ]))
            .unwrap();
        assert_eq!(config.watch.services, vec!["Alpha", "Beta"]);
        assert_eq!(config.watch.events, vec!["running"]);
        assert_eq!(config.watch.duration_secs, 5);
        assert_eq!(config.backend.kind, BackendKind::Virtual);
        assert_eq!(config.logging.filter, "trace");
    }

    #[test]
    fn should_prefer_rust_log_over_svcwatch_log() {
        let mut config = Config::default();
        config
            .apply_overrides(env(&[("SVCWATCH_LOG", "trace"), ("RUST_LOG", "warn")]))
            .unwrap();
        assert_eq!(config.logging.filter, "warn");
    }

    #[test]
    fn should_reject_bad_duration_override() {
        let mut config = Config::default();
        let result = config.apply_overrides(env(&[("SVCWATCH_DURATION_SECS", "soon")]));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn should_reject_unknown_backend_override() {
        let mut config = Config::default();
        let result = config.apply_overrides(env(&[("SVCWATCH_BACKEND", "remote")]));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }
}

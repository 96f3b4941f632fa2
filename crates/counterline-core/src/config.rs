//! Configuration loading and typed config structures.
//!
//! The canonical configuration lives in `counterline-config.yaml` at the
//! project root. Every section and field has a default, so an empty file
//! (or no file) yields a runnable configuration.
//!
//! Queue parameters are checked by [`QueueConfig::validate`] before an
//! engine is built; parsing alone never rejects out-of-range numbers.

use std::path::Path;

use counterline_types::{RunParameters, SchedulerKind, ServiceMode};
use serde::Deserialize;

/// Largest accepted server count.
pub const MAX_SERVERS: u32 = 1_000;

/// Largest accepted customer count.
pub const MAX_CUSTOMERS: u64 = 1_000_000;

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A queue parameter is outside its allowed range.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration {
        /// Which parameter is wrong and why.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration. Mirrors `counterline-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CounterlineConfig {
    /// Queue model parameters.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Run loop pacing and bounds.
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Observer HTTP server settings.
    #[serde(default)]
    pub observer: ObserverConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CounterlineConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `COUNTERLINE_OBSERVER_PORT` overrides `observer.port` when set to a
    /// valid port number.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.observer.apply_env_overrides();
        Ok(config)
    }
}

/// Queue model parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueueConfig {
    /// Number of server slots (at least 1).
    #[serde(default = "default_servers")]
    pub servers: u32,

    /// Mean arrivals per unit time (positive, finite).
    #[serde(default = "default_arrival_rate")]
    pub arrival_rate: f64,

    /// Number of subjects to schedule (at least 1).
    #[serde(default = "default_customers")]
    pub customers: u64,

    /// Service duration, or its mean in exponential mode (positive, finite).
    #[serde(default = "default_service_time")]
    pub service_time: f64,

    /// How service durations are produced.
    #[serde(default)]
    pub service_mode: ServiceMode,

    /// Random seed. When absent a seed is drawn per run and reported.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Future-event-list backend.
    #[serde(default)]
    pub scheduler: SchedulerKind,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            servers: default_servers(),
            arrival_rate: default_arrival_rate(),
            customers: default_customers(),
            service_time: default_service_time(),
            service_mode: ServiceMode::default(),
            seed: None,
            scheduler: SchedulerKind::default(),
        }
    }
}

impl QueueConfig {
    /// Rebuild a queue config from the parameters of an existing run.
    pub const fn from_params(params: &RunParameters, seed: Option<u64>) -> Self {
        Self {
            servers: params.servers,
            arrival_rate: params.arrival_rate,
            customers: params.customers,
            service_time: params.service_time,
            service_mode: params.service_mode,
            seed,
            scheduler: params.scheduler,
        }
    }

    /// The run parameters this config describes.
    pub const fn params(&self) -> RunParameters {
        RunParameters {
            servers: self.servers,
            arrival_rate: self.arrival_rate,
            customers: self.customers,
            service_time: self.service_time,
            service_mode: self.service_mode,
            scheduler: self.scheduler,
        }
    }

    /// Check every parameter is in range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidConfiguration`] naming the first
    /// offending parameter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.servers == 0 {
            return Err(invalid("servers must be at least 1"));
        }
        if self.servers > MAX_SERVERS {
            return Err(invalid(format!(
                "servers must be at most {MAX_SERVERS}, got {}",
                self.servers
            )));
        }
        if !(self.arrival_rate.is_finite() && self.arrival_rate > 0.0) {
            return Err(invalid(format!(
                "arrival_rate must be a positive finite number, got {}",
                self.arrival_rate
            )));
        }
        if self.customers == 0 {
            return Err(invalid("customers must be at least 1"));
        }
        if self.customers > MAX_CUSTOMERS {
            return Err(invalid(format!(
                "customers must be at most {MAX_CUSTOMERS}, got {}",
                self.customers
            )));
        }
        if !(self.service_time.is_finite() && self.service_time > 0.0) {
            return Err(invalid(format!(
                "service_time must be a positive finite number, got {}",
                self.service_time
            )));
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidConfiguration {
        reason: reason.into(),
    }
}

/// Run loop configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunnerConfig {
    /// Real-time milliseconds between steps (0 = run flat out).
    #[serde(default = "default_step_interval_ms")]
    pub step_interval_ms: u64,

    /// Start stepping immediately instead of waiting for `play`.
    #[serde(default = "default_true")]
    pub autoplay: bool,

    /// Maximum steps per run (0 = unlimited).
    #[serde(default)]
    pub max_steps: u64,

    /// End the loop when the event list drains. When false the loop
    /// pauses and waits for a reset or stop instead.
    #[serde(default = "default_true")]
    pub exit_on_completion: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            step_interval_ms: default_step_interval_ms(),
            autoplay: true,
            max_steps: 0,
            exit_on_completion: true,
        }
    }
}

/// Observer HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObserverConfig {
    /// Whether to start the observer server.
    #[serde(default)]
    pub enabled: bool,

    /// Bind address.
    #[serde(default = "default_observer_host")]
    pub host: String,

    /// TCP port.
    #[serde(default = "default_observer_port")]
    pub port: u16,
}

impl ObserverConfig {
    /// Apply `COUNTERLINE_OBSERVER_PORT` when it holds a valid port.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("COUNTERLINE_OBSERVER_PORT")
            && let Ok(port) = val.trim().parse::<u16>()
        {
            self.port = port;
        }
    }
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_observer_host(),
            port: default_observer_port(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions for serde
// ---------------------------------------------------------------------------

const fn default_servers() -> u32 {
    2
}

const fn default_arrival_rate() -> f64 {
    1.0
}

const fn default_customers() -> u64 {
    50
}

const fn default_service_time() -> f64 {
    5.0
}

const fn default_step_interval_ms() -> u64 {
    500
}

fn default_observer_host() -> String {
    String::from("0.0.0.0")
}

const fn default_observer_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    String::from("info")
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = CounterlineConfig::default();
        assert_eq!(config.queue.servers, 2);
        assert_eq!(config.queue.customers, 50);
        assert_eq!(config.queue.service_mode, ServiceMode::Fixed);
        assert_eq!(config.queue.scheduler, SchedulerKind::Heap);
        assert_eq!(config.runner.step_interval_ms, 500);
        assert!(config.queue.validate().is_ok());
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r"
queue:
  servers: 3
  arrival_rate: 0.5
  customers: 20
  service_time: 2.5
  service_mode: exponential
  seed: 99
  scheduler: unsorted

runner:
  step_interval_ms: 100
  autoplay: false
  max_steps: 40
  exit_on_completion: false

observer:
  enabled: true
  host: 127.0.0.1
  port: 9090

logging:
  level: debug
  json: true
";
        let config = CounterlineConfig::parse(yaml);
        assert!(config.is_ok(), "parse failed: {config:?}");
        let config = config.unwrap_or_default();

        assert_eq!(config.queue.servers, 3);
        assert_eq!(config.queue.customers, 20);
        assert_eq!(config.queue.service_mode, ServiceMode::Exponential);
        assert_eq!(config.queue.seed, Some(99));
        assert_eq!(config.queue.scheduler, SchedulerKind::Unsorted);
        assert_eq!(config.runner.max_steps, 40);
        assert!(!config.runner.autoplay);
        assert!(!config.runner.exit_on_completion);
        assert!(config.observer.enabled);
        assert_eq!(config.observer.host, "127.0.0.1");
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    fn parse_minimal_yaml() {
        let config = CounterlineConfig::parse("queue:\n  servers: 4\n").unwrap_or_default();
        assert_eq!(config.queue.servers, 4);
        // Everything else uses defaults
        assert_eq!(config.queue.customers, 50);
        assert_eq!(config.runner.step_interval_ms, 500);
    }

    #[test]
    fn parse_empty_yaml() {
        assert!(CounterlineConfig::parse("").is_ok());
    }

    #[test]
    fn parse_rejects_unknown_service_mode() {
        let result = CounterlineConfig::parse("queue:\n  service_mode: gamma\n");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn validate_rejects_too_many_servers() {
        let config = QueueConfig {
            servers: MAX_SERVERS + 1,
            ..QueueConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidConfiguration { reason }) if reason.contains("at most")
        ));

        let at_limit = QueueConfig {
            servers: MAX_SERVERS,
            ..QueueConfig::default()
        };
        assert!(at_limit.validate().is_ok());
    }

    #[test]
    fn validate_rejects_too_many_customers() {
        for customers in [MAX_CUSTOMERS + 1, u64::MAX / 2, u64::MAX] {
            let config = QueueConfig {
                customers,
                ..QueueConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidConfiguration { .. })
            ));
        }
    }

    #[test]
    fn validate_rejects_zero_servers() {
        let config = QueueConfig {
            servers: 0,
            ..QueueConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn validate_rejects_non_positive_rates_and_times() {
        for (arrival_rate, service_time) in [(0.0, 1.0), (-1.0, 1.0), (1.0, 0.0), (f64::NAN, 1.0), (1.0, f64::INFINITY)] {
            let config = QueueConfig {
                arrival_rate,
                service_time,
                ..QueueConfig::default()
            };
            assert!(config.validate().is_err(), "accepted {arrival_rate}/{service_time}");
        }
    }

    #[test]
    fn validate_rejects_zero_customers() {
        let config = QueueConfig {
            customers: 0,
            ..QueueConfig::default()
        };
        let err = config.validate().err().map(|e| e.to_string());
        assert_eq!(
            err.as_deref(),
            Some("invalid configuration: customers must be at least 1")
        );
    }

    #[test]
    fn params_roundtrip() {
        let config = QueueConfig {
            seed: Some(5),
            ..QueueConfig::default()
        };
        let rebuilt = QueueConfig::from_params(&config.params(), Some(5));
        assert_eq!(rebuilt, config);
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("counterline-config.yaml");
        if path.exists() {
            let config = CounterlineConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}

//! CLI configuration management
//!
//! Settings are layered, highest priority first:
//! 1. Command-line flags
//! 2. Environment variables (`PRICER_LOG_LEVEL`, `PRICER_WORKERS`, `PRICER_SEED`)
//! 3. TOML configuration file
//! 4. Defaults

use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use pricer_distributed::config::DEFAULT_SEED;
use pricer_distributed::{SimulationConfig, VarianceReduction};

/// Environment variable overriding the log level
pub const ENV_LOG_LEVEL: &str = "PRICER_LOG_LEVEL";
/// Environment variable overriding the worker count
pub const ENV_WORKERS: &str = "PRICER_WORKERS";
/// Environment variable overriding the base seed
pub const ENV_SEED: &str = "PRICER_SEED";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid worker count: {0}. Must be at least 1")]
    InvalidWorkers(usize),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Configuration file error: {0}")]
    FileError(String),

    #[error("Environment variable error: {0}")]
    EnvError(String),
}

/// Log levels accepted by the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ConfigError::InvalidLogLevel(s.to_string())),
        }
    }
}

impl LogLevel {
    /// Convert log level to tracing filter string
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

/// Simulation settings shared by every command
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PricerConfig {
    /// Log level
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    /// Number of parallel workers
    pub workers: usize,
    /// Base seed; worker `i` uses `seed + i`
    pub seed: u64,
    /// Variance reduction mode
    #[serde(deserialize_with = "deserialize_variance_reduction")]
    pub variance_reduction: VarianceReduction,
    /// Whether workers may be left without samples
    pub allow_idle_workers: bool,
    /// CSV file that result rows are appended to
    pub results_file: Option<PathBuf>,
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    LogLevel::from_str(&s).map_err(serde::de::Error::custom)
}

fn deserialize_variance_reduction<'de, D>(deserializer: D) -> Result<VarianceReduction, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    VarianceReduction::from_str(&s).map_err(serde::de::Error::custom)
}

impl Default for PricerConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            workers: num_cpus::get().max(1),
            seed: DEFAULT_SEED,
            variance_reduction: VarianceReduction::None,
            allow_idle_workers: true,
            results_file: None,
        }
    }
}

impl PricerConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileError(format!("Failed to read config file: {}", e)))?;

        let config: PricerConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::FileError(format!("Failed to parse TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides read through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = LogLevel::from_str(&level)?;
        }
        if let Some(workers) = lookup(ENV_WORKERS) {
            self.workers = workers.trim().parse().map_err(|_| {
                ConfigError::EnvError(format!("{} is not a worker count: {}", ENV_WORKERS, workers))
            })?;
        }
        if let Some(seed) = lookup(ENV_SEED) {
            self.seed = seed.trim().parse().map_err(|_| {
                ConfigError::EnvError(format!("{} is not a seed: {}", ENV_SEED, seed))
            })?;
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::InvalidWorkers(self.workers));
        }
        Ok(())
    }

    /// Merge with CLI arguments (CLI takes precedence)
    pub fn merge_with_cli(&mut self, cli: &CliArgs) -> Result<(), ConfigError> {
        if let Some(level) = &cli.log_level {
            self.log_level = LogLevel::from_str(level)?;
        }
        if let Some(workers) = cli.workers {
            self.workers = workers;
        }
        if let Some(seed) = cli.seed {
            self.seed = seed;
        }
        if cli.antithetic {
            self.variance_reduction = VarianceReduction::Antithetic;
        }
        if cli.no_idle_workers {
            self.allow_idle_workers = false;
        }
        if let Some(path) = &cli.results_file {
            self.results_file = Some(path.clone());
        }
        Ok(())
    }

    /// Engine configuration for a run of `total_samples` on `workers` workers
    pub fn simulation(
        &self,
        total_samples: u64,
        workers: usize,
    ) -> pricer_distributed::Result<SimulationConfig> {
        SimulationConfig::builder()
            .total_samples(total_samples)
            .worker_count(workers)
            .base_seed(self.seed)
            .variance_reduction(self.variance_reduction)
            .allow_idle_workers(self.allow_idle_workers)
            .build()
    }
}

/// Global flags relevant to configuration
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Config file path
    pub config_file: Option<PathBuf>,
    /// Log level override
    pub log_level: Option<String>,
    /// Worker count override
    pub workers: Option<usize>,
    /// Seed override
    pub seed: Option<u64>,
    /// Force antithetic sampling
    pub antithetic: bool,
    /// Forbid workers without samples
    pub no_idle_workers: bool,
    /// Results CSV override
    pub results_file: Option<PathBuf>,
}

/// Build configuration from all sources, reading the process environment
pub fn build_config(cli: &CliArgs) -> Result<PricerConfig, ConfigError> {
    build_config_with_env(cli, |key| std::env::var(key).ok())
}

/// Build configuration from all sources with an explicit environment
///
/// Priority (highest to lowest):
/// 1. CLI arguments
/// 2. Environment variables
/// 3. Config file
/// 4. Default values
pub fn build_config_with_env<F>(cli: &CliArgs, env: F) -> Result<PricerConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match &cli.config_file {
        Some(path) => PricerConfig::from_file(path)?,
        None => PricerConfig::default(),
    };

    config.apply_env(env)?;
    config.merge_with_cli(cli)?;

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_default_config() {
        let config = PricerConfig::default();
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(config.workers >= 1);
        assert_eq!(config.seed, 42);
        assert_eq!(config.variance_reduction, VarianceReduction::None);
        assert!(config.allow_idle_workers);
        assert!(config.results_file.is_none());
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str("trace").unwrap(), LogLevel::Trace);
        assert_eq!(LogLevel::from_str("DEBUG").unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::from_str("Info").unwrap(), LogLevel::Info);
        assert_eq!(LogLevel::from_str("WARN").unwrap(), LogLevel::Warn);
        assert_eq!(LogLevel::from_str("error").unwrap(), LogLevel::Error);

        assert!(LogLevel::from_str("invalid").is_err());
    }

    #[test]
    fn test_log_level_display() {
        assert_eq!(format!("{}", LogLevel::Trace), "trace");
        assert_eq!(format!("{}", LogLevel::Warn), "warn");
        assert_eq!(LogLevel::Error.as_filter_str(), "error");
    }

    #[test]
    fn test_toml_deserialization() {
        let toml_str = r#"
            log_level = "debug"
            workers = 8
            seed = 7
            variance_reduction = "antithetic"
            allow_idle_workers = false
            results_file = "results.csv"
        "#;

        let config: PricerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.workers, 8);
        assert_eq!(config.seed, 7);
        assert_eq!(config.variance_reduction, VarianceReduction::Antithetic);
        assert!(!config.allow_idle_workers);
        assert_eq!(config.results_file, Some(PathBuf::from("results.csv")));
    }

    #[test]
    fn test_partial_toml_deserialization() {
        let config: PricerConfig = toml::from_str("workers = 3").unwrap();
        assert_eq!(config.workers, 3);
        assert_eq!(config.seed, 42);
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn test_invalid_toml_values() {
        assert!(toml::from_str::<PricerConfig>("log_level = \"loud\"").is_err());
        assert!(toml::from_str::<PricerConfig>("variance_reduction = \"sobol\"").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> =
            [(ENV_LOG_LEVEL, "warn"), (ENV_WORKERS, "6"), (ENV_SEED, "1234")].into();
        let mut config = PricerConfig::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.log_level, LogLevel::Warn);
        assert_eq!(config.workers, 6);
        assert_eq!(config.seed, 1234);
    }

    #[test]
    fn test_bad_env_value() {
        let mut config = PricerConfig::default();
        let result = config.apply_env(|key| (key == ENV_WORKERS).then(|| "many".to_string()));
        assert!(matches!(result, Err(ConfigError::EnvError(_))));
    }

    #[test]
    fn test_cli_args_merge() {
        let mut config = PricerConfig::default();
        let cli = CliArgs {
            log_level: Some("debug".to_string()),
            workers: Some(2),
            seed: Some(99),
            antithetic: true,
            no_idle_workers: true,
            ..Default::default()
        };

        config.merge_with_cli(&cli).unwrap();

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.workers, 2);
        assert_eq!(config.seed, 99);
        assert_eq!(config.variance_reduction, VarianceReduction::Antithetic);
        assert!(!config.allow_idle_workers);
    }

    #[test]
    fn test_precedence_file_env_cli() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "workers = 3\nseed = 5\nlog_level = \"error\"").unwrap();

        let cli = CliArgs {
            config_file: Some(file.path().to_path_buf()),
            seed: Some(77),
            ..Default::default()
        };
        let config =
            build_config_with_env(&cli, |key| (key == ENV_WORKERS).then(|| "4".to_string()))
                .unwrap();

        assert_eq!(config.log_level, LogLevel::Error); // file
        assert_eq!(config.workers, 4); // env beats file
        assert_eq!(config.seed, 77); // CLI beats file
    }

    #[test]
    fn test_zero_workers_rejected() {
        let cli = CliArgs {
            workers: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            build_config_with_env(&cli, no_env),
            Err(ConfigError::InvalidWorkers(0))
        ));
    }

    #[test]
    fn test_missing_file() {
        let cli = CliArgs {
            config_file: Some(PathBuf::from("/nonexistent/mcprice.toml")),
            ..Default::default()
        };
        assert!(matches!(
            build_config_with_env(&cli, no_env),
            Err(ConfigError::FileError(_))
        ));
    }

    #[test]
    fn test_simulation_config() {
        let config = PricerConfig {
            seed: 11,
            variance_reduction: VarianceReduction::Antithetic,
            ..PricerConfig::default()
        };
        let sim = config.simulation(1000, 4).unwrap();
        assert_eq!(sim.total_samples(), 1000);
        assert_eq!(sim.worker_count(), 4);
        assert_eq!(sim.base_seed(), 11);
        assert_eq!(sim.variance_reduction(), VarianceReduction::Antithetic);
        assert!(config.simulation(0, 4).is_err());
    }
}

//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub log: LogConfig,
    /// Ledger and chart-of-accounts tuning.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Report tuning.
    #[serde(default)]
    pub aggregation: AggregationConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable, multi-line.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_filter() -> String {
    "kontra=info,sea_orm=warn,sqlx=warn".to_string()
}

/// Ledger configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Upper bound on account-code allocation attempts before giving up.
    #[serde(default = "default_max_attempts")]
    pub code_generation_max_attempts: u32,
    /// Upper bound on entry-number allocation attempts.
    #[serde(default = "default_max_attempts")]
    pub max_entry_attempts: u32,
    /// Prefix of human-readable entry numbers.
    #[serde(default = "default_entry_number_prefix")]
    pub entry_number_prefix: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            code_generation_max_attempts: default_max_attempts(),
            max_entry_attempts: default_max_attempts(),
            entry_number_prefix: default_entry_number_prefix(),
        }
    }
}

fn default_max_attempts() -> u32 {
    10
}

fn default_entry_number_prefix() -> String {
    "JE".to_string()
}

/// Aggregation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AggregationConfig {
    /// Budgets above this total (whole currency units) require approval.
    #[serde(default = "default_budget_approval_threshold")]
    pub budget_approval_threshold: i64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            budget_approval_threshold: default_budget_approval_threshold(),
        }
    }
}

fn default_budget_approval_threshold() -> i64 {
    1_000_000_000
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Sources, later ones overriding earlier ones:
    /// `config/default`, `config/{RUN_MODE}`, then `KONTRA__*` variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("KONTRA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

//! CLI error types

use pricer_core::types::PricingError;
use pricer_distributed::EngineError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors surfaced by `mcprice` commands
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid option parameters: {0}")]
    Pricing(#[from] PricingError),

    #[error("Simulation failed: {0}")]
    Engine(#[from] EngineError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Validation failed: relative error {rel_error_pct:.4}% exceeds {threshold_pct}%")]
    ValidationFailed {
        rel_error_pct: f64,
        threshold_pct: f64,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

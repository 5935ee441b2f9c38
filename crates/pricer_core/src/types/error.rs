//! Error types for structured error handling.
//!
//! This module provides:
//! - `PricingError`: Errors from parameter validation and pricing operations

use thiserror::Error;

/// Categorised pricing errors.
///
/// Provides structured error handling for pricing operations with
/// descriptive context for each failure mode.
///
/// # Variants
/// - `InvalidInput`: Invalid market data or parameters
/// - `NumericalInstability`: Computation produced a non-finite value
///
/// # Examples
/// ```
/// use pricer_core::types::PricingError;
///
/// let err = PricingError::InvalidInput("Negative spot price".to_string());
/// assert_eq!(format!("{}", err), "Invalid input: Negative spot price");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    /// Invalid input data or parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Numerical instability during computation
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),
}

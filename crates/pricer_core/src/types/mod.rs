//! Core financial and error types.
//!
//! This module provides:
//! - `option`: Validated European option parameters
//! - `error`: Structured error types for validation and pricing operations
//!
//! # Re-exports
//!
//! For convenience, commonly used types are re-exported at this module level:
//! - [`OptionParameters`] from `option`
//! - [`PricingError`] from `error`

pub mod error;
pub mod option;

// Re-export commonly used types at module level
pub use error::PricingError;
pub use option::OptionParameters;

//! Analytical (closed-form) solutions for European options.
//!
//! These prices are the reference against which Monte Carlo estimates are
//! validated; the simulation path itself never calls them.
//!
//! # Usage
//!
//! ```rust
//! use pricer_core::analytical::{black_scholes_call, black_scholes_put};
//! use pricer_core::types::OptionParameters;
//!
//! let params = OptionParameters::new(100.0, 100.0, 1.0, 0.05, 0.2).unwrap();
//! let call = black_scholes_call(&params);
//! let put = black_scholes_put(&params);
//! assert!(call > put);
//! ```

pub mod black_scholes;
pub mod distributions;

pub use black_scholes::{black_scholes_call, black_scholes_put};
pub use distributions::norm_cdf;

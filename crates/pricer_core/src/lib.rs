//! # pricer_core: Foundation Types for Monte Carlo Option Pricing
//!
//! ## Layer 1 (Foundation) Role
//!
//! pricer_core serves as the bottom layer of the workspace, providing:
//! - Validated option inputs: `OptionParameters` (`types::option`)
//! - Error types: `PricingError` (`types::error`)
//! - Closed-form reference prices and normal distribution functions (`analytical`)
//!
//! ## Zero Dependency Principle
//!
//! Layer 1 has no dependencies on other pricer_* crates, with minimal external dependencies:
//! - num-traits: Traits for generic numerical computation
//! - thiserror: Error derivation
//! - serde: Serialisation support (optional)
//!
//! ## Usage Examples
//!
//! ```rust
//! use pricer_core::analytical::black_scholes_call;
//! use pricer_core::types::OptionParameters;
//!
//! let params = OptionParameters::new(100.0, 100.0, 1.0, 0.05, 0.2).unwrap();
//! let reference = black_scholes_call(&params);
//! # assert!((reference - 10.4506).abs() < 1e-3);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialisation for `OptionParameters`

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod analytical;
pub mod types;

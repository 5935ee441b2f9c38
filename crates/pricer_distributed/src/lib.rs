//! # pricer_distributed: Distributed Monte Carlo Estimation Engine
//!
//! ## Layer 3 (Engine) Role
//!
//! Prices European calls by splitting a Monte Carlo simulation over a fixed
//! number of workers that meet exactly once, in a collective reduction:
//!
//! - [`partition`]: exact per-worker sample counts and seeds
//! - [`rng`]: seeded, optionally antithetic, standard normal streams
//! - [`model`]: one-step GBM terminal payoff
//! - [`accumulator`]: per-worker moment accumulation
//! - [`collective`]: the reduction, returning a result on the coordinator only
//! - [`estimate`]: price, standard error and confidence intervals
//! - [`engine`]: the worker pool driving one run end to end
//! - [`convergence`]: error-versus-sample-count sweeps and slope fitting
//!
//! ## Usage
//!
//! ```rust
//! use pricer_core::analytical::black_scholes_call;
//! use pricer_core::types::OptionParameters;
//! use pricer_distributed::{DistributedPricer, SimulationConfig, VarianceReduction};
//!
//! let params = OptionParameters::new(100.0, 100.0, 1.0, 0.05, 0.2).unwrap();
//! let config = SimulationConfig::builder()
//!     .total_samples(200_000)
//!     .worker_count(4)
//!     .base_seed(42)
//!     .variance_reduction(VarianceReduction::Antithetic)
//!     .build()
//!     .unwrap();
//!
//! let run = DistributedPricer::new(config).unwrap().price(&params).unwrap();
//! let reference = black_scholes_call(&params);
//! assert!((run.estimate.price - reference).abs() < 5.0 * run.estimate.standard_error);
//! ```
//!
//! ## Reproducibility
//!
//! For a fixed `(base_seed, worker_count, variance_reduction)` a run is
//! bit-for-bit reproducible: worker `i` always draws from `base_seed + i`,
//! and the coordinator reduces contributions in rank order.
//!
//! ## Feature Flags
//!
//! - `serde`: Serialisation for estimates, statistics and convergence points

#![warn(missing_docs)]

pub mod accumulator;
pub mod collective;
pub mod config;
pub mod convergence;
pub mod engine;
pub mod error;
pub mod estimate;
pub mod model;
pub mod partition;
pub mod rng;

pub use accumulator::{accumulate, LocalAccumulator, LocalStatistics};
pub use collective::{ChannelCommunicator, Collective, COORDINATOR_RANK};
pub use config::{SimulationConfig, SimulationConfigBuilder};
pub use convergence::{
    fit_log_log_slope, fit_standard_error_slope, ConvergenceAnalyzer, ConvergencePoint,
    ConvergenceSweep,
};
pub use engine::{DistributedPricer, SimulationRun};
pub use error::{EngineError, Result};
pub use estimate::{GlobalStatistics, PriceEstimate};
pub use model::OptionModel;
pub use partition::{partition, worker_shares, WorkerShare};
pub use rng::{SampleGenerator, VarianceReduction};

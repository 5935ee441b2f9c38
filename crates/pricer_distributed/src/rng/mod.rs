//! # Random Number Generation
//!
//! Seeded standard normal streams for the workers of a simulation run.
//!
//! - [`WorkerRng`]: a `StdRng` wrapper drawing N(0, 1) via the Ziggurat method
//! - [`SampleGenerator`]: a bounded iterator of shocks, optionally antithetic
//!
//! Worker `i` seeds its stream with `base_seed + i`, so a run is reproducible
//! for a fixed seed and worker count, and no two workers share a stream.
//!
//! ```rust
//! use pricer_distributed::rng::{SampleGenerator, VarianceReduction};
//!
//! let a: Vec<f64> = SampleGenerator::new(42, 100, VarianceReduction::None).collect();
//! let b: Vec<f64> = SampleGenerator::new(42, 100, VarianceReduction::None).collect();
//! assert_eq!(a, b);
//! ```

mod prng;
mod sampler;

pub use prng::WorkerRng;
pub use sampler::{SampleGenerator, VarianceReduction};

//! Simulation run configuration.

use crate::error::{EngineError, Result};
use crate::rng::VarianceReduction;

/// Base seed used when none is given.
pub const DEFAULT_SEED: u64 = 42;

/// Immutable configuration of a distributed simulation run.
///
/// Use [`SimulationConfigBuilder`] to construct instances.
///
/// # Examples
///
/// ```rust
/// use pricer_distributed::{SimulationConfig, VarianceReduction};
///
/// let config = SimulationConfig::builder()
///     .total_samples(1_000_000)
///     .worker_count(4)
///     .variance_reduction(VarianceReduction::Antithetic)
///     .build()
///     .expect("valid configuration");
///
/// assert_eq!(config.base_seed(), 42);
/// assert!(config.allow_idle_workers());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulationConfig {
    total_samples: u64,
    worker_count: usize,
    base_seed: u64,
    variance_reduction: VarianceReduction,
    /// Whether a run may leave workers with no samples.
    allow_idle_workers: bool,
}

impl SimulationConfig {
    /// Creates a new configuration builder.
    #[inline]
    pub fn builder() -> SimulationConfigBuilder {
        SimulationConfigBuilder::default()
    }

    /// Total number of samples across all workers.
    #[inline]
    pub fn total_samples(&self) -> u64 {
        self.total_samples
    }

    /// Number of parallel workers.
    #[inline]
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Seed from which every worker seed is derived.
    #[inline]
    pub fn base_seed(&self) -> u64 {
        self.base_seed
    }

    /// Variance reduction mode.
    #[inline]
    pub fn variance_reduction(&self) -> VarianceReduction {
        self.variance_reduction
    }

    /// Whether workers may receive zero samples.
    #[inline]
    pub fn allow_idle_workers(&self) -> bool {
        self.allow_idle_workers
    }

    /// Returns a copy with a different sample count.
    pub fn with_total_samples(&self, total_samples: u64) -> Self {
        Self {
            total_samples,
            ..self.clone()
        }
    }

    /// Returns a copy with a different base seed.
    pub fn with_base_seed(&self, base_seed: u64) -> Self {
        Self {
            base_seed,
            ..self.clone()
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if:
    /// - `total_samples` is 0
    /// - `worker_count` is 0
    /// - idle workers are disallowed and `worker_count > total_samples`
    pub fn validate(&self) -> Result<()> {
        if self.total_samples == 0 {
            return Err(EngineError::InvalidInput(
                "total_samples must be positive".to_string(),
            ));
        }
        if self.worker_count == 0 {
            return Err(EngineError::InvalidInput(
                "worker_count must be positive".to_string(),
            ));
        }
        if !self.allow_idle_workers && self.worker_count as u64 > self.total_samples {
            return Err(EngineError::InvalidInput(format!(
                "worker_count {} exceeds total_samples {} and idle workers are disallowed",
                self.worker_count, self.total_samples
            )));
        }
        Ok(())
    }
}

/// Builder for [`SimulationConfig`].
#[derive(Clone, Debug)]
pub struct SimulationConfigBuilder {
    total_samples: Option<u64>,
    worker_count: Option<usize>,
    base_seed: u64,
    variance_reduction: VarianceReduction,
    allow_idle_workers: bool,
}

impl Default for SimulationConfigBuilder {
    fn default() -> Self {
        Self {
            total_samples: None,
            worker_count: None,
            base_seed: DEFAULT_SEED,
            variance_reduction: VarianceReduction::None,
            allow_idle_workers: true,
        }
    }
}

impl SimulationConfigBuilder {
    /// Sets the total number of samples.
    #[inline]
    pub fn total_samples(mut self, total_samples: u64) -> Self {
        self.total_samples = Some(total_samples);
        self
    }

    /// Sets the number of workers.
    #[inline]
    pub fn worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = Some(worker_count);
        self
    }

    /// Sets the base seed.
    #[inline]
    pub fn base_seed(mut self, base_seed: u64) -> Self {
        self.base_seed = base_seed;
        self
    }

    /// Sets the variance reduction mode.
    #[inline]
    pub fn variance_reduction(mut self, mode: VarianceReduction) -> Self {
        self.variance_reduction = mode;
        self
    }

    /// Shorthand for antithetic (`true`) or plain (`false`) sampling.
    #[inline]
    pub fn antithetic(self, enabled: bool) -> Self {
        self.variance_reduction(if enabled {
            VarianceReduction::Antithetic
        } else {
            VarianceReduction::None
        })
    }

    /// Allows or forbids workers with no samples.
    #[inline]
    pub fn allow_idle_workers(mut self, allow: bool) -> Self {
        self.allow_idle_workers = allow;
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if `total_samples` or `worker_count` is unset or invalid.
    pub fn build(self) -> Result<SimulationConfig> {
        let total_samples = self.total_samples.ok_or_else(|| {
            EngineError::InvalidInput("total_samples must be specified".to_string())
        })?;
        let worker_count = self.worker_count.ok_or_else(|| {
            EngineError::InvalidInput("worker_count must be specified".to_string())
        })?;

        let config = SimulationConfig {
            total_samples,
            worker_count,
            base_seed: self.base_seed,
            variance_reduction: self.variance_reduction,
            allow_idle_workers: self.allow_idle_workers,
        };

        config.validate()?;
        Ok(config)
    }
}

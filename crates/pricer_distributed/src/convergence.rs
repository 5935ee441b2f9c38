//! Convergence analysis: error against sample count.
//!
//! [`ConvergenceAnalyzer::sweep`] runs an independent simulation per sample
//! count tier and records the absolute error against the analytical reference.
//! Monte Carlo error decays as `N^(-1/2)`, so [`fit_log_log_slope`] over a
//! sweep should return a slope close to `-0.5`.
//!
//! Each tier (and each replication inside a tier) is seeded from
//! `base_seed + ((tier · replications + replication) << 32)`. Worker seeds add
//! the worker index to that, so streams never collide across tiers for fewer
//! than 2³² workers, and the sweep can be replayed exactly.

use std::sync::Arc;

use pricer_core::analytical::black_scholes_call;
use pricer_core::types::OptionParameters;
use tracing::debug;

use crate::config::SimulationConfig;
use crate::engine::DistributedPricer;
use crate::error::{EngineError, Result};

/// Reference pricing function.
pub type ReferencePricer = fn(&OptionParameters) -> f64;

/// One tier of a convergence sweep.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConvergencePoint {
    /// Samples per simulation in this tier.
    pub sample_count: u64,
    /// Price estimate (mean over replications).
    pub price: f64,
    /// Standard error (mean over replications).
    pub standard_error: f64,
    /// |price − reference| (mean over replications).
    pub absolute_error: f64,
}

struct SweepContext {
    pricer: DistributedPricer,
    params: OptionParameters,
    replications: usize,
    reference_price: f64,
}

/// Drives repeated simulations at increasing sample counts.
///
/// # Examples
///
/// ```rust
/// use pricer_core::types::OptionParameters;
/// use pricer_distributed::{ConvergenceAnalyzer, SimulationConfig};
///
/// let params = OptionParameters::new(100.0, 100.0, 1.0, 0.05, 0.2).unwrap();
/// let config = SimulationConfig::builder()
///     .total_samples(1_000)
///     .worker_count(2)
///     .build()
///     .unwrap();
///
/// let analyzer = ConvergenceAnalyzer::new(params, config).unwrap();
/// let points: Vec<_> = analyzer
///     .sweep(&[1_000, 10_000])
///     .collect::<Result<_, _>>()
///     .unwrap();
///
/// assert_eq!(points.len(), 2);
/// assert_eq!(points[1].sample_count, 10_000);
/// ```
pub struct ConvergenceAnalyzer {
    pricer: DistributedPricer,
    params: OptionParameters,
    replications: usize,
    reference: ReferencePricer,
}

impl ConvergenceAnalyzer {
    /// Creates an analyzer pricing `params` with the workers, seed and variance
    /// reduction of `config`. The configured sample count is ignored; each
    /// tier supplies its own.
    ///
    /// # Errors
    ///
    /// Propagates [`DistributedPricer::new`] errors.
    pub fn new(params: OptionParameters, config: SimulationConfig) -> Result<Self> {
        Ok(Self {
            pricer: DistributedPricer::new(config)?,
            params,
            replications: 1,
            reference: black_scholes_call,
        })
    }

    /// Number of independent simulations averaged per tier (at least one).
    pub fn replications(mut self, replications: usize) -> Self {
        self.replications = replications.max(1);
        self
    }

    /// Replaces the Black-Scholes call reference.
    pub fn reference(mut self, reference: ReferencePricer) -> Self {
        self.reference = reference;
        self
    }

    /// Reference price the errors are measured against.
    pub fn reference_price(&self) -> f64 {
        (self.reference)(&self.params)
    }

    /// Returns a lazy sweep over `sample_counts`, visited in ascending order.
    ///
    /// Nothing runs until the sweep is iterated. The sweep is `Clone`: a clone
    /// replays the same tiers with the same seeds.
    pub fn sweep(self, sample_counts: &[u64]) -> ConvergenceSweep {
        let mut tiers = sample_counts.to_vec();
        tiers.sort_unstable();

        let reference_price = self.reference_price();
        ConvergenceSweep {
            context: Arc::new(SweepContext {
                pricer: self.pricer,
                params: self.params,
                replications: self.replications,
                reference_price,
            }),
            tiers: tiers.into(),
            next_tier: 0,
        }
    }
}

/// Lazy, finite, restartable sequence of convergence points.
#[derive(Clone)]
pub struct ConvergenceSweep {
    context: Arc<SweepContext>,
    tiers: Arc<[u64]>,
    next_tier: usize,
}

impl ConvergenceSweep {
    /// Reference price of the sweep.
    pub fn reference_price(&self) -> f64 {
        self.context.reference_price
    }

    /// Returns a fresh sweep starting from the first tier.
    pub fn restart(&self) -> Self {
        Self {
            next_tier: 0,
            ..self.clone()
        }
    }

    fn run_tier(&self, tier: usize, sample_count: u64) -> Result<ConvergencePoint> {
        let ctx = &self.context;
        if sample_count == 0 {
            return Err(EngineError::InvalidInput(
                "convergence tiers must have a positive sample count".to_string(),
            ));
        }

        let base_seed = ctx.pricer.config().base_seed();
        let mut price = 0.0;
        let mut standard_error = 0.0;
        let mut absolute_error = 0.0;
        for replication in 0..ctx.replications {
            let seed = tier_seed(base_seed, tier, replication, ctx.replications);
            let run = ctx.pricer.simulate(&ctx.params, sample_count, seed)?;
            price += run.estimate.price;
            standard_error += run.estimate.standard_error;
            absolute_error += (run.estimate.price - ctx.reference_price).abs();
        }

        let reps = ctx.replications as f64;
        let point = ConvergencePoint {
            sample_count,
            price: price / reps,
            standard_error: standard_error / reps,
            absolute_error: absolute_error / reps,
        };
        debug!(
            tier,
            sample_count,
            absolute_error = point.absolute_error,
            "convergence tier complete"
        );
        Ok(point)
    }
}

impl Iterator for ConvergenceSweep {
    type Item = Result<ConvergencePoint>;

    fn next(&mut self) -> Option<Self::Item> {
        let tier = self.next_tier;
        let sample_count = *self.tiers.get(tier)?;
        self.next_tier += 1;
        Some(self.run_tier(tier, sample_count))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.tiers.len().saturating_sub(self.next_tier);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ConvergenceSweep {}

impl std::fmt::Debug for ConvergenceSweep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConvergenceSweep")
            .field("tiers", &self.tiers)
            .field("next_tier", &self.next_tier)
            .field("replications", &self.context.replications)
            .finish()
    }
}

/// Seed of one replication of one tier.
pub fn tier_seed(base_seed: u64, tier: usize, replication: usize, replications: usize) -> u64 {
    let stream = (tier as u64)
        .wrapping_mul(replications as u64)
        .wrapping_add(replication as u64);
    base_seed.wrapping_add(stream << 32)
}

/// Least-squares slope of `ln(absolute_error)` against `ln(sample_count)`.
///
/// Points with a zero error are skipped. Returns `None` with fewer than two
/// usable points or a single distinct sample count.
pub fn fit_log_log_slope(points: &[ConvergencePoint]) -> Option<f64> {
    ols_slope(
        points
            .iter()
            .map(|p| (p.sample_count as f64, p.absolute_error)),
    )
}

/// Least-squares slope of `ln(standard_error)` against `ln(sample_count)`.
pub fn fit_standard_error_slope(points: &[ConvergencePoint]) -> Option<f64> {
    ols_slope(
        points
            .iter()
            .map(|p| (p.sample_count as f64, p.standard_error)),
    )
}

fn ols_slope(pairs: impl Iterator<Item = (f64, f64)>) -> Option<f64> {
    let logs: Vec<(f64, f64)> = pairs
        .filter(|&(x, y)| x > 0.0 && y > 0.0 && y.is_finite())
        .map(|(x, y)| (x.ln(), y.ln()))
        .collect();
    if logs.len() < 2 {
        return None;
    }

    let n = logs.len() as f64;
    let mean_x = logs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = logs.iter().map(|(_, y)| y).sum::<f64>() / n;
    let sxx: f64 = logs.iter().map(|(x, _)| (x - mean_x).powi(2)).sum();
    let sxy: f64 = logs
        .iter()
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum();

    if sxx <= f64::EPSILON {
        return None;
    }
    Some(sxy / sxx)
}

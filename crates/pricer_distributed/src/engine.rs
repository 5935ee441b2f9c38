//! Distributed simulation engine.
//!
//! A run is single-program-multiple-data: every worker executes the same
//! pipeline on its own share, and the workers meet once, in the collective
//! reduction.
//!
//! ```text
//! partition ─┬─ worker 0: SampleGenerator → LocalAccumulator ─┐
//!            ├─ worker 1: SampleGenerator → LocalAccumulator ─┤ reduce → estimate
//!            └─ worker P-1: ...                               ─┘  (rank 0 only)
//! ```
//!
//! Workers run on a dedicated rayon pool with exactly one thread per worker,
//! so the coordinator can block in the reduction while every other worker
//! still has a thread to run on.

use std::sync::mpsc;
use std::time::{Duration, Instant};

use pricer_core::types::OptionParameters;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, error, info, warn};

use crate::accumulator::accumulate_on_rank;
use crate::collective::{ChannelCommunicator, Collective};
use crate::config::SimulationConfig;
use crate::error::{EngineError, Result};
use crate::estimate::{GlobalStatistics, PriceEstimate};
use crate::model::OptionModel;
use crate::partition::{worker_shares, WorkerShare};
use crate::rng::{SampleGenerator, VarianceReduction};

/// Outcome of one simulation run, as seen by the coordinator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationRun {
    /// Price, standard error and sample count.
    pub estimate: PriceEstimate,
    /// Wall-clock time from worker launch to reduced estimate.
    pub elapsed: Duration,
    /// Number of workers that took part.
    pub worker_count: usize,
    /// Base seed of the run.
    pub base_seed: u64,
    /// Variance reduction mode of the run.
    pub variance_reduction: VarianceReduction,
}

impl SimulationRun {
    /// Elapsed wall-clock time in seconds.
    #[inline]
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// Samples per second over the whole run; zero if no time was measured.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed_secs();
        if secs > 0.0 {
            self.estimate.sample_count as f64 / secs
        } else {
            0.0
        }
    }

    /// Samples per second per worker.
    pub fn throughput_per_worker(&self) -> f64 {
        self.throughput() / self.worker_count.max(1) as f64
    }
}

/// Prices European calls by distributed Monte Carlo simulation.
///
/// # Examples
///
/// ```rust
/// use pricer_core::types::OptionParameters;
/// use pricer_distributed::{DistributedPricer, SimulationConfig};
///
/// let config = SimulationConfig::builder()
///     .total_samples(100_000)
///     .worker_count(4)
///     .build()
///     .unwrap();
/// let pricer = DistributedPricer::new(config).unwrap();
///
/// let params = OptionParameters::new(100.0, 100.0, 1.0, 0.05, 0.2).unwrap();
/// let run = pricer.price(&params).unwrap();
///
/// assert_eq!(run.estimate.sample_count, 100_000);
/// assert!((run.estimate.price - 10.4506).abs() < 5.0 * run.estimate.standard_error);
/// ```
pub struct DistributedPricer {
    config: SimulationConfig,
    pool: ThreadPool,
}

impl DistributedPricer {
    /// Validates `config` and starts a pool of `worker_count` threads.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if the configuration is invalid.
    /// - `WorkerPool` if the threads cannot be spawned.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;

        let pool = ThreadPoolBuilder::new()
            .num_threads(config.worker_count())
            .thread_name(|index| format!("mc-worker-{}", index))
            .build()
            .map_err(|e| EngineError::WorkerPool(e.to_string()))?;

        Ok(Self { config, pool })
    }

    /// Configuration of this pricer.
    #[inline]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Runs one simulation with the configured sample count and seed.
    pub fn price(&self, params: &OptionParameters) -> Result<SimulationRun> {
        self.simulate(params, self.config.total_samples(), self.config.base_seed())
    }

    /// Runs one simulation of `total_samples` draws seeded from `base_seed`.
    ///
    /// Worker count, variance reduction and idle-worker policy come from the
    /// pricer's configuration.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for a zero sample count or a forbidden idle worker.
    /// - `NumericalFailure` if any worker produced a non-finite payoff.
    /// - `PartialParticipation` / `CoordinatorUnavailable` if a worker did not
    ///   take part in the reduction.
    pub fn simulate(
        &self,
        params: &OptionParameters,
        total_samples: u64,
        base_seed: u64,
    ) -> Result<SimulationRun> {
        let run_config = self
            .config
            .with_total_samples(total_samples)
            .with_base_seed(base_seed);
        run_config.validate()?;

        let worker_count = run_config.worker_count();
        let mode = run_config.variance_reduction();

        let shares = worker_shares(total_samples, worker_count, base_seed)?;
        let idle = shares.iter().filter(|s| s.sample_count == 0).count();
        if idle > 0 {
            warn!(idle, worker_count, total_samples, "some workers have no samples");
        }

        info!(
            total_samples,
            worker_count,
            base_seed,
            mode = %mode,
            "starting simulation"
        );

        let endpoints = ChannelCommunicator::group(worker_count)?;
        let (outcome_tx, outcome_rx) = mpsc::channel();
        let params = *params;

        let start = Instant::now();
        self.pool.scope(|scope| {
            for (share, comm) in shares.into_iter().zip(endpoints) {
                let outcome_tx = outcome_tx.clone();
                scope.spawn(move |_| {
                    let outcome = run_worker(&params, share, mode, comm);
                    // The receiver outlives the scope.
                    let _ = outcome_tx.send((share.worker_index, outcome));
                });
            }
        });
        drop(outcome_tx);
        let elapsed = start.elapsed();

        let mut global: Option<GlobalStatistics> = None;
        let mut failures: Vec<(usize, EngineError)> = Vec::new();
        for (rank, outcome) in outcome_rx {
            match outcome {
                Ok(Some(stats)) => global = Some(stats),
                Ok(None) => {}
                Err(err) => failures.push((rank, err)),
            }
        }

        if let Some(err) = root_cause(failures) {
            error!(error = %err, "simulation failed");
            return Err(err);
        }

        let global = global.ok_or_else(|| {
            EngineError::InvalidState("coordinator returned no statistics".to_string())
        })?;
        let estimate = global.estimate(OptionModel::new(&params).discount_factor())?;

        info!(
            price = estimate.price,
            standard_error = estimate.standard_error,
            samples = estimate.sample_count,
            elapsed_ms = elapsed.as_millis() as u64,
            "simulation complete"
        );

        Ok(SimulationRun {
            estimate,
            elapsed,
            worker_count,
            base_seed,
            variance_reduction: mode,
        })
    }
}

impl std::fmt::Debug for DistributedPricer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistributedPricer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// One worker's local pass followed by its part in the reduction.
///
/// A failed local pass drops the endpoint without contributing, which the
/// coordinator observes as missing participation.
fn run_worker<C: Collective>(
    params: &OptionParameters,
    share: WorkerShare,
    mode: VarianceReduction,
    comm: C,
) -> Result<Option<GlobalStatistics>> {
    debug!(
        rank = share.worker_index,
        samples = share.sample_count,
        seed = share.seed,
        "worker started"
    );

    let draws = SampleGenerator::new(share.seed, share.sample_count, mode);
    let local = match accumulate_on_rank(params, draws, mode, share.worker_index) {
        Ok(local) => local,
        Err(err) => {
            error!(rank = share.worker_index, error = %err, "worker failed");
            drop(comm);
            return Err(err);
        }
    };

    debug!(rank = share.worker_index, count = local.count, "worker reducing");
    comm.reduce(local)
}

/// Picks the error to report when one or more ranks failed.
///
/// Participation failures are consequences of another rank failing, so a
/// local failure is preferred; ties go to the lowest rank.
fn root_cause(mut failures: Vec<(usize, EngineError)>) -> Option<EngineError> {
    failures.sort_by_key(|(rank, _)| *rank);
    let position = failures
        .iter()
        .position(|(_, err)| !err.is_participation_failure())
        .unwrap_or(0);
    if failures.is_empty() {
        None
    } else {
        Some(failures.swap_remove(position).1)
    }
}

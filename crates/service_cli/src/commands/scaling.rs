//! Scaling command implementation
//!
//! Strong scaling keeps the total sample count fixed while workers grow.
//! Weak scaling keeps the per-worker sample count fixed.

use std::io::Write;

use clap::ValueEnum;
use pricer_core::types::OptionParameters;
use pricer_distributed::DistributedPricer;
use tracing::info;

use crate::config::PricerConfig;
use crate::output::{append_csv, emit, OutputFormat, ScalingRow};
use crate::{CliError, Result};

/// Scaling experiment kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScalingKind {
    /// Fixed total samples
    Strong,
    /// Fixed samples per worker
    Weak,
}

impl ScalingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalingKind::Strong => "strong",
            ScalingKind::Weak => "weak",
        }
    }

    /// Total samples for `workers` workers given the command's sample argument
    pub fn total_samples(&self, samples: u64, workers: usize) -> u64 {
        match self {
            ScalingKind::Strong => samples,
            ScalingKind::Weak => samples.saturating_mul(workers as u64),
        }
    }

    /// Speedup and efficiency relative to the baseline run
    ///
    /// Strong: speedup = t_base / t, efficiency = speedup / (w / w_base).
    /// Weak: efficiency = t_base / t, speedup is the scaled speedup
    /// efficiency * w / w_base.
    pub fn metrics(
        &self,
        base_workers: usize,
        base_elapsed: f64,
        workers: usize,
        elapsed: f64,
    ) -> (f64, f64) {
        if elapsed <= 0.0 || base_elapsed <= 0.0 {
            return (0.0, 0.0);
        }
        let ratio = workers as f64 / base_workers as f64;
        match self {
            ScalingKind::Strong => {
                let speedup = base_elapsed / elapsed;
                (speedup, speedup / ratio)
            }
            ScalingKind::Weak => {
                let efficiency = base_elapsed / elapsed;
                (efficiency * ratio, efficiency)
            }
        }
    }
}

/// Runs one simulation per worker count; the first count is the baseline
pub fn execute(
    config: &PricerConfig,
    params: &OptionParameters,
    kind: ScalingKind,
    samples: u64,
    worker_counts: &[usize],
) -> Result<Vec<ScalingRow>> {
    let Some(&base_workers) = worker_counts.first() else {
        return Err(CliError::InvalidArgument(
            "at least one worker count is required".to_string(),
        ));
    };
    if let Some(&zero) = worker_counts.iter().find(|&&w| w == 0) {
        return Err(CliError::InvalidArgument(format!(
            "worker counts must be positive, got {}",
            zero
        )));
    }

    let mut rows = Vec::with_capacity(worker_counts.len());
    let mut base_elapsed = 0.0;

    for (i, &workers) in worker_counts.iter().enumerate() {
        let total = kind.total_samples(samples, workers);
        let pricer = DistributedPricer::new(config.simulation(total, workers)?)?;
        let run = pricer.price(params)?;
        let elapsed = run.elapsed_secs();
        if i == 0 {
            base_elapsed = elapsed;
        }
        let (speedup, efficiency) = kind.metrics(base_workers, base_elapsed, workers, elapsed);

        info!(
            experiment = kind.as_str(),
            workers,
            samples = total,
            elapsed,
            speedup,
            efficiency,
            "scaling point complete"
        );

        rows.push(ScalingRow {
            experiment: kind.as_str(),
            method: run.variance_reduction.as_str(),
            n_workers: workers,
            n_samples: run.estimate.sample_count,
            mc_price: run.estimate.price,
            mc_stderr: run.estimate.standard_error,
            elapsed_sec: elapsed,
            throughput: run.throughput(),
            speedup,
            efficiency,
            seed: run.base_seed,
        });
    }
    Ok(rows)
}

/// Run the scaling command
pub fn run(
    config: &PricerConfig,
    params: &OptionParameters,
    kind: ScalingKind,
    samples: u64,
    worker_counts: &[usize],
    format: OutputFormat,
) -> Result<()> {
    info!(
        experiment = kind.as_str(),
        samples,
        points = worker_counts.len(),
        "Starting scaling experiment..."
    );

    let rows = execute(config, params, kind, samples, worker_counts)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    emit(&mut out, format, &rows, print_table)?;

    if let Some(path) = &config.results_file {
        append_csv(path, &rows)?;
        info!(path = %path.display(), "Results appended");
    }
    Ok(())
}

fn print_table<W: Write>(out: &mut W, rows: &[ScalingRow]) -> std::io::Result<()> {
    writeln!(
        out,
        "{:>8} {:>12} {:>12} {:>10} {:>14} {:>8} {:>10}",
        "workers", "samples", "price", "time (s)", "samples/s", "speedup", "efficiency"
    )?;
    for row in rows {
        writeln!(
            out,
            "{:>8} {:>12} {:>12.6} {:>10.3} {:>14.0} {:>8.2} {:>10.2}",
            row.n_workers,
            row.n_samples,
            row.mc_price,
            row.elapsed_sec,
            row.throughput,
            row.speedup,
            row.efficiency
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn atm() -> OptionParameters {
        OptionParameters::new(100.0, 100.0, 1.0, 0.05, 0.2).unwrap()
    }

    #[test]
    fn test_strong_metrics() {
        let (speedup, efficiency) = ScalingKind::Strong.metrics(1, 8.0, 4, 2.5);
        assert_relative_eq!(speedup, 3.2, epsilon = 1e-12);
        assert_relative_eq!(efficiency, 0.8, epsilon = 1e-12);
    }

    #[test]
    fn test_weak_metrics() {
        let (speedup, efficiency) = ScalingKind::Weak.metrics(2, 1.0, 8, 1.25);
        assert_relative_eq!(efficiency, 0.8, epsilon = 1e-12);
        assert_relative_eq!(speedup, 3.2, epsilon = 1e-12);
    }

    #[test]
    fn test_baseline_is_unity() {
        for kind in [ScalingKind::Strong, ScalingKind::Weak] {
            let (speedup, efficiency) = kind.metrics(2, 1.5, 2, 1.5);
            assert_relative_eq!(speedup, 1.0, epsilon = 1e-12);
            assert_relative_eq!(efficiency, 1.0, epsilon = 1e-12);
        }
        assert_eq!(ScalingKind::Strong.metrics(1, 1.0, 2, 0.0), (0.0, 0.0));
    }

    #[test]
    fn test_total_samples() {
        assert_eq!(ScalingKind::Strong.total_samples(1_000, 4), 1_000);
        assert_eq!(ScalingKind::Weak.total_samples(1_000, 4), 4_000);
    }

    #[test]
    fn test_weak_experiment_rows() {
        let config = PricerConfig::default();
        let rows = execute(&config, &atm(), ScalingKind::Weak, 5_000, &[1, 2, 4]).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].n_samples, 5_000);
        assert_eq!(rows[2].n_samples, 20_000);
        assert_eq!(rows[2].n_workers, 4);
        assert!(rows.iter().all(|r| r.experiment == "weak"));
        assert_relative_eq!(rows[0].speedup, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_worker_lists() {
        let config = PricerConfig::default();
        assert!(matches!(
            execute(&config, &atm(), ScalingKind::Strong, 1_000, &[]),
            Err(CliError::InvalidArgument(_))
        ));
        assert!(matches!(
            execute(&config, &atm(), ScalingKind::Strong, 1_000, &[1, 0]),
            Err(CliError::InvalidArgument(_))
        ));
    }
}

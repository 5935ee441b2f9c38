//! Convergence command implementation
//!
//! Sweeps sample counts and fits the log-log error slope.

use std::io::Write;

use pricer_core::types::OptionParameters;
use pricer_distributed::{
    fit_log_log_slope, fit_standard_error_slope, ConvergenceAnalyzer, ConvergencePoint,
};
use tracing::{info, warn};

use crate::config::PricerConfig;
use crate::output::{append_csv, emit, ConvergenceRow, OutputFormat};
use crate::{CliError, Result};

/// Result of a sweep
#[derive(Debug, Clone)]
pub struct ConvergenceReport {
    pub rows: Vec<ConvergenceRow>,
    /// Fitted slope of log(absolute error) against log(N)
    pub error_slope: Option<f64>,
    /// Fitted slope of log(standard error) against log(N)
    pub standard_error_slope: Option<f64>,
}

/// Runs the sweep over `tiers` with `replications` simulations per tier
pub fn execute(
    config: &PricerConfig,
    params: &OptionParameters,
    tiers: &[u64],
    replications: usize,
) -> Result<ConvergenceReport> {
    if tiers.is_empty() {
        return Err(CliError::InvalidArgument(
            "at least one sample tier is required".to_string(),
        ));
    }
    let largest = tiers.iter().copied().max().unwrap_or(1).max(1);
    let simulation = config.simulation(largest, config.workers)?;
    let method = simulation.variance_reduction().as_str();

    let analyzer = ConvergenceAnalyzer::new(*params, simulation)?.replications(replications);
    let sweep = analyzer.sweep(tiers);
    let reference = sweep.reference_price();

    let points = sweep
        .inspect(|point| {
            if let Ok(p) = point {
                info!(
                    samples = p.sample_count,
                    price = p.price,
                    abs_error = p.absolute_error,
                    "tier complete"
                );
            }
        })
        .collect::<std::result::Result<Vec<ConvergencePoint>, _>>()?;

    let rows = points
        .iter()
        .map(|p| {
            ConvergenceRow::from_point(
                p,
                method,
                config.workers,
                replications.max(1),
                reference,
                config.seed,
            )
        })
        .collect();

    Ok(ConvergenceReport {
        rows,
        error_slope: fit_log_log_slope(&points),
        standard_error_slope: fit_standard_error_slope(&points),
    })
}

/// Run the convergence command
pub fn run(
    config: &PricerConfig,
    params: &OptionParameters,
    tiers: &[u64],
    replications: usize,
    format: OutputFormat,
) -> Result<()> {
    info!(
        tiers = tiers.len(),
        replications,
        workers = config.workers,
        "Starting convergence sweep..."
    );

    let report = execute(config, params, tiers, replications)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    emit(&mut out, format, &report.rows, print_table)?;

    match report.error_slope {
        Some(slope) => {
            info!(slope, "log-log error slope (expected about -0.5)");
            if format == OutputFormat::Table {
                writeln!(out, "error slope          {:.4} (expected -0.5)", slope)?;
            }
        }
        None => warn!("fewer than two tiers; no slope fitted"),
    }
    if let (Some(slope), OutputFormat::Table) = (report.standard_error_slope, format) {
        writeln!(out, "standard error slope {:.4}", slope)?;
    }

    if let Some(path) = &config.results_file {
        append_csv(path, &report.rows)?;
        info!(path = %path.display(), "Results appended");
    }
    Ok(())
}

fn print_table<W: Write>(out: &mut W, rows: &[ConvergenceRow]) -> std::io::Result<()> {
    writeln!(
        out,
        "{:>12} {:>12} {:>12} {:>12}",
        "samples", "price", "std error", "abs error"
    )?;
    for row in rows {
        writeln!(
            out,
            "{:>12} {:>12.6} {:>12.6} {:>12.6}",
            row.n_samples, row.mc_price, row.mc_stderr, row.abs_error
        )?;
    }
    if let Some(first) = rows.first() {
        writeln!(out, "Black-Scholes reference {:.6}", first.bs_price)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PricerConfig {
        PricerConfig {
            workers: 2,
            ..PricerConfig::default()
        }
    }

    fn atm() -> OptionParameters {
        OptionParameters::new(100.0, 100.0, 1.0, 0.05, 0.2).unwrap()
    }

    #[test]
    fn test_sweep_rows_are_sorted() {
        let report = execute(&config(), &atm(), &[40_000, 4_000, 400_000], 1).unwrap();
        let counts: Vec<u64> = report.rows.iter().map(|r| r.n_samples).collect();
        assert_eq!(counts, vec![4_000, 40_000, 400_000]);

        let slope = report.standard_error_slope.unwrap();
        assert!((slope + 0.5).abs() < 0.1, "slope {}", slope);
        assert!(report.error_slope.is_some());
    }

    #[test]
    fn test_single_tier_has_no_slope() {
        let report = execute(&config(), &atm(), &[1_000], 2).unwrap();
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].replications, 2);
        assert!(report.error_slope.is_none());
    }

    #[test]
    fn test_empty_tiers_rejected() {
        assert!(matches!(
            execute(&config(), &atm(), &[], 1),
            Err(CliError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_zero_tier_is_an_error() {
        assert!(matches!(
            execute(&config(), &atm(), &[0, 1_000], 1),
            Err(CliError::Engine(_))
        ));
    }
}

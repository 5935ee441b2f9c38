//! Price command implementation
//!
//! Prices one European call and compares it with Black-Scholes.

use std::io::Write;

use pricer_core::analytical::black_scholes_call;
use pricer_core::types::OptionParameters;
use pricer_distributed::DistributedPricer;
use tracing::{info, warn};

use crate::config::PricerConfig;
use crate::output::{append_csv, emit, OutputFormat, PriceRow};
use crate::{CliError, Result};

/// Relative error (percent) below which a validated run passes
pub const VALIDATION_THRESHOLD_PCT: f64 = 1.0;

/// Prices `params` with `samples` draws and returns the result row
pub fn execute(
    config: &PricerConfig,
    params: &OptionParameters,
    samples: u64,
) -> Result<PriceRow> {
    let pricer = DistributedPricer::new(config.simulation(samples, config.workers)?)?;
    let run = pricer.price(params)?;
    Ok(PriceRow::from_run(params, &run, black_scholes_call(params)))
}

/// Checks a row against the analytical price
pub fn check(row: &PriceRow) -> Result<()> {
    info!(
        bs_price = row.bs_price,
        abs_error = row.abs_error,
        rel_error_pct = row.rel_error_pct,
        within_ci95 = row.within_ci95,
        "validation against Black-Scholes"
    );
    if !row.within_ci95 {
        warn!("reference price lies outside the 95% confidence interval");
    }
    if row.rel_error_pct >= VALIDATION_THRESHOLD_PCT {
        return Err(CliError::ValidationFailed {
            rel_error_pct: row.rel_error_pct,
            threshold_pct: VALIDATION_THRESHOLD_PCT,
        });
    }
    Ok(())
}

/// Run the price command
pub fn run(
    config: &PricerConfig,
    params: &OptionParameters,
    samples: u64,
    validate: bool,
    format: OutputFormat,
) -> Result<()> {
    info!(samples, workers = config.workers, "Starting pricing...");

    let row = execute(config, params, samples)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    emit(&mut out, format, std::slice::from_ref(&row), print_table)?;

    if let Some(path) = &config.results_file {
        append_csv(path, std::slice::from_ref(&row))?;
        info!(path = %path.display(), "Results appended");
    }

    if validate {
        check(&row)?;
        info!("Validation passed");
    }
    Ok(())
}

fn print_table<W: Write>(out: &mut W, rows: &[PriceRow]) -> std::io::Result<()> {
    for row in rows {
        writeln!(out, "Monte Carlo European call ({})", row.method)?;
        writeln!(
            out,
            "  S0={} K={} T={} r={} sigma={}",
            row.spot, row.strike, row.maturity, row.r, row.sigma
        )?;
        writeln!(
            out,
            "  samples      {} ({} workers, seed {})",
            row.n_samples, row.n_workers, row.seed
        )?;
        writeln!(out, "  price        {:.6}", row.mc_price)?;
        writeln!(out, "  std error    {:.6}", row.mc_stderr)?;
        writeln!(
            out,
            "  95% CI       [{:.6}, {:.6}]",
            row.mc_price - row.ci95_half_width,
            row.mc_price + row.ci95_half_width
        )?;
        writeln!(
            out,
            "  99% CI       [{:.6}, {:.6}]",
            row.mc_price - row.ci99_half_width,
            row.mc_price + row.ci99_half_width
        )?;
        writeln!(out, "  Black-Scholes {:.6}", row.bs_price)?;
        writeln!(
            out,
            "  error        {:.6} ({:.4}%)",
            row.abs_error, row.rel_error_pct
        )?;
        writeln!(
            out,
            "  elapsed      {:.3}s ({:.0} samples/s)",
            row.elapsed_sec, row.throughput
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricer_distributed::VarianceReduction;

    fn config(workers: usize) -> PricerConfig {
        PricerConfig {
            workers,
            ..PricerConfig::default()
        }
    }

    fn atm() -> OptionParameters {
        OptionParameters::new(100.0, 100.0, 1.0, 0.05, 0.2).unwrap()
    }

    #[test]
    fn test_execute_and_validate() {
        let row = execute(&config(4), &atm(), 400_000).unwrap();
        assert_eq!(row.n_samples, 400_000);
        assert_eq!(row.n_workers, 4);
        assert_eq!(row.method, "standard");
        assert!(check(&row).is_ok());
    }

    #[test]
    fn test_antithetic_method_label() {
        let cfg = PricerConfig {
            variance_reduction: VarianceReduction::Antithetic,
            ..config(2)
        };
        let row = execute(&cfg, &atm(), 10_000).unwrap();
        assert_eq!(row.method, "antithetic");
    }

    #[test]
    fn test_zero_samples_is_an_error() {
        assert!(matches!(
            execute(&config(2), &atm(), 0),
            Err(CliError::Engine(_))
        ));
    }

    #[test]
    fn test_validation_failure() {
        let mut row = execute(&config(1), &atm(), 1_000).unwrap();
        row.rel_error_pct = 5.0;
        assert!(matches!(check(&row), Err(CliError::ValidationFailed { .. })));
    }

    #[test]
    fn test_table_output() {
        let row = execute(&config(1), &atm(), 1_000).unwrap();
        let mut buffer = Vec::new();
        print_table(&mut buffer, &[row]).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("price"));
        assert!(text.contains("95% CI"));
        assert!(text.contains("99% CI"));
        assert!(text.contains("Black-Scholes"));
    }
}

//! Result rows and their table, JSON and CSV renderings

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use clap::ValueEnum;
use pricer_core::types::OptionParameters;
use pricer_distributed::{ConvergencePoint, SimulationRun};
use serde::Serialize;

use crate::Result;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Pretty-printed JSON array
    Json,
    /// CSV with a header row
    Csv,
}

/// One priced run, compared with the analytical reference
#[derive(Debug, Clone, Serialize)]
pub struct PriceRow {
    pub method: &'static str,
    pub n_workers: usize,
    pub n_samples: u64,
    pub samples_per_worker: u64,
    #[serde(rename = "S0")]
    pub spot: f64,
    #[serde(rename = "K")]
    pub strike: f64,
    #[serde(rename = "T")]
    pub maturity: f64,
    pub r: f64,
    pub sigma: f64,
    pub mc_price: f64,
    pub mc_stderr: f64,
    pub bs_price: f64,
    pub abs_error: f64,
    pub rel_error_pct: f64,
    pub within_ci95: bool,
    pub ci95_half_width: f64,
    pub ci99_half_width: f64,
    pub elapsed_sec: f64,
    pub throughput: f64,
    pub throughput_per_worker: f64,
    pub seed: u64,
}

impl PriceRow {
    /// Builds a row from a finished run
    pub fn from_run(params: &OptionParameters, run: &SimulationRun, reference: f64) -> Self {
        let est = run.estimate;
        let abs_error = (est.price - reference).abs();
        Self {
            method: run.variance_reduction.as_str(),
            n_workers: run.worker_count,
            n_samples: est.sample_count,
            samples_per_worker: est.sample_count / run.worker_count.max(1) as u64,
            spot: params.spot(),
            strike: params.strike(),
            maturity: params.maturity(),
            r: params.rate(),
            sigma: params.volatility(),
            mc_price: est.price,
            mc_stderr: est.standard_error,
            bs_price: reference,
            abs_error,
            rel_error_pct: relative_error_pct(abs_error, reference),
            within_ci95: est.contains_95(reference),
            ci95_half_width: est.confidence_95(),
            ci99_half_width: est.confidence_99(),
            elapsed_sec: run.elapsed_secs(),
            throughput: run.throughput(),
            throughput_per_worker: run.throughput_per_worker(),
            seed: run.base_seed,
        }
    }
}

/// One tier of a convergence sweep
#[derive(Debug, Clone, Serialize)]
pub struct ConvergenceRow {
    pub method: &'static str,
    pub n_workers: usize,
    pub n_samples: u64,
    pub replications: usize,
    pub mc_price: f64,
    pub mc_stderr: f64,
    pub bs_price: f64,
    pub abs_error: f64,
    pub seed: u64,
}

impl ConvergenceRow {
    /// Builds a row from a sweep point
    pub fn from_point(
        point: &ConvergencePoint,
        method: &'static str,
        n_workers: usize,
        replications: usize,
        reference: f64,
        seed: u64,
    ) -> Self {
        Self {
            method,
            n_workers,
            n_samples: point.sample_count,
            replications,
            mc_price: point.price,
            mc_stderr: point.standard_error,
            bs_price: reference,
            abs_error: point.absolute_error,
            seed,
        }
    }
}

/// One worker count of a scaling experiment
#[derive(Debug, Clone, Serialize)]
pub struct ScalingRow {
    pub experiment: &'static str,
    pub method: &'static str,
    pub n_workers: usize,
    pub n_samples: u64,
    pub mc_price: f64,
    pub mc_stderr: f64,
    pub elapsed_sec: f64,
    pub throughput: f64,
    pub speedup: f64,
    pub efficiency: f64,
    pub seed: u64,
}

/// Relative error in percent; zero reference gives zero
pub fn relative_error_pct(abs_error: f64, reference: f64) -> f64 {
    if reference != 0.0 {
        100.0 * abs_error / reference.abs()
    } else {
        0.0
    }
}

/// Appends rows to a CSV file, writing the header only when the file is new or empty
pub fn append_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let needs_header = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_header)
        .from_writer(file);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes rows as CSV with a header
pub fn write_csv<T: Serialize, W: Write>(out: W, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes rows as a pretty-printed JSON array
pub fn write_json<T: Serialize, W: Write>(mut out: W, rows: &[T]) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, rows)?;
    writeln!(out)?;
    Ok(())
}

/// Renders rows in the requested format, using `table` for the table form
pub fn emit<T, W, F>(out: &mut W, format: OutputFormat, rows: &[T], table: F) -> Result<()>
where
    T: Serialize,
    W: Write,
    F: FnOnce(&mut W, &[T]) -> std::io::Result<()>,
{
    match format {
        OutputFormat::Table => table(out, rows)?,
        OutputFormat::Json => write_json(&mut *out, rows)?,
        OutputFormat::Csv => write_csv(&mut *out, rows)?,
    }
    Ok(())
}

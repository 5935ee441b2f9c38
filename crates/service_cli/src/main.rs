//! mcprice - Distributed Monte Carlo pricing of European calls
//!
//! Operational entry point for the distributed pricer.
//!
//! # Commands
//!
//! - `mcprice price` - Price one option and compare with Black-Scholes
//! - `mcprice convergence` - Sweep sample counts and fit the error slope
//! - `mcprice scaling strong|weak` - Measure speedup over worker counts
//!
//! # Configuration
//!
//! Global flags override `PRICER_*` environment variables, which override
//! the TOML file given with `--config`. Logs go to stderr and honour
//! `RUST_LOG` when it is set.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;
mod error;
mod output;

use commands::scaling::ScalingKind;
use commands::OptionArgs;
use config::{build_config, CliArgs, LogLevel};
use output::OutputFormat;

pub use error::{CliError, Result};

/// Distributed Monte Carlo European call pricer
#[derive(Parser)]
#[command(name = "mcprice")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Number of parallel workers
    #[arg(short, long, global = true)]
    workers: Option<usize>,

    /// Base random seed; worker i uses seed + i
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Use antithetic variates
    #[arg(long, global = true)]
    antithetic: bool,

    /// Reject runs that would leave a worker without samples
    #[arg(long, global = true)]
    no_idle_workers: bool,

    /// Append result rows to this CSV file
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Price a European call and compare with Black-Scholes
    Price {
        /// Total number of samples
        #[arg(short = 'n', long, default_value_t = 1_000_000)]
        samples: u64,

        /// Fail unless the relative error is below 1%
        #[arg(long)]
        validate: bool,

        #[command(flatten)]
        option: OptionArgs,
    },

    /// Sweep sample counts and fit the log-log error slope
    Convergence {
        /// Comma-separated sample counts
        #[arg(
            short,
            long,
            value_delimiter = ',',
            default_values_t = [10_000u64, 100_000, 1_000_000, 10_000_000]
        )]
        tiers: Vec<u64>,

        /// Independent simulations averaged per tier
        #[arg(short, long, default_value_t = 1)]
        replications: usize,

        #[command(flatten)]
        option: OptionArgs,
    },

    /// Measure strong or weak scaling over worker counts
    Scaling {
        /// Experiment kind
        #[arg(value_enum)]
        kind: ScalingKind,

        /// Total samples (strong) or samples per worker (weak)
        #[arg(short = 'n', long, default_value_t = 10_000_000)]
        samples: u64,

        /// Comma-separated worker counts; the first is the baseline
        #[arg(long, value_delimiter = ',', default_values_t = [1usize, 2, 4, 8])]
        worker_counts: Vec<usize>,

        #[command(flatten)]
        option: OptionArgs,
    },
}

impl Cli {
    fn config_args(&self) -> CliArgs {
        CliArgs {
            config_file: self.config.clone(),
            log_level: self.log_level.clone(),
            workers: self.workers,
            seed: self.seed,
            antithetic: self.antithetic,
            no_idle_workers: self.no_idle_workers,
            results_file: self.output.clone(),
        }
    }
}

fn init_tracing(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_filter_str()));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = build_config(&cli.config_args())?;

    init_tracing(config.log_level);
    debug!(?config, "Configuration loaded");

    match cli.command {
        Commands::Price {
            samples,
            validate,
            option,
        } => commands::price::run(
            &config,
            &option.to_params()?,
            samples,
            validate,
            cli.format,
        ),
        Commands::Convergence {
            tiers,
            replications,
            option,
        } => commands::convergence::run(
            &config,
            &option.to_params()?,
            &tiers,
            replications,
            cli.format,
        ),
        Commands::Scaling {
            kind,
            samples,
            worker_counts,
            option,
        } => commands::scaling::run(
            &config,
            &option.to_params()?,
            kind,
            samples,
            &worker_counts,
            cli.format,
        ),
    }
}

//! CLI command implementations
//!
//! Each submodule implements a specific CLI command.

pub mod convergence;
pub mod price;
pub mod scaling;

use clap::Args;
use pricer_core::types::{OptionParameters, PricingError};

/// European call parameters shared by every command
#[derive(Debug, Clone, Copy, Args)]
pub struct OptionArgs {
    /// Initial underlying price S0
    #[arg(long, default_value_t = 100.0)]
    pub spot: f64,

    /// Strike price K
    #[arg(long, default_value_t = 100.0)]
    pub strike: f64,

    /// Time to maturity T in years
    #[arg(long, default_value_t = 1.0)]
    pub maturity: f64,

    /// Continuously compounded risk-free rate r
    #[arg(long, default_value_t = 0.05, allow_hyphen_values = true)]
    pub rate: f64,

    /// Volatility sigma
    #[arg(long, default_value_t = 0.2)]
    pub volatility: f64,
}

impl OptionArgs {
    /// Validates the arguments into option parameters
    pub fn to_params(&self) -> Result<OptionParameters, PricingError> {
        OptionParameters::new(
            self.spot,
            self.strike,
            self.maturity,
            self.rate,
            self.volatility,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_args_validation() {
        let args = OptionArgs {
            spot: 100.0,
            strike: 100.0,
            maturity: 1.0,
            rate: -0.01,
            volatility: 0.2,
        };
        assert!(args.to_params().is_ok());

        let bad = OptionArgs {
            volatility: 0.0,
            ..args
        };
        assert!(bad.to_params().is_err());
    }
}

//! Black-Scholes closed-form prices for European options.
//!
//! Used as the reference oracle when validating Monte Carlo estimates.
//!
//! ## Mathematical Formulas
//!
//! **Call Price**: C = S·N(d₁) - K·e^(-rT)·N(d₂)
//! **Put Price**: P = K·e^(-rT)·N(-d₂) - S·N(-d₁)
//!
//! Where:
//! - d₁ = (ln(S/K) + (r + σ²/2)T) / (σ√T)
//! - d₂ = d₁ - σ√T

use super::distributions::norm_cdf;
use crate::types::OptionParameters;

fn d1_d2(params: &OptionParameters) -> (f64, f64) {
    let vol_sqrt_t = params.volatility() * params.maturity().sqrt();
    let d1 = ((params.spot() / params.strike()).ln()
        + (params.rate() + 0.5 * params.volatility() * params.volatility()) * params.maturity())
        / vol_sqrt_t;
    (d1, d1 - vol_sqrt_t)
}

/// Black-Scholes price of a European call.
///
/// Parameters are validated at construction of [`OptionParameters`], so this
/// function is total.
///
/// # Examples
/// ```
/// use pricer_core::analytical::black_scholes_call;
/// use pricer_core::types::OptionParameters;
///
/// let params = OptionParameters::new(100.0, 100.0, 1.0, 0.05, 0.2).unwrap();
/// assert!((black_scholes_call(&params) - 10.4506).abs() < 1e-3);
/// ```
pub fn black_scholes_call(params: &OptionParameters) -> f64 {
    let (d1, d2) = d1_d2(params);
    params.spot() * norm_cdf(d1) - params.strike() * params.discount_factor() * norm_cdf(d2)
}

/// Black-Scholes price of a European put.
pub fn black_scholes_put(params: &OptionParameters) -> f64 {
    let (d1, d2) = d1_d2(params);
    params.strike() * params.discount_factor() * norm_cdf(-d2) - params.spot() * norm_cdf(-d1)
}

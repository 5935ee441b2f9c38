//! Terminal payoff of a European call under geometric Brownian motion.
//!
//! The exact GBM solution is sampled in one step:
//!
//! ```text
//! S_T = S0 · exp((r - σ²/2)·T + σ·√T·Z),   Z ~ N(0, 1)
//! payoff = max(S_T - K, 0)
//! ```
//!
//! [`OptionModel`] hoists the drift, the diffusion scale and the discount
//! factor out of the per-draw evaluation. Payoffs are accumulated
//! undiscounted; the coordinator applies [`OptionModel::discount_factor`]
//! once, to the reduced mean. The model is `Copy` and stateless, so each
//! worker holds its own copy.

use pricer_core::types::OptionParameters;

/// Precomputed one-step GBM model for a European call.
///
/// # Examples
///
/// ```rust
/// use pricer_core::types::OptionParameters;
/// use pricer_distributed::model::OptionModel;
///
/// let params = OptionParameters::new(100.0, 100.0, 1.0, 0.05, 0.2).unwrap();
/// let model = OptionModel::new(&params);
///
/// // Z = 0 leaves only the drift term
/// let s_t = model.terminal_price(0.0);
/// assert!((s_t - 100.0 * (0.05_f64 - 0.02).exp()).abs() < 1e-12);
/// assert!(model.payoff(-10.0) == 0.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OptionModel {
    spot: f64,
    strike: f64,
    /// (r - σ²/2)·T
    drift: f64,
    /// σ·√T
    diffusion: f64,
    /// exp(-rT)
    discount_factor: f64,
}

impl OptionModel {
    /// Builds the model from validated option parameters.
    pub fn new(params: &OptionParameters) -> Self {
        let vol = params.volatility();
        let maturity = params.maturity();
        Self {
            spot: params.spot(),
            strike: params.strike(),
            drift: (params.rate() - 0.5 * vol * vol) * maturity,
            diffusion: vol * maturity.sqrt(),
            discount_factor: params.discount_factor(),
        }
    }

    /// Terminal underlying price for the standard normal shock `z`.
    #[inline]
    pub fn terminal_price(&self, z: f64) -> f64 {
        self.spot * (self.drift + self.diffusion * z).exp()
    }

    /// Undiscounted call payoff `max(S_T - K, 0)` for the shock `z`.
    ///
    /// A NaN terminal price yields a NaN payoff rather than zero.
    #[inline]
    pub fn payoff(&self, z: f64) -> f64 {
        let intrinsic = self.terminal_price(z) - self.strike;
        if intrinsic > 0.0 || intrinsic.is_nan() {
            intrinsic
        } else {
            0.0
        }
    }

    /// Discount factor exp(-rT) applied to the mean payoff.
    #[inline]
    pub fn discount_factor(&self) -> f64 {
        self.discount_factor
    }
}

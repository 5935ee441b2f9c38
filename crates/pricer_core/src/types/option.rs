//! European option contract and market parameters.
//!
//! [`OptionParameters`] bundles the five Black-Scholes inputs. It is validated
//! once at construction and is immutable afterwards, so every consumer (the
//! Monte Carlo workers, the analytical reference) can share it by value.

use super::error::PricingError;

/// Black-Scholes inputs for a European option.
///
/// # Invariants
///
/// - `spot`, `strike`, `maturity` and `volatility` are finite and strictly positive
/// - `rate` is finite (zero and negative rates are allowed)
///
/// # Examples
///
/// ```
/// use pricer_core::types::OptionParameters;
///
/// let params = OptionParameters::new(100.0, 100.0, 1.0, 0.05, 0.2).unwrap();
/// assert_eq!(params.spot(), 100.0);
/// assert!((params.discount_factor() - (-0.05_f64).exp()).abs() < 1e-15);
///
/// assert!(OptionParameters::new(100.0, 100.0, 0.0, 0.05, 0.2).is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct OptionParameters {
    /// Initial underlying price (S0)
    spot: f64,
    /// Strike price (K)
    strike: f64,
    /// Time to maturity in years (T)
    maturity: f64,
    /// Continuously compounded risk-free rate (r)
    rate: f64,
    /// Annualised volatility (σ)
    volatility: f64,
}

impl OptionParameters {
    /// Creates validated option parameters.
    ///
    /// # Arguments
    ///
    /// * `spot` - Initial underlying price S0 (> 0)
    /// * `strike` - Strike price K (> 0)
    /// * `maturity` - Time to maturity T in years (> 0)
    /// * `rate` - Risk-free rate r (any finite value)
    /// * `volatility` - Volatility σ (> 0)
    ///
    /// # Errors
    ///
    /// Returns `PricingError::InvalidInput` naming the first offending parameter.
    pub fn new(
        spot: f64,
        strike: f64,
        maturity: f64,
        rate: f64,
        volatility: f64,
    ) -> Result<Self, PricingError> {
        require_positive("spot", spot)?;
        require_positive("strike", strike)?;
        require_positive("maturity", maturity)?;
        if !rate.is_finite() {
            return Err(PricingError::InvalidInput(format!(
                "rate must be finite, got {}",
                rate
            )));
        }
        require_positive("volatility", volatility)?;

        Ok(Self {
            spot,
            strike,
            maturity,
            rate,
            volatility,
        })
    }

    /// Returns the initial underlying price S0.
    #[inline]
    pub fn spot(&self) -> f64 {
        self.spot
    }

    /// Returns the strike price K.
    #[inline]
    pub fn strike(&self) -> f64 {
        self.strike
    }

    /// Returns the time to maturity T in years.
    #[inline]
    pub fn maturity(&self) -> f64 {
        self.maturity
    }

    /// Returns the risk-free rate r.
    #[inline]
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Returns the volatility σ.
    #[inline]
    pub fn volatility(&self) -> f64 {
        self.volatility
    }

    /// Returns the discount factor exp(-rT).
    #[inline]
    pub fn discount_factor(&self) -> f64 {
        (-self.rate * self.maturity).exp()
    }
}

fn require_positive(name: &str, value: f64) -> Result<(), PricingError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PricingError::InvalidInput(format!(
            "{} must be positive and finite, got {}",
            name, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_valid_parameters() {
        let params = OptionParameters::new(100.0, 95.0, 0.5, 0.03, 0.25).unwrap();
        assert_eq!(params.spot(), 100.0);
        assert_eq!(params.strike(), 95.0);
        assert_eq!(params.maturity(), 0.5);
        assert_eq!(params.rate(), 0.03);
        assert_eq!(params.volatility(), 0.25);
        assert_relative_eq!(params.discount_factor(), (-0.015_f64).exp(), epsilon = 1e-15);
    }

    #[test]
    fn test_zero_and_negative_rates_allowed() {
        assert!(OptionParameters::new(100.0, 100.0, 1.0, 0.0, 0.2).is_ok());
        let params = OptionParameters::new(100.0, 100.0, 1.0, -0.01, 0.2).unwrap();
        assert!(params.discount_factor() > 1.0);
    }

    #[test]
    fn test_rejects_non_positive_inputs() {
        assert!(OptionParameters::new(0.0, 100.0, 1.0, 0.05, 0.2).is_err());
        assert!(OptionParameters::new(100.0, -1.0, 1.0, 0.05, 0.2).is_err());
        assert!(OptionParameters::new(100.0, 100.0, 0.0, 0.05, 0.2).is_err());
        assert!(OptionParameters::new(100.0, 100.0, 1.0, 0.05, 0.0).is_err());
    }

    #[test]
    fn test_rejects_non_finite_inputs() {
        assert!(OptionParameters::new(f64::NAN, 100.0, 1.0, 0.05, 0.2).is_err());
        assert!(OptionParameters::new(100.0, f64::INFINITY, 1.0, 0.05, 0.2).is_err());
        assert!(OptionParameters::new(100.0, 100.0, 1.0, f64::NAN, 0.2).is_err());
    }

    #[test]
    fn test_error_names_parameter() {
        let err = OptionParameters::new(100.0, 100.0, 1.0, 0.05, -0.2).unwrap_err();
        assert!(err.to_string().contains("volatility"));
    }
}

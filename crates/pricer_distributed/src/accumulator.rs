//! Per-worker moment accumulation.
//!
//! A worker folds its shock stream into one [`LocalStatistics`] value. The
//! accumulator is owned by exactly one worker for the duration of its local
//! pass and is moved into the collective reduction afterwards.
//!
//! Two sets of moments are kept:
//!
//! - draw moments (`sum_payoff`, `sum_squared_payoff`, `count`), from which the
//!   price is derived;
//! - sampling-unit moments (`unit_sum`, `unit_sum_squared`, `unit_count`), from
//!   which the standard error is derived. A unit is one draw in standard mode
//!   and the mean of an antithetic pair in antithetic mode; an odd stream ends
//!   with one unpaired unit. Treating the two halves of a pair as independent
//!   draws would hide the variance reduction.

use pricer_core::types::OptionParameters;

use crate::error::{EngineError, Result};
use crate::model::OptionModel;
use crate::rng::VarianceReduction;

/// Raw payoff moments of one worker (or of several, once merged).
///
/// Payoffs are undiscounted; discounting happens once, at estimation.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LocalStatistics {
    /// Σ payoff over all draws.
    pub sum_payoff: f64,
    /// Σ payoff² over all draws.
    pub sum_squared_payoff: f64,
    /// Number of draws.
    pub count: u64,
    /// Σ unit value over sampling units.
    pub unit_sum: f64,
    /// Σ unit value² over sampling units.
    pub unit_sum_squared: f64,
    /// Number of sampling units.
    pub unit_count: u64,
}

impl LocalStatistics {
    /// Statistics of zero draws.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns true if no draw has been recorded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Adds another worker's moments to these, field by field.
    pub fn merge(mut self, other: &LocalStatistics) -> Self {
        self.sum_payoff += other.sum_payoff;
        self.sum_squared_payoff += other.sum_squared_payoff;
        self.count += other.count;
        self.unit_sum += other.unit_sum;
        self.unit_sum_squared += other.unit_sum_squared;
        self.unit_count += other.unit_count;
        self
    }

    #[inline]
    fn record_draw(&mut self, payoff: f64) {
        self.sum_payoff += payoff;
        self.sum_squared_payoff += payoff * payoff;
        self.count += 1;
    }

    #[inline]
    fn record_unit(&mut self, value: f64) {
        self.unit_sum += value;
        self.unit_sum_squared += value * value;
        self.unit_count += 1;
    }
}

/// Streaming accumulator for one worker's local pass.
///
/// # Examples
///
/// ```rust
/// use pricer_core::types::OptionParameters;
/// use pricer_distributed::accumulator::LocalAccumulator;
/// use pricer_distributed::rng::VarianceReduction;
///
/// let params = OptionParameters::new(100.0, 100.0, 1.0, 0.05, 0.2).unwrap();
/// let mut acc = LocalAccumulator::new(&params, VarianceReduction::None);
/// acc.observe(0.5).unwrap();
/// acc.observe(-0.5).unwrap();
///
/// let stats = acc.finish();
/// assert_eq!(stats.count, 2);
/// assert_eq!(stats.unit_count, 2);
/// ```
#[derive(Clone, Debug)]
pub struct LocalAccumulator {
    model: OptionModel,
    mode: VarianceReduction,
    rank: usize,
    stats: LocalStatistics,
    /// First payoff of an open antithetic pair.
    open_pair: Option<f64>,
}

impl LocalAccumulator {
    /// Creates an empty accumulator for `params`.
    pub fn new(params: &OptionParameters, mode: VarianceReduction) -> Self {
        Self {
            model: OptionModel::new(params),
            mode,
            rank: 0,
            stats: LocalStatistics::empty(),
            open_pair: None,
        }
    }

    /// Tags numerical failures with the owning worker's rank.
    pub fn with_rank(mut self, rank: usize) -> Self {
        self.rank = rank;
        self
    }

    /// Evaluates the payoff of shock `z` and records it.
    ///
    /// # Errors
    ///
    /// `NumericalFailure` if the payoff is NaN or infinite.
    #[inline]
    pub fn observe(&mut self, z: f64) -> Result<()> {
        let payoff = self.model.payoff(z);
        if !payoff.is_finite() {
            return Err(EngineError::NumericalFailure {
                rank: self.rank,
                draw_index: self.stats.count,
                payoff,
            });
        }

        self.stats.record_draw(payoff);
        match self.mode {
            VarianceReduction::None => self.stats.record_unit(payoff),
            VarianceReduction::Antithetic => match self.open_pair.take() {
                Some(first) => self.stats.record_unit(0.5 * (first + payoff)),
                None => self.open_pair = Some(payoff),
            },
        }
        Ok(())
    }

    /// Closes any unpaired draw and returns the frozen statistics.
    pub fn finish(mut self) -> LocalStatistics {
        if let Some(unpaired) = self.open_pair.take() {
            self.stats.record_unit(unpaired);
        }
        self.stats
    }
}

/// Folds a whole shock stream into local statistics.
///
/// An empty stream yields [`LocalStatistics::empty`].
///
/// # Errors
///
/// `NumericalFailure` on the first non-finite payoff.
pub fn accumulate<I>(
    params: &OptionParameters,
    draws: I,
    mode: VarianceReduction,
) -> Result<LocalStatistics>
where
    I: IntoIterator<Item = f64>,
{
    accumulate_on_rank(params, draws, mode, 0)
}

/// As [`accumulate`], tagging failures with `rank`.
pub fn accumulate_on_rank<I>(
    params: &OptionParameters,
    draws: I,
    mode: VarianceReduction,
    rank: usize,
) -> Result<LocalStatistics>
where
    I: IntoIterator<Item = f64>,
{
    let mut acc = LocalAccumulator::new(params, mode).with_rank(rank);
    for z in draws {
        acc.observe(z)?;
    }
    Ok(acc.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::SampleGenerator;
    use approx::assert_relative_eq;

    fn atm() -> OptionParameters {
        OptionParameters::new(100.0, 100.0, 1.0, 0.05, 0.2).unwrap()
    }

    #[test]
    fn test_empty_stream_gives_zero_statistics() {
        let stats = accumulate(&atm(), std::iter::empty(), VarianceReduction::None).unwrap();
        assert!(stats.is_empty());
        assert_eq!(stats, LocalStatistics::empty());

        let stats = accumulate(&atm(), std::iter::empty(), VarianceReduction::Antithetic).unwrap();
        assert_eq!(stats.unit_count, 0);
    }

    #[test]
    fn test_moments_match_direct_computation() {
        let params = atm();
        let model = OptionModel::new(&params);
        let shocks = [-1.0, 0.0, 0.3, 1.5, 2.0];

        let stats = accumulate(&params, shocks, VarianceReduction::None).unwrap();
        let payoffs: Vec<f64> = shocks.iter().map(|&z| model.payoff(z)).collect();

        assert_eq!(stats.count, 5);
        assert_relative_eq!(stats.sum_payoff, payoffs.iter().sum::<f64>(), epsilon = 1e-12);
        assert_relative_eq!(
            stats.sum_squared_payoff,
            payoffs.iter().map(|p| p * p).sum::<f64>(),
            epsilon = 1e-9
        );
        // Standard mode: units are draws.
        assert_eq!(stats.unit_count, stats.count);
        assert_eq!(stats.unit_sum, stats.sum_payoff);
    }

    #[test]
    fn test_antithetic_units_are_pair_means() {
        let params = atm();
        let model = OptionModel::new(&params);
        let shocks = [1.0, -1.0, 0.4, -0.4, 2.0];

        let stats = accumulate(&params, shocks, VarianceReduction::Antithetic).unwrap();
        assert_eq!(stats.count, 5);
        assert_eq!(stats.unit_count, 3);

        let u0 = 0.5 * (model.payoff(1.0) + model.payoff(-1.0));
        let u1 = 0.5 * (model.payoff(0.4) + model.payoff(-0.4));
        let u2 = model.payoff(2.0);
        assert_relative_eq!(stats.unit_sum, u0 + u1 + u2, epsilon = 1e-12);
        assert_relative_eq!(stats.unit_sum_squared, u0 * u0 + u1 * u1 + u2 * u2, epsilon = 1e-9);
    }

    #[test]
    fn test_non_finite_payoff_is_reported() {
        let params = atm();
        let err = accumulate_on_rank(&params, [0.0, 1.0, f64::INFINITY], VarianceReduction::None, 3)
            .unwrap_err();
        match err {
            EngineError::NumericalFailure {
                rank,
                draw_index,
                payoff,
            } => {
                assert_eq!(rank, 3);
                assert_eq!(draw_index, 2);
                assert!(!payoff.is_finite());
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(accumulate(&params, [f64::NAN], VarianceReduction::None).is_err());
    }

    #[test]
    fn test_merge_adds_fields() {
        let params = atm();
        let a = accumulate(&params, SampleGenerator::new(1, 100, VarianceReduction::None), VarianceReduction::None).unwrap();
        let b = accumulate(&params, SampleGenerator::new(2, 50, VarianceReduction::None), VarianceReduction::None).unwrap();

        let merged = a.clone().merge(&b);
        assert_eq!(merged.count, 150);
        assert_eq!(merged.unit_count, 150);
        assert_relative_eq!(merged.sum_payoff, a.sum_payoff + b.sum_payoff, epsilon = 1e-12);
        assert_eq!(LocalStatistics::empty().merge(&a), a);
    }
}

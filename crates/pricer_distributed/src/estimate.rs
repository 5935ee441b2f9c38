//! Global statistics and the price estimate derived from them.

use crate::accumulator::LocalStatistics;
use crate::error::{EngineError, Result};

/// Moments reduced over every worker of a run.
///
/// Produced once, on the coordinator only, and never mutated afterwards.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct GlobalStatistics {
    totals: LocalStatistics,
}

impl GlobalStatistics {
    /// Reduces contributions in the order given, pairwise.
    ///
    /// Pairwise (tree) summation makes the result a function of the contribution
    /// order alone, and bounds rounding growth to O(log P).
    pub fn from_contributions(contributions: &[LocalStatistics]) -> Self {
        Self {
            totals: tree_sum(contributions),
        }
    }

    /// Σ payoff over all draws.
    #[inline]
    pub fn sum_payoff(&self) -> f64 {
        self.totals.sum_payoff
    }

    /// Σ payoff² over all draws.
    #[inline]
    pub fn sum_squared_payoff(&self) -> f64 {
        self.totals.sum_squared_payoff
    }

    /// Total number of draws.
    #[inline]
    pub fn count(&self) -> u64 {
        self.totals.count
    }

    /// Total number of sampling units.
    #[inline]
    pub fn unit_count(&self) -> u64 {
        self.totals.unit_count
    }

    /// Derives the price and standard error under discount factor `discount_factor`.
    ///
    /// ```text
    /// price  = D · Σpayoff / N
    /// stderr = D · sqrt(max(E[U²] - E[U]², 0) / M)
    /// ```
    ///
    /// where `U` ranges over the `M` sampling units (`M = N` without variance
    /// reduction, in which case this is the plain payoff variance).
    ///
    /// # Errors
    ///
    /// `InvalidState` if no draw was recorded.
    pub fn estimate(&self, discount_factor: f64) -> Result<PriceEstimate> {
        let t = &self.totals;
        if t.count == 0 || t.unit_count == 0 {
            return Err(EngineError::InvalidState(
                "cannot estimate a price from zero samples".to_string(),
            ));
        }

        let mean = t.sum_payoff / t.count as f64;

        let units = t.unit_count as f64;
        let unit_mean = t.unit_sum / units;
        // Cancellation can push the difference slightly negative.
        let unit_variance = (t.unit_sum_squared / units - unit_mean * unit_mean).max(0.0);

        Ok(PriceEstimate {
            price: discount_factor * mean,
            standard_error: discount_factor * (unit_variance / units).sqrt(),
            sample_count: t.count,
        })
    }
}

impl From<LocalStatistics> for GlobalStatistics {
    fn from(totals: LocalStatistics) -> Self {
        Self { totals }
    }
}

fn tree_sum(items: &[LocalStatistics]) -> LocalStatistics {
    match items {
        [] => LocalStatistics::empty(),
        [single] => single.clone(),
        _ => {
            let (left, right) = items.split_at(items.len() / 2);
            tree_sum(left).merge(&tree_sum(right))
        }
    }
}

/// Terminal output of one simulation run.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PriceEstimate {
    /// Discounted mean payoff.
    pub price: f64,
    /// Standard error of the price.
    pub standard_error: f64,
    /// Number of draws behind the estimate.
    pub sample_count: u64,
}

impl PriceEstimate {
    /// Returns the 95% confidence interval half-width.
    #[inline]
    pub fn confidence_95(&self) -> f64 {
        1.96 * self.standard_error
    }

    /// Returns the 99% confidence interval half-width.
    #[inline]
    pub fn confidence_99(&self) -> f64 {
        2.576 * self.standard_error
    }

    /// Returns true if `value` lies inside the 95% confidence interval.
    #[inline]
    pub fn contains_95(&self, value: f64) -> bool {
        (self.price - value).abs() <= self.confidence_95()
    }
}

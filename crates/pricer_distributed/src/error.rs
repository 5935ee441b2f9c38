//! Error types for the distributed estimation engine.
//!
//! Every failure aborts the whole run. A partially reduced estimate is never
//! returned: a missing contribution understates the sample count and biases
//! the price.

use pricer_core::types::PricingError;
use thiserror::Error;

/// Errors raised while configuring or running a distributed simulation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Invalid parameters or configuration, detected before any worker starts.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An upstream validation gap reached the estimation step.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The coordinator received fewer contributions than there are workers.
    #[error(
        "Partial participation: received {received} of {expected} contributions (missing ranks {missing:?})"
    )]
    PartialParticipation {
        /// Number of workers in the group.
        expected: usize,
        /// Contributions actually received, including the coordinator's own.
        received: usize,
        /// Ranks that never contributed.
        missing: Vec<usize>,
    },

    /// A worker could not deliver its contribution to the coordinator.
    #[error("Coordinator unavailable: rank {rank} could not deliver its contribution")]
    CoordinatorUnavailable {
        /// Rank of the worker that failed to send.
        rank: usize,
    },

    /// A payoff evaluated to NaN or infinity.
    #[error("Numerical failure on rank {rank}: payoff {payoff} at draw {draw_index}")]
    NumericalFailure {
        /// Rank of the worker that produced the value.
        rank: usize,
        /// Index of the offending draw within the worker's stream.
        draw_index: u64,
        /// The non-finite payoff.
        payoff: f64,
    },

    /// The worker thread pool could not be created.
    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}

impl EngineError {
    /// Returns true for errors that are consequences of another worker failing.
    ///
    /// Used to report the root cause when several ranks fail in one run.
    #[inline]
    pub fn is_participation_failure(&self) -> bool {
        matches!(
            self,
            Self::PartialParticipation { .. } | Self::CoordinatorUnavailable { .. }
        )
    }
}

impl From<PricingError> for EngineError {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::InvalidInput(msg) => Self::InvalidInput(msg),
            PricingError::NumericalInstability(msg) => Self::InvalidState(msg),
        }
    }
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_display() {
        let err = EngineError::InvalidInput("total_samples must be positive".to_string());
        assert!(err.to_string().contains("total_samples"));

        let err = EngineError::PartialParticipation {
            expected: 4,
            received: 3,
            missing: vec![2],
        };
        let msg = err.to_string();
        assert!(msg.contains("3 of 4"));
        assert!(msg.contains("[2]"));

        let err = EngineError::NumericalFailure {
            rank: 1,
            draw_index: 7,
            payoff: f64::NAN,
        };
        assert!(err.to_string().contains("rank 1"));
    }

    #[test]
    fn test_participation_classification() {
        assert!(EngineError::CoordinatorUnavailable { rank: 3 }.is_participation_failure());
        assert!(EngineError::PartialParticipation {
            expected: 2,
            received: 1,
            missing: vec![1],
        }
        .is_participation_failure());
        assert!(!EngineError::InvalidState("empty".to_string()).is_participation_failure());
    }

    #[test]
    fn test_from_pricing_error() {
        let err: EngineError = PricingError::InvalidInput("spot".to_string()).into();
        assert_eq!(err, EngineError::InvalidInput("spot".to_string()));
    }
}
